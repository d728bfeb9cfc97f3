use thiserror::Error;

/// Top-level error type for the `adminlink-api` crate.
///
/// Covers configuration the socket layer cannot honor, failures reported
/// by the Socket.IO client, and namespace refusals. `adminlink-core` maps
/// these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Setup ───────────────────────────────────────────────────────
    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Every configured transport was disabled.
    #[error("No transports enabled")]
    NoTransports,

    // ── Connection ──────────────────────────────────────────────────
    /// Error surfaced by the Socket.IO / Engine.IO client.
    #[error("Socket error: {0}")]
    Socket(#[from] rust_socketio::Error),

    /// A connection attempt did not finish in time.
    #[error("Timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Namespace middleware rejected the CONNECT packet.
    #[error("Connection to namespace {namespace} refused: {message}")]
    ConnectRefused { namespace: String, message: String },
}

impl Error {
    /// Returns `true` if the namespace refused our credentials.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::ConnectRefused { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Socket(_) | Self::Timeout { .. })
    }
}

// ── Core error types ──
//
// User-facing errors from adminlink-core. Consumers never see raw socket
// or client failures; the `From<adminlink_api::Error>` impl translates
// transport-layer errors into domain-appropriate variants.

use thiserror::Error;

use crate::credential::Refusal;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to console at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Console refused the connection: {message}")]
    AuthenticationFailed { message: String },

    #[error("Console disconnected")]
    ControllerDisconnected,

    #[error("Console connection timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ── Credential errors ────────────────────────────────────────────
    #[error("Not connecting: {0}")]
    CredentialRefused(#[from] Refusal),

    #[error("Credential store error: {message}")]
    CredentialStore { message: String },

    // ── Event errors ─────────────────────────────────────────────────
    #[error("Unknown event: {name}")]
    UnknownEvent { name: String },

    #[error("Malformed {name} payload: {reason}")]
    MalformedEvent { name: String, reason: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<adminlink_api::Error> for CoreError {
    fn from(err: adminlink_api::Error) -> Self {
        use adminlink_api::Error as Api;

        match err {
            Api::ConnectRefused { message, .. } => CoreError::AuthenticationFailed { message },
            Api::Timeout { timeout_ms } => CoreError::Timeout { timeout_ms },
            Api::Socket(e) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: e.to_string(),
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::NoTransports => CoreError::Config {
                message: "no transports enabled".into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_namespace_maps_to_authentication_failure() {
        let err: CoreError = adminlink_api::Error::ConnectRefused {
            namespace: "/admin".into(),
            message: "invalid token".into(),
        }
        .into();
        assert!(matches!(err, CoreError::AuthenticationFailed { ref message } if message == "invalid token"));
    }

    #[test]
    fn slow_connect_maps_to_timeout() {
        let err: CoreError = adminlink_api::Error::Timeout { timeout_ms: 20_000 }.into();
        assert_eq!(err.to_string(), "Console connection timed out after 20000ms");
    }

    #[test]
    fn refusal_converts() {
        let err = CoreError::from(Refusal::MissingToken {
            username: "ops".into(),
        });
        assert_eq!(err.to_string(), "Not connecting: no stored token for ops");
    }
}

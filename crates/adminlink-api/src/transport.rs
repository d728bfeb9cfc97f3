// Transport selection and request options for the console connection.
//
// The Engine.IO transports themselves live in `rust_socketio`; this module
// decides which of them to allow, where the endpoint is, and which headers
// ride along on the handshake, every poll, and the WebSocket upgrade.

use std::time::Duration;

use rust_socketio::TransportType;
use secrecy::SecretString;
use url::Url;

use crate::error::Error;

/// A single Engine.IO transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TransportKind {
    /// Persistent bidirectional WebSocket.
    WebSocket,
    /// HTTP long-polling fallback.
    Polling,
}

/// Which transports a connection may use and how it presents itself.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Server path of the Engine.IO endpoint (e.g. `/socket.io/`).
    pub path: String,
    /// Allowed transports. Without `upgrade`, the first one wins.
    pub transports: Vec<TransportKind>,
    /// Start on polling and upgrade to WebSocket when the server offers it.
    pub upgrade: bool,
    /// Send `cookie` on every request (credentialed mode).
    pub with_credentials: bool,
    /// Bound on a single connection attempt.
    pub timeout: Duration,
    /// `Cookie` header value, e.g. a load balancer's sticky-session cookie.
    pub cookie: Option<SecretString>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            path: "/socket.io/".into(),
            transports: vec![TransportKind::WebSocket, TransportKind::Polling],
            upgrade: true,
            with_credentials: true,
            timeout: Duration::from_secs(20),
            cookie: None,
        }
    }
}

impl TransportConfig {
    pub fn is_enabled(&self, kind: TransportKind) -> bool {
        self.transports.contains(&kind)
    }

    /// Map the allowed transports onto the client's transport strategy.
    pub fn transport_type(&self) -> Result<TransportType, Error> {
        let websocket = self.is_enabled(TransportKind::WebSocket);
        let polling = self.is_enabled(TransportKind::Polling);

        match (websocket, polling) {
            (true, true) if self.upgrade => Ok(TransportType::Any),
            (true, true) => match self.transports.first() {
                Some(TransportKind::Polling) => Ok(TransportType::Polling),
                _ => Ok(TransportType::Websocket),
            },
            (true, false) => Ok(TransportType::Websocket),
            (false, true) => Ok(TransportType::Polling),
            (false, false) => Err(Error::NoTransports),
        }
    }

    /// Engine.IO endpoint under `origin`.
    pub fn endpoint(&self, origin: &Url) -> Result<Url, Error> {
        Ok(origin.join(&self.path)?)
    }

    /// The `Cookie` header to send, if credentialed mode has one.
    pub fn cookie_header(&self) -> Option<&SecretString> {
        if self.with_credentials {
            self.cookie.as_ref()
        } else {
            None
        }
    }
}

/// Whole milliseconds in `d`, saturating.
pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

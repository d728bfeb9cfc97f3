// ── Runtime connection configuration ──
//
// These types describe *how* to reach the console's admin namespace.
// They carry connection tuning only, never the auth token, and never touch
// disk. The CLI (or an embedder) constructs a `ControllerConfig` and hands
// it in.

use std::time::Duration;

use adminlink_api::{AuthPayload, ReconnectConfig, SocketOptions, TransportConfig, TransportKind};
use secrecy::SecretString;
use url::Url;

use crate::error::CoreError;

/// Configuration for connecting to a single console.
///
/// Built by the CLI, passed to `Controller` -- core never reads config files.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Console origin (e.g., `https://console.example.com`).
    pub url: Url,
    /// Engine.IO endpoint path. Default: `/socket.io/`.
    pub path: String,
    /// Socket.IO namespace. Default: `/admin`.
    pub namespace: String,
    /// Transports to try, in order. Default: WebSocket, then polling.
    pub transports: Vec<TransportKind>,
    /// Allow upgrading a polling session to WebSocket.
    pub upgrade: bool,
    /// Send `cookie` on every request and the WebSocket upgrade.
    pub with_credentials: bool,
    /// `Cookie` header for credentialed mode, e.g. a sticky-session cookie.
    pub cookie: Option<SecretString>,
    /// First reconnect delay.
    pub reconnect_delay: Duration,
    /// Reconnect delay cap.
    pub reconnect_delay_max: Duration,
    /// Handshake and request timeout.
    pub timeout: Duration,
}

impl ControllerConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            path: "/socket.io/".into(),
            namespace: "/admin".into(),
            transports: vec![TransportKind::WebSocket, TransportKind::Polling],
            upgrade: true,
            with_credentials: true,
            cookie: None,
            reconnect_delay: Duration::from_secs(1),
            reconnect_delay_max: Duration::from_secs(5),
            timeout: Duration::from_secs(20),
        }
    }

    /// Reject configurations the socket layer cannot honor.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.transports.is_empty() {
            return Err(CoreError::Config {
                message: "at least one transport must be enabled".into(),
            });
        }
        if !self.namespace.starts_with('/') {
            return Err(CoreError::Config {
                message: format!("namespace must start with '/': {}", self.namespace),
            });
        }
        if self.reconnect_delay > self.reconnect_delay_max {
            return Err(CoreError::Config {
                message: "reconnect delay exceeds its cap".into(),
            });
        }
        Ok(())
    }

    /// Socket options for one connection carrying `auth`.
    pub(crate) fn socket_options(&self, auth: AuthPayload) -> SocketOptions {
        let transport = TransportConfig {
            path: self.path.clone(),
            transports: self.transports.clone(),
            upgrade: self.upgrade,
            with_credentials: self.with_credentials,
            timeout: self.timeout,
            cookie: self.cookie.clone(),
        };

        SocketOptions {
            origin: self.url.clone(),
            namespace: self.namespace.clone(),
            transport,
            reconnect: ReconnectConfig {
                min_delay: self.reconnect_delay,
                max_delay: self.reconnect_delay_max,
            },
            auth: Some(auth),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn config() -> ControllerConfig {
        ControllerConfig::new(Url::parse("https://console.example.com").unwrap())
    }

    #[test]
    fn defaults_enable_both_transports_and_bounded_backoff() {
        let config = config();
        assert_eq!(
            config.transports,
            vec![TransportKind::WebSocket, TransportKind::Polling]
        );
        assert!(config.upgrade);
        assert!(config.with_credentials);
        assert_eq!(config.reconnect_delay, Duration::from_secs(1));
        assert_eq!(config.reconnect_delay_max, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn socket_options_carry_auth_and_cookie() {
        let auth = AuthPayload {
            token: SecretString::from("t".to_string()),
            role: "admin".into(),
            username: "ops".into(),
        };
        let mut config = config();
        config.cookie = Some(SecretString::from("io=sticky".to_string()));
        let options = config.socket_options(auth);
        assert_eq!(options.namespace, "/admin");
        assert!(options.auth.is_some());
        assert!(options.transport.cookie_header().is_some());
        assert_eq!(options.reconnect.max_delay, Duration::from_secs(5));
    }

    #[test]
    fn validate_rejects_empty_transports() {
        let mut config = config();
        config.transports.clear();
        assert!(matches!(config.validate(), Err(CoreError::Config { .. })));
    }
}

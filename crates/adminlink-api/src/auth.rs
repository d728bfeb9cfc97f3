use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

/// Credentials carried in the namespace CONNECT packet.
///
/// The token stays wrapped in a [`SecretString`] until the moment the
/// packet is encoded, so it never shows up in `Debug` output or logs.
#[derive(Debug, Clone)]
pub struct AuthPayload {
    pub token: SecretString,
    pub role: String,
    pub username: String,
}

impl AuthPayload {
    /// The `{ token, role, username }` object the server's namespace
    /// middleware expects.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "token": self.token.expose_secret(),
            "role": self.role,
            "username": self.username,
        })
    }
}

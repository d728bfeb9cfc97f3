// ── Credential gate ──
//
// Decides whether a connection may be opened for the current
// authentication state, and with which token. Token storage itself is an
// external collaborator behind `CredentialStore`.

use std::collections::HashMap;
use std::sync::Mutex;

use adminlink_api::AuthPayload;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::error::CoreError;

/// Who is signed in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub username: String,
    pub role: String,
}

impl Identity {
    pub fn new(username: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            role: role.into(),
        }
    }
}

/// Externally owned authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub authenticated: bool,
    pub identity: Option<Identity>,
}

impl AuthState {
    pub fn signed_in(identity: Identity) -> Self {
        Self {
            authenticated: true,
            identity: Some(identity),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }
}

/// Source of session tokens.
///
/// Implementations decide where tokens live (keyring, memory, ...). An
/// `Err` from `token` is treated as "no token" by the gate.
pub trait CredentialStore: Send + Sync {
    fn token(&self, identity: &Identity) -> Result<Option<SecretString>, CoreError>;

    /// Forget the token for `identity`. Clearing an absent token succeeds.
    fn clear(&self, identity: &Identity) -> Result<(), CoreError>;
}

/// What the gate hands to the connection: the namespace auth payload.
#[derive(Debug, Clone)]
pub struct CredentialBundle {
    pub token: SecretString,
    pub role: String,
    pub username: String,
}

impl CredentialBundle {
    pub fn to_auth_payload(&self) -> AuthPayload {
        AuthPayload {
            token: self.token.clone(),
            role: self.role.clone(),
            username: self.username.clone(),
        }
    }
}

/// Why no connection will be opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Refusal {
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("authenticated without an identity")]
    MissingIdentity,
    #[error("no stored token for {username}")]
    MissingToken { username: String },
}

/// Resolve a credential bundle for `auth`, or say why not.
pub fn resolve(auth: &AuthState, store: &dyn CredentialStore) -> Result<CredentialBundle, Refusal> {
    if !auth.authenticated {
        return Err(Refusal::NotAuthenticated);
    }
    let identity = auth.identity.as_ref().ok_or(Refusal::MissingIdentity)?;
    let missing = || Refusal::MissingToken {
        username: identity.username.clone(),
    };

    let token = match store.token(identity) {
        Ok(token) => token.ok_or_else(missing)?,
        Err(e) => {
            tracing::warn!(username = %identity.username, error = %e, "credential store lookup failed");
            return Err(missing());
        }
    };
    if token.expose_secret().is_empty() {
        return Err(missing());
    }

    Ok(CredentialBundle {
        token,
        role: identity.role.clone(),
        username: identity.username.clone(),
    })
}

// ── In-memory store ──────────────────────────────────────────────────

/// Tokens held in process memory, keyed by username.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    tokens: Mutex<HashMap<String, SecretString>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, username: impl Into<String>, token: SecretString) {
        self.lock().insert(username.into(), token);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SecretString>> {
        // A poisoned map is still a valid map.
        self.tokens
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn token(&self, identity: &Identity) -> Result<Option<SecretString>, CoreError> {
        Ok(self.lock().get(&identity.username).cloned())
    }

    fn clear(&self, identity: &Identity) -> Result<(), CoreError> {
        self.lock().remove(&identity.username);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store_with(username: &str, token: &str) -> MemoryCredentialStore {
        let store = MemoryCredentialStore::new();
        store.insert(username, SecretString::from(token.to_string()));
        store
    }

    struct BrokenStore;

    impl CredentialStore for BrokenStore {
        fn token(&self, _: &Identity) -> Result<Option<SecretString>, CoreError> {
            Err(CoreError::CredentialStore {
                message: "locked".into(),
            })
        }

        fn clear(&self, _: &Identity) -> Result<(), CoreError> {
            Ok(())
        }
    }

    #[test]
    fn signed_in_with_token_yields_bundle() {
        let store = store_with("ops", "t0k");
        let bundle = resolve(&AuthState::signed_in(Identity::new("ops", "admin")), &store).unwrap();
        assert_eq!(bundle.username, "ops");
        assert_eq!(bundle.role, "admin");
        assert_eq!(bundle.token.expose_secret(), "t0k");
        assert_eq!(
            bundle.to_auth_payload().to_json()["token"],
            serde_json::json!("t0k")
        );
    }

    #[test]
    fn refusals() {
        let store = store_with("ops", "t0k");

        assert_eq!(
            resolve(&AuthState::signed_out(), &store).unwrap_err(),
            Refusal::NotAuthenticated
        );
        assert_eq!(
            resolve(
                &AuthState {
                    authenticated: true,
                    identity: None
                },
                &store
            )
            .unwrap_err(),
            Refusal::MissingIdentity
        );
        assert_eq!(
            resolve(&AuthState::signed_in(Identity::new("eve", "admin")), &store).unwrap_err(),
            Refusal::MissingToken {
                username: "eve".into()
            }
        );
    }

    #[test]
    fn empty_or_unreadable_tokens_are_missing() {
        let empty = store_with("ops", "");
        let auth = AuthState::signed_in(Identity::new("ops", "admin"));
        assert!(matches!(
            resolve(&auth, &empty),
            Err(Refusal::MissingToken { .. })
        ));
        assert!(matches!(
            resolve(&auth, &BrokenStore),
            Err(Refusal::MissingToken { .. })
        ));
    }

    #[test]
    fn clear_forgets_token() {
        let store = store_with("ops", "t0k");
        let identity = Identity::new("ops", "admin");
        store.clear(&identity).unwrap();
        assert!(store.token(&identity).unwrap().is_none());
        store.clear(&identity).unwrap();
    }
}

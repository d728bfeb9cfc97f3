// Token storage backed by the system keyring.
//
// Lookup order for a token: the env var named by the profile, then the
// keyring entry `{profile}/{username}`, then the plaintext token in the
// profile. Clearing deletes the keyring entry and revokes the identity
// for the life of the store, so env and plaintext tokens are not
// resurrected after a forced logout.

use std::collections::HashSet;
use std::sync::Mutex;

use adminlink_core::{CoreError, CredentialStore, Identity};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::{ConfigError, Profile};

/// Keyring service name all entries live under.
pub const KEYRING_SERVICE: &str = "adminlink";

/// `CredentialStore` for one profile.
pub struct KeyringCredentialStore {
    profile_name: String,
    token_env: Option<String>,
    plaintext: Option<SecretString>,
    use_keyring: bool,
    revoked: Mutex<HashSet<String>>,
}

impl KeyringCredentialStore {
    pub fn new(profile_name: impl Into<String>) -> Self {
        Self {
            profile_name: profile_name.into(),
            token_env: None,
            plaintext: None,
            use_keyring: true,
            revoked: Mutex::new(HashSet::new()),
        }
    }

    /// Store configured with the profile's env var and plaintext fallbacks.
    pub fn for_profile(profile_name: impl Into<String>, profile: &Profile) -> Self {
        let mut store = Self::new(profile_name);
        store.token_env.clone_from(&profile.token_env);
        store.plaintext = profile.token.clone().map(SecretString::from);
        store
    }

    /// Skip the system keyring (headless hosts, tests).
    pub fn without_keyring(mut self) -> Self {
        self.use_keyring = false;
        self
    }

    fn entry_name(&self, username: &str) -> String {
        format!("{}/{username}", self.profile_name)
    }

    fn entry(&self, username: &str) -> Result<keyring::Entry, keyring::Error> {
        keyring::Entry::new(KEYRING_SERVICE, &self.entry_name(username))
    }

    /// Save `token` for `username` in the keyring.
    pub fn store(&self, username: &str, token: &SecretString) -> Result<(), ConfigError> {
        self.entry(username)?.set_password(token.expose_secret())?;
        if let Ok(mut revoked) = self.revoked.lock() {
            revoked.remove(username);
        }
        debug!(entry = %self.entry_name(username), "token stored");
        Ok(())
    }

    /// Delete the keyring entry for `username`. An absent entry is fine.
    pub fn delete(&self, username: &str) -> Result<(), ConfigError> {
        match self.entry(username)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn is_revoked(&self, username: &str) -> bool {
        self.revoked
            .lock()
            .map(|revoked| revoked.contains(username))
            .unwrap_or(true)
    }

    fn from_keyring(&self, username: &str) -> Option<SecretString> {
        if !self.use_keyring {
            return None;
        }
        match self.entry(username).and_then(|e| e.get_password()) {
            Ok(secret) => Some(SecretString::from(secret)),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                debug!(error = %e, "keyring unavailable");
                None
            }
        }
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn token(&self, identity: &Identity) -> Result<Option<SecretString>, CoreError> {
        if self.is_revoked(&identity.username) {
            return Ok(None);
        }

        // 1. Profile's token_env -> env var lookup
        if let Some(ref env_name) = self.token_env {
            if let Ok(val) = std::env::var(env_name) {
                return Ok(Some(SecretString::from(val)));
            }
        }

        // 2. System keyring
        if let Some(secret) = self.from_keyring(&identity.username) {
            return Ok(Some(secret));
        }

        // 3. Plaintext in config
        Ok(self.plaintext.clone())
    }

    fn clear(&self, identity: &Identity) -> Result<(), CoreError> {
        self.revoked
            .lock()
            .map_err(|_| CoreError::CredentialStore {
                message: "revocation set poisoned".into(),
            })?
            .insert(identity.username.clone());

        if !self.use_keyring {
            return Ok(());
        }
        self.delete(&identity.username).map_err(|e| {
            warn!(error = %e, "keyring delete failed");
            CoreError::CredentialStore {
                message: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn profile(token: Option<&str>) -> Profile {
        Profile {
            server: "https://console.example.com".into(),
            username: Some("ops".into()),
            role: "admin".into(),
            token: token.map(str::to_owned),
            ..Profile::default()
        }
    }

    #[test]
    fn plaintext_token_is_the_last_resort() {
        let store = KeyringCredentialStore::for_profile("default", &profile(Some("t0k")))
            .without_keyring();
        let token = store.token(&Identity::new("ops", "admin")).unwrap().unwrap();
        assert_eq!(token.expose_secret(), "t0k");
    }

    #[test]
    fn no_source_means_no_token() {
        let store = KeyringCredentialStore::for_profile("default", &profile(None)).without_keyring();
        assert!(store.token(&Identity::new("ops", "admin")).unwrap().is_none());
    }

    #[test]
    fn clearing_revokes_plaintext_for_that_identity_only() {
        let store = KeyringCredentialStore::for_profile("default", &profile(Some("t0k")))
            .without_keyring();
        let ops = Identity::new("ops", "admin");

        store.clear(&ops).unwrap();
        assert!(store.token(&ops).unwrap().is_none());
        assert!(store.token(&Identity::new("night", "admin")).unwrap().is_some());
    }

    #[test]
    fn entries_are_scoped_by_profile() {
        let store = KeyringCredentialStore::new("lab");
        assert_eq!(store.entry_name("ops"), "lab/ops");
    }
}

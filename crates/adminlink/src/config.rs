//! Global-flag-aware wrappers over `adminlink_config`.
//!
//! Resolves the active profile, layers `--server`/`--username`/`--role`/
//! `--token` on top, and produces everything a `Controller` needs.

use std::sync::Arc;

use adminlink_config::{
    Config, Defaults, KeyringCredentialStore, Profile, auth_state_for, config_path, load_config,
    profile_to_controller_config,
};
use adminlink_core::{AuthState, ControllerConfig, CredentialStore, MemoryCredentialStore};
use clap::ValueEnum;
use secrecy::SecretString;
use tracing::warn;

use crate::cli::{ColorMode, GlobalOpts};
use crate::error::CliError;

/// A profile after global flag overrides.
pub struct ActiveProfile {
    pub name: String,
    pub profile: Profile,
    pub config: Config,
}

/// Everything needed to open one console connection.
pub struct Target {
    pub profile_name: String,
    pub controller: ControllerConfig,
    pub credentials: Arc<dyn CredentialStore>,
    pub auth: AuthState,
    pub color: ColorMode,
}

/// `--color` when given, else the config file's `defaults.color`.
pub fn color_mode(flag: Option<&ColorMode>, defaults: &Defaults) -> ColorMode {
    if let Some(mode) = flag {
        return mode.clone();
    }
    ColorMode::from_str(&defaults.color, true).unwrap_or_else(|_| {
        warn!(color = %defaults.color, "unknown defaults.color, using auto");
        ColorMode::Auto
    })
}

pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Resolve the profile in effect, building an ad-hoc one from `--server`
/// when the config file has none.
pub fn resolve_profile(global: &GlobalOpts) -> Result<ActiveProfile, CliError> {
    let config = load_config()?;
    let name = active_profile_name(global, &config);

    let mut profile = match (config.profiles.get(&name), &global.server) {
        (Some(profile), _) => profile.clone(),
        (None, Some(server)) => Profile {
            server: server.clone(),
            role: "admin".into(),
            ..Profile::default()
        },
        (None, None) if global.profile.is_some() => {
            let mut available: Vec<&str> = config.profiles.keys().map(String::as_str).collect();
            available.sort_unstable();
            return Err(CliError::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
        (None, None) => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    if let Some(ref server) = global.server {
        profile.server.clone_from(server);
    }
    if let Some(ref username) = global.username {
        profile.username = Some(username.clone());
    }
    if let Some(ref role) = global.role {
        profile.role.clone_from(role);
    }

    Ok(ActiveProfile {
        name,
        profile,
        config,
    })
}

/// Build the connection target for the active profile.
///
/// `--token` bypasses the keyring with an in-memory store.
pub fn resolve_target(global: &GlobalOpts) -> Result<Target, CliError> {
    let active = resolve_profile(global)?;
    let mut controller = profile_to_controller_config(&active.profile, &active.config.defaults)?;
    if global.timeout > 0 {
        controller.timeout = controller
            .timeout
            .min(std::time::Duration::from_secs(global.timeout));
    }
    let auth = auth_state_for(&active.profile, &active.name)?;
    let color = color_mode(global.color.as_ref(), &active.config.defaults);

    let credentials: Arc<dyn CredentialStore> = match (&global.token, &active.profile.username) {
        (Some(token), Some(username)) => {
            let store = MemoryCredentialStore::new();
            store.insert(username.clone(), SecretString::from(token.clone()));
            Arc::new(store)
        }
        _ => Arc::new(KeyringCredentialStore::for_profile(
            active.name.clone(),
            &active.profile,
        )),
    };

    Ok(Target {
        profile_name: active.name,
        controller,
        credentials,
        auth,
        color,
    })
}

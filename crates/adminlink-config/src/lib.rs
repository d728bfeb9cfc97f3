//! Shared configuration for the adminlink CLI and embedders.
//!
//! TOML profiles, token resolution (env + keyring + plaintext), and
//! translation to `adminlink_core::ControllerConfig`. The CLI layers its
//! global flags on top.

mod credentials;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use adminlink_core::{AuthState, ControllerConfig, Identity, TransportKind};

pub use credentials::{KEYRING_SERVICE, KeyringCredentialStore};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("no username configured for profile '{profile}'")]
    NoUsername { profile: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named console profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up `name`, falling back to the configured default profile.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default")
            .to_owned();
        match self.profiles.get(&name) {
            Some(profile) => Ok((name, profile)),
            None => Err(ConfigError::UnknownProfile { name }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Color mode when `--color` is absent: "auto", "always", or "never".
    #[serde(default = "default_color")]
    pub color: String,

    /// Handshake and request timeout, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    20
}

/// A named console profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Console origin (e.g., "https://console.example.com").
    pub server: String,

    /// Engine.IO path override.
    pub path: Option<String>,

    /// Namespace override (default "/admin").
    pub namespace: Option<String>,

    /// Operator account this profile signs in as.
    pub username: Option<String>,

    /// Role sent in the namespace auth payload.
    #[serde(default = "default_role")]
    pub role: String,

    /// Session token (plaintext -- prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the token.
    pub token_env: Option<String>,

    /// Transports in preference order: "websocket", "polling".
    pub transports: Option<Vec<String>>,

    /// Allow polling sessions to upgrade to WebSocket.
    pub upgrade: Option<bool>,

    /// Send `cookie` on the handshake, every poll, and the upgrade.
    pub with_credentials: Option<bool>,

    /// `Cookie` header value for credentialed mode (e.g. a sticky-session cookie).
    pub cookie: Option<String>,

    /// Override timeout, in seconds.
    pub timeout: Option<u64>,

    /// First reconnect delay, in milliseconds.
    pub reconnect_delay_ms: Option<u64>,

    /// Reconnect delay cap, in milliseconds.
    pub reconnect_delay_max_ms: Option<u64>,
}

fn default_role() -> String {
    "admin".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "adminlink", "adminlink").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("adminlink");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, still layering `ADMINLINK_` env on top.
///
/// Nested keys use a double underscore: `ADMINLINK_DEFAULTS__TIMEOUT=5`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ADMINLINK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML at `path`, creating parent directories.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Profile translation ─────────────────────────────────────────────

/// Build a `ControllerConfig` from a profile, applying `defaults` where
/// the profile is silent.
pub fn profile_to_controller_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<ControllerConfig, ConfigError> {
    let url: url::Url = profile
        .server
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "server".into(),
            reason: format!("invalid URL: {}", profile.server),
        })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "server".into(),
            reason: format!("expected an http(s) URL, got '{}'", url.scheme()),
        });
    }

    let mut config = ControllerConfig::new(url);
    if let Some(ref path) = profile.path {
        config.path.clone_from(path);
    }
    if let Some(ref namespace) = profile.namespace {
        config.namespace.clone_from(namespace);
    }
    if let Some(ref names) = profile.transports {
        config.transports = parse_transports(names)?;
    }
    if let Some(upgrade) = profile.upgrade {
        config.upgrade = upgrade;
    }
    if let Some(with_credentials) = profile.with_credentials {
        config.with_credentials = with_credentials;
    }
    if let Some(ref cookie) = profile.cookie {
        config.cookie = Some(SecretString::from(cookie.clone()));
    }
    if let Some(ms) = profile.reconnect_delay_ms {
        config.reconnect_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = profile.reconnect_delay_max_ms {
        config.reconnect_delay_max = Duration::from_millis(ms);
    }
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));

    config.validate().map_err(|e| ConfigError::Validation {
        field: "profile".into(),
        reason: e.to_string(),
    })?;
    Ok(config)
}

fn parse_transports(names: &[String]) -> Result<Vec<TransportKind>, ConfigError> {
    names
        .iter()
        .map(|name| {
            name.parse().map_err(|_| ConfigError::Validation {
                field: "transports".into(),
                reason: format!("expected 'websocket' or 'polling', got '{name}'"),
            })
        })
        .collect()
}

/// The signed-in state a profile represents.
pub fn auth_state_for(profile: &Profile, profile_name: &str) -> Result<AuthState, ConfigError> {
    let username = profile
        .username
        .clone()
        .ok_or_else(|| ConfigError::NoUsername {
            profile: profile_name.into(),
        })?;
    Ok(AuthState::signed_in(Identity::new(
        username,
        profile.role.clone(),
    )))
}

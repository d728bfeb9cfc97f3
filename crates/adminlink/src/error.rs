//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use adminlink_config::ConfigError;
use adminlink_core::{CoreError, Refusal};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to console at {url}")]
    #[diagnostic(
        code(adminlink::connection_failed),
        help(
            "{reason}\n\
             Check that the console is running and reachable at {url}.\n\
             Re-run with -vv to see the handshake."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("The console rejected the login: {message}")]
    #[diagnostic(
        code(adminlink::auth_failed),
        help("The stored token may have expired. Run: adminlink login --profile {profile}")
    )]
    AuthFailed { profile: String, message: String },

    #[error("No session token stored for profile '{profile}'")]
    #[diagnostic(
        code(adminlink::no_credentials),
        help(
            "Store one with: adminlink login --profile {profile}\n\
             Or set ADMINLINK_TOKEN, or token_env in the profile."
        )
    )]
    NoCredentials { profile: String },

    #[error("No operator username for profile '{profile}'")]
    #[diagnostic(
        code(adminlink::not_signed_in),
        help("Set `username` in the profile or pass --username.")
    )]
    NotSignedIn { profile: String },

    #[error("Logged out by the console{}", .reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    #[diagnostic(
        code(adminlink::forced_logout),
        help("The stored token was removed. Run: adminlink login")
    )]
    ForcedLogout { reason: Option<String> },

    // ── Commands ─────────────────────────────────────────────────────
    #[error("The console rejected the command: {message}")]
    #[diagnostic(code(adminlink::rejected))]
    Rejected { message: String },

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(adminlink::not_found),
        help("Run: adminlink {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("'{identifier}' matches more than one session")]
    #[diagnostic(
        code(adminlink::ambiguous),
        help("Use more characters of the id. Candidates: {candidates}")
    )]
    Ambiguous {
        identifier: String,
        candidates: String,
    },

    #[error("Console protocol error: {message}")]
    #[diagnostic(code(adminlink::protocol))]
    Protocol { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(adminlink::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(adminlink::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No console configured")]
    #[diagnostic(
        code(adminlink::no_config),
        help(
            "Pass --server and --username, or add a profile to:\n\
             {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(adminlink::config))]
    Config(ConfigError),

    #[error("Keyring error: {message}")]
    #[diagnostic(
        code(adminlink::keyring),
        help("Use ADMINLINK_TOKEN or token_env when no system keyring is available.")
    )]
    Keyring { message: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(adminlink::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Timed out after {seconds}s waiting for {waiting_for}")]
    #[diagnostic(
        code(adminlink::timeout),
        help("Increase the wait with --timeout or check console responsiveness.")
    )]
    Timeout { seconds: u64, waiting_for: String },

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(adminlink::json), help("Check the JSON contents and try again."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. }
            | Self::NoCredentials { .. }
            | Self::NotSignedIn { .. }
            | Self::ForcedLogout { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. }
            | Self::Ambiguous { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoUsername { profile } => CliError::NotSignedIn { profile },
            ConfigError::Keyring(e) => CliError::Keyring {
                message: e.to_string(),
            },
            other => CliError::Config(other),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: "current".into(),
                message,
            },

            CoreError::ControllerDisconnected => CliError::ConnectionFailed {
                url: "(disconnected)".into(),
                reason: "console connection was lost".into(),
            },

            CoreError::Timeout { timeout_ms } => CliError::Timeout {
                seconds: timeout_ms.div_ceil(1000),
                waiting_for: "the console".into(),
            },

            CoreError::CredentialRefused(Refusal::MissingToken { .. }) => {
                CliError::NoCredentials {
                    profile: "current".into(),
                }
            }
            CoreError::CredentialRefused(_) => CliError::NotSignedIn {
                profile: "current".into(),
            },

            CoreError::CredentialStore { message } => CliError::Keyring { message },

            CoreError::Config { message } => CliError::Validation {
                field: "connection".into(),
                reason: message,
            },

            CoreError::UnknownEvent { name } => CliError::Protocol {
                message: format!("unknown event '{name}'"),
            },
            CoreError::MalformedEvent { name, reason } => CliError::Protocol {
                message: format!("malformed '{name}': {reason}"),
            },
            CoreError::Internal(message) => CliError::Protocol { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refusals_map_to_auth_exit_code() {
        let err = CliError::from(CoreError::CredentialRefused(Refusal::MissingToken {
            username: "ops".into(),
        }));
        assert!(matches!(err, CliError::NoCredentials { .. }));
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }

    #[test]
    fn forced_logout_message_includes_reason() {
        let err = CliError::ForcedLogout {
            reason: Some("revoked".into()),
        };
        assert_eq!(err.to_string(), "Logged out by the console: revoked");
        let bare = CliError::ForcedLogout { reason: None };
        assert_eq!(bare.to_string(), "Logged out by the console");
    }

    #[test]
    fn config_validation_is_a_usage_error() {
        let err = CliError::from(ConfigError::Validation {
            field: "server".into(),
            reason: "invalid URL".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}

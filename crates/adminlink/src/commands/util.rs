//! Shared helpers for command handlers: connecting, waiting for the
//! console to sync or confirm, and resolving identifiers.

use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

use adminlink_core::{Command, ConnectionState, Controller, CoreError, Mirror, Notice, Refusal};
use tokio::sync::broadcast;
use tracing::debug;

use crate::cli::{CallerData, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

/// How long to listen for a rejection when a command has no visible effect.
const REJECTION_GRACE: Duration = Duration::from_secs(2);

/// An open console connection plus what error messages need.
pub struct Console {
    pub controller: Controller,
    pub url: String,
    pub profile: String,
    /// Whether human-facing output may use color.
    pub color: bool,
}

pub fn wait_limit(global: &GlobalOpts) -> Duration {
    Duration::from_secs(global.timeout.max(1))
}

/// Open the connection for the active profile without waiting for it.
pub async fn open(global: &GlobalOpts) -> Result<Console, CliError> {
    let target = config::resolve_target(global)?;
    let url = target.controller.url.to_string();
    let profile = target.profile_name;
    let color = output::should_color(&target.color);
    let controller = Controller::new(target.controller, target.credentials);

    controller
        .set_auth_state(target.auth)
        .await
        .map_err(|e| match e {
            CoreError::CredentialRefused(Refusal::MissingToken { .. }) => {
                CliError::NoCredentials {
                    profile: profile.clone(),
                }
            }
            CoreError::CredentialRefused(_) => CliError::NotSignedIn {
                profile: profile.clone(),
            },
            other => other.into(),
        })?;

    Ok(Console {
        controller,
        url,
        profile,
        color,
    })
}

/// Open the connection and wait for the first `init` snapshot.
pub async fn connect(global: &GlobalOpts) -> Result<Console, CliError> {
    let console = open(global).await?;
    if let Err(e) = wait_until_synced(&console, global).await {
        console.controller.shutdown().await;
        return Err(e);
    }
    Ok(console)
}

async fn wait_until_synced(console: &Console, global: &GlobalOpts) -> Result<(), CliError> {
    let limit = wait_limit(global);
    let mut inits = console.controller.store().init_updates();
    let mut notices = console.controller.notices();

    let synced = async {
        loop {
            tokio::select! {
                result = inits.wait_for(Option::is_some) => {
                    return match result {
                        Ok(_) => Ok(()),
                        Err(_) => Err(CliError::from(CoreError::ControllerDisconnected)),
                    };
                }
                notice = notices.recv() => {
                    if let Some(err) = terminal_error(notice) {
                        return Err(err);
                    }
                }
            }
        }
    };

    match tokio::time::timeout(limit, synced).await {
        Ok(result) => result,
        Err(_) => Err(stalled(console, limit, "the initial snapshot")),
    }
}

fn terminal_error(notice: Result<Notice, broadcast::error::RecvError>) -> Option<CliError> {
    match notice {
        Ok(Notice::ForcedLogout { reason }) => Some(CliError::ForcedLogout { reason }),
        _ => None,
    }
}

/// Explain a timeout by what the connection was doing at the time.
fn stalled(console: &Console, limit: Duration, waiting_for: &str) -> CliError {
    match *console.controller.connection_state().borrow() {
        ConnectionState::Connected => CliError::Timeout {
            seconds: limit.as_secs(),
            waiting_for: waiting_for.into(),
        },
        _ => CliError::ConnectionFailed {
            url: console.url.clone(),
            reason: "the console did not accept the connection (unreachable or login refused)"
                .into(),
        },
    }
}

// ── Sending commands ─────────────────────────────────────────────────

/// What a command should look like once the console has applied it.
pub enum Expect<'a> {
    /// The mirror reaches a state satisfying the predicate.
    Mirror(&'a dyn Fn(&Mirror) -> bool),
    /// Nothing observable changes; only a rejection would be reported.
    NoRejection,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Confirmed,
    /// Sent, but the console said nothing either way in time.
    Unconfirmed,
}

/// Send `command` and wait for its effect or a rejection.
///
/// Rejections carry no correlation id; any rejection arriving in the
/// window is attributed to this command.
pub async fn send(
    console: &Console,
    global: &GlobalOpts,
    command: &Command,
    expect: Expect<'_>,
) -> Result<Outcome, CliError> {
    let mut mirror = console.controller.mirror();
    let mut notices = console.controller.notices();

    if !console.controller.commands().dispatch(command) {
        return Err(CliError::ConnectionFailed {
            url: console.url.clone(),
            reason: "the connection dropped before the command was sent".into(),
        });
    }
    debug!(command = command.name(), "command sent");

    let never: &dyn Fn(&Mirror) -> bool = &never_settles;
    let (limit, settled, quiet_is_success) = match expect {
        Expect::Mirror(predicate) => (wait_limit(global), predicate, false),
        Expect::NoRejection => (wait_limit(global).min(REJECTION_GRACE), never, true),
    };

    let outcome = async {
        if settled(&mirror.latest()) {
            return Ok(Outcome::Confirmed);
        }
        loop {
            tokio::select! {
                snap = mirror.changed() => match snap {
                    Some(snap) if settled(&snap) => return Ok(Outcome::Confirmed),
                    Some(_) => {}
                    None => return Err(CliError::from(CoreError::ControllerDisconnected)),
                },
                notice = notices.recv() => match notice {
                    Ok(Notice::ForcedLogout { reason }) => {
                        return Err(CliError::ForcedLogout { reason });
                    }
                    Ok(notice) => {
                        return Err(CliError::Rejected {
                            message: notice.to_string(),
                        });
                    }
                    Err(_) => {}
                },
            }
        }
    };

    match tokio::time::timeout(limit, outcome).await {
        Ok(result) => result,
        Err(_) if quiet_is_success => Ok(Outcome::Confirmed),
        Err(_) => Ok(Outcome::Unconfirmed),
    }
}

fn never_settles(_: &Mirror) -> bool {
    false
}

/// Report a command's outcome on stderr.
pub fn report(outcome: &Outcome, global: &GlobalOpts, message: &str) {
    if global.quiet {
        return;
    }
    match outcome {
        Outcome::Confirmed => eprintln!("{message}"),
        Outcome::Unconfirmed => eprintln!(
            "{message} (sent; no confirmation within {}s)",
            wait_limit(global).as_secs()
        ),
    }
}

// ── Identifier resolution ────────────────────────────────────────────

/// Resolve a session by exact id, alias, or unique id prefix.
pub fn resolve_session(mirror: &Mirror, identifier: &str) -> Result<String, CliError> {
    if mirror.session(identifier).is_some() {
        return Ok(identifier.to_owned());
    }

    let mut matches: Vec<&str> = mirror
        .sessions
        .iter()
        .filter(|s| {
            mirror.aliases.get(&s.id).map(String::as_str) == Some(identifier)
                || s.alias.as_deref() == Some(identifier)
        })
        .map(|s| s.id.as_str())
        .collect();
    if matches.is_empty() {
        matches = mirror
            .sessions
            .iter()
            .filter(|s| s.id.starts_with(identifier))
            .map(|s| s.id.as_str())
            .collect();
    }
    matches.dedup();

    match matches.as_slice() {
        [id] => Ok((*id).to_owned()),
        [] => Err(CliError::NotFound {
            resource_type: "session".into(),
            identifier: identifier.into(),
            list_command: "sessions".into(),
        }),
        many => Err(CliError::Ambiguous {
            identifier: identifier.into(),
            candidates: many.join(", "),
        }),
    }
}

// ── Input helpers ────────────────────────────────────────────────────

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Read a caller profile from `--data` or `--from-file`.
pub fn read_caller_data(data: &CallerData) -> Result<serde_json::Value, CliError> {
    let value = match (&data.data, &data.from_file) {
        (Some(inline), _) => serde_json::from_str(inline)?,
        (None, Some(path)) => read_json_file(path)?,
        (None, None) => {
            return Err(CliError::Validation {
                field: "data".into(),
                reason: "pass --data or --from-file".into(),
            });
        }
    };
    if !value.is_object() {
        return Err(CliError::Validation {
            field: "data".into(),
            reason: "expected a JSON object".into(),
        });
    }
    Ok(value)
}

fn read_json_file(path: &Path) -> Result<serde_json::Value, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: "from-file".into(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// Split repeated `KEY=VALUE` arguments.
pub fn parse_pairs(pairs: &[String], field: &str) -> Result<Vec<(String, String)>, CliError> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
            _ => Err(CliError::Validation {
                field: field.into(),
                reason: format!("expected KEY=VALUE, got '{pair}'"),
            }),
        })
        .collect()
}

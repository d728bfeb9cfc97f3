// ── Inbound events ──
//
// Typed view of everything the console emits on the admin namespace.
// Parsing is the only fallible step; once an event is a `ServerEvent`
// the reducer applies it without further validation. The `init` snapshot
// is the exception to all-or-nothing parsing: bad records are skipped.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::CoreError;
use crate::model::{Caller, Session, Settings, id_string, null_as_default, opt_id_string};

/// Wire names of every inbound event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum EventName {
    Init,
    SessionCreated,
    SessionUpdated,
    SessionRemoved,
    SessionRemoveSuccess,
    SessionRemoveError,
    SessionsCleared,
    SessionAssigned,
    SessionUnassigned,
    AssignmentError,
    AssignmentsCleared,
    SettingsUpdated,
    IpBanned,
    IpUnbanned,
    CallerAdded,
    CallerUpdated,
    CallerDeleted,
    AliasUpdated,
    RedirectError,
    ForceLogout,
}

/// Full state the console sends on every (re)connect.
///
/// Decoding keeps whatever is usable: a session, caller, or ban entry
/// that does not parse is logged and skipped, and `null` aliases are
/// dropped, so one bad record never costs the rest of the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawSnapshot")]
pub struct InitSnapshot {
    pub sessions: Vec<Session>,
    pub settings: Settings,
    #[serde(rename = "bannedIPs")]
    pub banned_ips: Vec<String>,
    pub callers: Vec<Caller>,
    pub aliases: HashMap<String, String>,
}

/// The snapshot as sent, before per-record validation.
#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(default, deserialize_with = "null_as_default")]
    sessions: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    settings: Settings,
    #[serde(default, rename = "bannedIPs", deserialize_with = "null_as_default")]
    banned_ips: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    callers: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    aliases: HashMap<String, Option<String>>,
}

impl From<RawSnapshot> for InitSnapshot {
    fn from(raw: RawSnapshot) -> Self {
        Self {
            sessions: keep_valid("session", raw.sessions),
            settings: raw.settings,
            banned_ips: keep_valid("banned ip", raw.banned_ips),
            callers: keep_valid("caller", raw.callers),
            aliases: raw
                .aliases
                .into_iter()
                .filter_map(|(id, alias)| Some((id, alias?)))
                .collect(),
        }
    }
}

/// Decode each record on its own, skipping the ones that do not parse.
fn keep_valid<T: DeserializeOwned>(kind: &str, records: Vec<Value>) -> Vec<T> {
    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match serde_json::from_value(record) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(kind, index, error = %e, "skipping malformed init record");
                None
            }
        })
        .collect()
}

/// One decoded inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Init(InitSnapshot),
    SessionCreated(Session),
    SessionUpdated(Session),
    SessionRemoved { session_id: String },
    SessionRemoveSuccess { session_id: String },
    SessionRemoveError { session_id: Option<String>, error: String },
    SessionsCleared,
    SessionAssigned { session_id: String, caller: String },
    SessionUnassigned { session_id: String },
    AssignmentError { error: String },
    AssignmentsCleared { caller: String, count: u64 },
    SettingsUpdated(Settings),
    IpBanned(String),
    IpUnbanned(String),
    CallerAdded(Caller),
    CallerUpdated(Caller),
    CallerDeleted { caller_id: String },
    /// `alias: None` removes the session's alias.
    AliasUpdated { session_id: String, alias: Option<String> },
    RedirectError { session_id: Option<String>, error: String },
    ForceLogout { reason: Option<String> },
}

// ── Payload shapes ───────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRef {
    #[serde(deserialize_with = "id_string")]
    session_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Assignment {
    #[serde(deserialize_with = "id_string")]
    session_id: String,
    #[serde(deserialize_with = "id_string")]
    caller: String,
}

#[derive(Deserialize)]
struct ClearedAssignments {
    #[serde(deserialize_with = "id_string")]
    caller: String,
    #[serde(default)]
    count: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AliasChange {
    #[serde(deserialize_with = "id_string")]
    session_id: String,
    #[serde(default)]
    alias: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorReport {
    #[serde(default, deserialize_with = "opt_id_string")]
    session_id: Option<String>,
    #[serde(default)]
    error: Value,
}

impl ErrorReport {
    fn message(&self) -> String {
        match &self.error {
            Value::String(s) => s.clone(),
            Value::Null => "unknown error".into(),
            Value::Object(map) => map
                .get("message")
                .and_then(Value::as_str)
                .map_or_else(|| self.error.to_string(), str::to_owned),
            other => other.to_string(),
        }
    }
}

#[derive(Default, Deserialize)]
struct Logout {
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Deserialize)]
struct Id(#[serde(deserialize_with = "id_string")] String);

// ── Parsing ──────────────────────────────────────────────────────────

impl ServerEvent {
    /// Decode an event from its wire name and first argument.
    pub fn from_wire(name: &str, payload: Value) -> Result<Self, CoreError> {
        let kind: EventName = name.parse().map_err(|_| CoreError::UnknownEvent {
            name: name.to_owned(),
        })?;

        Ok(match kind {
            EventName::Init => Self::Init(parse(kind, payload)?),
            EventName::SessionCreated => Self::SessionCreated(parse(kind, payload)?),
            EventName::SessionUpdated => Self::SessionUpdated(parse(kind, payload)?),
            EventName::SessionRemoved => Self::SessionRemoved {
                session_id: parse::<Id>(kind, payload)?.0,
            },
            EventName::SessionRemoveSuccess => Self::SessionRemoveSuccess {
                session_id: parse::<SessionRef>(kind, payload)?.session_id,
            },
            EventName::SessionRemoveError => {
                let report: ErrorReport = parse(kind, payload)?;
                Self::SessionRemoveError {
                    error: report.message(),
                    session_id: report.session_id,
                }
            }
            EventName::SessionsCleared => Self::SessionsCleared,
            EventName::SessionAssigned => {
                let a: Assignment = parse(kind, payload)?;
                Self::SessionAssigned {
                    session_id: a.session_id,
                    caller: a.caller,
                }
            }
            EventName::SessionUnassigned => Self::SessionUnassigned {
                session_id: parse::<SessionRef>(kind, payload)?.session_id,
            },
            EventName::AssignmentError => Self::AssignmentError {
                error: parse::<ErrorReport>(kind, payload)?.message(),
            },
            EventName::AssignmentsCleared => {
                let c: ClearedAssignments = parse(kind, payload)?;
                Self::AssignmentsCleared {
                    caller: c.caller,
                    count: c.count,
                }
            }
            EventName::SettingsUpdated => Self::SettingsUpdated(parse(kind, payload)?),
            EventName::IpBanned => Self::IpBanned(parse(kind, payload)?),
            EventName::IpUnbanned => Self::IpUnbanned(parse(kind, payload)?),
            EventName::CallerAdded => Self::CallerAdded(parse(kind, payload)?),
            EventName::CallerUpdated => Self::CallerUpdated(parse(kind, payload)?),
            EventName::CallerDeleted => Self::CallerDeleted {
                caller_id: parse::<Id>(kind, payload)?.0,
            },
            EventName::AliasUpdated => {
                let a: AliasChange = parse(kind, payload)?;
                Self::AliasUpdated {
                    session_id: a.session_id,
                    alias: a.alias,
                }
            }
            EventName::RedirectError => {
                let report: ErrorReport = parse(kind, payload)?;
                Self::RedirectError {
                    error: report.message(),
                    session_id: report.session_id,
                }
            }
            EventName::ForceLogout => Self::ForceLogout {
                reason: parse_or_default::<Logout>(kind, payload)?.reason,
            },
        })
    }

    pub fn name(&self) -> EventName {
        match self {
            Self::Init(_) => EventName::Init,
            Self::SessionCreated(_) => EventName::SessionCreated,
            Self::SessionUpdated(_) => EventName::SessionUpdated,
            Self::SessionRemoved { .. } => EventName::SessionRemoved,
            Self::SessionRemoveSuccess { .. } => EventName::SessionRemoveSuccess,
            Self::SessionRemoveError { .. } => EventName::SessionRemoveError,
            Self::SessionsCleared => EventName::SessionsCleared,
            Self::SessionAssigned { .. } => EventName::SessionAssigned,
            Self::SessionUnassigned { .. } => EventName::SessionUnassigned,
            Self::AssignmentError { .. } => EventName::AssignmentError,
            Self::AssignmentsCleared { .. } => EventName::AssignmentsCleared,
            Self::SettingsUpdated(_) => EventName::SettingsUpdated,
            Self::IpBanned(_) => EventName::IpBanned,
            Self::IpUnbanned(_) => EventName::IpUnbanned,
            Self::CallerAdded(_) => EventName::CallerAdded,
            Self::CallerUpdated(_) => EventName::CallerUpdated,
            Self::CallerDeleted { .. } => EventName::CallerDeleted,
            Self::AliasUpdated { .. } => EventName::AliasUpdated,
            Self::RedirectError { .. } => EventName::RedirectError,
            Self::ForceLogout { .. } => EventName::ForceLogout,
        }
    }
}

fn parse<T: DeserializeOwned>(kind: EventName, payload: Value) -> Result<T, CoreError> {
    serde_json::from_value(payload).map_err(|e| CoreError::MalformedEvent {
        name: kind.to_string(),
        reason: e.to_string(),
    })
}

/// Like [`parse`], but an absent payload yields `T::default()`.
fn parse_or_default<T: DeserializeOwned + Default>(
    kind: EventName,
    payload: Value,
) -> Result<T, CoreError> {
    if payload.is_null() {
        Ok(T::default())
    } else {
        parse(kind, payload)
    }
}

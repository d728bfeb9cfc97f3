// ── Command API ──
//
// Every outbound request flows through the `Command` enum. A command is
// pure intent: it names a wire event and builds its payload, nothing
// more. State only changes when the console broadcasts the result back.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::error::CoreError;
use crate::model::Settings;

/// All requests the admin namespace accepts.
#[derive(Debug, Clone, PartialEq, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Command {
    // ── Callers ──────────────────────────────────────────────────────
    AddCaller { data: Value },
    UpdateCaller { id: String, data: Value },
    DeleteCaller { id: String },

    // ── Sessions ─────────────────────────────────────────────────────
    SetAlias { session_id: String, alias: String },
    RemoveSession { session_id: String },
    RedirectUser(RedirectRequest),
    ClearSessions,
    AssignSession { session_id: String, caller_id: String },
    UnassignSession { session_id: String },

    // ── Bans ─────────────────────────────────────────────────────────
    BanIp { ip: String },
    UnbanIp { ip: String },

    // ── Settings ─────────────────────────────────────────────────────
    UpdateSettings(Settings),
}

/// Send a session to another page, optionally filling page placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectRequest {
    pub session_id: String,
    pub page: String,
    pub placeholders: BTreeMap<String, String>,
}

impl RedirectRequest {
    pub fn new(session_id: impl Into<String>, page: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            page: page.into(),
            placeholders: BTreeMap::new(),
        }
    }

    pub fn placeholder(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.placeholders.insert(key.into(), value.into());
        self
    }
}

impl Command {
    /// Wire event name, e.g. `"ban_ip"`.
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Event argument, or `None` for commands sent without one.
    pub fn payload(&self) -> Result<Option<Value>, CoreError> {
        let payload = match self {
            Self::AddCaller { data } => data.clone(),
            Self::UpdateCaller { id, data } => json!({ "id": id, "data": data }),
            Self::DeleteCaller { id } => json!(id),
            Self::SetAlias { session_id, alias } => {
                json!({ "sessionId": session_id, "alias": alias })
            }
            Self::RemoveSession { session_id } | Self::UnassignSession { session_id } => {
                json!({ "sessionId": session_id })
            }
            Self::RedirectUser(req) => json!({
                "sessionId": req.session_id,
                "page": req.page,
                "placeholders": req.placeholders,
            }),
            Self::ClearSessions => return Ok(None),
            Self::AssignSession {
                session_id,
                caller_id,
            } => json!({ "sessionId": session_id, "callerId": caller_id }),
            Self::BanIp { ip } | Self::UnbanIp { ip } => json!(ip),
            Self::UpdateSettings(settings) => serde_json::to_value(settings)
                .map_err(|e| CoreError::Internal(format!("cannot encode settings: {e}")))?,
        };
        Ok(Some(payload))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn wire_names() {
        assert_eq!(Command::ClearSessions.name(), "clear_sessions");
        assert_eq!(
            Command::BanIp {
                ip: "1.2.3.4".into()
            }
            .name(),
            "ban_ip"
        );
        assert_eq!(
            Command::RedirectUser(RedirectRequest::default()).name(),
            "redirect_user"
        );
        assert_eq!(
            Command::UpdateSettings(Settings::default()).name(),
            "update_settings"
        );
    }

    #[test]
    fn payload_shapes() {
        assert_eq!(Command::ClearSessions.payload().unwrap(), None);
        assert_eq!(
            Command::UnbanIp {
                ip: "1.2.3.4".into()
            }
            .payload()
            .unwrap(),
            Some(json!("1.2.3.4"))
        );
        assert_eq!(
            Command::AssignSession {
                session_id: "s1".into(),
                caller_id: "c1".into()
            }
            .payload()
            .unwrap(),
            Some(json!({ "sessionId": "s1", "callerId": "c1" }))
        );
        assert_eq!(
            Command::UpdateCaller {
                id: "c1".into(),
                data: json!({ "name": "Dana" })
            }
            .payload()
            .unwrap(),
            Some(json!({ "id": "c1", "data": { "name": "Dana" } }))
        );
    }

    #[test]
    fn redirect_always_sends_placeholders() {
        let bare = Command::RedirectUser(RedirectRequest::new("s1", "otp"));
        assert_eq!(
            bare.payload().unwrap(),
            Some(json!({ "sessionId": "s1", "page": "otp", "placeholders": {} }))
        );

        let filled = Command::RedirectUser(
            RedirectRequest::new("s1", "otp").placeholder("phone", "***-1234"),
        );
        assert_eq!(
            filled.payload().unwrap().unwrap()["placeholders"],
            json!({ "phone": "***-1234" })
        );
    }
}

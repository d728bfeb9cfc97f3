use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A tracked remote party's live connection, as the console reports it.
///
/// `assigned_to` is a weak reference to a [`Caller`](super::Caller) id;
/// it may dangle after the caller is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(deserialize_with = "super::id_string")]
    pub id: String,

    /// Originating address.
    #[serde(default)]
    pub ip: String,

    /// Liveness flag.
    #[serde(default)]
    pub connected: bool,

    #[serde(
        default,
        deserialize_with = "super::opt_id_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub assigned_to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Every other field, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Session {
    pub fn new(id: impl Into<String>, ip: impl Into<String>, connected: bool) -> Self {
        Self {
            id: id.into(),
            ip: ip.into(),
            connected,
            assigned_to: None,
            alias: None,
            extra: Map::new(),
        }
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An operator account sessions can be assigned to.
///
/// The console owns the profile shape; only `id` is interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caller {
    #[serde(deserialize_with = "super::id_string")]
    pub id: String,

    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl Caller {
    /// Best human-readable label: `name`, then `username`, then the id.
    pub fn display_name(&self) -> &str {
        ["name", "username"]
            .iter()
            .find_map(|key| self.profile.get(*key).and_then(Value::as_str))
            .unwrap_or(self.id.as_str())
    }
}

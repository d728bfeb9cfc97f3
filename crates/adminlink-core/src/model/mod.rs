// ── Domain model ──
//
// Mirrored records. Every record keeps the fields the client reasons
// about as typed fields and carries everything else verbatim, so the
// mirror never silently drops data the console sends.

mod caller;
mod session;
mod settings;

pub use caller::Caller;
pub use session::Session;
pub use settings::Settings;

use serde::{Deserialize, Deserializer, de};
use serde_json::Value;

/// A record addressed by a string id.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Session {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Caller {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Accept ids sent as either JSON strings or numbers.
pub(crate) fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected a string or numeric id, got {other}"
        ))),
    }
}

/// Same as [`id_string`], for optional references.
pub(crate) fn opt_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected a string or numeric id, got {other}"
        ))),
    }
}

/// Treat an explicit `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

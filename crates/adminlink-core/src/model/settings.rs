use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The console's single settings record.
///
/// Always replaced wholesale. Feature toggles and anything else the
/// console adds live in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_page: Option<String>,

    #[serde(default, deserialize_with = "super::null_as_default")]
    pub available_pages: Vec<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Settings {
    /// A boolean feature toggle, if present.
    pub fn toggle(&self, name: &str) -> Option<bool> {
        self.extra.get(name).and_then(Value::as_bool)
    }

    /// Names of the available pages, whether listed as strings or as
    /// objects with a `name`/`id`.
    pub fn page_names(&self) -> Vec<&str> {
        self.available_pages
            .iter()
            .filter_map(|page| match page {
                Value::String(s) => Some(s.as_str()),
                Value::Object(map) => map
                    .get("name")
                    .or_else(|| map.get("id"))
                    .and_then(Value::as_str),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn toggles_and_pages() {
        let settings: Settings = serde_json::from_value(json!({
            "redirectUrl": "https://example.com",
            "defaultPage": "login",
            "availablePages": ["login", { "name": "otp" }, { "id": "done" }, 3],
            "captchaEnabled": true
        }))
        .unwrap();

        assert_eq!(settings.toggle("captchaEnabled"), Some(true));
        assert_eq!(settings.toggle("missing"), None);
        assert_eq!(settings.page_names(), vec!["login", "otp", "done"]);
    }

    #[test]
    fn null_pages_are_empty() {
        let settings: Settings =
            serde_json::from_value(json!({ "availablePages": null })).unwrap();
        assert!(settings.available_pages.is_empty());
    }
}

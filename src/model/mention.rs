//! Normalized `@mention` reference (spec.md §3 `Incoming.mentions`).

use serde::{Deserialize, Serialize};

/// A single `@mention` found in message text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mention {
    pub user_id: String,
    pub user_name: Option<String>,
    /// UTF-16 code-unit offset of the mention within the message text, if
    /// the platform reports it.
    pub offset: Option<usize>,
    pub length: Option<usize>,
}

impl Mention {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: None,
            offset: None,
            length: None,
        }
    }

    /// Coerce a map-form mention (spec.md §4.1: "convert map-form mentions
    /// ... into typed `Mention`") into the typed value. Returns `None` when
    /// the value isn't shaped like a mention at all.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        let obj = value.as_object()?;
        let user_id = obj.get("user_id").and_then(|v| v.as_str())?.to_string();
        Some(Self {
            user_id,
            user_name: obj
                .get("user_name")
                .and_then(|v| v.as_str())
                .map(String::from),
            offset: obj.get("offset").and_then(|v| v.as_u64()).map(|n| n as usize),
            length: obj.get("length").and_then(|v| v.as_u64()).map(|n| n as usize),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_map_form() {
        let mention = Mention::from_value(&json!({"user_id": "u1", "offset": 3, "length": 5})).unwrap();
        assert_eq!(mention.user_id, "u1");
        assert_eq!(mention.offset, Some(3));
    }

    #[test]
    fn rejects_values_without_user_id() {
        assert!(Mention::from_value(&json!({"offset": 1})).is_none());
    }
}

//! Opaque platform-scalar identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque scalar identifier from a platform (room id, user id, message
/// id, ...). Platforms disagree on whether these are strings or integers
/// over the wire; `ExternalId` normalizes either into a canonical string
/// (spec.md §4.1: "`channel_id ← stringify(external_room_id)`").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(String);

impl ExternalId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Best-effort coercion from a JSON scalar (string or number) as used
    /// when parsing adapter-supplied raw payloads.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(Self::new(s.clone())),
            serde_json::Value::Number(n) => Some(Self::new(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ExternalId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ExternalId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for ExternalId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for ExternalId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stringifies_numbers_and_strings_alike() {
        assert_eq!(ExternalId::from(42i64).as_str(), "42");
        assert_eq!(ExternalId::from("room-1").as_str(), "room-1");
    }

    #[test]
    fn from_value_handles_json_scalars() {
        assert_eq!(ExternalId::from_value(&json!(7)).unwrap().as_str(), "7");
        assert_eq!(
            ExternalId::from_value(&json!("abc")).unwrap().as_str(),
            "abc"
        );
        assert!(ExternalId::from_value(&json!(null)).is_none());
    }
}

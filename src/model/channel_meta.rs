//! Normalized channel metadata attached to an `Incoming` (spec.md §3 `ChannelMeta`).

use super::Metadata;
use serde::{Deserialize, Serialize};

/// Lightweight channel-shaped metadata carried alongside an `Incoming`
/// message — distinct from the outbound-facing [`ChannelInfo`](super::ChannelInfo),
/// which is what `fetch_metadata` returns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelMeta {
    pub title: Option<String>,
    pub chat_type: Option<String>,
    pub topic: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ChannelMeta {
    /// Per spec.md §4.1: "ensure `channel_meta` is a `ChannelMeta` value
    /// (default empty)". Accepts either an already-typed object or a loose
    /// JSON map; anything else yields the empty default.
    pub fn from_value(value: Option<&serde_json::Value>) -> Self {
        let Some(obj) = value.and_then(|v| v.as_object()) else {
            return Self::default();
        };
        Self {
            title: obj.get("title").and_then(|v| v.as_str()).map(String::from),
            chat_type: obj
                .get("chat_type")
                .and_then(|v| v.as_str())
                .map(String::from),
            topic: obj.get("topic").and_then(|v| v.as_str()).map(String::from),
            metadata: Metadata::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_to_empty_for_absent_or_non_object_input() {
        assert!(ChannelMeta::from_value(None).title.is_none());
        assert!(ChannelMeta::from_value(Some(&json!("not-an-object"))).title.is_none());
    }

    #[test]
    fn reads_known_fields() {
        let meta = ChannelMeta::from_value(Some(&json!({"title": "general", "chat_type": "group"})));
        assert_eq!(meta.title.as_deref(), Some("general"));
        assert_eq!(meta.chat_type.as_deref(), Some("group"));
    }
}

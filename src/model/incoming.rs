//! Normalized inbound event body (spec.md §3 `Incoming`).

use super::{Author, ChannelMeta, ExternalId, Media, Mention, Metadata};
use crate::error::{FieldError, Result, ValidationError};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// A platform-agnostic inbound message. This is the wire-shaped value an
/// adapter's `transform_incoming` produces; [`Message`](super::Message) is
/// the stored/paginated shape derived from it.
#[derive(Debug, Clone)]
pub struct Incoming {
    pub external_room_id: ExternalId,
    pub external_user_id: Option<ExternalId>,
    pub external_message_id: Option<ExternalId>,
    pub external_reply_to_id: Option<ExternalId>,
    pub external_thread_id: Option<ExternalId>,
    pub text: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub chat_type: Option<String>,
    pub chat_title: Option<String>,
    pub was_mentioned: bool,
    pub mentions: Vec<Mention>,
    pub media: Vec<Media>,
    pub author: Option<Author>,
    pub channel_meta: ChannelMeta,
    pub raw: Value,
    pub metadata: Metadata,
}

impl Incoming {
    /// Schema-validating constructor from a loose JSON payload, as produced
    /// by an adapter's `transform_incoming` before normalization. Applies
    /// the coercions spec.md §4.1 documents:
    ///
    /// - synthesizes `author` from `(external_user_id, username, display_name)`
    ///   when absent but `external_user_id` is present;
    /// - coerces map-form `mentions`/`media` into typed values;
    /// - defaults `channel_meta` to empty when absent or malformed.
    pub fn from_value(value: Value) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            ValidationError::single(
                "Incoming",
                value.clone(),
                "$",
                "expected a JSON object",
            )
        })?;

        let external_room_id = obj
            .get("external_room_id")
            .and_then(ExternalId::from_value)
            .ok_or_else(|| missing_field("Incoming", &value, "external_room_id"))?;

        let external_user_id = obj.get("external_user_id").and_then(ExternalId::from_value);
        let external_message_id = obj
            .get("external_message_id")
            .and_then(ExternalId::from_value);
        let external_reply_to_id = obj
            .get("external_reply_to_id")
            .and_then(ExternalId::from_value);
        let external_thread_id = obj
            .get("external_thread_id")
            .and_then(ExternalId::from_value);

        let text = obj.get("text").and_then(|v| v.as_str()).map(String::from);
        let timestamp = parse_timestamp(obj.get("timestamp"));
        let chat_type = obj
            .get("chat_type")
            .and_then(|v| v.as_str())
            .map(String::from);
        let chat_title = obj
            .get("chat_title")
            .and_then(|v| v.as_str())
            .map(String::from);
        let was_mentioned = obj
            .get("was_mentioned")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let mentions = obj
            .get("mentions")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Mention::from_value).collect())
            .unwrap_or_default();

        let media = obj
            .get("media")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Media::from_value).collect())
            .unwrap_or_default();

        let author = match obj.get("author") {
            Some(a) if a.is_object() => parse_author(a),
            _ => external_user_id.as_ref().map(|id| {
                Author::synthesize(
                    id,
                    obj.get("username")
                        .and_then(|v| v.as_str())
                        .map(String::from),
                    obj.get("display_name")
                        .and_then(|v| v.as_str())
                        .map(String::from),
                )
            }),
        };

        let channel_meta = ChannelMeta::from_value(obj.get("channel_meta"));

        let metadata = obj
            .get("metadata")
            .and_then(Value::as_object)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        Ok(Self {
            external_room_id,
            external_user_id,
            external_message_id,
            external_reply_to_id,
            external_thread_id,
            text,
            timestamp,
            chat_type,
            chat_title,
            was_mentioned,
            mentions,
            media,
            author,
            channel_meta,
            raw: value,
            metadata,
        })
    }

    /// Text to match against regex-based handlers, with the spec's `nil`
    /// fallback already applied (spec.md §4.4: "matches ... `incoming.text`
    /// (or `""` if nil)").
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

fn parse_author(value: &Value) -> Option<Author> {
    let obj = value.as_object()?;
    let user_id = obj.get("user_id").and_then(|v| v.as_str())?.to_string();
    Some(Author {
        user_id,
        user_name: obj
            .get("user_name")
            .and_then(|v| v.as_str())
            .map(String::from),
        full_name: obj
            .get("full_name")
            .and_then(|v| v.as_str())
            .map(String::from),
        is_bot: obj.get("is_bot").and_then(Value::as_bool).unwrap_or(false),
        is_me: obj.get("is_me").and_then(Value::as_bool).unwrap_or(false),
        metadata: Metadata::new(),
    })
}

/// Accepts an integer epoch (seconds), an ISO8601 string, or nothing.
fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

pub(crate) fn missing_field(subject: &str, input: &Value, path: &str) -> ValidationError {
    ValidationError::new(subject, input.clone(), vec![FieldError::new(path, "is required")])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requires_external_room_id() {
        let err = Incoming::from_value(json!({"text": "hi"})).unwrap_err();
        match err {
            crate::error::Error::Validation(v) => {
                assert_eq!(v.errors[0].path, "external_room_id");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn synthesizes_author_when_absent() {
        let incoming = Incoming::from_value(json!({
            "external_room_id": "r1",
            "external_user_id": "u1",
            "username": "alice",
        }))
        .unwrap();
        let author = incoming.author.unwrap();
        assert_eq!(author.user_id, "u1");
        assert_eq!(author.user_name.as_deref(), Some("alice"));
    }

    #[test]
    fn does_not_synthesize_author_without_external_user_id() {
        let incoming = Incoming::from_value(json!({"external_room_id": "r1"})).unwrap();
        assert!(incoming.author.is_none());
    }

    #[test]
    fn coerces_mentions_and_media() {
        let incoming = Incoming::from_value(json!({
            "external_room_id": "r1",
            "mentions": [{"user_id": "u2"}],
            "media": [{"kind": "image", "url": "https://x/1.png"}],
        }))
        .unwrap();
        assert_eq!(incoming.mentions.len(), 1);
        assert_eq!(incoming.media.len(), 1);
    }

    #[test]
    fn channel_meta_defaults_to_empty() {
        let incoming = Incoming::from_value(json!({"external_room_id": "r1"})).unwrap();
        assert!(incoming.channel_meta.title.is_none());
    }

    #[test]
    fn text_or_empty_handles_absent_text() {
        let incoming = Incoming::from_value(json!({"external_room_id": "r1"})).unwrap();
        assert_eq!(incoming.text_or_empty(), "");
    }
}

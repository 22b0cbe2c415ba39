//! Stored/paginated normalized message form (spec.md §3, §4.1 `Message`).

use super::plain::{tag, tagged, Plain, Revive, ToPlain};
use super::{Author, ExternalId, Incoming, Media, Metadata};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// A normalized message as it appears in history pages — distinct from
/// [`Incoming`], which is the wire-shaped inbound event body.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub thread_id: String,
    pub channel_id: String,
    pub adapter_name: String,
    pub author: Option<Author>,
    pub text: Option<String>,
    pub media: Vec<Media>,
    pub is_mention: bool,
    pub created_at: DateTime<Utc>,
    pub external_message_id: Option<ExternalId>,
    pub metadata: Metadata,
}

/// Options threaded through [`Message::from_incoming`] for fields the
/// `Incoming` value doesn't itself carry (spec.md §4.1:
/// `Message.from_incoming(incoming, {adapter_name, thread_id})`).
pub struct FromIncomingOpts<'a> {
    pub adapter_name: &'a str,
    /// Explicit thread id override; falls back to
    /// `"adapter:room[:thread]"` when absent.
    pub thread_id: Option<String>,
}

impl Message {
    /// Construct a `Message` from a normalized `Incoming`, applying the
    /// spec.md §4.1 formula:
    ///
    /// - `id ← external_message_id ∨ new id`
    /// - `thread_id ← explicit ∨ "adapter:room[:thread]"`
    /// - `channel_id ← stringify(external_room_id)`
    /// - `is_mention ← was_mentioned`
    /// - `created_at ← incoming.timestamp`
    pub fn from_incoming(incoming: &Incoming, opts: FromIncomingOpts<'_>) -> Self {
        let id = incoming
            .external_message_id
            .as_ref()
            .map(ExternalId::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let thread_id = opts.thread_id.unwrap_or_else(|| {
            crate::normalize::thread_id_from(
                opts.adapter_name,
                &incoming.external_room_id,
                incoming.external_thread_id.as_ref(),
            )
        });

        Self {
            id,
            thread_id,
            channel_id: format!("{}:{}", opts.adapter_name, incoming.external_room_id),
            adapter_name: opts.adapter_name.to_string(),
            author: incoming.author.clone(),
            text: incoming.text.clone(),
            media: incoming.media.clone(),
            is_mention: incoming.was_mentioned,
            created_at: incoming.timestamp.unwrap_or_else(Utc::now),
            external_message_id: incoming.external_message_id.clone(),
            metadata: incoming.metadata.clone(),
        }
    }
}

impl ToPlain for Message {
    fn to_plain(&self) -> Plain {
        tagged(
            tag::MESSAGE,
            [
                ("id", Value::String(self.id.clone())),
                ("thread_id", Value::String(self.thread_id.clone())),
                ("channel_id", Value::String(self.channel_id.clone())),
                ("adapter_name", Value::String(self.adapter_name.clone())),
                ("text", self.text.clone().map(Value::String).unwrap_or(Value::Null)),
                ("is_mention", Value::Bool(self.is_mention)),
                ("created_at", Value::String(self.created_at.to_rfc3339())),
                (
                    "external_message_id",
                    self.external_message_id
                        .as_ref()
                        .map(|id| Value::String(id.to_string()))
                        .unwrap_or(Value::Null),
                ),
                ("metadata", Value::Object(self.metadata.clone().into_iter().collect())),
            ],
        )
    }
}

impl Revive for Message {
    fn revive(plain: &Plain) -> Result<Self> {
        let obj = plain.as_object().ok_or_else(|| {
            crate::error::ValidationError::single("Message", plain.clone(), "$", "expected an object")
        })?;
        let id = obj
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let created_at = obj
            .get("created_at")
            .and_then(|v| v.as_str())
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);
        Ok(Self {
            id,
            thread_id: obj
                .get("thread_id")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            channel_id: obj
                .get("channel_id")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            adapter_name: obj
                .get("adapter_name")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            author: None,
            text: obj.get("text").and_then(|v| v.as_str()).map(String::from),
            media: Vec::new(),
            is_mention: obj.get("is_mention").and_then(Value::as_bool).unwrap_or(false),
            created_at,
            external_message_id: obj.get("external_message_id").and_then(ExternalId::from_value),
            metadata: super::plain::string_map(obj.get("metadata")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn derives_channel_and_thread_ids() {
        let incoming = Incoming::from_value(json!({
            "external_room_id": "room1",
            "external_message_id": "m1",
        }))
        .unwrap();
        let message = Message::from_incoming(
            &incoming,
            FromIncomingOpts {
                adapter_name: "telegram",
                thread_id: None,
            },
        );
        assert_eq!(message.id, "m1");
        assert_eq!(message.channel_id, "telegram:room1");
        assert_eq!(message.thread_id, "telegram:room1");
    }

    #[test]
    fn explicit_thread_id_wins_over_derivation() {
        let incoming = Incoming::from_value(json!({"external_room_id": "room1"})).unwrap();
        let message = Message::from_incoming(
            &incoming,
            FromIncomingOpts {
                adapter_name: "telegram",
                thread_id: Some("custom".to_string()),
            },
        );
        assert_eq!(message.thread_id, "custom");
    }

    #[test]
    fn synthesizes_id_when_no_external_message_id() {
        let incoming = Incoming::from_value(json!({"external_room_id": "room1"})).unwrap();
        let message = Message::from_incoming(
            &incoming,
            FromIncomingOpts {
                adapter_name: "telegram",
                thread_id: None,
            },
        );
        assert!(!message.id.is_empty());
    }
}

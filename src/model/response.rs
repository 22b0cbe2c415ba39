//! Normalized adapter send result (spec.md §3, §4.1 `Response`).

use super::{ExternalId, Metadata};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Status of a sent message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Sent,
    Failed,
    Pending,
}

impl Default for MessageStatus {
    fn default() -> Self {
        Self::Sent
    }
}

/// The normalized result of an adapter `send_message`/`edit_message`/etc.
/// call.
///
/// spec.md §9 flags this struct's legacy fields (`message_id`, `chat_id`,
/// `channel_id`, `date`) as duplicating the canonical ones and directs that
/// implementations "populate them from canonical fields only and treat them
/// as read-only aliases." Rather than storing duplicate fields that could
/// drift, `Response` keeps only the canonical fields and exposes the legacy
/// names as computed accessor methods.
#[derive(Debug, Clone)]
pub struct Response {
    pub external_message_id: Option<ExternalId>,
    pub external_room_id: Option<ExternalId>,
    pub text: Option<String>,
    pub status: MessageStatus,
    pub timestamp: Option<DateTime<Utc>>,
    pub raw: Value,
    pub metadata: Metadata,
}

impl Response {
    pub fn new() -> Self {
        Self {
            external_message_id: None,
            external_room_id: None,
            text: None,
            status: MessageStatus::default(),
            timestamp: None,
            raw: Value::Null,
            metadata: Metadata::new(),
        }
    }

    /// Coerce a loose adapter-returned JSON value into a canonical
    /// `Response`, applying spec.md §4.1's legacy-field coercions:
    /// `message_id` → `external_message_id`, `chat_id`/`channel_id` →
    /// `external_room_id`, and timestamp parsing from an integer epoch, an
    /// ISO8601 string, or (already-typed callers) a `DateTime`.
    pub fn from_value(value: Value) -> Self {
        let obj = value.as_object();

        let external_message_id = obj
            .and_then(|o| o.get("external_message_id").or_else(|| o.get("message_id")))
            .and_then(ExternalId::from_value);

        let external_room_id = obj
            .and_then(|o| {
                o.get("external_room_id")
                    .or_else(|| o.get("chat_id"))
                    .or_else(|| o.get("channel_id"))
            })
            .and_then(ExternalId::from_value);

        let text = obj
            .and_then(|o| o.get("text"))
            .and_then(|v| v.as_str())
            .map(String::from);

        let status = match obj.and_then(|o| o.get("status")).and_then(|v| v.as_str()) {
            Some("failed") => MessageStatus::Failed,
            Some("pending") => MessageStatus::Pending,
            _ => MessageStatus::Sent,
        };

        let timestamp = obj
            .and_then(|o| o.get("timestamp").or_else(|| o.get("date")))
            .and_then(parse_timestamp);

        let metadata = obj
            .and_then(|o| o.get("metadata"))
            .and_then(Value::as_object)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        Self {
            external_message_id,
            external_room_id,
            text,
            status,
            timestamp,
            raw: value,
            metadata,
        }
    }

    /// Legacy alias for `external_message_id`.
    pub fn message_id(&self) -> Option<&ExternalId> {
        self.external_message_id.as_ref()
    }

    /// Legacy alias for `external_room_id`.
    pub fn chat_id(&self) -> Option<&ExternalId> {
        self.external_room_id.as_ref()
    }

    /// Legacy alias for `external_room_id`.
    pub fn channel_id(&self) -> Option<&ExternalId> {
        self.external_room_id.as_ref()
    }

    /// Legacy alias for `timestamp`.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

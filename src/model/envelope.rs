//! Tagged-union event envelope (spec.md §3 `EventEnvelope`, §9 "Sum types for events").

use super::plain::{tag, tagged, Plain, Revive, ToPlain};
use super::{ExternalId, Incoming, Metadata};
use crate::error::Result;
use serde_json::Value;
use uuid::Uuid;

/// The kind of event an [`EventEnvelope`] carries. Exhaustive over the set
/// spec.md names; the router (component C5) switches on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Message,
    Reaction,
    Action,
    ModalSubmit,
    ModalClose,
    SlashCommand,
    AssistantThreadStarted,
    AssistantContextChanged,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Message => "message",
            EventType::Reaction => "reaction",
            EventType::Action => "action",
            EventType::ModalSubmit => "modal_submit",
            EventType::ModalClose => "modal_close",
            EventType::SlashCommand => "slash_command",
            EventType::AssistantThreadStarted => "assistant_thread_started",
            EventType::AssistantContextChanged => "assistant_context_changed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "message" => EventType::Message,
            "reaction" => EventType::Reaction,
            "action" => EventType::Action,
            "modal_submit" => EventType::ModalSubmit,
            "modal_close" => EventType::ModalClose,
            "slash_command" => EventType::SlashCommand,
            "assistant_thread_started" => EventType::AssistantThreadStarted,
            "assistant_context_changed" => EventType::AssistantContextChanged,
            _ => return None,
        })
    }

    /// Infer the event type from payload shape when the wire format omits
    /// it explicitly (spec.md §4.3): presence of `emoji` → `reaction`,
    /// `action_id` → `action`, `callback_id` → `modal_submit`, `command` →
    /// `slash_command`, otherwise `message`.
    pub fn infer(payload: &Value) -> Self {
        let Some(obj) = payload.as_object() else {
            return EventType::Message;
        };
        if obj.contains_key("emoji") {
            EventType::Reaction
        } else if obj.contains_key("action_id") {
            EventType::Action
        } else if obj.contains_key("callback_id") {
            EventType::ModalSubmit
        } else if obj.contains_key("command") {
            EventType::SlashCommand
        } else {
            EventType::Message
        }
    }
}

/// The typed variant carried by an [`EventEnvelope`], keyed by `event_type`.
#[derive(Debug, Clone)]
pub enum EventPayload {
    Message(Incoming),
    Reaction(ReactionEvent),
    Action(ActionEvent),
    ModalSubmit(ModalSubmitEvent),
    ModalClose(ModalCloseEvent),
    SlashCommand(SlashCommandEvent),
    AssistantThreadStarted(AssistantThreadStartedEvent),
    AssistantContextChanged(AssistantContextChangedEvent),
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::Message(_) => EventType::Message,
            EventPayload::Reaction(_) => EventType::Reaction,
            EventPayload::Action(_) => EventType::Action,
            EventPayload::ModalSubmit(_) => EventType::ModalSubmit,
            EventPayload::ModalClose(_) => EventType::ModalClose,
            EventPayload::SlashCommand(_) => EventType::SlashCommand,
            EventPayload::AssistantThreadStarted(_) => EventType::AssistantThreadStarted,
            EventPayload::AssistantContextChanged(_) => EventType::AssistantContextChanged,
        }
    }

    /// The `thread_id`/`channel_id`/`message_id` implied by this payload, if
    /// any — used by [`with_envelope_payload`] to fill envelope slots.
    pub fn implied_ids(&self) -> ImpliedIds {
        match self {
            EventPayload::Message(incoming) => ImpliedIds {
                channel_id: Some(incoming.external_room_id.to_string()),
                message_id: incoming.external_message_id.as_ref().map(ToString::to_string),
                thread_id: None,
            },
            EventPayload::Reaction(event) => ImpliedIds {
                channel_id: Some(event.external_room_id.to_string()),
                message_id: event.external_message_id.as_ref().map(ToString::to_string),
                thread_id: None,
            },
            EventPayload::Action(event) => ImpliedIds {
                channel_id: Some(event.external_room_id.to_string()),
                message_id: None,
                thread_id: None,
            },
            EventPayload::ModalSubmit(_) | EventPayload::ModalClose(_) => ImpliedIds::default(),
            EventPayload::SlashCommand(event) => ImpliedIds {
                channel_id: Some(event.external_room_id.to_string()),
                message_id: None,
                thread_id: None,
            },
            EventPayload::AssistantThreadStarted(event) => ImpliedIds {
                thread_id: Some(event.thread_id.clone()),
                channel_id: None,
                message_id: None,
            },
            EventPayload::AssistantContextChanged(event) => ImpliedIds {
                thread_id: Some(event.thread_id.clone()),
                channel_id: None,
                message_id: None,
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImpliedIds {
    pub thread_id: Option<String>,
    pub channel_id: Option<String>,
    pub message_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReactionEvent {
    pub emoji: String,
    pub added: bool,
    pub external_user_id: Option<ExternalId>,
    pub external_message_id: Option<ExternalId>,
    pub external_room_id: ExternalId,
    pub raw: Value,
}

#[derive(Debug, Clone)]
pub struct ActionEvent {
    pub action_id: String,
    pub external_user_id: Option<ExternalId>,
    pub external_room_id: ExternalId,
    pub value: Option<String>,
    pub raw: Value,
}

#[derive(Debug, Clone)]
pub struct ModalSubmitEvent {
    pub callback_id: String,
    pub external_user_id: Option<ExternalId>,
    pub values: Metadata,
    pub raw: Value,
}

#[derive(Debug, Clone)]
pub struct ModalCloseEvent {
    pub callback_id: String,
    pub external_user_id: Option<ExternalId>,
    pub raw: Value,
}

#[derive(Debug, Clone)]
pub struct SlashCommandEvent {
    pub command: String,
    pub text: Option<String>,
    pub external_user_id: Option<ExternalId>,
    pub external_room_id: ExternalId,
    pub raw: Value,
}

#[derive(Debug, Clone)]
pub struct AssistantThreadStartedEvent {
    pub thread_id: String,
    pub raw: Value,
}

#[derive(Debug, Clone)]
pub struct AssistantContextChangedEvent {
    pub thread_id: String,
    pub context: Value,
    pub raw: Value,
}

/// The tagged-union event carrier routed by component C5.
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub id: String,
    pub adapter_name: String,
    pub thread_id: Option<String>,
    pub channel_id: Option<String>,
    pub message_id: Option<String>,
    pub payload: EventPayload,
    pub raw: Value,
    pub metadata: Metadata,
}

impl EventEnvelope {
    pub fn new(adapter_name: impl Into<String>, payload: EventPayload, raw: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            adapter_name: adapter_name.into(),
            thread_id: None,
            channel_id: None,
            message_id: None,
            payload,
            raw,
            metadata: Metadata::new(),
        }
    }

    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }

    /// Fill `thread_id`/`channel_id`/`message_id` from the payload when the
    /// envelope's own slots are still empty — **never** overwrites a
    /// populated slot (spec.md §4.3 `with_envelope_payload`, §8 property 5).
    pub fn with_payload_ids_filled(mut self) -> Self {
        let implied = self.payload.implied_ids();
        if self.thread_id.is_none() {
            self.thread_id = implied.thread_id;
        }
        if self.channel_id.is_none() {
            self.channel_id = implied.channel_id;
        }
        if self.message_id.is_none() {
            self.message_id = implied.message_id;
        }
        self
    }
}

impl ToPlain for EventEnvelope {
    fn to_plain(&self) -> Plain {
        tagged(
            tag::EVENT_ENVELOPE,
            [
                ("id", Value::String(self.id.clone())),
                ("adapter_name", Value::String(self.adapter_name.clone())),
                ("event_type", Value::String(self.event_type().as_str().to_string())),
                ("thread_id", self.thread_id.clone().map(Value::String).unwrap_or(Value::Null)),
                ("channel_id", self.channel_id.clone().map(Value::String).unwrap_or(Value::Null)),
                ("message_id", self.message_id.clone().map(Value::String).unwrap_or(Value::Null)),
                ("raw", self.raw.clone()),
                ("metadata", Value::Object(self.metadata.clone().into_iter().collect())),
            ],
        )
    }
}

impl Revive for EventEnvelope {
    /// Reconstructs the envelope by re-running normalization over the
    /// preserved `raw` payload against the tagged `event_type` — the
    /// payload variants themselves aren't separately snapshotted, matching
    /// spec.md §4.8's treatment of handler-only state as intentionally
    /// lossy across a revival (here: the parsed-event shape, not the raw
    /// wire bytes, is what's reconstructed fresh).
    fn revive(plain: &Plain) -> Result<Self> {
        let obj = plain.as_object().ok_or_else(|| {
            crate::error::ValidationError::single("EventEnvelope", plain.clone(), "$", "expected an object")
        })?;
        let adapter_name = obj
            .get("adapter_name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let event_type = obj
            .get("event_type")
            .and_then(|v| v.as_str())
            .and_then(EventType::from_str)
            .unwrap_or(EventType::Message);
        let raw = obj.get("raw").cloned().unwrap_or(Value::Null);
        let mut envelope = crate::normalize::ensure_event_envelope(raw, &adapter_name, Some(event_type))?;
        envelope.id = obj.get("id").and_then(|v| v.as_str()).unwrap_or(&envelope.id).to_string();
        envelope.thread_id = obj.get("thread_id").and_then(|v| v.as_str()).map(String::from).or(envelope.thread_id);
        envelope.channel_id = obj.get("channel_id").and_then(|v| v.as_str()).map(String::from).or(envelope.channel_id);
        envelope.message_id = obj.get("message_id").and_then(|v| v.as_str()).map(String::from).or(envelope.message_id);
        envelope.metadata = super::plain::string_map(obj.get("metadata"));
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn infers_event_type_from_shape() {
        assert_eq!(EventType::infer(&json!({"emoji": "👍"})), EventType::Reaction);
        assert_eq!(EventType::infer(&json!({"action_id": "a"})), EventType::Action);
        assert_eq!(EventType::infer(&json!({"callback_id": "c"})), EventType::ModalSubmit);
        assert_eq!(EventType::infer(&json!({"command": "/x"})), EventType::SlashCommand);
        assert_eq!(EventType::infer(&json!({"text": "hi"})), EventType::Message);
    }

    #[test]
    fn with_payload_ids_filled_never_overwrites() {
        let event = ActionEvent {
            action_id: "a1".to_string(),
            external_user_id: None,
            external_room_id: ExternalId::from("room1"),
            value: None,
            raw: Value::Null,
        };
        let mut envelope = EventEnvelope::new("slack", EventPayload::Action(event), Value::Null);
        envelope.channel_id = Some("preset".to_string());
        let envelope = envelope.with_payload_ids_filled();
        assert_eq!(envelope.channel_id.as_deref(), Some("preset"));
    }

    #[test]
    fn with_payload_ids_filled_populates_empty_slots() {
        let event = ActionEvent {
            action_id: "a1".to_string(),
            external_user_id: None,
            external_room_id: ExternalId::from("room1"),
            value: None,
            raw: Value::Null,
        };
        let envelope =
            EventEnvelope::new("slack", EventPayload::Action(event), Value::Null).with_payload_ids_filled();
        assert_eq!(envelope.channel_id.as_deref(), Some("room1"));
    }
}

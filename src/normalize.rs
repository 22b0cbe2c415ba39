//! Event normalizer (spec.md §4.3 — component C3).
//!
//! Coerces heterogeneous JSON payloads into the typed [`EventPayload`]
//! variants and wraps them in an [`EventEnvelope`]. A typed value passed to
//! any `ensure_*` function here passes through unchanged in spirit — since
//! Rust already has the typed value at that point, these functions exist
//! for the raw-JSON-in case, mirroring the source's "a typed value passes
//! through; a map is enriched ... then constructed via the schema" split.

use crate::error::{NormalizeError, Result};
use crate::model::{
    ActionEvent, AssistantContextChangedEvent, AssistantThreadStartedEvent, EventEnvelope,
    EventPayload, EventType, ExternalId, Incoming, Metadata, ModalCloseEvent, ModalSubmitEvent,
    ReactionEvent, SlashCommandEvent,
};
use serde_json::Value;

/// `"adapter:room"` if no sub-thread, else `"adapter:room:thread"` (spec.md
/// §4.3 `thread_id_from`).
pub fn thread_id_from(
    adapter_name: &str,
    external_room_id: &ExternalId,
    external_thread_id: Option<&ExternalId>,
) -> String {
    match external_thread_id {
        Some(thread_id) => format!("{adapter_name}:{external_room_id}:{thread_id}"),
        None => format!("{adapter_name}:{external_room_id}"),
    }
}

fn require_object<'a>(subject: &str, value: &'a Value) -> Result<&'a serde_json::Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| NormalizeError::InvalidEvent { kind: subject.to_string(), value: value.clone() }.into())
}

fn require_room_id(subject: &str, obj: &serde_json::Map<String, Value>, value: &Value) -> Result<ExternalId> {
    obj.get("external_room_id")
        .and_then(ExternalId::from_value)
        .ok_or_else(|| NormalizeError::InvalidEvent { kind: subject.to_string(), value: value.clone() }.into())
}

/// Coerce a raw payload into an [`Incoming`] (spec.md §4.3).
pub fn ensure_incoming(value: Value) -> Result<Incoming> {
    Incoming::from_value(value).map_err(|e| match e {
        crate::error::Error::Validation(v) => NormalizeError::InvalidIncoming(v.input).into(),
        other => other,
    })
}

/// Coerce a raw payload into a [`ReactionEvent`] (spec.md §4.3).
pub fn ensure_reaction_event(value: Value) -> Result<ReactionEvent> {
    let obj = require_object("reaction", &value)?;
    let external_room_id = require_room_id("reaction", obj, &value)?;
    let emoji = obj
        .get("emoji")
        .and_then(|v| v.as_str())
        .ok_or_else(|| NormalizeError::InvalidEvent { kind: "reaction".to_string(), value: value.clone() })?
        .to_string();
    Ok(ReactionEvent {
        emoji,
        added: obj.get("added").and_then(Value::as_bool).unwrap_or(true),
        external_user_id: obj.get("external_user_id").and_then(ExternalId::from_value),
        external_message_id: obj.get("external_message_id").and_then(ExternalId::from_value),
        external_room_id,
        raw: value,
    })
}

/// Coerce a raw payload into an [`ActionEvent`] (spec.md §4.3).
pub fn ensure_action_event(value: Value) -> Result<ActionEvent> {
    let obj = require_object("action", &value)?;
    let external_room_id = require_room_id("action", obj, &value)?;
    let action_id = obj
        .get("action_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| NormalizeError::InvalidEvent { kind: "action".to_string(), value: value.clone() })?
        .to_string();
    Ok(ActionEvent {
        action_id,
        external_user_id: obj.get("external_user_id").and_then(ExternalId::from_value),
        external_room_id,
        value: obj.get("value").and_then(|v| v.as_str()).map(String::from),
        raw: value,
    })
}

/// Coerce a raw payload into a [`ModalSubmitEvent`] (spec.md §4.3).
pub fn ensure_modal_submit_event(value: Value) -> Result<ModalSubmitEvent> {
    let obj = require_object("modal_submit", &value)?;
    let callback_id = obj
        .get("callback_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| NormalizeError::InvalidEvent { kind: "modal_submit".to_string(), value: value.clone() })?
        .to_string();
    let values: Metadata = obj
        .get("values")
        .and_then(Value::as_object)
        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();
    Ok(ModalSubmitEvent {
        callback_id,
        external_user_id: obj.get("external_user_id").and_then(ExternalId::from_value),
        values,
        raw: value,
    })
}

/// Coerce a raw payload into a [`ModalCloseEvent`] (spec.md §4.3).
pub fn ensure_modal_close_event(value: Value) -> Result<ModalCloseEvent> {
    let obj = require_object("modal_close", &value)?;
    let callback_id = obj
        .get("callback_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| NormalizeError::InvalidEvent { kind: "modal_close".to_string(), value: value.clone() })?
        .to_string();
    Ok(ModalCloseEvent {
        callback_id,
        external_user_id: obj.get("external_user_id").and_then(ExternalId::from_value),
        raw: value,
    })
}

/// Coerce a raw payload into a [`SlashCommandEvent`] (spec.md §4.3).
pub fn ensure_slash_command_event(value: Value) -> Result<SlashCommandEvent> {
    let obj = require_object("slash_command", &value)?;
    let external_room_id = require_room_id("slash_command", obj, &value)?;
    let command = obj
        .get("command")
        .and_then(|v| v.as_str())
        .ok_or_else(|| NormalizeError::InvalidEvent { kind: "slash_command".to_string(), value: value.clone() })?
        .to_string();
    Ok(SlashCommandEvent {
        command,
        text: obj.get("text").and_then(|v| v.as_str()).map(String::from),
        external_user_id: obj.get("external_user_id").and_then(ExternalId::from_value),
        external_room_id,
        raw: value,
    })
}

/// Coerce a raw payload into an [`AssistantThreadStartedEvent`] (spec.md
/// §4.3: "`thread_id` defaults to `\"unknown\"` for assistant events when
/// missing").
pub fn ensure_assistant_thread_started_event(value: Value) -> Result<AssistantThreadStartedEvent> {
    let obj = require_object("assistant_thread_started", &value)?;
    let thread_id = obj
        .get("thread_id")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();
    Ok(AssistantThreadStartedEvent { thread_id, raw: value })
}

/// Coerce a raw payload into an [`AssistantContextChangedEvent`] (spec.md §4.3).
pub fn ensure_assistant_context_changed_event(value: Value) -> Result<AssistantContextChangedEvent> {
    let obj = require_object("assistant_context_changed", &value)?;
    let thread_id = obj
        .get("thread_id")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();
    let context = obj.get("context").cloned().unwrap_or(Value::Null);
    Ok(AssistantContextChangedEvent { thread_id, context, raw: value })
}

/// Build an [`EventEnvelope`] from a raw payload, inferring `event_type`
/// when not supplied explicitly (spec.md §4.3 `ensure_event_envelope`):
/// presence of `emoji` → `reaction`, `action_id` → `action`, `callback_id`
/// → `modal_submit`, `command` → `slash_command`, otherwise `message`.
pub fn ensure_event_envelope(
    value: Value,
    adapter_name: &str,
    event_type_hint: Option<EventType>,
) -> Result<EventEnvelope> {
    let event_type = event_type_hint
        .or_else(|| {
            value
                .get("event_type")
                .and_then(|v| v.as_str())
                .and_then(EventType::from_str)
        })
        .unwrap_or_else(|| EventType::infer(&value));

    let payload = match event_type {
        EventType::Message => EventPayload::Message(ensure_incoming(value.clone())?),
        EventType::Reaction => EventPayload::Reaction(ensure_reaction_event(value.clone())?),
        EventType::Action => EventPayload::Action(ensure_action_event(value.clone())?),
        EventType::ModalSubmit => EventPayload::ModalSubmit(ensure_modal_submit_event(value.clone())?),
        EventType::ModalClose => EventPayload::ModalClose(ensure_modal_close_event(value.clone())?),
        EventType::SlashCommand => EventPayload::SlashCommand(ensure_slash_command_event(value.clone())?),
        EventType::AssistantThreadStarted => {
            EventPayload::AssistantThreadStarted(ensure_assistant_thread_started_event(value.clone())?)
        }
        EventType::AssistantContextChanged => {
            EventPayload::AssistantContextChanged(ensure_assistant_context_changed_event(value.clone())?)
        }
    };

    let envelope = EventEnvelope::new(adapter_name.to_string(), payload, value);
    Ok(envelope.with_payload_ids_filled())
}

/// Splice a freshly-routed payload back into an envelope, refilling any
/// still-empty `thread_id`/`channel_id`/`message_id` slots from it without
/// ever overwriting a populated one (spec.md §4.3 `with_envelope_payload`,
/// §8 property 5).
pub fn with_envelope_payload(mut envelope: EventEnvelope, payload: EventPayload) -> EventEnvelope {
    envelope.payload = payload;
    envelope.with_payload_ids_filled()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn thread_id_formation_matches_spec() {
        let room = ExternalId::from("room1");
        assert_eq!(thread_id_from("slack", &room, None), "slack:room1");
        let thread = ExternalId::from("t1");
        assert_eq!(thread_id_from("slack", &room, Some(&thread)), "slack:room1:t1");
    }

    #[test]
    fn ensure_event_envelope_infers_type_from_shape() {
        let envelope =
            ensure_event_envelope(json!({"external_room_id": "r1", "emoji": "👍"}), "slack", None).unwrap();
        assert_eq!(envelope.event_type(), EventType::Reaction);
    }

    #[test]
    fn ensure_event_envelope_fills_ids_from_payload() {
        let envelope = ensure_event_envelope(
            json!({"external_room_id": "r1", "action_id": "a1"}),
            "slack",
            None,
        )
        .unwrap();
        assert_eq!(envelope.channel_id.as_deref(), Some("r1"));
    }

    #[test]
    fn assistant_events_default_thread_id_to_unknown() {
        let event = ensure_assistant_thread_started_event(json!({})).unwrap();
        assert_eq!(event.thread_id, "unknown");
    }

    #[test]
    fn with_envelope_payload_never_overwrites_populated_slots() {
        let mut envelope =
            ensure_event_envelope(json!({"external_room_id": "r1", "text": "hi"}), "slack", None).unwrap();
        envelope.channel_id = Some("preset".to_string());
        let reaction = ensure_reaction_event(json!({"external_room_id": "r2", "emoji": "x"})).unwrap();
        let envelope = with_envelope_payload(envelope, EventPayload::Reaction(reaction));
        assert_eq!(envelope.channel_id.as_deref(), Some("preset"));
    }
}

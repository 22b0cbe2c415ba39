//! Event router (spec.md §4.3/§4.4 — component C5).
//!
//! Dispatches an already-normalized [`EventEnvelope`] to the matching
//! [`Chat`] handler class and splices the (possibly handler-mutated) payload
//! back into the envelope. The match below is exhaustive over
//! [`EventPayload`]'s eight variants, so there is no reachable "unsupported
//! event type" branch here — that error is only possible earlier, in
//! [`crate::normalize::ensure_event_envelope`] when a wire `event_type`
//! string names something unrecognized.

use crate::chat::Chat;
use crate::model::{EventEnvelope, EventPayload};
use crate::normalize::with_envelope_payload;

/// Routes one envelope through [`Chat`], returning the updated `Chat`
/// alongside the envelope with its payload (and any previously-empty id
/// slots) refreshed from the dispatch outcome.
pub async fn route(chat: Chat, envelope: EventEnvelope) -> (Chat, EventEnvelope) {
    let payload = envelope.payload.clone();
    let adapter_name = envelope.adapter_name.clone();

    tracing::debug!(adapter_name, event_type = envelope.event_type.as_str(), "routing event envelope");

    match payload {
        EventPayload::Message(incoming) => {
            let (chat, incoming) = chat.process_message(&adapter_name, incoming).await;
            let envelope = with_envelope_payload(envelope, EventPayload::Message(incoming));
            (chat, envelope)
        }
        EventPayload::Reaction(event) => {
            let (chat, event) = chat.dispatch_reaction(event).await;
            let envelope = with_envelope_payload(envelope, EventPayload::Reaction(event));
            (chat, envelope)
        }
        EventPayload::Action(event) => {
            let (chat, event) = chat.dispatch_action(event).await;
            let envelope = with_envelope_payload(envelope, EventPayload::Action(event));
            (chat, envelope)
        }
        EventPayload::ModalSubmit(event) => {
            let (chat, event) = chat.dispatch_modal_submit(event).await;
            let envelope = with_envelope_payload(envelope, EventPayload::ModalSubmit(event));
            (chat, envelope)
        }
        EventPayload::ModalClose(event) => {
            let (chat, event) = chat.dispatch_modal_close(event).await;
            let envelope = with_envelope_payload(envelope, EventPayload::ModalClose(event));
            (chat, envelope)
        }
        EventPayload::SlashCommand(event) => {
            let (chat, event) = chat.dispatch_slash_command(event).await;
            let envelope = with_envelope_payload(envelope, EventPayload::SlashCommand(event));
            (chat, envelope)
        }
        EventPayload::AssistantThreadStarted(event) => {
            let (chat, event) = chat.dispatch_assistant_thread_started(event).await;
            let envelope = with_envelope_payload(envelope, EventPayload::AssistantThreadStarted(event));
            (chat, envelope)
        }
        EventPayload::AssistantContextChanged(event) => {
            let (chat, event) = chat.dispatch_assistant_context_changed(event).await;
            let envelope = with_envelope_payload(envelope, EventPayload::AssistantContextChanged(event));
            (chat, envelope)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MockAdapter;
    use crate::normalize::ensure_event_envelope;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn chat_with_mock() -> Chat {
        let chat = Chat::new("c1");
        chat.adapters.register(Arc::new(MockAdapter::new("mock")));
        chat
    }

    #[tokio::test]
    async fn routes_message_payload_to_process_message() {
        let seen = Arc::new(Mutex::new(0u32));
        let mut chat = chat_with_mock();
        let recorded = seen.clone();
        chat.on_message(r".*", move |_thread, _incoming| {
            let recorded = recorded.clone();
            async move {
                *recorded.lock().unwrap() += 1;
            }
        })
        .unwrap();

        let envelope = ensure_event_envelope(json!({"external_room_id": "room1", "text": "hi"}), "mock", None).unwrap();
        let (_chat, envelope) = route(chat, envelope).await;
        assert_eq!(*seen.lock().unwrap(), 1);
        assert_eq!(envelope.channel_id.as_deref(), Some("room1"));
    }

    #[tokio::test]
    async fn routes_reaction_payload_to_dispatch_reaction() {
        let seen = Arc::new(Mutex::new(0u32));
        let mut chat = chat_with_mock();
        let recorded = seen.clone();
        chat.on_reaction(move |_event| {
            let recorded = recorded.clone();
            async move {
                *recorded.lock().unwrap() += 1;
            }
        });

        let envelope =
            ensure_event_envelope(json!({"external_room_id": "room1", "emoji": "👍"}), "mock", None).unwrap();
        let (_chat, _envelope) = route(chat, envelope).await;
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn routes_slash_command_payload_to_dispatch_slash_command() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut chat = chat_with_mock();
        let recorded = seen.clone();
        chat.on_slash_command(move |event| {
            let recorded = recorded.clone();
            async move {
                recorded.lock().unwrap().push(event.command);
            }
        });

        let envelope = ensure_event_envelope(
            json!({"external_room_id": "room1", "command": "/help"}),
            "mock",
            None,
        )
        .unwrap();
        let (_chat, _envelope) = route(chat, envelope).await;
        assert_eq!(*seen.lock().unwrap(), vec!["/help"]);
    }
}

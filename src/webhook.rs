//! Inbound webhook pipeline (spec.md §4.6 — component C6).
//!
//! `handle_request` never propagates an error to its caller: every failure
//! mode — an unresolved adapter, a rejected [`WebhookRequest`], a parse
//! error, even a panicking handler somewhere downstream in dispatch —
//! becomes a [`WebhookResponse`] instead. The pipeline takes `chat` by
//! value and hands back whichever `Chat` survived the run, so callers keep
//! threading state the same way they do through [`crate::router::route`].

use crate::adapter::{AdapterDyn, OptsMap, WebhookOutcome};
use crate::chat::Chat;
use crate::error::{Error, WebhookError};
use crate::model::{WebhookRequest, WebhookResponse};
use crate::router;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;

/// Resolve the adapter, verify the request, parse it into an event (if any),
/// route it, and format a response — catching any panic raised along the
/// way as a 500 rather than letting it unwind into the caller.
pub async fn handle_request(
    chat: Chat,
    adapter_name: &str,
    request: WebhookRequest,
    opts: &OptsMap,
) -> (Chat, WebhookResponse) {
    let chat_before_panic = chat.clone();
    match AssertUnwindSafe(run_pipeline(chat, adapter_name, request, opts))
        .catch_unwind()
        .await
    {
        Ok(outcome) => outcome,
        Err(panic) => {
            let reason = panic_reason(&panic);
            tracing::error!(adapter_name, reason, "webhook handler panicked, returning 500");
            (chat_before_panic, WebhookResponse::webhook_exception(reason))
        }
    }
}

async fn run_pipeline(
    chat: Chat,
    adapter_name: &str,
    request: WebhookRequest,
    opts: &OptsMap,
) -> (Chat, WebhookResponse) {
    let Some(adapter) = chat.adapters.resolve(adapter_name) else {
        tracing::warn!(adapter_name, "webhook request for unknown adapter");
        return (chat, WebhookResponse::unknown_adapter(adapter_name));
    };

    if let Err(e) = adapter.verify_webhook(&request, opts).await {
        let reason = reason_for(&e);
        tracing::warn!(adapter_name, reason, "webhook verification failed");
        let response = format_or_fallback(adapter.as_ref(), WebhookOutcome::Err(reason), opts).await;
        return (chat, response);
    }

    match adapter.parse_event(&request, opts).await {
        Ok(None) => {
            tracing::debug!(adapter_name, "webhook parsed as noop, no envelope to route");
            let response = format_or_fallback(adapter.as_ref(), WebhookOutcome::Noop, opts).await;
            (chat, response)
        }
        Ok(Some(envelope)) => {
            tracing::info!(adapter_name, event_type = envelope.event_type.as_str(), "webhook routed");
            let (chat, _envelope) = router::route(chat, envelope).await;
            let response = format_or_fallback(adapter.as_ref(), WebhookOutcome::Ok, opts).await;
            (chat, response)
        }
        Err(e) => {
            let reason = reason_for(&e);
            tracing::warn!(adapter_name, reason, "webhook event parse failed");
            let response = format_or_fallback(adapter.as_ref(), WebhookOutcome::Err(reason), opts).await;
            (chat, response)
        }
    }
}

async fn format_or_fallback(adapter: &dyn AdapterDyn, outcome: WebhookOutcome, opts: &OptsMap) -> WebhookResponse {
    adapter
        .format_webhook_response(&outcome, opts)
        .await
        .unwrap_or_else(|_| WebhookResponse::response_format_error())
}

/// Maps a caught error onto the canonical reason strings
/// `format_webhook_response`'s default implementation branches on (spec.md
/// §4.2 fallback rule), falling back to the error's own message for
/// anything else.
fn reason_for(err: &Error) -> String {
    match err {
        Error::Webhook(WebhookError::InvalidSecret) => "invalid_webhook_secret".to_string(),
        Error::Webhook(WebhookError::InvalidSignature) => "invalid_signature".to_string(),
        other => other.to_string(),
    }
}

fn panic_reason(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MockAdapter;
    use serde_json::json;
    use std::sync::Arc;

    fn chat_with_mock(mock: MockAdapter) -> Chat {
        let chat = Chat::new("c1");
        chat.adapters.register(Arc::new(mock));
        chat
    }

    #[tokio::test]
    async fn unknown_adapter_returns_404_without_touching_chat() {
        let chat = Chat::new("c1");
        let request = WebhookRequest::from_value(json!({}), Some("mock".to_string()));
        let (_chat, response) = handle_request(chat, "mock", request, &OptsMap::new()).await;
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn verification_failure_maps_to_401() {
        let chat = chat_with_mock(MockAdapter::new("mock").with_verification_failure("invalid_webhook_secret"));
        let request = WebhookRequest::from_value(json!({}), Some("mock".to_string()));
        let (_chat, response) = handle_request(chat, "mock", request, &OptsMap::new()).await;
        assert_eq!(response.status, 401);
    }

    #[tokio::test]
    async fn valid_message_webhook_routes_and_returns_200() {
        let mut chat_seed = chat_with_mock(MockAdapter::new("mock"));
        let seen = std::sync::Arc::new(std::sync::Mutex::new(0u32));
        let recorded = seen.clone();
        chat_seed.on_message(r".*", move |_thread, _incoming| {
            let recorded = recorded.clone();
            async move {
                *recorded.lock().unwrap() += 1;
            }
        })
        .unwrap();

        let request = WebhookRequest::from_value(
            json!({"payload": {"external_room_id": "room1", "text": "hi"}}),
            Some("mock".to_string()),
        );
        let (_chat, response) = handle_request(chat_seed, "mock", request, &OptsMap::new()).await;
        assert_eq!(response.status, 200);
        assert_eq!(*seen.lock().unwrap(), 1);
    }
}

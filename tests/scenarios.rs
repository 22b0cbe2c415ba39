//! End-to-end scenarios S1-S7 (spec.md §8), exercised through the public API
//! only, against [`MockAdapter`] and a bespoke noop-parsing test adapter.

use chatcore::adapter::{Adapter, MockAdapter, OptsMap, Registry, WebhookOutcome};
use chatcore::error::{AdapterError, Result};
use chatcore::model::{
    CapabilityMatrix, Capability, CapabilityStatus, EventEnvelope, ExternalId, FetchOptions, FromIncomingOpts,
    Incoming, Message, MessagePage, ModalResult, Response, WebhookRequest, WebhookResponse,
};
use chatcore::{webhook, Chat};
use serde_json::json;
use std::sync::{Arc, Mutex};

fn incoming(room: &str, text: &str, message_id: Option<&str>, mentioned: bool) -> Incoming {
    let mut value = json!({
        "external_room_id": room,
        "text": text,
        "was_mentioned": mentioned,
    });
    if let Some(id) = message_id {
        value["external_message_id"] = json!(id);
    }
    Incoming::from_value(value).unwrap()
}

fn chat_with_mock(name: &str) -> Chat {
    let chat = Chat::new("c1");
    chat.adapters.register(Arc::new(MockAdapter::new(name)));
    chat
}

/// S1 - mention-only routing: with a `subscribed` handler also registered,
/// only the mention handler fires, and the message is not re-dispatched on
/// replay because of the dedupe key.
#[tokio::test]
async fn s1_mention_only_routing() {
    let mention_seen = Arc::new(Mutex::new(0u32));
    let subscribed_seen = Arc::new(Mutex::new(0u32));

    let mut chat = chat_with_mock("mock");
    chat.set_user_name("jido");

    let m = mention_seen.clone();
    chat.on_mention(move |_thread, _incoming| {
        let m = m.clone();
        async move {
            *m.lock().unwrap() += 1;
        }
    });

    let s = subscribed_seen.clone();
    chat.on_subscribed(move |_thread, _incoming| {
        let s = s.clone();
        async move {
            *s.lock().unwrap() += 1;
        }
    });

    let in1 = incoming("room1", "@jido hi", Some("m1"), true);
    let (chat, _) = chat.process_message("mock", in1).await;
    assert_eq!(*mention_seen.lock().unwrap(), 1);
    assert_eq!(*subscribed_seen.lock().unwrap(), 0);

    let in1_again = incoming("room1", "@jido hi", Some("m1"), true);
    let (_chat, _) = chat.process_message("mock", in1_again).await;
    assert_eq!(*mention_seen.lock().unwrap(), 1, "replay of m1 must not re-dispatch");
    assert_eq!(*subscribed_seen.lock().unwrap(), 0);
}

/// S2 - regex routing: a registered `^ping$` handler fires exactly once for
/// a non-mentioning "ping" message.
#[tokio::test]
async fn s2_regex_routing() {
    let seen = Arc::new(Mutex::new(0u32));
    let mut chat = chat_with_mock("mock");
    let s = seen.clone();
    chat.on_message(r"(?i)^ping$", move |_thread, _incoming| {
        let s = s.clone();
        async move {
            *s.lock().unwrap() += 1;
        }
    })
    .unwrap();

    let in1 = incoming("room1", "ping", Some("m1"), false);
    let (_chat, _) = chat.process_message("mock", in1).await;
    assert_eq!(*seen.lock().unwrap(), 1);
}

/// S3 - dedupe eviction: with `dedupe_limit = 2`, processing m1, m2, m3
/// evicts m1, and replaying it re-dispatches.
#[tokio::test]
async fn s3_dedupe_eviction() {
    let mut config = chatcore::ChatConfig::default();
    config.dedupe_limit = 2;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut chat = chat_with_mock("mock").with_config(config);
    let s = seen.clone();
    chat.on_message(r".*", move |_thread, incoming| {
        let s = s.clone();
        async move {
            s.lock().unwrap().push(incoming.external_message_id.map(|id| id.to_string()));
        }
    })
    .unwrap();

    let (chat, _) = chat.process_message("mock", incoming("room1", "a", Some("m1"), false)).await;
    let (chat, _) = chat.process_message("mock", incoming("room1", "b", Some("m2"), false)).await;
    let (chat, _) = chat.process_message("mock", incoming("room1", "c", Some("m3"), false)).await;
    assert_eq!(seen.lock().unwrap().len(), 3);

    // m1 was evicted, so replaying it dispatches again.
    let (_chat, _) = chat.process_message("mock", incoming("room1", "a", Some("m1"), false)).await;
    assert_eq!(seen.lock().unwrap().len(), 4);
}

/// A test-only adapter whose pages are fixed in advance, used to verify
/// S4's lazy single-call-until-consumption claim via a call counter.
struct CountingPageAdapter {
    name: String,
    pages: Mutex<Vec<MessagePage>>,
    calls: Arc<Mutex<u32>>,
}

impl Adapter for CountingPageAdapter {
    fn channel_type(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> CapabilityMatrix {
        CapabilityMatrix::defaults()
    }

    async fn transform_incoming(&self, raw: serde_json::Value) -> Result<Incoming> {
        Incoming::from_value(raw)
    }

    async fn send_message(&self, room: &ExternalId, text: &str, _opts: &OptsMap) -> Result<Response> {
        Ok(Response::from_value(json!({"channel_id": room.as_str(), "text": text})))
    }

    async fn edit_message(&self, _room: &ExternalId, _id: &str, _text: &str, _opts: &OptsMap) -> Result<Response> {
        Err(AdapterError::Unsupported.into())
    }

    async fn delete_message(&self, _room: &ExternalId, _id: &str, _opts: &OptsMap) -> Result<()> {
        Err(AdapterError::Unsupported.into())
    }

    async fn add_reaction(&self, _room: &ExternalId, _id: &str, _emoji: &str, _opts: &OptsMap) -> Result<()> {
        Err(AdapterError::Unsupported.into())
    }

    async fn remove_reaction(&self, _room: &ExternalId, _id: &str, _emoji: &str, _opts: &OptsMap) -> Result<()> {
        Err(AdapterError::Unsupported.into())
    }

    async fn open_dm(&self, _user: &ExternalId, _opts: &OptsMap) -> Result<ExternalId> {
        Err(AdapterError::Unsupported.into())
    }

    async fn fetch_messages(&self, _room: &ExternalId, _opts: &FetchOptions) -> Result<MessagePage> {
        *self.calls.lock().unwrap() += 1;
        let mut pages = self.pages.lock().unwrap();
        if pages.is_empty() {
            Ok(MessagePage::empty())
        } else {
            Ok(pages.remove(0))
        }
    }

    async fn open_modal(&self, _trigger_id: &str, _view: serde_json::Value, _opts: &OptsMap) -> Result<ModalResult> {
        Err(AdapterError::Unsupported.into())
    }

    async fn start_typing(&self, _room: &ExternalId, _opts: &OptsMap) -> Result<()> {
        Err(AdapterError::Unsupported.into())
    }

    async fn verify_webhook(&self, _request: &WebhookRequest, _opts: &OptsMap) -> Result<()> {
        Ok(())
    }
}

fn page_message(id: &str) -> Message {
    let incoming = Incoming::from_value(json!({"external_room_id": "room1", "external_message_id": id})).unwrap();
    Message::from_incoming(&incoming, FromIncomingOpts { adapter_name: "paged", thread_id: None })
}

/// S4 - paginated history stream: page A has a cursor pointing at page B;
/// `all_messages` concatenates both in order, and the adapter is called
/// exactly twice (not once per logical message).
#[tokio::test]
async fn s4_paginated_history() {
    let calls = Arc::new(Mutex::new(0u32));
    let page_a = MessagePage::new(vec![page_message("m10"), page_message("m11")], Some("c1".to_string()));
    let page_b = MessagePage::new(vec![page_message("m12")], None);
    let adapter = Arc::new(CountingPageAdapter {
        name: "paged".to_string(),
        pages: Mutex::new(vec![page_a, page_b]),
        calls: calls.clone(),
    });

    let registry = Arc::new(Registry::new());
    registry.register(adapter.clone());
    let chat = Chat::new("c1").with_adapters(registry);

    let resolved = chat.adapters.resolve("paged").unwrap();
    let thread = chatcore::Thread::new(resolved, "paged", ExternalId::from("room1"), None, false);

    let all = thread.all_messages(FetchOptions::default()).await.unwrap();
    let ids: Vec<_> = all.iter().filter_map(|m| m.external_message_id.as_ref().map(|i| i.to_string())).collect();
    assert_eq!(ids, vec!["m10", "m11", "m12"]);
    assert_eq!(*calls.lock().unwrap(), 2);
}

/// S5 - webhook unknown adapter: a 404 with the canonical error body, and
/// `chat` passes through untouched.
#[tokio::test]
async fn s5_webhook_unknown_adapter() {
    let registry = Arc::new(Registry::new());
    registry.register(Arc::new(MockAdapter::new("test")));
    let chat = Chat::new("c1").with_adapters(registry);

    let request = WebhookRequest::from_value(json!({}), Some("missing".to_string()));
    let (_chat, response) = webhook::handle_request(chat, "missing", request, &OptsMap::new()).await;
    assert_eq!(response.status, 404);
    assert_eq!(response.body, json!({"error": "unknown_adapter", "adapter_name": "missing"}));
}

/// A test-only adapter whose `parse_event` always reports noop, with no
/// custom `format_webhook_response` override, exercising S6's "otherwise
/// 200" branch of the fallback rule.
struct NoopAdapter;

impl Adapter for NoopAdapter {
    fn channel_type(&self) -> &str {
        "noop"
    }

    fn capabilities(&self) -> CapabilityMatrix {
        CapabilityMatrix::defaults()
    }

    async fn transform_incoming(&self, raw: serde_json::Value) -> Result<Incoming> {
        Incoming::from_value(raw)
    }

    async fn send_message(&self, room: &ExternalId, text: &str, _opts: &OptsMap) -> Result<Response> {
        Ok(Response::from_value(json!({"channel_id": room.as_str(), "text": text})))
    }

    async fn edit_message(&self, _room: &ExternalId, _id: &str, _text: &str, _opts: &OptsMap) -> Result<Response> {
        Err(AdapterError::Unsupported.into())
    }

    async fn delete_message(&self, _room: &ExternalId, _id: &str, _opts: &OptsMap) -> Result<()> {
        Err(AdapterError::Unsupported.into())
    }

    async fn add_reaction(&self, _room: &ExternalId, _id: &str, _emoji: &str, _opts: &OptsMap) -> Result<()> {
        Err(AdapterError::Unsupported.into())
    }

    async fn remove_reaction(&self, _room: &ExternalId, _id: &str, _emoji: &str, _opts: &OptsMap) -> Result<()> {
        Err(AdapterError::Unsupported.into())
    }

    async fn open_dm(&self, _user: &ExternalId, _opts: &OptsMap) -> Result<ExternalId> {
        Err(AdapterError::Unsupported.into())
    }

    async fn fetch_messages(&self, _room: &ExternalId, _opts: &FetchOptions) -> Result<MessagePage> {
        Ok(MessagePage::empty())
    }

    async fn open_modal(&self, _trigger_id: &str, _view: serde_json::Value, _opts: &OptsMap) -> Result<ModalResult> {
        Err(AdapterError::Unsupported.into())
    }

    async fn start_typing(&self, _room: &ExternalId, _opts: &OptsMap) -> Result<()> {
        Err(AdapterError::Unsupported.into())
    }

    async fn verify_webhook(&self, _request: &WebhookRequest, _opts: &OptsMap) -> Result<()> {
        Ok(())
    }

    async fn parse_event(&self, _request: &WebhookRequest, _opts: &OptsMap) -> Result<Option<EventEnvelope>> {
        Ok(None)
    }
}

/// S6 - noop parse: with no custom `format_webhook_response` override, the
/// pipeline falls back to the default formatter's 200 `{"ok": true}`.
#[tokio::test]
async fn s6_noop_parse_without_custom_formatter() {
    let registry = Arc::new(Registry::new());
    registry.register(Arc::new(NoopAdapter));
    let chat = Chat::new("c1").with_adapters(registry);

    let request = WebhookRequest::from_value(json!({}), Some("noop".to_string()));
    let (_chat, response) = webhook::handle_request(chat, "noop", request, &OptsMap::new()).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!({"ok": true}));
}

/// Same noop parse as [`NoopAdapter`], but with a `format_webhook_response`
/// override that distinguishes `WebhookOutcome::Noop` from `Ok` and reports
/// it as 204 (spec.md §4.6 step 4, §6's canonical `204 {"ok":true,"noop":true}`).
struct NoopAdapterWithCustomFormatter;

impl Adapter for NoopAdapterWithCustomFormatter {
    fn channel_type(&self) -> &str {
        "noop-custom"
    }

    fn capabilities(&self) -> CapabilityMatrix {
        CapabilityMatrix::defaults()
    }

    async fn transform_incoming(&self, raw: serde_json::Value) -> Result<Incoming> {
        Incoming::from_value(raw)
    }

    async fn send_message(&self, room: &ExternalId, text: &str, _opts: &OptsMap) -> Result<Response> {
        Ok(Response::from_value(json!({"channel_id": room.as_str(), "text": text})))
    }

    async fn edit_message(&self, _room: &ExternalId, _id: &str, _text: &str, _opts: &OptsMap) -> Result<Response> {
        Err(AdapterError::Unsupported.into())
    }

    async fn delete_message(&self, _room: &ExternalId, _id: &str, _opts: &OptsMap) -> Result<()> {
        Err(AdapterError::Unsupported.into())
    }

    async fn add_reaction(&self, _room: &ExternalId, _id: &str, _emoji: &str, _opts: &OptsMap) -> Result<()> {
        Err(AdapterError::Unsupported.into())
    }

    async fn remove_reaction(&self, _room: &ExternalId, _id: &str, _emoji: &str, _opts: &OptsMap) -> Result<()> {
        Err(AdapterError::Unsupported.into())
    }

    async fn open_dm(&self, _user: &ExternalId, _opts: &OptsMap) -> Result<ExternalId> {
        Err(AdapterError::Unsupported.into())
    }

    async fn fetch_messages(&self, _room: &ExternalId, _opts: &FetchOptions) -> Result<MessagePage> {
        Ok(MessagePage::empty())
    }

    async fn open_modal(&self, _trigger_id: &str, _view: serde_json::Value, _opts: &OptsMap) -> Result<ModalResult> {
        Err(AdapterError::Unsupported.into())
    }

    async fn start_typing(&self, _room: &ExternalId, _opts: &OptsMap) -> Result<()> {
        Err(AdapterError::Unsupported.into())
    }

    async fn verify_webhook(&self, _request: &WebhookRequest, _opts: &OptsMap) -> Result<()> {
        Ok(())
    }

    async fn parse_event(&self, _request: &WebhookRequest, _opts: &OptsMap) -> Result<Option<EventEnvelope>> {
        Ok(None)
    }

    async fn format_webhook_response(&self, outcome: &WebhookOutcome, _opts: &OptsMap) -> Result<WebhookResponse> {
        Ok(match outcome {
            WebhookOutcome::Noop => WebhookResponse::noop(),
            WebhookOutcome::Ok => WebhookResponse::ok(),
            WebhookOutcome::Err(reason) => WebhookResponse::invalid_request(reason),
        })
    }
}

/// S6's other branch: a custom `format_webhook_response` override can tell
/// a routed success (`Ok`) apart from a parser noop (`Noop`) and report the
/// latter as 204, end to end through [`webhook::handle_request`].
#[tokio::test]
async fn s6_noop_parse_with_custom_formatter_reports_204() {
    let registry = Arc::new(Registry::new());
    registry.register(Arc::new(NoopAdapterWithCustomFormatter));
    let chat = Chat::new("c1").with_adapters(registry);

    let request = WebhookRequest::from_value(json!({}), Some("noop-custom".to_string()));
    let (_chat, response) = webhook::handle_request(chat, "noop-custom", request, &OptsMap::new()).await;
    assert_eq!(response.status, 204);
    assert_eq!(response.body, json!({"ok": true, "noop": true}));
}

/// The default formatter, by contrast, reports both `Ok` and `Noop` as 200 —
/// it only distinguishes success from error (spec.md §4.2 fallback rule).
#[tokio::test]
async fn s6_default_formatter_reports_both_ok_and_noop_as_200() {
    let adapter = MockAdapter::new("mock");
    let ok = adapter.format_webhook_response(&WebhookOutcome::Ok, &OptsMap::new()).await.unwrap();
    let noop = adapter.format_webhook_response(&WebhookOutcome::Noop, &OptsMap::new()).await.unwrap();
    assert_eq!(ok.status, 200);
    assert_eq!(noop.status, 200);
    assert_ne!(noop.status, WebhookResponse::noop().status);
}

/// S7 - capability validator failure: an adapter declares `edit_message:
/// Native` in its matrix but never lists it in `implemented_capabilities`
/// (Rust's manifest stand-in for reflective override detection, spec.md
/// §9). `validate_capabilities` must report exactly that offender.
#[tokio::test]
async fn s7_capability_validator_reports_undeclared_native() {
    let mock = MockAdapter::new("mock").with_capabilities({
        let mut declared = std::collections::HashMap::new();
        declared.insert(Capability::EditMessage, CapabilityStatus::Native);
        declared.insert(Capability::Stream, CapabilityStatus::Native);
        CapabilityMatrix::with_declared(declared)
    });

    // edit_message IS in MockAdapter's manifest, so declaring it Native is fine.
    assert_eq!(mock.capabilities().status(Capability::EditMessage), CapabilityStatus::Native);

    // stream is NOT in MockAdapter's manifest, so it must be reported.
    let err = chatcore::adapter::validate_capabilities("mock", &mock).unwrap_err();
    match err {
        chatcore::error::Error::Adapter(chatcore::error::AdapterError::CapabilityMismatch {
            adapter_name,
            capabilities,
        }) => {
            assert_eq!(adapter_name, "mock");
            assert_eq!(capabilities, vec!["stream".to_string()]);
        }
        other => panic!("expected CapabilityMismatch, got {other:?}"),
    }
}

/// A correctly-declared matrix (every `Native` entry backed by the manifest)
/// validates as `Ok` (spec.md §8 property 7, "iff" direction).
#[tokio::test]
async fn s7_capability_validator_accepts_consistent_matrix() {
    let mock = MockAdapter::new("mock").with_capabilities({
        let mut declared = std::collections::HashMap::new();
        declared.insert(Capability::EditMessage, CapabilityStatus::Native);
        declared.insert(Capability::DeleteMessage, CapabilityStatus::Native);
        CapabilityMatrix::with_declared(declared)
    });
    assert!(chatcore::adapter::validate_capabilities("mock", &mock).is_ok());
}

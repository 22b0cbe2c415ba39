//! The platform adapter contract (spec.md §4.2 component C2).
//!
//! Every platform integration implements [`Adapter`]. Three operations are
//! required; the rest have default bodies that return
//! [`AdapterError::Unsupported`] so the wrapper layer (`wrappers` module) can
//! apply the documented fallback or surface the error, exactly as it would
//! for a platform adapter that never implemented the optional callback.

mod mock;
mod registry;
pub mod wrappers;

pub use mock::MockAdapter;
pub use registry::Registry;

use crate::error::{AdapterError, Result};
use crate::model::{
    Capability, CapabilityMatrix, CapabilityStatus, ChannelInfo, EventEnvelope, ExternalId,
    FetchOptions, Incoming, Message, MessagePage, Metadata, ModalResult, Response, ThreadPage,
    WebhookRequest,
};
use crate::outbound::Thread;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;

/// Arbitrary per-call options passed through to an adapter callback.
pub type OptsMap = HashMap<String, Value>;

/// The outcome a webhook pipeline step hands to `format_webhook_response`
/// (spec.md §4.2 fallback rule, §4.6 step 3).
#[derive(Debug, Clone)]
pub enum WebhookOutcome {
    Ok,
    /// The parser reported `:noop` — a routed event, if any, was consumed
    /// with no envelope to report back (spec.md §4.6 step 4, §6's
    /// `204 {"ok":true,"noop":true}`). Distinct from `Ok` so a custom
    /// `format_webhook_response` can tell the two apart; the default
    /// formatter still reports both as 200 (spec.md §4.2: the default
    /// mapper only distinguishes `Ok`/`Err`, not noop).
    Noop,
    Err(String),
}

/// Static, type-safe adapter contract. Use this to implement a platform
/// integration; use [`AdapterDyn`]/`Arc<dyn AdapterDyn>` to store
/// heterogeneous adapters behind one interface.
pub trait Adapter: Send + Sync + 'static {
    /// Stable identifier for this platform, e.g. `"discord"`, `"telegram"`.
    fn channel_type(&self) -> &str;

    /// Normalize a raw platform payload into an [`Incoming`] (required).
    fn transform_incoming(&self, raw: Value) -> impl Future<Output = Result<Incoming>> + Send;

    /// Deliver a text message to a room (required).
    fn send_message(
        &self,
        external_room_id: &ExternalId,
        text: &str,
        opts: &OptsMap,
    ) -> impl Future<Output = Result<Response>> + Send;

    /// Declared capability matrix. Adapters that implement optional
    /// callbacks natively should override this to declare `Native`;
    /// unoverridden capabilities keep the reflected defaults (spec.md §4.2).
    fn capabilities(&self) -> CapabilityMatrix {
        CapabilityMatrix::defaults()
    }

    /// The manifest of optional operations this adapter actually overrides.
    /// Rust gives no runtime reflection over trait-default overrides (unlike
    /// the dynamically-typed system this contract was modeled on), so an
    /// adapter declaring `Native` capabilities must also list them here —
    /// this is the "method returning a manifest" spec.md §9 calls for in
    /// place of reflective probing. `validate_capabilities` cross-checks
    /// this set against `capabilities()`.
    fn implemented_capabilities(&self) -> HashSet<Capability> {
        HashSet::new()
    }

    fn initialize(&self, _opts: &OptsMap) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }

    fn shutdown(&self) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }

    fn edit_message(
        &self,
        _external_room_id: &ExternalId,
        _external_message_id: &str,
        _text: &str,
        _opts: &OptsMap,
    ) -> impl Future<Output = Result<Response>> + Send {
        async { Err(AdapterError::Unsupported.into()) }
    }

    fn delete_message(
        &self,
        _external_room_id: &ExternalId,
        _external_message_id: &str,
        _opts: &OptsMap,
    ) -> impl Future<Output = Result<()>> + Send {
        async { Err(AdapterError::Unsupported.into()) }
    }

    fn start_typing(
        &self,
        _external_room_id: &ExternalId,
        _opts: &OptsMap,
    ) -> impl Future<Output = Result<()>> + Send {
        async { Err(AdapterError::Unsupported.into()) }
    }

    fn fetch_metadata(
        &self,
        _external_room_id: &ExternalId,
        _opts: &OptsMap,
    ) -> impl Future<Output = Result<ChannelInfo>> + Send {
        async { Err(AdapterError::Unsupported.into()) }
    }

    fn fetch_thread(
        &self,
        _external_room_id: &ExternalId,
        _external_thread_id: Option<&ExternalId>,
        _opts: &OptsMap,
    ) -> impl Future<Output = Result<Thread>> + Send {
        async { Err(AdapterError::Unsupported.into()) }
    }

    fn fetch_message(
        &self,
        _external_room_id: &ExternalId,
        _external_message_id: &str,
        _opts: &OptsMap,
    ) -> impl Future<Output = Result<Message>> + Send {
        async { Err(AdapterError::Unsupported.into()) }
    }

    fn add_reaction(
        &self,
        _external_room_id: &ExternalId,
        _external_message_id: &str,
        _emoji: &str,
        _opts: &OptsMap,
    ) -> impl Future<Output = Result<()>> + Send {
        async { Err(AdapterError::Unsupported.into()) }
    }

    fn remove_reaction(
        &self,
        _external_room_id: &ExternalId,
        _external_message_id: &str,
        _emoji: &str,
        _opts: &OptsMap,
    ) -> impl Future<Output = Result<()>> + Send {
        async { Err(AdapterError::Unsupported.into()) }
    }

    fn post_ephemeral(
        &self,
        _external_room_id: &ExternalId,
        _text: &str,
        _user_id: &str,
        _opts: &OptsMap,
    ) -> impl Future<Output = Result<crate::model::EphemeralMessage>> + Send {
        async { Err(AdapterError::Unsupported.into()) }
    }

    fn post_channel_message(
        &self,
        _external_channel_id: &ExternalId,
        _text: &str,
        _opts: &OptsMap,
    ) -> impl Future<Output = Result<Response>> + Send {
        async { Err(AdapterError::Unsupported.into()) }
    }

    /// Deliver a sequence of text chunks as a progressively-updated message
    /// (e.g. a streamed LLM response). Fallback concatenates and calls
    /// `send_message` (spec.md §4.2).
    fn stream(
        &self,
        _external_room_id: &ExternalId,
        _chunks: &[String],
        _opts: &OptsMap,
    ) -> impl Future<Output = Result<Response>> + Send {
        async { Err(AdapterError::Unsupported.into()) }
    }

    fn open_modal(
        &self,
        _trigger_id: &str,
        _view: Value,
        _opts: &OptsMap,
    ) -> impl Future<Output = Result<ModalResult>> + Send {
        async { Err(AdapterError::Unsupported.into()) }
    }

    fn fetch_messages(
        &self,
        _external_room_id: &ExternalId,
        _opts: &FetchOptions,
    ) -> impl Future<Output = Result<MessagePage>> + Send {
        async { Err(AdapterError::Unsupported.into()) }
    }

    fn fetch_channel_messages(
        &self,
        _external_channel_id: &ExternalId,
        _opts: &FetchOptions,
    ) -> impl Future<Output = Result<MessagePage>> + Send {
        async { Err(AdapterError::Unsupported.into()) }
    }

    fn list_threads(
        &self,
        _external_channel_id: &ExternalId,
        _opts: &FetchOptions,
    ) -> impl Future<Output = Result<ThreadPage>> + Send {
        async { Err(AdapterError::Unsupported.into()) }
    }

    fn open_dm(
        &self,
        _external_user_id: &ExternalId,
        _opts: &OptsMap,
    ) -> impl Future<Output = Result<ExternalId>> + Send {
        async { Err(AdapterError::Unsupported.into()) }
    }

    fn handle_webhook(
        &self,
        _request: &WebhookRequest,
        _opts: &OptsMap,
    ) -> impl Future<Output = Result<crate::model::WebhookResponse>> + Send {
        async { Err(AdapterError::Unsupported.into()) }
    }

    /// Not implemented → open (spec.md §4.2 fallback rule).
    fn verify_webhook(
        &self,
        _request: &WebhookRequest,
        _opts: &OptsMap,
    ) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }

    /// Not implemented → transform the payload as an `Incoming` and wrap it
    /// in a `message` envelope with `metadata = {path, method}` (spec.md
    /// §4.2 fallback rule).
    fn parse_event(
        &self,
        request: &WebhookRequest,
        _opts: &OptsMap,
    ) -> impl Future<Output = Result<Option<EventEnvelope>>> + Send {
        async move {
            let incoming = self.transform_incoming(request.payload.clone()).await?;
            let mut metadata = Metadata::new();
            if let Some(path) = &request.path {
                metadata.insert("path".to_string(), Value::String(path.clone()));
            }
            metadata.insert("method".to_string(), Value::String(request.method.clone()));
            let mut envelope = EventEnvelope::new(
                self.channel_type().to_string(),
                crate::model::EventPayload::Message(incoming),
                request.raw.clone(),
            );
            envelope.metadata = metadata;
            Ok(Some(envelope.with_payload_ids_filled()))
        }
    }

    /// Not implemented → canonical mapping: `Ok`/`Noop` → 200;
    /// `invalid_webhook_secret` / `invalid_signature` → 401; other errors →
    /// 400 (spec.md §4.2 fallback rule). A custom formatter may still report
    /// `Noop` as 204 (spec.md §4.6 step 4, §6).
    fn format_webhook_response(
        &self,
        outcome: &WebhookOutcome,
        _opts: &OptsMap,
    ) -> impl Future<Output = Result<crate::model::WebhookResponse>> + Send {
        let outcome = outcome.clone();
        async move {
            Ok(match outcome {
                WebhookOutcome::Ok | WebhookOutcome::Noop => crate::model::WebhookResponse::ok(),
                WebhookOutcome::Err(reason)
                    if reason == "invalid_webhook_secret" || reason == "invalid_signature" =>
                {
                    crate::model::WebhookResponse::new(
                        401,
                        serde_json::json!({"error": reason}),
                    )
                }
                WebhookOutcome::Err(reason) => crate::model::WebhookResponse::new(
                    400,
                    serde_json::json!({"error": "invalid_webhook_request", "reason": reason}),
                ),
            })
        }
    }

    fn listener_child_specs(&self) -> Vec<Value> {
        Vec::new()
    }
}

/// Dyn-compatible companion to [`Adapter`], generated by the blanket impl
/// below. Store adapters as `Arc<dyn AdapterDyn>` for runtime polymorphism.
pub trait AdapterDyn: Send + Sync + 'static {
    fn channel_type(&self) -> &str;
    fn capabilities(&self) -> CapabilityMatrix;
    fn implemented_capabilities(&self) -> HashSet<Capability>;
    fn listener_child_specs(&self) -> Vec<Value>;

    fn transform_incoming<'a>(
        &'a self,
        raw: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Incoming>> + Send + 'a>>;

    fn send_message<'a>(
        &'a self,
        external_room_id: &'a ExternalId,
        text: &'a str,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<Response>> + Send + 'a>>;

    fn initialize<'a>(&'a self, opts: &'a OptsMap) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
    fn shutdown<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    fn edit_message<'a>(
        &'a self,
        external_room_id: &'a ExternalId,
        external_message_id: &'a str,
        text: &'a str,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<Response>> + Send + 'a>>;

    fn delete_message<'a>(
        &'a self,
        external_room_id: &'a ExternalId,
        external_message_id: &'a str,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    fn start_typing<'a>(
        &'a self,
        external_room_id: &'a ExternalId,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    fn fetch_metadata<'a>(
        &'a self,
        external_room_id: &'a ExternalId,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<ChannelInfo>> + Send + 'a>>;

    fn fetch_thread<'a>(
        &'a self,
        external_room_id: &'a ExternalId,
        external_thread_id: Option<&'a ExternalId>,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<Thread>> + Send + 'a>>;

    fn fetch_message<'a>(
        &'a self,
        external_room_id: &'a ExternalId,
        external_message_id: &'a str,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<Message>> + Send + 'a>>;

    fn add_reaction<'a>(
        &'a self,
        external_room_id: &'a ExternalId,
        external_message_id: &'a str,
        emoji: &'a str,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    fn remove_reaction<'a>(
        &'a self,
        external_room_id: &'a ExternalId,
        external_message_id: &'a str,
        emoji: &'a str,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    fn post_ephemeral<'a>(
        &'a self,
        external_room_id: &'a ExternalId,
        text: &'a str,
        user_id: &'a str,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<crate::model::EphemeralMessage>> + Send + 'a>>;

    fn post_channel_message<'a>(
        &'a self,
        external_channel_id: &'a ExternalId,
        text: &'a str,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<Response>> + Send + 'a>>;

    fn stream<'a>(
        &'a self,
        external_room_id: &'a ExternalId,
        chunks: &'a [String],
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<Response>> + Send + 'a>>;

    fn open_modal<'a>(
        &'a self,
        trigger_id: &'a str,
        view: Value,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<ModalResult>> + Send + 'a>>;

    fn fetch_messages<'a>(
        &'a self,
        external_room_id: &'a ExternalId,
        opts: &'a FetchOptions,
    ) -> Pin<Box<dyn Future<Output = Result<MessagePage>> + Send + 'a>>;

    fn fetch_channel_messages<'a>(
        &'a self,
        external_channel_id: &'a ExternalId,
        opts: &'a FetchOptions,
    ) -> Pin<Box<dyn Future<Output = Result<MessagePage>> + Send + 'a>>;

    fn list_threads<'a>(
        &'a self,
        external_channel_id: &'a ExternalId,
        opts: &'a FetchOptions,
    ) -> Pin<Box<dyn Future<Output = Result<ThreadPage>> + Send + 'a>>;

    fn open_dm<'a>(
        &'a self,
        external_user_id: &'a ExternalId,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<ExternalId>> + Send + 'a>>;

    fn handle_webhook<'a>(
        &'a self,
        request: &'a WebhookRequest,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<crate::model::WebhookResponse>> + Send + 'a>>;

    fn verify_webhook<'a>(
        &'a self,
        request: &'a WebhookRequest,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    fn parse_event<'a>(
        &'a self,
        request: &'a WebhookRequest,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<Option<EventEnvelope>>> + Send + 'a>>;

    fn format_webhook_response<'a>(
        &'a self,
        outcome: &'a WebhookOutcome,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<crate::model::WebhookResponse>> + Send + 'a>>;
}

impl<T: Adapter> AdapterDyn for T {
    fn channel_type(&self) -> &str {
        Adapter::channel_type(self)
    }

    fn capabilities(&self) -> CapabilityMatrix {
        Adapter::capabilities(self)
    }

    fn implemented_capabilities(&self) -> HashSet<Capability> {
        Adapter::implemented_capabilities(self)
    }

    fn listener_child_specs(&self) -> Vec<Value> {
        Adapter::listener_child_specs(self)
    }

    fn transform_incoming<'a>(
        &'a self,
        raw: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Incoming>> + Send + 'a>> {
        Box::pin(Adapter::transform_incoming(self, raw))
    }

    fn send_message<'a>(
        &'a self,
        external_room_id: &'a ExternalId,
        text: &'a str,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<Response>> + Send + 'a>> {
        Box::pin(Adapter::send_message(self, external_room_id, text, opts))
    }

    fn initialize<'a>(&'a self, opts: &'a OptsMap) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(Adapter::initialize(self, opts))
    }

    fn shutdown<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(Adapter::shutdown(self))
    }

    fn edit_message<'a>(
        &'a self,
        external_room_id: &'a ExternalId,
        external_message_id: &'a str,
        text: &'a str,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<Response>> + Send + 'a>> {
        Box::pin(Adapter::edit_message(self, external_room_id, external_message_id, text, opts))
    }

    fn delete_message<'a>(
        &'a self,
        external_room_id: &'a ExternalId,
        external_message_id: &'a str,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(Adapter::delete_message(self, external_room_id, external_message_id, opts))
    }

    fn start_typing<'a>(
        &'a self,
        external_room_id: &'a ExternalId,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(Adapter::start_typing(self, external_room_id, opts))
    }

    fn fetch_metadata<'a>(
        &'a self,
        external_room_id: &'a ExternalId,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<ChannelInfo>> + Send + 'a>> {
        Box::pin(Adapter::fetch_metadata(self, external_room_id, opts))
    }

    fn fetch_thread<'a>(
        &'a self,
        external_room_id: &'a ExternalId,
        external_thread_id: Option<&'a ExternalId>,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<Thread>> + Send + 'a>> {
        Box::pin(Adapter::fetch_thread(self, external_room_id, external_thread_id, opts))
    }

    fn fetch_message<'a>(
        &'a self,
        external_room_id: &'a ExternalId,
        external_message_id: &'a str,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<Message>> + Send + 'a>> {
        Box::pin(Adapter::fetch_message(self, external_room_id, external_message_id, opts))
    }

    fn add_reaction<'a>(
        &'a self,
        external_room_id: &'a ExternalId,
        external_message_id: &'a str,
        emoji: &'a str,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(Adapter::add_reaction(self, external_room_id, external_message_id, emoji, opts))
    }

    fn remove_reaction<'a>(
        &'a self,
        external_room_id: &'a ExternalId,
        external_message_id: &'a str,
        emoji: &'a str,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(Adapter::remove_reaction(self, external_room_id, external_message_id, emoji, opts))
    }

    fn post_ephemeral<'a>(
        &'a self,
        external_room_id: &'a ExternalId,
        text: &'a str,
        user_id: &'a str,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<crate::model::EphemeralMessage>> + Send + 'a>> {
        Box::pin(Adapter::post_ephemeral(self, external_room_id, text, user_id, opts))
    }

    fn post_channel_message<'a>(
        &'a self,
        external_channel_id: &'a ExternalId,
        text: &'a str,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<Response>> + Send + 'a>> {
        Box::pin(Adapter::post_channel_message(self, external_channel_id, text, opts))
    }

    fn stream<'a>(
        &'a self,
        external_room_id: &'a ExternalId,
        chunks: &'a [String],
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<Response>> + Send + 'a>> {
        Box::pin(Adapter::stream(self, external_room_id, chunks, opts))
    }

    fn open_modal<'a>(
        &'a self,
        trigger_id: &'a str,
        view: Value,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<ModalResult>> + Send + 'a>> {
        Box::pin(Adapter::open_modal(self, trigger_id, view, opts))
    }

    fn fetch_messages<'a>(
        &'a self,
        external_room_id: &'a ExternalId,
        opts: &'a FetchOptions,
    ) -> Pin<Box<dyn Future<Output = Result<MessagePage>> + Send + 'a>> {
        Box::pin(Adapter::fetch_messages(self, external_room_id, opts))
    }

    fn fetch_channel_messages<'a>(
        &'a self,
        external_channel_id: &'a ExternalId,
        opts: &'a FetchOptions,
    ) -> Pin<Box<dyn Future<Output = Result<MessagePage>> + Send + 'a>> {
        Box::pin(Adapter::fetch_channel_messages(self, external_channel_id, opts))
    }

    fn list_threads<'a>(
        &'a self,
        external_channel_id: &'a ExternalId,
        opts: &'a FetchOptions,
    ) -> Pin<Box<dyn Future<Output = Result<ThreadPage>> + Send + 'a>> {
        Box::pin(Adapter::list_threads(self, external_channel_id, opts))
    }

    fn open_dm<'a>(
        &'a self,
        external_user_id: &'a ExternalId,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<ExternalId>> + Send + 'a>> {
        Box::pin(Adapter::open_dm(self, external_user_id, opts))
    }

    fn handle_webhook<'a>(
        &'a self,
        request: &'a WebhookRequest,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<crate::model::WebhookResponse>> + Send + 'a>> {
        Box::pin(Adapter::handle_webhook(self, request, opts))
    }

    fn verify_webhook<'a>(
        &'a self,
        request: &'a WebhookRequest,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(Adapter::verify_webhook(self, request, opts))
    }

    fn parse_event<'a>(
        &'a self,
        request: &'a WebhookRequest,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<Option<EventEnvelope>>> + Send + 'a>> {
        Box::pin(Adapter::parse_event(self, request, opts))
    }

    fn format_webhook_response<'a>(
        &'a self,
        outcome: &'a WebhookOutcome,
        opts: &'a OptsMap,
    ) -> Pin<Box<dyn Future<Output = Result<crate::model::WebhookResponse>> + Send + 'a>> {
        Box::pin(Adapter::format_webhook_response(self, outcome, opts))
    }
}

/// Checks that every capability the adapter declares `Native` corresponds to
/// an operation it actually overrides (spec.md §4.2 `validate_capabilities`,
/// §8 property 7, §8 scenario S7).
///
/// Cross-checks `adapter.capabilities()` against `adapter.implemented_capabilities()`
/// — the manifest spec.md §9 calls for in place of reflective
/// `function_exported?`-style probing, which Rust's static dispatch has no
/// equivalent of. Every capability declared [`CapabilityStatus::Native`]
/// that is absent from the manifest is reported as a `(capability,
/// "missing_callback")` offender.
pub fn validate_capabilities<A: AdapterDyn + ?Sized>(adapter_name: &str, adapter: &A) -> Result<()> {
    let matrix = adapter.capabilities();
    let implemented = adapter.implemented_capabilities();
    let offenders: Vec<String> = Capability::ALL
        .iter()
        .filter(|cap| matrix.status(**cap) == CapabilityStatus::Native && !implemented.contains(*cap))
        .map(|cap| cap.as_str().to_string())
        .collect();
    if offenders.is_empty() {
        Ok(())
    } else {
        Err(AdapterError::CapabilityMismatch {
            adapter_name: adapter_name.to_string(),
            capabilities: offenders,
        }
        .into())
    }
}

//! Wrapper functions applying the documented capability fallbacks (spec.md
//! §4.2 "Wrapper semantics" / "Fallback rules").
//!
//! Every optional [`Adapter`] method already returns
//! [`AdapterError::Unsupported`] by default when not overridden. These
//! wrappers are the single place that turns that default into the
//! documented fallback behavior (or lets it propagate unchanged when no
//! fallback is specified) — callers in the outbound facade (component C7)
//! go through these rather than calling adapter methods directly.

use super::{Adapter, OptsMap};
use crate::error::Result;
use crate::model::{ChannelInfo, EphemeralMessage, ExternalId, Response};
use crate::outbound::Thread;

/// `post_channel_message` falls back to `send_message` when not implemented
/// (spec.md §4.2 fallback rule).
pub async fn post_channel_message<A: Adapter>(
    adapter: &A,
    external_channel_id: &ExternalId,
    text: &str,
    opts: &OptsMap,
) -> Result<Response> {
    match adapter.post_channel_message(external_channel_id, text, opts).await {
        Err(e) if e.is_unsupported() => adapter.send_message(external_channel_id, text, opts).await,
        other => other,
    }
}

/// `stream` concatenates chunks into a string and calls `send_message` when
/// not implemented (spec.md §4.2 fallback rule).
pub async fn stream<A: Adapter>(
    adapter: &A,
    external_room_id: &ExternalId,
    chunks: &[String],
    opts: &OptsMap,
) -> Result<Response> {
    match adapter.stream(external_room_id, chunks, opts).await {
        Err(e) if e.is_unsupported() => {
            let text = chunks.concat();
            adapter.send_message(external_room_id, &text, opts).await
        }
        other => other,
    }
}

/// `post_ephemeral` with option `fallback_to_dm=true` and an adapter
/// providing `open_dm` opens a DM, sends the text there, and returns
/// `EphemeralMessage{used_fallback=true, metadata.source_room_id=original}`
/// (spec.md §4.2 fallback rule).
pub async fn post_ephemeral<A: Adapter>(
    adapter: &A,
    external_room_id: &ExternalId,
    text: &str,
    user_id: &str,
    fallback_to_dm: bool,
    opts: &OptsMap,
) -> Result<EphemeralMessage> {
    match adapter.post_ephemeral(external_room_id, text, user_id, opts).await {
        Err(e) if e.is_unsupported() && fallback_to_dm => {
            let dm_room = adapter.open_dm(&ExternalId::from(user_id), opts).await?;
            adapter.send_message(&dm_room, text, opts).await?;
            Ok(EphemeralMessage::via_dm_fallback(text, user_id, external_room_id))
        }
        other => other,
    }
}

/// `fetch_metadata` not implemented returns a synthetic `ChannelInfo{id:
/// room_id, metadata: {adapter_name}}` (spec.md §4.2 fallback rule).
pub async fn fetch_metadata<A: Adapter>(
    adapter: &A,
    external_room_id: &ExternalId,
    opts: &OptsMap,
) -> Result<ChannelInfo> {
    match adapter.fetch_metadata(external_room_id, opts).await {
        Err(e) if e.is_unsupported() => {
            Ok(ChannelInfo::synthetic(external_room_id.to_string(), adapter.channel_type()))
        }
        other => other,
    }
}

/// `fetch_thread` not implemented returns a synthetic `Thread` built from
/// the call arguments (spec.md §4.2 fallback rule).
pub async fn fetch_thread(
    adapter: std::sync::Arc<dyn super::AdapterDyn>,
    adapter_name: &str,
    external_room_id: &ExternalId,
    external_thread_id: Option<&ExternalId>,
    opts: &OptsMap,
) -> Result<Thread> {
    match adapter
        .fetch_thread(external_room_id, external_thread_id, opts)
        .await
    {
        Err(e) if e.is_unsupported() => Ok(Thread::synthetic(
            adapter,
            adapter_name,
            external_room_id.clone(),
            external_thread_id.cloned(),
        )),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MockAdapter;

    #[tokio::test]
    async fn post_channel_message_falls_back_to_send_message() {
        let mock = MockAdapter::new("mock");
        let opts = OptsMap::new();
        let response = post_channel_message(&mock, &ExternalId::from("c1"), "hi", &opts)
            .await
            .unwrap();
        assert_eq!(response.text.as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn stream_concatenates_chunks_and_falls_back() {
        let mock = MockAdapter::new("mock");
        let opts = OptsMap::new();
        let chunks = vec!["Hel".to_string(), "lo".to_string()];
        let response = stream(&mock, &ExternalId::from("r1"), &chunks, &opts).await.unwrap();
        assert_eq!(response.text.as_deref(), Some("Hello"));
    }

    #[tokio::test]
    async fn fetch_metadata_falls_back_to_synthetic() {
        let mock = MockAdapter::new("mock");
        let opts = OptsMap::new();
        let info = fetch_metadata(&mock, &ExternalId::from("r1"), &opts).await.unwrap();
        assert_eq!(info.id, "r1");
        assert_eq!(info.metadata.get("adapter_name").unwrap(), "mock");
    }

    #[tokio::test]
    async fn post_ephemeral_falls_back_to_dm_when_requested() {
        let mock = MockAdapter::new("mock").with_open_dm_room("dm-room");
        let opts = OptsMap::new();
        let ephemeral = post_ephemeral(&mock, &ExternalId::from("r1"), "psst", "u1", true, &opts)
            .await
            .unwrap();
        assert!(ephemeral.used_fallback);
        assert_eq!(ephemeral.metadata.get("source_room_id").unwrap(), "r1");
    }
}

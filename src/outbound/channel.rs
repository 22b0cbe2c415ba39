//! `ChannelRef` outbound handle (spec.md §3, §4.7 `ChannelRef`).

use super::Thread;
use crate::adapter::{AdapterDyn, OptsMap};
use crate::error::Result;
use crate::model::{ChannelInfo, ExternalId, FetchOptions, Message, MessagePage, Metadata, Response, ThreadPage};
use async_stream::stream;
use futures::Stream;
use std::collections::HashSet;
use std::pin::Pin;
use std::sync::Arc;

/// Addresses a channel as a whole, independent of any particular thread
/// (spec.md §3 `ChannelRef`).
#[derive(Clone)]
pub struct ChannelRef {
    pub id: String,
    pub adapter_name: String,
    pub adapter: Arc<dyn AdapterDyn>,
    pub external_channel_id: ExternalId,
    pub metadata: Metadata,
}

impl std::fmt::Debug for ChannelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRef")
            .field("id", &self.id)
            .field("adapter_name", &self.adapter_name)
            .finish_non_exhaustive()
    }
}

impl ChannelRef {
    /// `id = "adapter:channel"` (spec.md §3 invariant, mirroring `Thread`'s
    /// `channel_id` formation).
    pub fn new(adapter: Arc<dyn AdapterDyn>, adapter_name: impl Into<String>, external_channel_id: ExternalId) -> Self {
        let adapter_name = adapter_name.into();
        let id = format!("{adapter_name}:{external_channel_id}");
        Self {
            id,
            adapter_name,
            adapter,
            external_channel_id,
            metadata: Metadata::new(),
        }
    }

    /// The `Thread` for this channel with no sub-thread (spec.md §3, §4.7:
    /// posting to a channel is posting to its root thread).
    pub fn root_thread(&self) -> Thread {
        Thread::new(
            self.adapter.clone(),
            self.adapter_name.clone(),
            self.external_channel_id.clone(),
            None,
            false,
        )
    }

    /// `post_channel_message` falls back to `send_message` when the adapter
    /// doesn't implement it (spec.md §4.2 fallback rule).
    pub async fn post(&self, text: &str, opts: &OptsMap) -> Result<Response> {
        match self.adapter.post_channel_message(&self.external_channel_id, text, opts).await {
            Err(e) if e.is_unsupported() => self.adapter.send_message(&self.external_channel_id, text, opts).await,
            other => other,
        }
    }

    /// Not implemented → synthetic `ChannelInfo` (spec.md §4.2 fallback rule).
    pub async fn fetch_metadata(&self, opts: &OptsMap) -> Result<ChannelInfo> {
        match self.adapter.fetch_metadata(&self.external_channel_id, opts).await {
            Err(e) if e.is_unsupported() => Ok(ChannelInfo::synthetic(
                self.external_channel_id.to_string(),
                self.adapter.channel_type(),
            )),
            other => other,
        }
    }

    /// One page of channel-wide history (spec.md §4.7 `fetch_channel_messages`).
    pub async fn fetch_channel_messages(&self, opts: &FetchOptions) -> Result<MessagePage> {
        self.adapter.fetch_channel_messages(&self.external_channel_id, opts).await
    }

    /// Follows `next_cursor` until exhausted, deduplicating cursors seen
    /// (spec.md §4.7, mirroring `Thread::all_messages`).
    pub async fn all_channel_messages(&self, opts: FetchOptions) -> Result<Vec<Message>> {
        let mut out = Vec::new();
        let mut seen_cursors = HashSet::new();
        let mut next = opts;
        loop {
            let page = self.fetch_channel_messages(&next).await?;
            out.extend(page.messages);
            match page.next_cursor {
                Some(cursor) if !cursor.is_empty() && seen_cursors.insert(cursor.clone()) => {
                    next = FetchOptions::with_cursor(cursor);
                }
                _ => break,
            }
        }
        Ok(out)
    }

    /// One page of threads within this channel (spec.md §4.7 `list_threads`).
    pub async fn list_threads(&self, opts: &FetchOptions) -> Result<ThreadPage> {
        self.adapter.list_threads(&self.external_channel_id, opts).await
    }

    /// Lazily yields threads across pages, halting on an adapter error
    /// without propagating it (spec.md §4.7 `threads_stream`, mirroring
    /// `Thread::messages_stream`).
    pub fn threads_stream(&self, opts: FetchOptions) -> Pin<Box<dyn Stream<Item = crate::model::ThreadSummary> + Send>> {
        let adapter = self.adapter.clone();
        let external_channel_id = self.external_channel_id.clone();
        Box::pin(stream! {
            let mut seen_cursors = HashSet::new();
            let mut next = opts;
            loop {
                let page = match adapter.list_threads(&external_channel_id, &next).await {
                    Ok(page) => page,
                    Err(_) => break,
                };
                for thread in page.threads {
                    yield thread;
                }
                match page.next_cursor {
                    Some(cursor) if !cursor.is_empty() && seen_cursors.insert(cursor.clone()) => {
                        next = FetchOptions::with_cursor(cursor);
                    }
                    _ => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MockAdapter;
    use crate::model::ThreadSummary;

    fn channel(adapter: MockAdapter) -> ChannelRef {
        ChannelRef::new(Arc::new(adapter), "mock", ExternalId::from("chan1"))
    }

    #[test]
    fn id_formation() {
        let c = channel(MockAdapter::new("mock"));
        assert_eq!(c.id, "mock:chan1");
    }

    #[tokio::test]
    async fn post_falls_back_to_send_message() {
        let c = channel(MockAdapter::new("mock"));
        let opts = OptsMap::new();
        let response = c.post("hi", &opts).await.unwrap();
        assert_eq!(response.text.as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn fetch_metadata_falls_back_to_synthetic() {
        let c = channel(MockAdapter::new("mock"));
        let opts = OptsMap::new();
        let info = c.fetch_metadata(&opts).await.unwrap();
        assert_eq!(info.id, "chan1");
    }

    #[test]
    fn root_thread_has_no_sub_thread() {
        let c = channel(MockAdapter::new("mock"));
        let thread = c.root_thread();
        assert_eq!(thread.id, "mock:chan1");
        assert!(thread.external_thread_id.is_none());
    }

    #[tokio::test]
    async fn threads_stream_yields_summaries() {
        use futures::StreamExt;
        struct ListingAdapter;
        impl crate::adapter::Adapter for ListingAdapter {
            fn channel_type(&self) -> &str {
                "mock"
            }
            async fn transform_incoming(&self, raw: serde_json::Value) -> Result<crate::model::Incoming> {
                crate::model::Incoming::from_value(raw)
            }
            async fn send_message(&self, external_room_id: &ExternalId, text: &str, _opts: &OptsMap) -> Result<Response> {
                Ok(Response::from_value(serde_json::json!({"channel_id": external_room_id.as_str(), "text": text})))
            }
            async fn list_threads(&self, _external_channel_id: &ExternalId, _opts: &FetchOptions) -> Result<ThreadPage> {
                Ok(ThreadPage::new(
                    vec![ThreadSummary {
                        id: "mock:chan1:t1".to_string(),
                        channel_id: "mock:chan1".to_string(),
                        adapter_name: "mock".to_string(),
                        external_thread_id: Some(ExternalId::from("t1")),
                        metadata: Metadata::new(),
                    }],
                    None,
                ))
            }
        }
        let c = ChannelRef::new(Arc::new(ListingAdapter), "mock", ExternalId::from("chan1"));
        let threads: Vec<_> = c.threads_stream(FetchOptions::default()).collect().await;
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].id, "mock:chan1:t1");
    }
}

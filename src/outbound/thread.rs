//! `Thread` outbound handle (spec.md §3, §4.7 `Thread`).

use super::MentionTarget;
use crate::adapter::{wrappers, AdapterDyn, OptsMap};
use crate::error::Result;
use crate::model::{
    EphemeralMessage, ExternalId, FetchOptions, Message, MessagePage, Metadata, ModalResult,
    Postable, Response, SentMessage,
};
use crate::normalize;
use async_stream::stream;
use futures::Stream;
use serde_json::Value;
use std::collections::HashSet;
use std::pin::Pin;
use std::sync::Arc;

/// Anything [`Thread::post`] accepts: a string, a [`Postable`], a loose map
/// coercible to one, or an iterable of text chunks treated as a stream
/// (spec.md §4.7).
pub enum PostInput {
    Postable(Postable),
    Stream(Vec<String>),
}

impl From<String> for PostInput {
    fn from(value: String) -> Self {
        PostInput::Postable(Postable::Text(value))
    }
}

impl From<&str> for PostInput {
    fn from(value: &str) -> Self {
        PostInput::Postable(Postable::Text(value.to_string()))
    }
}

impl From<Postable> for PostInput {
    fn from(value: Postable) -> Self {
        PostInput::Postable(value)
    }
}

impl From<Vec<String>> for PostInput {
    fn from(chunks: Vec<String>) -> Self {
        PostInput::Stream(chunks)
    }
}

impl From<Value> for PostInput {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => {
                PostInput::Stream(items.into_iter().filter_map(|v| v.as_str().map(String::from)).collect())
            }
            other => PostInput::Postable(Postable::from(other)),
        }
    }
}

/// Addresses a room plus an optional sub-thread (spec.md §3 `Thread`).
#[derive(Clone)]
pub struct Thread {
    pub id: String,
    pub adapter_name: String,
    pub adapter: Arc<dyn AdapterDyn>,
    pub external_room_id: ExternalId,
    pub external_thread_id: Option<ExternalId>,
    pub channel_id: String,
    pub is_dm: bool,
    pub metadata: Metadata,
}

impl std::fmt::Debug for Thread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Thread")
            .field("id", &self.id)
            .field("adapter_name", &self.adapter_name)
            .field("is_dm", &self.is_dm)
            .finish_non_exhaustive()
    }
}

impl Thread {
    /// `id = "adapter:room[:thread]"`, `channel_id = "adapter:room"` (spec.md
    /// §3 invariant, §8 property 8).
    pub fn new(
        adapter: Arc<dyn AdapterDyn>,
        adapter_name: impl Into<String>,
        external_room_id: ExternalId,
        external_thread_id: Option<ExternalId>,
        is_dm: bool,
    ) -> Self {
        let adapter_name = adapter_name.into();
        let id = normalize::thread_id_from(&adapter_name, &external_room_id, external_thread_id.as_ref());
        let channel_id = format!("{adapter_name}:{external_room_id}");
        Self {
            id,
            adapter_name,
            adapter,
            external_room_id,
            external_thread_id,
            channel_id,
            is_dm,
            metadata: Metadata::new(),
        }
    }

    /// The synthetic `Thread` built when `fetch_thread` isn't implemented
    /// (spec.md §4.2 fallback rule).
    pub(crate) fn synthetic(
        adapter: Arc<dyn AdapterDyn>,
        adapter_name: &str,
        external_room_id: ExternalId,
        external_thread_id: Option<ExternalId>,
    ) -> Self {
        Self::new(adapter, adapter_name.to_string(), external_room_id, external_thread_id, false)
    }

    /// Injects `thread_id: external_thread_id` into `opts` when this thread
    /// has a sub-thread, idempotently — never overriding a caller-supplied
    /// value (spec.md §4.7).
    fn merged_opts(&self, mut opts: OptsMap) -> OptsMap {
        if let Some(thread_id) = &self.external_thread_id {
            opts.entry("thread_id".to_string())
                .or_insert_with(|| Value::String(thread_id.to_string()));
        }
        opts
    }

    pub async fn post(&self, input: impl Into<PostInput>, opts: OptsMap) -> Result<SentMessage> {
        let opts = self.merged_opts(opts);
        let (response, text) = match input.into() {
            PostInput::Postable(postable) => {
                let payload = postable.to_payload();
                let response = self
                    .adapter
                    .send_message(&self.external_room_id, &payload.text, &opts)
                    .await?;
                (response, payload.text)
            }
            PostInput::Stream(chunks) => {
                let response = match self.adapter.stream(&self.external_room_id, &chunks, &opts).await {
                    Err(e) if e.is_unsupported() => {
                        let text = chunks.concat();
                        self.adapter.send_message(&self.external_room_id, &text, &opts).await?
                    }
                    other => other?,
                };
                let text = chunks.concat();
                (response, text)
            }
        };

        let id = response
            .external_message_id
            .clone()
            .map(|id| id.to_string())
            .unwrap_or_else(crate::model::sent_message::new_id);

        Ok(SentMessage {
            id,
            thread_id: self.id.clone(),
            adapter_name: self.adapter_name.clone(),
            adapter: self.adapter.clone(),
            external_room_id: self.external_room_id.clone(),
            text,
            formatted: None,
            raw: response.raw.clone(),
            attachments: Vec::new(),
            metadata: Metadata::new(),
            response,
            default_opts: opts,
        })
    }

    pub async fn open_modal(&self, trigger_id: &str, view: Value, opts: &OptsMap) -> Result<ModalResult> {
        self.adapter.open_modal(trigger_id, view, opts).await
    }

    pub async fn start_typing(&self, opts: &OptsMap) -> Result<()> {
        self.adapter.start_typing(&self.external_room_id, opts).await
    }

    pub async fn post_ephemeral(
        &self,
        text: &str,
        user_id: &str,
        fallback_to_dm: bool,
        opts: &OptsMap,
    ) -> Result<EphemeralMessage> {
        match self
            .adapter
            .post_ephemeral(&self.external_room_id, text, user_id, opts)
            .await
        {
            Err(e) if e.is_unsupported() && fallback_to_dm => {
                let dm_room = self.adapter.open_dm(&ExternalId::from(user_id), opts).await?;
                self.adapter.send_message(&dm_room, text, opts).await?;
                Ok(EphemeralMessage::via_dm_fallback(text, user_id, &self.external_room_id))
            }
            other => other,
        }
    }

    /// One page of history (spec.md §4.7 `messages`).
    pub async fn messages(&self, opts: &FetchOptions) -> Result<MessagePage> {
        self.adapter.fetch_messages(&self.external_room_id, opts).await
    }

    /// Follows `next_cursor` until `None`/empty, deduplicating cursors seen
    /// to guard against adapter-side pagination cycles, and concatenates
    /// pages in order (spec.md §4.7 `all_messages`, §8 scenario S4).
    pub async fn all_messages(&self, opts: FetchOptions) -> Result<Vec<Message>> {
        let mut out = Vec::new();
        let mut seen_cursors = HashSet::new();
        let mut next = opts;
        loop {
            let page = self.messages(&next).await?;
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

    /// Lazily yields one `Message` at a time, fetching pages on demand;
    /// halts on `next_cursor = None` or an adapter error, without
    /// propagating the error — partial data already emitted remains
    /// observed by the consumer (spec.md §4.7 `messages_stream`).
    pub fn messages_stream(&self, opts: FetchOptions) -> Pin<Box<dyn Stream<Item = Message> + Send>> {
        let adapter = self.adapter.clone();
        let external_room_id = self.external_room_id.clone();
        Box::pin(stream! {
            let mut seen_cursors = HashSet::new();
            let mut next = opts;
            loop {
                let page = match adapter.fetch_messages(&external_room_id, &next).await {
                    Ok(page) => page,
                    Err(_) => break,
                };
                for message in page.messages {
                    yield message;
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

    /// `discord → "<@id>"`, `telegram → "@id"`, other → `"@id"` (spec.md §4.7,
    /// §6).
    pub fn mention_user(&self, user: impl Into<MentionTarget>) -> String {
        user.into().render(&self.adapter_name)
    }

    /// Calls `Adapter.fetch_thread`; the fallback wrapper substitutes a
    /// synthetic `Thread` when the adapter doesn't implement it (spec.md
    /// §4.7 `refresh`).
    pub async fn refresh(&self) -> Result<Thread> {
        let opts = OptsMap::new();
        wrappers::fetch_thread(
            self.adapter.clone(),
            &self.adapter_name,
            &self.external_room_id,
            self.external_thread_id.as_ref(),
            &opts,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MockAdapter;
    use crate::model::Message as ChatMessage;
    use futures::StreamExt;

    fn thread(adapter: MockAdapter) -> Thread {
        Thread::new(Arc::new(adapter), "mock", ExternalId::from("room1"), None, false)
    }

    #[test]
    fn id_and_channel_id_formation() {
        let t = thread(MockAdapter::new("mock"));
        assert_eq!(t.id, "mock:room1");
        assert_eq!(t.channel_id, "mock:room1");
    }

    #[test]
    fn sub_thread_formation() {
        let t = Thread::new(
            Arc::new(MockAdapter::new("mock")),
            "mock",
            ExternalId::from("room1"),
            Some(ExternalId::from("t1")),
            false,
        );
        assert_eq!(t.id, "mock:room1:t1");
        assert_eq!(t.channel_id, "mock:room1");
    }

    #[tokio::test]
    async fn post_text_sends_and_wraps_sent_message() {
        let t = thread(MockAdapter::new("mock"));
        let sent = t.post("hello", OptsMap::new()).await.unwrap();
        assert_eq!(sent.text, "hello");
        assert_eq!(sent.thread_id, "mock:room1");
    }

    #[tokio::test]
    async fn all_messages_concatenates_pages_and_stops_on_exhausted_cursor() {
        let page_a = MessagePage::new(
            vec![dummy_message("m10"), dummy_message("m11")],
            Some("c1".to_string()),
        );
        let page_b = MessagePage::new(vec![dummy_message("m12")], None);
        let mock = MockAdapter::new("mock").with_page(None, page_a).with_page(Some("c1"), page_b);
        let t = thread(mock);
        let messages = t.all_messages(FetchOptions::default()).await.unwrap();
        let ids: Vec<_> = messages.iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids, vec!["m10", "m11", "m12"]);
    }

    #[tokio::test]
    async fn messages_stream_yields_lazily_across_pages() {
        let page_a = MessagePage::new(
            vec![dummy_message("m10"), dummy_message("m11")],
            Some("c1".to_string()),
        );
        let page_b = MessagePage::new(vec![dummy_message("m12")], None);
        let mock = MockAdapter::new("mock").with_page(None, page_a).with_page(Some("c1"), page_b);
        let t = thread(mock);
        let messages: Vec<_> = t.messages_stream(FetchOptions::default()).collect().await;
        let ids: Vec<_> = messages.iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids, vec!["m10", "m11", "m12"]);
    }

    #[test]
    fn mention_user_renders_per_adapter() {
        let t = Thread::new(Arc::new(MockAdapter::new("discord")), "discord", ExternalId::from("room1"), None, false);
        assert_eq!(t.mention_user("42"), "<@42>");
        let t = Thread::new(Arc::new(MockAdapter::new("telegram")), "telegram", ExternalId::from("room1"), None, false);
        assert_eq!(t.mention_user("42"), "@42");
    }

    fn dummy_message(id: &str) -> ChatMessage {
        let incoming = crate::model::Incoming::from_value(serde_json::json!({
            "external_room_id": "room1",
            "external_message_id": id,
        }))
        .unwrap();
        ChatMessage::from_incoming(
            &incoming,
            crate::model::FromIncomingOpts {
                adapter_name: "mock",
                thread_id: None,
            },
        )
    }
}

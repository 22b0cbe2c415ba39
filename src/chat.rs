//! `Chat` root state and message dispatch (spec.md §3 `Chat`, §4.4 component C4).
//!
//! `Chat` is threaded functionally: every dispatch entry point consumes a
//! `Chat` by value and returns the (possibly updated) `Chat` alongside
//! whatever it processed. Handler callbacks follow the same shape — a
//! stateful handler takes the current `Chat` and must hand one back; a
//! stateless one only observes and the dispatcher keeps the `Chat` it
//! already had. This sidesteps spec.md §9's "handler arity variance" note
//! (2 vs 3 args for message handlers, 1 vs 2 for event handlers) with two
//! registration functions per handler class rather than runtime arity
//! introspection, which Rust has no reasonable way to do anyway.

use crate::adapter::Registry;
use crate::config::ChatConfig;
use crate::error::{Result, ValidationError};
use crate::model::{
    tag, tagged, sorted_string_seq, string_map, ActionEvent, AssistantContextChangedEvent,
    AssistantThreadStartedEvent, Incoming, Metadata, ModalCloseEvent, ModalSubmitEvent, Plain,
    ReactionEvent, Revive, SlashCommandEvent, ToPlain,
};
use crate::outbound::Thread;
use futures::future::BoxFuture;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;

/// A registered `on_mention`/`on_subscribed`/`on_message` callback.
///
/// `Stateless` handlers only observe; `Stateful` handlers take and return a
/// `Chat`, replacing the one threaded through the rest of dispatch (spec.md
/// §4.4: "the handler's return value ... replaces the chat passed to the
/// next handler").
#[derive(Clone)]
pub enum MessageHandler {
    Stateless(Arc<dyn Fn(Thread, Incoming) -> BoxFuture<'static, ()> + Send + Sync>),
    Stateful(Arc<dyn Fn(Chat, Thread, Incoming) -> BoxFuture<'static, Chat> + Send + Sync>),
}

impl MessageHandler {
    async fn invoke(&self, chat: Chat, thread: Thread, incoming: Incoming) -> Chat {
        match self {
            MessageHandler::Stateless(f) => {
                f(thread, incoming).await;
                chat
            }
            MessageHandler::Stateful(f) => f(chat, thread, incoming).await,
        }
    }
}

/// A `message`-class handler plus the compiled regex it's routed by,
/// compiled once at registration time rather than per dispatch (spec.md §9
/// "Regex compilation").
#[derive(Clone)]
struct RegexMessageHandler {
    regex: Regex,
    handler: MessageHandler,
}

/// A registered event-class callback (`reaction`, `action`, `modal_submit`,
/// `modal_close`, `slash_command`, `assistant_thread_started`,
/// `assistant_context_changed`). Generic over the event payload type so one
/// definition serves every class.
pub enum EventHandler<T> {
    Stateless(Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>),
    Stateful(Arc<dyn Fn(Chat, T) -> BoxFuture<'static, Chat> + Send + Sync>),
}

impl<T> Clone for EventHandler<T> {
    fn clone(&self) -> Self {
        match self {
            EventHandler::Stateless(f) => EventHandler::Stateless(Arc::clone(f)),
            EventHandler::Stateful(f) => EventHandler::Stateful(Arc::clone(f)),
        }
    }
}

impl<T> EventHandler<T> {
    async fn invoke(&self, chat: Chat, event: T) -> Chat {
        match self {
            EventHandler::Stateless(f) => {
                f(event).await;
                chat
            }
            EventHandler::Stateful(f) => f(chat, event).await,
        }
    }
}

/// Which state bucket `Chat::set_state` writes to (spec.md §3: "Thread/
/// Channel state is modified only via `set_state`").
pub enum StateTarget {
    Thread(String),
    Channel(String),
}

/// How `Chat::set_state` applies a value (spec.md §3 `set_state` modes
/// `:replace`, `:merge`, key-put).
pub enum StateMode {
    Replace(Metadata),
    Merge(Metadata),
    Put(String, Value),
}

/// Root conversational state (spec.md §3 `Chat`, component C8).
///
/// Cheaply cloneable: handler lists and the adapter registry are held
/// behind `Arc`, so threading `Chat` through a dispatch chain doesn't clone
/// the whole world on every handler invocation.
#[derive(Clone)]
pub struct Chat {
    pub id: String,
    pub user_name: Option<String>,
    pub adapters: Arc<Registry>,
    pub subscriptions: HashSet<String>,
    dedupe: HashSet<(String, String)>,
    dedupe_order: VecDeque<(String, String)>,
    mention_regex: Option<Regex>,
    mention_handlers: Vec<MessageHandler>,
    message_handlers: Vec<RegexMessageHandler>,
    subscribed_handlers: Vec<MessageHandler>,
    reaction_handlers: Vec<EventHandler<ReactionEvent>>,
    action_handlers: Vec<EventHandler<ActionEvent>>,
    modal_submit_handlers: Vec<EventHandler<ModalSubmitEvent>>,
    modal_close_handlers: Vec<EventHandler<ModalCloseEvent>>,
    slash_command_handlers: Vec<EventHandler<SlashCommandEvent>>,
    assistant_thread_started_handlers: Vec<EventHandler<AssistantThreadStartedEvent>>,
    assistant_context_changed_handlers: Vec<EventHandler<AssistantContextChangedEvent>>,
    pub thread_state: HashMap<String, Metadata>,
    pub channel_state: HashMap<String, Metadata>,
    pub metadata: Metadata,
    pub config: ChatConfig,
    /// Advisory only; spec.md §9 treats this as metadata the core never
    /// enforces, not a precondition dispatch checks.
    pub initialized: bool,
}

impl std::fmt::Debug for Chat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chat")
            .field("id", &self.id)
            .field("user_name", &self.user_name)
            .field("subscriptions", &self.subscriptions)
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

impl Chat {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_name: None,
            adapters: Arc::new(Registry::new()),
            subscriptions: HashSet::new(),
            dedupe: HashSet::new(),
            dedupe_order: VecDeque::new(),
            mention_regex: None,
            mention_handlers: Vec::new(),
            message_handlers: Vec::new(),
            subscribed_handlers: Vec::new(),
            reaction_handlers: Vec::new(),
            action_handlers: Vec::new(),
            modal_submit_handlers: Vec::new(),
            modal_close_handlers: Vec::new(),
            slash_command_handlers: Vec::new(),
            assistant_thread_started_handlers: Vec::new(),
            assistant_context_changed_handlers: Vec::new(),
            thread_state: HashMap::new(),
            channel_state: HashMap::new(),
            metadata: Metadata::new(),
            config: ChatConfig::default(),
            initialized: false,
        }
    }

    pub fn with_adapters(mut self, adapters: Arc<Registry>) -> Self {
        self.adapters = adapters;
        self
    }

    pub fn with_config(mut self, config: ChatConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the bot's own display name and (re)compiles the mention regex
    /// used by [`Chat::is_mentioned`]: `(?i)(^|\s)@<name>\b`, with the name
    /// regex-escaped so a user name containing metacharacters (`.`, `(`,
    /// etc.) can't widen the match — spec.md §9 flags the source's
    /// unescaped version as a bug this port doesn't reproduce.
    pub fn set_user_name(&mut self, user_name: impl Into<String>) {
        let user_name = user_name.into();
        let pattern = format!(r"(?i)(^|\s)@{}\b", regex::escape(&user_name));
        self.mention_regex = Regex::new(&pattern).ok();
        self.user_name = Some(user_name);
    }

    pub fn subscribe(&mut self, thread_id: impl Into<String>) {
        self.subscriptions.insert(thread_id.into());
    }

    pub fn unsubscribe(&mut self, thread_id: &str) {
        self.subscriptions.remove(thread_id);
    }

    pub fn get_thread_state(&self, thread_id: &str) -> Option<&Metadata> {
        self.thread_state.get(thread_id)
    }

    pub fn get_channel_state(&self, channel_id: &str) -> Option<&Metadata> {
        self.channel_state.get(channel_id)
    }

    /// The only way thread/channel state is mutated (spec.md §3 `set_state`).
    pub fn set_state(&mut self, target: StateTarget, mode: StateMode) {
        let map = match target {
            StateTarget::Thread(id) => self.thread_state.entry(id).or_default(),
            StateTarget::Channel(id) => self.channel_state.entry(id).or_default(),
        };
        match mode {
            StateMode::Replace(value) => *map = value,
            StateMode::Merge(partial) => map.extend(partial),
            StateMode::Put(key, value) => {
                map.insert(key, value);
            }
        }
    }

    // -- registration -----------------------------------------------------
    //
    // Every registration function appends to the end of its handler list,
    // so registration order is dispatch order (spec.md §4.8).

    pub fn on_mention<F, Fut>(&mut self, f: F)
    where
        F: Fn(Thread, Incoming) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.mention_handlers.push(MessageHandler::Stateless(Arc::new(move |thread, incoming| {
            Box::pin(f(thread, incoming)) as BoxFuture<'static, ()>
        })));
    }

    pub fn on_mention_with_chat<F, Fut>(&mut self, f: F)
    where
        F: Fn(Chat, Thread, Incoming) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Chat> + Send + 'static,
    {
        self.mention_handlers.push(MessageHandler::Stateful(Arc::new(move |chat, thread, incoming| {
            Box::pin(f(chat, thread, incoming)) as BoxFuture<'static, Chat>
        })));
    }

    pub fn on_subscribed<F, Fut>(&mut self, f: F)
    where
        F: Fn(Thread, Incoming) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.subscribed_handlers.push(MessageHandler::Stateless(Arc::new(move |thread, incoming| {
            Box::pin(f(thread, incoming)) as BoxFuture<'static, ()>
        })));
    }

    pub fn on_subscribed_with_chat<F, Fut>(&mut self, f: F)
    where
        F: Fn(Chat, Thread, Incoming) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Chat> + Send + 'static,
    {
        self.subscribed_handlers.push(MessageHandler::Stateful(Arc::new(move |chat, thread, incoming| {
            Box::pin(f(chat, thread, incoming)) as BoxFuture<'static, Chat>
        })));
    }

    /// Registers a handler routed by a case-sensitive-by-default regex
    /// against `incoming.text_or_empty()`; `pattern` is compiled once here
    /// and cached on the handler entry (spec.md §9 "Regex compilation").
    pub fn on_message<F, Fut>(&mut self, pattern: &str, f: F) -> Result<()>
    where
        F: Fn(Thread, Incoming) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let regex = compile_handler_pattern(pattern)?;
        self.message_handlers.push(RegexMessageHandler {
            regex,
            handler: MessageHandler::Stateless(Arc::new(move |thread, incoming| {
                Box::pin(f(thread, incoming)) as BoxFuture<'static, ()>
            })),
        });
        Ok(())
    }

    pub fn on_message_with_chat<F, Fut>(&mut self, pattern: &str, f: F) -> Result<()>
    where
        F: Fn(Chat, Thread, Incoming) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Chat> + Send + 'static,
    {
        let regex = compile_handler_pattern(pattern)?;
        self.message_handlers.push(RegexMessageHandler {
            regex,
            handler: MessageHandler::Stateful(Arc::new(move |chat, thread, incoming| {
                Box::pin(f(chat, thread, incoming)) as BoxFuture<'static, Chat>
            })),
        });
        Ok(())
    }

    pub fn on_reaction<F, Fut>(&mut self, f: F)
    where
        F: Fn(ReactionEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.reaction_handlers.push(EventHandler::Stateless(Arc::new(move |event| Box::pin(f(event)) as BoxFuture<'static, ()>)));
    }

    pub fn on_reaction_with_chat<F, Fut>(&mut self, f: F)
    where
        F: Fn(Chat, ReactionEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Chat> + Send + 'static,
    {
        self.reaction_handlers
            .push(EventHandler::Stateful(Arc::new(move |chat, event| Box::pin(f(chat, event)) as BoxFuture<'static, Chat>)));
    }

    pub fn on_action<F, Fut>(&mut self, f: F)
    where
        F: Fn(ActionEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.action_handlers.push(EventHandler::Stateless(Arc::new(move |event| Box::pin(f(event)) as BoxFuture<'static, ()>)));
    }

    pub fn on_action_with_chat<F, Fut>(&mut self, f: F)
    where
        F: Fn(Chat, ActionEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Chat> + Send + 'static,
    {
        self.action_handlers
            .push(EventHandler::Stateful(Arc::new(move |chat, event| Box::pin(f(chat, event)) as BoxFuture<'static, Chat>)));
    }

    pub fn on_modal_submit<F, Fut>(&mut self, f: F)
    where
        F: Fn(ModalSubmitEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.modal_submit_handlers.push(EventHandler::Stateless(Arc::new(move |event| Box::pin(f(event)) as BoxFuture<'static, ()>)));
    }

    pub fn on_modal_submit_with_chat<F, Fut>(&mut self, f: F)
    where
        F: Fn(Chat, ModalSubmitEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Chat> + Send + 'static,
    {
        self.modal_submit_handlers
            .push(EventHandler::Stateful(Arc::new(move |chat, event| Box::pin(f(chat, event)) as BoxFuture<'static, Chat>)));
    }

    pub fn on_modal_close<F, Fut>(&mut self, f: F)
    where
        F: Fn(ModalCloseEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.modal_close_handlers.push(EventHandler::Stateless(Arc::new(move |event| Box::pin(f(event)) as BoxFuture<'static, ()>)));
    }

    pub fn on_modal_close_with_chat<F, Fut>(&mut self, f: F)
    where
        F: Fn(Chat, ModalCloseEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Chat> + Send + 'static,
    {
        self.modal_close_handlers
            .push(EventHandler::Stateful(Arc::new(move |chat, event| Box::pin(f(chat, event)) as BoxFuture<'static, Chat>)));
    }

    pub fn on_slash_command<F, Fut>(&mut self, f: F)
    where
        F: Fn(SlashCommandEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.slash_command_handlers.push(EventHandler::Stateless(Arc::new(move |event| Box::pin(f(event)) as BoxFuture<'static, ()>)));
    }

    pub fn on_slash_command_with_chat<F, Fut>(&mut self, f: F)
    where
        F: Fn(Chat, SlashCommandEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Chat> + Send + 'static,
    {
        self.slash_command_handlers
            .push(EventHandler::Stateful(Arc::new(move |chat, event| Box::pin(f(chat, event)) as BoxFuture<'static, Chat>)));
    }

    pub fn on_assistant_thread_started<F, Fut>(&mut self, f: F)
    where
        F: Fn(AssistantThreadStartedEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.assistant_thread_started_handlers
            .push(EventHandler::Stateless(Arc::new(move |event| Box::pin(f(event)) as BoxFuture<'static, ()>)));
    }

    pub fn on_assistant_thread_started_with_chat<F, Fut>(&mut self, f: F)
    where
        F: Fn(Chat, AssistantThreadStartedEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Chat> + Send + 'static,
    {
        self.assistant_thread_started_handlers
            .push(EventHandler::Stateful(Arc::new(move |chat, event| Box::pin(f(chat, event)) as BoxFuture<'static, Chat>)));
    }

    pub fn on_assistant_context_changed<F, Fut>(&mut self, f: F)
    where
        F: Fn(AssistantContextChangedEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.assistant_context_changed_handlers
            .push(EventHandler::Stateless(Arc::new(move |event| Box::pin(f(event)) as BoxFuture<'static, ()>)));
    }

    pub fn on_assistant_context_changed_with_chat<F, Fut>(&mut self, f: F)
    where
        F: Fn(Chat, AssistantContextChangedEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Chat> + Send + 'static,
    {
        self.assistant_context_changed_handlers
            .push(EventHandler::Stateful(Arc::new(move |chat, event| Box::pin(f(chat, event)) as BoxFuture<'static, Chat>)));
    }

    // -- dispatch -----------------------------------------------------------

    fn dedupe_key(adapter_name: &str, incoming: &Incoming) -> Option<(String, String)> {
        incoming
            .external_message_id
            .as_ref()
            .map(|id| (adapter_name.to_string(), id.to_string()))
    }

    /// Records a dedupe key and evicts from the front of `dedupe_order`
    /// until it's back within `config.dedupe_limit`, removing the evicted
    /// key from `dedupe` too so the two never disagree on membership
    /// (spec.md §4.4 FIFO eviction, §8 scenario S3).
    fn remember_dedupe(&mut self, key: (String, String)) {
        self.dedupe.insert(key.clone());
        self.dedupe_order.push_back(key);
        while self.dedupe_order.len() > self.config.dedupe_limit {
            if let Some((adapter_name, external_message_id)) = self.dedupe_order.pop_front() {
                self.dedupe.remove(&(adapter_name.clone(), external_message_id.clone()));
                tracing::debug!(adapter_name, external_message_id, limit = self.config.dedupe_limit, "dedupe entry evicted");
            }
        }
    }

    fn is_mentioned(&self, incoming: &Incoming) -> bool {
        if incoming.was_mentioned {
            return true;
        }
        self.mention_regex.as_ref().is_some_and(|re| re.is_match(incoming.text_or_empty()))
    }

    /// Normalizes dedup state, resolves the addressed adapter, builds the
    /// `Thread` the event arrived on, and routes to the right handler class
    /// (spec.md §4.4 component C4, §4.5 message branch of component C5).
    ///
    /// A replayed `external_message_id` already seen is idempotent: the
    /// `Chat` and `Incoming` come back unchanged, with no handler invoked
    /// (spec.md §4.4, §8 property/scenario S3). Events with no
    /// `external_message_id` skip dedup entirely and always dispatch.
    pub async fn process_message(mut self, adapter_name: &str, incoming: Incoming) -> (Chat, Incoming) {
        if let Some(key) = Self::dedupe_key(adapter_name, &incoming) {
            if self.dedupe.contains(&key) {
                tracing::debug!(adapter_name, external_message_id = %key.1, "duplicate message replay ignored");
                return (self, incoming);
            }
            self.remember_dedupe(key);
        }

        let adapter = self.adapters.resolve_or_placeholder(adapter_name);
        let thread = Thread::new(
            adapter,
            adapter_name.to_string(),
            incoming.external_room_id.clone(),
            incoming.external_thread_id.clone(),
            incoming.chat_type.as_deref() == Some("direct"),
        );

        let chat = self.route_message(thread, incoming.clone()).await;
        (chat, incoming)
    }

    /// Routing priority is mutually exclusive: `subscribed` beats `mention`
    /// beats `message`-regex — exactly one class fires per message (spec.md
    /// §4.4, §5 concurrency model, §8 scenarios S1/S2).
    async fn route_message(mut self, thread: Thread, incoming: Incoming) -> Chat {
        if self.subscriptions.contains(&thread.id) {
            tracing::debug!(thread_id = %thread.id, handlers = self.subscribed_handlers.len(), "routed to subscribed handlers");
            let handlers = self.subscribed_handlers.clone();
            for handler in &handlers {
                self = handler.invoke(self, thread.clone(), incoming.clone()).await;
            }
        } else if self.is_mentioned(&incoming) {
            tracing::debug!(thread_id = %thread.id, handlers = self.mention_handlers.len(), "routed to mention handlers");
            let handlers = self.mention_handlers.clone();
            for handler in &handlers {
                self = handler.invoke(self, thread.clone(), incoming.clone()).await;
            }
        } else {
            let text = incoming.text_or_empty().to_string();
            let handlers = self.message_handlers.clone();
            let matched = handlers.iter().filter(|entry| entry.regex.is_match(&text)).count();
            tracing::debug!(thread_id = %thread.id, matched, "routed to message-regex handlers");
            for entry in &handlers {
                if entry.regex.is_match(&text) {
                    self = entry.handler.invoke(self, thread.clone(), incoming.clone()).await;
                }
            }
        }
        self
    }

    pub async fn dispatch_reaction(mut self, event: ReactionEvent) -> (Chat, ReactionEvent) {
        let handlers = self.reaction_handlers.clone();
        for handler in &handlers {
            self = handler.invoke(self, event.clone()).await;
        }
        (self, event)
    }

    pub async fn dispatch_action(mut self, event: ActionEvent) -> (Chat, ActionEvent) {
        let handlers = self.action_handlers.clone();
        for handler in &handlers {
            self = handler.invoke(self, event.clone()).await;
        }
        (self, event)
    }

    pub async fn dispatch_modal_submit(mut self, event: ModalSubmitEvent) -> (Chat, ModalSubmitEvent) {
        let handlers = self.modal_submit_handlers.clone();
        for handler in &handlers {
            self = handler.invoke(self, event.clone()).await;
        }
        (self, event)
    }

    pub async fn dispatch_modal_close(mut self, event: ModalCloseEvent) -> (Chat, ModalCloseEvent) {
        let handlers = self.modal_close_handlers.clone();
        for handler in &handlers {
            self = handler.invoke(self, event.clone()).await;
        }
        (self, event)
    }

    pub async fn dispatch_slash_command(mut self, event: SlashCommandEvent) -> (Chat, SlashCommandEvent) {
        let handlers = self.slash_command_handlers.clone();
        for handler in &handlers {
            self = handler.invoke(self, event.clone()).await;
        }
        (self, event)
    }

    pub async fn dispatch_assistant_thread_started(
        mut self,
        event: AssistantThreadStartedEvent,
    ) -> (Chat, AssistantThreadStartedEvent) {
        let handlers = self.assistant_thread_started_handlers.clone();
        for handler in &handlers {
            self = handler.invoke(self, event.clone()).await;
        }
        (self, event)
    }

    pub async fn dispatch_assistant_context_changed(
        mut self,
        event: AssistantContextChangedEvent,
    ) -> (Chat, AssistantContextChangedEvent) {
        let handlers = self.assistant_context_changed_handlers.clone();
        for handler in &handlers {
            self = handler.invoke(self, event.clone()).await;
        }
        (self, event)
    }

    fn handler_counts(&self) -> Map<String, Value> {
        let mut counts = Map::new();
        counts.insert("mention".to_string(), Value::from(self.mention_handlers.len()));
        counts.insert("message".to_string(), Value::from(self.message_handlers.len()));
        counts.insert("subscribed".to_string(), Value::from(self.subscribed_handlers.len()));
        counts.insert("reaction".to_string(), Value::from(self.reaction_handlers.len()));
        counts.insert("action".to_string(), Value::from(self.action_handlers.len()));
        counts.insert("modal_submit".to_string(), Value::from(self.modal_submit_handlers.len()));
        counts.insert("modal_close".to_string(), Value::from(self.modal_close_handlers.len()));
        counts.insert("slash_command".to_string(), Value::from(self.slash_command_handlers.len()));
        counts.insert(
            "assistant_thread_started".to_string(),
            Value::from(self.assistant_thread_started_handlers.len()),
        );
        counts.insert(
            "assistant_context_changed".to_string(),
            Value::from(self.assistant_context_changed_handlers.len()),
        );
        counts
    }
}

fn compile_handler_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| {
        ValidationError::single("message_handler", Value::String(pattern.to_string()), "pattern", e.to_string()).into()
    })
}

fn state_map_to_value(map: &HashMap<String, Metadata>) -> Value {
    Value::Object(map.iter().map(|(k, v)| (k.clone(), Value::Object(v.clone().into_iter().collect()))).collect())
}

fn state_map_from_value(value: Option<&Value>) -> HashMap<String, Metadata> {
    value
        .and_then(Value::as_object)
        .map(|obj| obj.iter().map(|(k, v)| (k.clone(), string_map(Some(v)))).collect())
        .unwrap_or_default()
}

impl ToPlain for Chat {
    /// Adapters and handler closures are never serialized — only their
    /// counts, under `handlers.serializable = false` (spec.md §4.8: "the
    /// handlers block encodes as `{serializable: false, counts: {...}}`").
    /// The dedupe set isn't snapshotted separately from `dedupe_order`: spec
    /// §9 notes the two must agree on membership, so only the ordered form
    /// is plain-encoded and `revive` rebuilds the set from it.
    fn to_plain(&self) -> Plain {
        tagged(
            tag::CHAT,
            [
                ("id", Value::String(self.id.clone())),
                ("user_name", self.user_name.clone().map(Value::String).unwrap_or(Value::Null)),
                ("subscriptions", sorted_string_seq(self.subscriptions.iter().cloned())),
                (
                    "dedupe_order",
                    Value::Array(
                        self.dedupe_order
                            .iter()
                            .map(|(adapter, id)| Value::Array(vec![Value::String(adapter.clone()), Value::String(id.clone())]))
                            .collect(),
                    ),
                ),
                ("thread_state", state_map_to_value(&self.thread_state)),
                ("channel_state", state_map_to_value(&self.channel_state)),
                ("metadata", Value::Object(self.metadata.clone().into_iter().collect())),
                (
                    "config",
                    Value::Object(Map::from_iter([
                        ("dedupe_limit".to_string(), Value::from(self.config.dedupe_limit)),
                        ("adapter_opts".to_string(), Value::Object(self.config.adapter_opts.clone().into_iter().collect())),
                    ])),
                ),
                ("initialized", Value::Bool(self.initialized)),
                (
                    "handlers",
                    Value::Object(Map::from_iter([
                        ("serializable".to_string(), Value::Bool(false)),
                        ("counts".to_string(), Value::Object(self.handler_counts())),
                    ])),
                ),
            ],
        )
    }
}

impl Revive for Chat {
    /// Restores everything except adapters and handlers: both are dropped
    /// on revival and callers must re-register them (spec.md §4.8
    /// "deserialization restores an empty handler table; callers must
    /// re-register handlers after revival" — the same applies here to the
    /// adapter registry, for the same reason: trait objects aren't plain
    /// data).
    fn revive(plain: &Plain) -> Result<Self> {
        let obj = plain
            .as_object()
            .ok_or_else(|| ValidationError::single("Chat", plain.clone(), "$", "expected an object"))?;

        let id = obj.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
        let mut chat = Chat::new(id);

        if let Some(user_name) = obj.get("user_name").and_then(|v| v.as_str()) {
            chat.set_user_name(user_name.to_string());
        }

        chat.subscriptions = obj
            .get("subscriptions")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default();

        if let Some(items) = obj.get("dedupe_order").and_then(Value::as_array) {
            for item in items {
                let Some(pair) = item.as_array() else { continue };
                let adapter_name = pair.first().and_then(|v| v.as_str());
                let message_id = pair.get(1).and_then(|v| v.as_str());
                if let (Some(adapter_name), Some(message_id)) = (adapter_name, message_id) {
                    let key = (adapter_name.to_string(), message_id.to_string());
                    chat.dedupe.insert(key.clone());
                    chat.dedupe_order.push_back(key);
                }
            }
        }

        chat.thread_state = state_map_from_value(obj.get("thread_state"));
        chat.channel_state = state_map_from_value(obj.get("channel_state"));
        chat.metadata = string_map(obj.get("metadata"));

        let config_obj = obj.get("config");
        chat.config.dedupe_limit = config_obj
            .and_then(|c| c.get("dedupe_limit"))
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(crate::config::DEFAULT_DEDUPE_LIMIT);
        chat.config.adapter_opts = config_obj
            .and_then(|c| c.get("adapter_opts"))
            .and_then(Value::as_object)
            .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        chat.initialized = obj.get("initialized").and_then(Value::as_bool).unwrap_or(false);

        Ok(chat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MockAdapter;
    use std::sync::Mutex;

    fn incoming(room: &str, text: &str, was_mentioned: bool) -> Incoming {
        Incoming::from_value(serde_json::json!({
            "external_room_id": room,
            "text": text,
            "was_mentioned": was_mentioned,
        }))
        .unwrap()
    }

    fn incoming_with_id(id: &str) -> Incoming {
        Incoming::from_value(serde_json::json!({
            "external_room_id": "room1",
            "external_message_id": id,
            "text": "hi",
        }))
        .unwrap()
    }

    fn chat_with_mock() -> Chat {
        let chat = Chat::new("c1");
        chat.adapters.register(Arc::new(MockAdapter::new("mock")));
        chat
    }

    #[tokio::test]
    async fn mention_routes_to_mention_handlers_only() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut chat = chat_with_mock();
        chat.set_user_name("jido");

        let recorded = seen.clone();
        chat.on_mention(move |_thread, incoming| {
            let recorded = recorded.clone();
            async move {
                recorded.lock().unwrap().push(incoming.text_or_empty().to_string());
            }
        });
        chat.on_message(r"(?i)^ping", move |_thread, _incoming| async move {
            panic!("message handler must not fire when mentioned");
        })
        .unwrap();

        let (_chat, _incoming) = chat.process_message("mock", incoming("room1", "hey @jido ping", false)).await;
        assert_eq!(*seen.lock().unwrap(), vec!["hey @jido ping"]);
    }

    #[tokio::test]
    async fn was_mentioned_flag_routes_as_mention_even_without_text_match() {
        let seen = Arc::new(Mutex::new(0u32));
        let mut chat = chat_with_mock();
        chat.set_user_name("jido");
        let recorded = seen.clone();
        chat.on_mention(move |_thread, _incoming| {
            let recorded = recorded.clone();
            async move {
                *recorded.lock().unwrap() += 1;
            }
        });

        let (_chat, _incoming) = chat.process_message("mock", incoming("room1", "no name here", true)).await;
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn mention_name_is_escaped_against_regex_metacharacters() {
        let seen = Arc::new(Mutex::new(0u32));
        let mut chat = chat_with_mock();
        chat.set_user_name("a.b");
        let recorded = seen.clone();
        chat.on_mention(move |_thread, _incoming| {
            let recorded = recorded.clone();
            async move {
                *recorded.lock().unwrap() += 1;
            }
        });

        let (chat, _) = chat.process_message("mock", incoming("room1", "hey @axb", false)).await;
        assert_eq!(*seen.lock().unwrap(), 0, "'.' must not match an arbitrary character");

        let (_chat, _) = chat.process_message("mock", incoming("room1", "hey @a.b", false)).await;
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn message_regex_routes_when_not_mentioned_or_subscribed() {
        let seen = Arc::new(Mutex::new(0u32));
        let mut chat = chat_with_mock();
        let recorded = seen.clone();
        chat.on_message(r"(?i)^ping", move |_thread, _incoming| {
            let recorded = recorded.clone();
            async move {
                *recorded.lock().unwrap() += 1;
            }
        })
        .unwrap();

        let (_chat, _incoming) = chat.process_message("mock", incoming("room1", "ping", false)).await;
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn subscribed_threads_take_priority_over_mention_and_message() {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let mut chat = chat_with_mock();
        chat.set_user_name("jido");
        chat.subscribe("mock:room1");

        let recorded = fired.clone();
        chat.on_subscribed(move |_thread, _incoming| {
            let recorded = recorded.clone();
            async move {
                recorded.lock().unwrap().push("subscribed");
            }
        });
        chat.on_mention(move |_thread, _incoming| async move {
            panic!("mention handler must not fire for a subscribed thread");
        });

        let (_chat, _incoming) = chat.process_message("mock", incoming("room1", "hey @jido", false)).await;
        assert_eq!(*fired.lock().unwrap(), vec!["subscribed"]);
    }

    #[tokio::test]
    async fn dedupe_evicts_oldest_past_limit_and_replay_refires_after_eviction() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut chat = chat_with_mock();
        chat.config.dedupe_limit = 2;
        let recorded = seen.clone();
        chat.on_message(r".*", move |_thread, incoming| {
            let recorded = recorded.clone();
            let id = incoming.external_message_id.as_ref().map(ToString::to_string);
            async move {
                if let Some(id) = id {
                    recorded.lock().unwrap().push(id);
                }
            }
        })
        .unwrap();

        let (chat, _) = chat.process_message("mock", incoming_with_id("m1")).await;
        let (chat, _) = chat.process_message("mock", incoming_with_id("m2")).await;
        let (chat, _) = chat.process_message("mock", incoming_with_id("m3")).await;

        let order: Vec<_> = chat.dedupe_order.iter().map(|(_, id)| id.clone()).collect();
        assert_eq!(order, vec!["m2", "m3"]);
        assert_eq!(chat.dedupe.len(), 2);

        // m1 was evicted, so replaying it re-fires instead of being swallowed.
        let (_chat, _) = chat.process_message("mock", incoming_with_id("m1")).await;
        assert_eq!(*seen.lock().unwrap(), vec!["m1", "m2", "m3", "m1"]);
    }

    #[tokio::test]
    async fn replay_of_a_retained_dedupe_key_is_idempotent() {
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

        let (chat, _) = chat.process_message("mock", incoming_with_id("m1")).await;
        let (_chat, _) = chat.process_message("mock", incoming_with_id("m1")).await;
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn to_plain_encodes_handlers_as_unserializable_counts() {
        let mut chat = Chat::new("c1");
        chat.on_mention(|_thread, _incoming| async move {});
        let plain = chat.to_plain();
        let handlers = plain.get("handlers").unwrap();
        assert_eq!(handlers.get("serializable").unwrap(), false);
        assert_eq!(handlers.get("counts").unwrap().get("mention").unwrap(), 1);
    }

    #[test]
    fn revive_restores_dedupe_set_and_order_in_agreement() {
        let mut chat = Chat::new("c1");
        chat.config.dedupe_limit = 10;
        chat.dedupe.insert(("mock".to_string(), "m1".to_string()));
        chat.dedupe_order.push_back(("mock".to_string(), "m1".to_string()));
        chat.subscribe("mock:room1");
        chat.metadata.insert("note".to_string(), Value::String("hi".to_string()));

        let plain = chat.to_plain();
        let revived = Chat::revive(&plain).unwrap();
        assert_eq!(revived.dedupe.len(), revived.dedupe_order.len());
        assert!(revived.subscriptions.contains("mock:room1"));
        assert_eq!(revived.metadata.get("note").unwrap(), "hi");
    }
}

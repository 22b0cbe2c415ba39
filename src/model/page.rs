//! Paginated history shapes (spec.md §3 `MessagePage`/`ThreadPage`/`ThreadSummary`).

use super::{ExternalId, Message, Metadata};

/// One page of a thread's or channel's message history.
#[derive(Debug, Clone)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub next_cursor: Option<String>,
}

impl MessagePage {
    pub fn new(messages: Vec<Message>, next_cursor: Option<String>) -> Self {
        Self {
            messages,
            next_cursor,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), None)
    }
}

/// Summary of a thread, as returned by an adapter's `list_threads`.
#[derive(Debug, Clone)]
pub struct ThreadSummary {
    pub id: String,
    pub channel_id: String,
    pub adapter_name: String,
    pub external_thread_id: Option<ExternalId>,
    pub metadata: Metadata,
}

/// One page of threads within a channel.
#[derive(Debug, Clone)]
pub struct ThreadPage {
    pub threads: Vec<ThreadSummary>,
    pub next_cursor: Option<String>,
}

impl ThreadPage {
    pub fn new(threads: Vec<ThreadSummary>, next_cursor: Option<String>) -> Self {
        Self {
            threads,
            next_cursor,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), None)
    }
}

//! Outbound facade (spec.md §4.7 — component C7).
//!
//! `Thread` addresses a room plus optional sub-thread; [`ChannelRef`]
//! addresses a room as a whole. Both are thin handles over an
//! `Arc<dyn AdapterDyn>` — all the actual work happens inside the adapter,
//! through the fallback-aware wrapper functions in
//! [`crate::adapter::wrappers`].

mod channel;
mod mention;
mod thread;

pub use channel::ChannelRef;
pub use mention::MentionTarget;
pub use thread::{PostInput, Thread};

//! chatcore: a transport-agnostic event router and outbound facade for
//! multi-platform chat bots (spec.md §1 Overview).
//!
//! A platform integration implements [`adapter::Adapter`] once; everything
//! else — normalization, dedup, mention/regex/subscription routing, event
//! dispatch, the webhook pipeline, and the outbound [`outbound::Thread`]/
//! [`outbound::ChannelRef`] handles — is shared across every adapter.

pub mod adapter;
pub mod chat;
pub mod config;
pub mod error;
pub mod model;
pub mod normalize;
pub mod outbound;
pub mod router;
pub mod webhook;

pub use adapter::{Adapter, AdapterDyn, Registry};
pub use chat::Chat;
pub use config::ChatConfig;
pub use error::{Error, Result};
pub use model::{Incoming, Plain, Revive, ToPlain};
pub use outbound::{ChannelRef, Thread};

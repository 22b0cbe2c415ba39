//! Normalized value model (spec.md §3, §4.1 — component C1).
//!
//! Every type here is constructed through a schema-validating factory (a
//! `from_value`/`new` associated function that returns
//! [`Result<T>`](crate::error::Result)) rather than a bare struct literal
//! exposed to callers crossing an adapter boundary, matching spec.md's
//! "values are constructed via a schema-validating factory that raises on
//! invariant violation." Internal code that already holds validated data
//! (e.g. the dispatcher threading an already-normalized `Incoming` into a
//! `Message`) builds struct literals directly.

mod author;
mod capability;
mod channel_info;
mod channel_meta;
mod envelope;
mod ids;
mod incoming;
mod media;
mod mention;
mod message;
mod page;
mod plain;
mod postable;
mod response;
pub mod sent_message;
mod target;
mod webhook;

pub use author::{mention_id, Author};
pub use capability::{Capability, CapabilityMatrix, CapabilityStatus};
pub use channel_info::ChannelInfo;
pub use channel_meta::ChannelMeta;
pub use envelope::{
    ActionEvent, AssistantContextChangedEvent, AssistantThreadStartedEvent, EventEnvelope,
    EventPayload, EventType, ModalCloseEvent, ModalSubmitEvent, ReactionEvent, SlashCommandEvent,
};
pub use ids::ExternalId;
pub use incoming::Incoming;
pub use media::{Media, MediaKind};
pub use mention::Mention;
pub use message::{FromIncomingOpts, Message};
pub use page::{MessagePage, ThreadPage, ThreadSummary};
pub use plain::{sorted_string_seq, string_map, tag, tagged, Plain, Revive, ToPlain};
pub use postable::{PostPayload, Postable};
pub use response::{MessageStatus, Response};
pub use sent_message::{EphemeralMessage, ModalResult, SentMessage};
pub use target::{MessagingTarget, ReplyMode, TargetKind};
pub use webhook::{FetchOptions, WebhookRequest, WebhookResponse};

use std::collections::HashMap;

/// Common shape for the free-form `metadata` maps carried by nearly every
/// canonical struct (spec.md §3: "`metadata`: arbitrary map").
pub type Metadata = HashMap<String, serde_json::Value>;

//! Per-adapter capability declaration (spec.md §3, §4.2 `CapabilityMatrix`).

use super::plain::{tag, tagged, Plain, Revive, ToPlain};
use crate::error::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Every operation an adapter may optionally support (spec.md §4.2's
/// "Optional" list). `capabilities()` declares a status for each; the core
/// never assumes exhaustive support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Initialize,
    Shutdown,
    EditMessage,
    DeleteMessage,
    StartTyping,
    FetchMetadata,
    FetchThread,
    FetchMessage,
    AddReaction,
    RemoveReaction,
    PostEphemeral,
    PostChannelMessage,
    Stream,
    OpenModal,
    FetchMessages,
    FetchChannelMessages,
    ListThreads,
    OpenDm,
    HandleWebhook,
    VerifyWebhook,
    ParseEvent,
    FormatWebhookResponse,
    ListenerChildSpecs,
}

impl Capability {
    pub const ALL: [Capability; 23] = [
        Capability::Initialize,
        Capability::Shutdown,
        Capability::EditMessage,
        Capability::DeleteMessage,
        Capability::StartTyping,
        Capability::FetchMetadata,
        Capability::FetchThread,
        Capability::FetchMessage,
        Capability::AddReaction,
        Capability::RemoveReaction,
        Capability::PostEphemeral,
        Capability::PostChannelMessage,
        Capability::Stream,
        Capability::OpenModal,
        Capability::FetchMessages,
        Capability::FetchChannelMessages,
        Capability::ListThreads,
        Capability::OpenDm,
        Capability::HandleWebhook,
        Capability::VerifyWebhook,
        Capability::ParseEvent,
        Capability::FormatWebhookResponse,
        Capability::ListenerChildSpecs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Initialize => "initialize",
            Capability::Shutdown => "shutdown",
            Capability::EditMessage => "edit_message",
            Capability::DeleteMessage => "delete_message",
            Capability::StartTyping => "start_typing",
            Capability::FetchMetadata => "fetch_metadata",
            Capability::FetchThread => "fetch_thread",
            Capability::FetchMessage => "fetch_message",
            Capability::AddReaction => "add_reaction",
            Capability::RemoveReaction => "remove_reaction",
            Capability::PostEphemeral => "post_ephemeral",
            Capability::PostChannelMessage => "post_channel_message",
            Capability::Stream => "stream",
            Capability::OpenModal => "open_modal",
            Capability::FetchMessages => "fetch_messages",
            Capability::FetchChannelMessages => "fetch_channel_messages",
            Capability::ListThreads => "list_threads",
            Capability::OpenDm => "open_dm",
            Capability::HandleWebhook => "handle_webhook",
            Capability::VerifyWebhook => "verify_webhook",
            Capability::ParseEvent => "parse_event",
            Capability::FormatWebhookResponse => "format_webhook_response",
            Capability::ListenerChildSpecs => "listener_child_specs",
        }
    }

    /// The default status synthesized by reflection when an adapter doesn't
    /// declare its own matrix (spec.md §4.2): `Fallback` for the operations
    /// that have a documented fallback path, `Unsupported` for the rest.
    pub fn reflected_default(&self) -> CapabilityStatus {
        match self {
            Capability::Initialize
            | Capability::Shutdown
            | Capability::PostEphemeral
            | Capability::PostChannelMessage
            | Capability::Stream
            | Capability::HandleWebhook
            | Capability::VerifyWebhook
            | Capability::ParseEvent
            | Capability::FormatWebhookResponse
            | Capability::FetchMetadata
            | Capability::FetchThread
            | Capability::FetchMessage => CapabilityStatus::Fallback,
            _ => CapabilityStatus::Unsupported,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Support level for one capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityStatus {
    /// Implemented directly by the adapter.
    Native,
    /// Not implemented; the core provides a documented fallback.
    Fallback,
    /// Not implemented and no fallback exists; calls return `Err(Unsupported)`.
    Unsupported,
}

/// Per-adapter declaration mapping operation → support level.
#[derive(Debug, Clone)]
pub struct CapabilityMatrix {
    statuses: HashMap<Capability, CapabilityStatus>,
}

impl CapabilityMatrix {
    /// The fully-reflected default matrix (spec.md §4.2): every capability
    /// at its `reflected_default()`, i.e. as if the adapter implemented
    /// none of the optional callbacks.
    pub fn defaults() -> Self {
        let statuses = Capability::ALL
            .iter()
            .map(|cap| (*cap, cap.reflected_default()))
            .collect();
        Self { statuses }
    }

    /// Merge a declared matrix over the reflected defaults (spec.md §4.2:
    /// "Declared matrices are merged over defaults").
    pub fn with_declared(declared: HashMap<Capability, CapabilityStatus>) -> Self {
        let mut matrix = Self::defaults();
        for (cap, status) in declared {
            matrix.statuses.insert(cap, status);
        }
        matrix
    }

    pub fn status(&self, capability: Capability) -> CapabilityStatus {
        self.statuses
            .get(&capability)
            .copied()
            .unwrap_or(CapabilityStatus::Unsupported)
    }

    pub fn set(&mut self, capability: Capability, status: CapabilityStatus) {
        self.statuses.insert(capability, status);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Capability, CapabilityStatus)> + '_ {
        self.statuses.iter().map(|(c, s)| (*c, *s))
    }
}

impl Default for CapabilityMatrix {
    fn default() -> Self {
        Self::defaults()
    }
}

impl CapabilityStatus {
    fn as_str(&self) -> &'static str {
        match self {
            CapabilityStatus::Native => "native",
            CapabilityStatus::Fallback => "fallback",
            CapabilityStatus::Unsupported => "unsupported",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "native" => CapabilityStatus::Native,
            "fallback" => CapabilityStatus::Fallback,
            "unsupported" => CapabilityStatus::Unsupported,
            _ => return None,
        })
    }
}

impl ToPlain for CapabilityMatrix {
    fn to_plain(&self) -> Plain {
        let mut statuses = serde_json::Map::new();
        for cap in Capability::ALL {
            statuses.insert(cap.as_str().to_string(), Value::String(self.status(cap).as_str().to_string()));
        }
        tagged(tag::CAPABILITY_MATRIX, [("statuses", Value::Object(statuses))])
    }
}

impl Revive for CapabilityMatrix {
    fn revive(plain: &Plain) -> Result<Self> {
        let obj = plain.as_object().ok_or_else(|| {
            crate::error::ValidationError::single(
                "CapabilityMatrix",
                plain.clone(),
                "$",
                "expected an object",
            )
        })?;
        let mut matrix = Self::defaults();
        if let Some(statuses) = obj.get("statuses").and_then(Value::as_object) {
            for (key, value) in statuses {
                if let (Some(cap), Some(status)) = (
                    Capability::ALL.iter().find(|c| c.as_str() == key),
                    value.as_str().and_then(CapabilityStatus::from_str),
                ) {
                    matrix.set(*cap, status);
                }
            }
        }
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflected_defaults_mark_paginated_ops_unsupported() {
        let matrix = CapabilityMatrix::defaults();
        assert_eq!(matrix.status(Capability::EditMessage), CapabilityStatus::Unsupported);
        assert_eq!(matrix.status(Capability::FetchMetadata), CapabilityStatus::Fallback);
    }

    #[test]
    fn declared_matrix_overrides_defaults() {
        let mut declared = HashMap::new();
        declared.insert(Capability::EditMessage, CapabilityStatus::Native);
        let matrix = CapabilityMatrix::with_declared(declared);
        assert_eq!(matrix.status(Capability::EditMessage), CapabilityStatus::Native);
        // untouched capabilities keep their reflected default
        assert_eq!(matrix.status(Capability::DeleteMessage), CapabilityStatus::Unsupported);
    }
}

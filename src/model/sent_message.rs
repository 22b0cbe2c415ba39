//! Outbound follow-up handle and related result types (spec.md §3, §4.7).

use super::plain::{tag, tagged, Plain, ToPlain};
use super::{ExternalId, Media, Metadata, Response};
use crate::adapter::AdapterDyn;
use crate::error::{AdapterError, Result};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Handle to a previously-sent message, exposing edit/delete/react
/// follow-ups (spec.md §3 `SentMessage`).
#[derive(Clone)]
pub struct SentMessage {
    pub id: String,
    pub thread_id: String,
    pub adapter_name: String,
    pub adapter: Arc<dyn AdapterDyn>,
    pub external_room_id: ExternalId,
    pub text: String,
    pub formatted: Option<String>,
    pub raw: Value,
    pub attachments: Vec<Media>,
    pub metadata: Metadata,
    pub response: Response,
    /// Merged into every follow-up call's opts (spec.md §4.7).
    pub default_opts: std::collections::HashMap<String, Value>,
}

impl std::fmt::Debug for SentMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentMessage")
            .field("id", &self.id)
            .field("thread_id", &self.thread_id)
            .field("adapter_name", &self.adapter_name)
            .field("text", &self.text)
            .finish_non_exhaustive()
    }
}

impl SentMessage {
    /// Edit the underlying message. On success, the returned `SentMessage`
    /// carries the new external id (if the adapter reports one), the new
    /// text/formatted body, and the edited `Response` (spec.md §4.7).
    pub async fn edit(&self, text: impl Into<String>) -> Result<SentMessage> {
        let text = text.into();
        let opts = self.default_opts.clone();
        let response = self
            .adapter
            .edit_message(&self.external_room_id, &self.id, &text, &opts)
            .await?;
        let mut updated = self.clone();
        if let Some(new_id) = response.external_message_id.clone() {
            updated.id = new_id.to_string();
        }
        updated.text = text.clone();
        updated.formatted = Some(text);
        updated.response = response;
        Ok(updated)
    }

    pub async fn delete(&self) -> Result<()> {
        self.adapter
            .delete_message(&self.external_room_id, &self.id, &self.default_opts)
            .await
    }

    pub async fn add_reaction(&self, emoji: impl Into<String>) -> Result<()> {
        self.adapter
            .add_reaction(&self.external_room_id, &self.id, &emoji.into(), &self.default_opts)
            .await
    }

    pub async fn remove_reaction(&self, emoji: impl Into<String>) -> Result<()> {
        self.adapter
            .remove_reaction(&self.external_room_id, &self.id, &emoji.into(), &self.default_opts)
            .await
    }
}

impl ToPlain for SentMessage {
    fn to_plain(&self) -> Plain {
        tagged(
            tag::SENT_MESSAGE,
            [
                ("id", Value::String(self.id.clone())),
                ("thread_id", Value::String(self.thread_id.clone())),
                ("adapter_name", Value::String(self.adapter_name.clone())),
                ("external_room_id", Value::String(self.external_room_id.to_string())),
                ("text", Value::String(self.text.clone())),
                ("formatted", self.formatted.clone().map(Value::String).unwrap_or(Value::Null)),
                ("metadata", Value::Object(self.metadata.clone().into_iter().collect())),
            ],
        )
    }
}

/// Result of `post_ephemeral`, including whether the DM fallback path was
/// used (spec.md §4.2 fallback rule).
#[derive(Debug, Clone)]
pub struct EphemeralMessage {
    pub text: String,
    pub user_id: String,
    pub used_fallback: bool,
    pub metadata: Metadata,
}

impl EphemeralMessage {
    pub fn new(text: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            user_id: user_id.into(),
            used_fallback: false,
            metadata: Metadata::new(),
        }
    }

    /// Build the DM-fallback result: `used_fallback=true` and
    /// `metadata.source_room_id` set to the original room (spec.md §4.2).
    pub fn via_dm_fallback(
        text: impl Into<String>,
        user_id: impl Into<String>,
        source_room_id: &ExternalId,
    ) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert(
            "source_room_id".to_string(),
            Value::String(source_room_id.to_string()),
        );
        Self {
            text: text.into(),
            user_id: user_id.into(),
            used_fallback: true,
            metadata,
        }
    }
}

/// Result of `open_modal`.
#[derive(Debug, Clone)]
pub struct ModalResult {
    pub ok: bool,
    pub metadata: Metadata,
}

impl ModalResult {
    pub fn ok() -> Self {
        Self {
            ok: true,
            metadata: Metadata::new(),
        }
    }
}

impl ToPlain for ModalResult {
    fn to_plain(&self) -> Plain {
        tagged(
            tag::MODAL_RESULT,
            [
                ("ok", Value::Bool(self.ok)),
                ("metadata", Value::Object(self.metadata.clone().into_iter().collect())),
            ],
        )
    }
}

/// A placeholder adapter substituted for an unknown name encountered during
/// revival (spec.md §9 REDESIGN FLAGS: "Unknown names must deserialize as
/// an opaque placeholder that errors on first use, not during revival").
pub struct UnknownAdapterPlaceholder {
    pub name: String,
}

impl crate::adapter::Adapter for UnknownAdapterPlaceholder {
    fn channel_type(&self) -> &str {
        &self.name
    }

    async fn transform_incoming(&self, _raw: Value) -> Result<super::Incoming> {
        Err(AdapterError::UnknownAdapter(self.name.clone()).into())
    }

    async fn send_message(
        &self,
        _external_room_id: &ExternalId,
        _text: &str,
        _opts: &std::collections::HashMap<String, Value>,
    ) -> Result<Response> {
        Err(AdapterError::UnknownAdapter(self.name.clone()).into())
    }
}

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

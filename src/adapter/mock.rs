//! In-memory test-support adapter (SPEC_FULL.md §2 supplemental feature).
//!
//! Not a platform integration — a configurable stand-in used by this
//! crate's own tests and by the `replay-webhook`/`validate-capabilities` CLI
//! commands to exercise the core without a real Telegram/Discord adapter.
//! Grounded on the channel-stub shape seen in
//! `other_examples/xdevweb3-ateclaw`'s `LineChannel`/`TeamsChannel` and
//! `other_examples/greentic-ai-greentic-messaging`'s `BasicAdapter`: a
//! struct holding canned, configurable responses behind interior mutability
//! rather than a real network client.

use super::{Adapter, OptsMap};
use crate::error::{AdapterError, Result};
use crate::model::{
    CapabilityMatrix, ExternalId, FetchOptions, Incoming, MessagePage, ModalResult, Response,
    WebhookRequest,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// A canned, in-memory adapter for tests and offline CLI replay.
pub struct MockAdapter {
    name: String,
    capabilities: CapabilityMatrix,
    open_dm_room: Option<ExternalId>,
    /// Pages keyed by the cursor that requests them (`None` = first page).
    pages: Mutex<HashMap<Option<String>, MessagePage>>,
    verify_result: Result<(), String>,
    sent: Mutex<Vec<(String, String)>>,
}

impl MockAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: CapabilityMatrix::defaults(),
            open_dm_room: None,
            pages: Mutex::new(HashMap::new()),
            verify_result: Ok(()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn with_capabilities(mut self, capabilities: CapabilityMatrix) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_open_dm_room(mut self, room: impl Into<String>) -> Self {
        self.open_dm_room = Some(ExternalId::from(room.into()));
        self
    }

    pub fn with_verification_failure(mut self, reason: impl Into<String>) -> Self {
        self.verify_result = Err(reason.into());
        self
    }

    /// Register the page returned for a given request cursor (spec.md §8
    /// scenario S4: `None` is the first page, `Some("c1")` the next).
    pub fn with_page(self, cursor: Option<&str>, page: MessagePage) -> Self {
        self.pages
            .lock()
            .expect("mock adapter lock poisoned")
            .insert(cursor.map(String::from), page);
        self
    }

    pub fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("mock adapter lock poisoned").clone()
    }
}

impl Adapter for MockAdapter {
    fn channel_type(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> CapabilityMatrix {
        self.capabilities.clone()
    }

    fn implemented_capabilities(&self) -> std::collections::HashSet<crate::model::Capability> {
        use crate::model::Capability::*;
        [
            EditMessage,
            DeleteMessage,
            AddReaction,
            RemoveReaction,
            OpenDm,
            FetchMessages,
            OpenModal,
            StartTyping,
            VerifyWebhook,
        ]
        .into_iter()
        .collect()
    }

    async fn transform_incoming(&self, raw: Value) -> Result<Incoming> {
        Incoming::from_value(raw)
    }

    async fn send_message(&self, external_room_id: &ExternalId, text: &str, _opts: &OptsMap) -> Result<Response> {
        self.sent
            .lock()
            .expect("mock adapter lock poisoned")
            .push((external_room_id.to_string(), text.to_string()));
        Ok(Response::from_value(serde_json::json!({
            "channel_id": external_room_id.as_str(),
            "text": text,
        })))
    }

    async fn edit_message(
        &self,
        external_room_id: &ExternalId,
        external_message_id: &str,
        text: &str,
        _opts: &OptsMap,
    ) -> Result<Response> {
        Ok(Response::from_value(serde_json::json!({
            "message_id": external_message_id,
            "channel_id": external_room_id.as_str(),
            "text": text,
        })))
    }

    async fn delete_message(&self, _external_room_id: &ExternalId, _external_message_id: &str, _opts: &OptsMap) -> Result<()> {
        Ok(())
    }

    async fn add_reaction(&self, _external_room_id: &ExternalId, _external_message_id: &str, _emoji: &str, _opts: &OptsMap) -> Result<()> {
        Ok(())
    }

    async fn remove_reaction(&self, _external_room_id: &ExternalId, _external_message_id: &str, _emoji: &str, _opts: &OptsMap) -> Result<()> {
        Ok(())
    }

    async fn open_dm(&self, _external_user_id: &ExternalId, _opts: &OptsMap) -> Result<ExternalId> {
        self.open_dm_room
            .clone()
            .ok_or(AdapterError::Unsupported.into())
    }

    async fn fetch_messages(&self, _external_room_id: &ExternalId, opts: &FetchOptions) -> Result<MessagePage> {
        let pages = self.pages.lock().expect("mock adapter lock poisoned");
        Ok(pages.get(&opts.cursor).cloned().unwrap_or_else(MessagePage::empty))
    }

    async fn open_modal(&self, _trigger_id: &str, _view: Value, _opts: &OptsMap) -> Result<ModalResult> {
        Ok(ModalResult::ok())
    }

    async fn start_typing(&self, _external_room_id: &ExternalId, _opts: &OptsMap) -> Result<()> {
        Ok(())
    }

    async fn verify_webhook(&self, _request: &WebhookRequest, _opts: &OptsMap) -> Result<()> {
        self.verify_result
            .clone()
            .map_err(|reason| AdapterError::Reported(reason).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn send_message_records_and_echoes() {
        let mock = MockAdapter::new("mock");
        let opts = OptsMap::new();
        let response = mock.send_message(&ExternalId::from("r1"), "hi", &opts).await.unwrap();
        assert_eq!(response.text.as_deref(), Some("hi"));
        assert_eq!(mock.sent_messages(), vec![("r1".to_string(), "hi".to_string())]);
    }

    #[tokio::test]
    async fn fetch_messages_returns_registered_page_by_cursor() {
        let page_a = MessagePage::new(Vec::new(), Some("c1".to_string()));
        let mock = MockAdapter::new("mock").with_page(None, page_a);
        let page = mock
            .fetch_messages(&ExternalId::from("r1"), &FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(page.next_cursor.as_deref(), Some("c1"));
    }
}

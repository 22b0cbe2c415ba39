//! Outbound-facing channel metadata (spec.md §3 `ChannelInfo`).

use super::Metadata;

/// Metadata about a channel as returned by an adapter's `fetch_metadata`.
#[derive(Debug, Clone)]
pub struct ChannelInfo {
    pub id: String,
    pub adapter_name: String,
    pub name: Option<String>,
    pub topic: Option<String>,
    pub metadata: Metadata,
}

impl ChannelInfo {
    /// The synthetic value returned when `fetch_metadata` isn't implemented
    /// (spec.md §4.2 fallback rule): `{id: room_id, metadata: {adapter_name}}`.
    pub fn synthetic(room_id: impl Into<String>, adapter_name: impl Into<String>) -> Self {
        let adapter_name = adapter_name.into();
        let mut metadata = Metadata::new();
        metadata.insert(
            "adapter_name".to_string(),
            serde_json::Value::String(adapter_name.clone()),
        );
        Self {
            id: room_id.into(),
            adapter_name,
            name: None,
            topic: None,
            metadata,
        }
    }
}

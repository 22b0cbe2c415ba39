//! Configuration for a [`Chat`](crate::chat::Chat) instance.
//!
//! Spec.md §3 describes `Chat.metadata` as an "arbitrary map" with a small
//! set of recognized keys. Rather than doing stringly-typed lookups against
//! that map on every dispatch, the recognized keys are lifted into a typed
//! `ChatConfig`, mirroring the teacher's `CompactionConfig`/`ChannelConfig`
//! pattern: typed, `Copy`-or-`Clone` where cheap, constructed once and
//! carried alongside the free-form metadata map for anything not yet
//! promoted to a field.

use serde_json::Value;
use std::collections::HashMap;

/// Default bound on `Chat.dedupe_order` (spec.md §3, §5 *Dedup bound*).
pub const DEFAULT_DEDUPE_LIMIT: usize = 1000;

/// Typed view over `Chat.metadata`'s recognized keys.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Maximum number of entries retained in the dedupe FIFO before the
    /// oldest is evicted. Must be positive; `ChatConfig::from_metadata`
    /// falls back to [`DEFAULT_DEDUPE_LIMIT`] for zero or missing values.
    pub dedupe_limit: usize,

    /// Keyword-like options passed through to adapter `initialize`/`shutdown`
    /// calls. Kept as a raw map since its shape is adapter-specific.
    pub adapter_opts: HashMap<String, Value>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            dedupe_limit: DEFAULT_DEDUPE_LIMIT,
            adapter_opts: HashMap::new(),
        }
    }
}

impl ChatConfig {
    /// Derive a `ChatConfig` from `Chat.metadata`, applying the spec's
    /// documented keys (`dedupe_limit`, `adapter_opts`) and defaulting the
    /// rest. Unrecognized keys are ignored here; they remain reachable via
    /// the original metadata map on `Chat`.
    pub fn from_metadata(metadata: &HashMap<String, Value>) -> Self {
        let dedupe_limit = metadata
            .get("dedupe_limit")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_DEDUPE_LIMIT);

        let adapter_opts = metadata
            .get("adapter_opts")
            .and_then(Value::as_object)
            .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        Self {
            dedupe_limit,
            adapter_opts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_when_metadata_empty() {
        let cfg = ChatConfig::from_metadata(&HashMap::new());
        assert_eq!(cfg.dedupe_limit, DEFAULT_DEDUPE_LIMIT);
        assert!(cfg.adapter_opts.is_empty());
    }

    #[test]
    fn reads_dedupe_limit_and_adapter_opts() {
        let mut metadata = HashMap::new();
        metadata.insert("dedupe_limit".to_string(), json!(5));
        metadata.insert("adapter_opts".to_string(), json!({"retries": 3}));
        let cfg = ChatConfig::from_metadata(&metadata);
        assert_eq!(cfg.dedupe_limit, 5);
        assert_eq!(cfg.adapter_opts.get("retries"), Some(&json!(3)));
    }

    #[test]
    fn zero_dedupe_limit_falls_back_to_default() {
        let mut metadata = HashMap::new();
        metadata.insert("dedupe_limit".to_string(), json!(0));
        let cfg = ChatConfig::from_metadata(&metadata);
        assert_eq!(cfg.dedupe_limit, DEFAULT_DEDUPE_LIMIT);
    }
}

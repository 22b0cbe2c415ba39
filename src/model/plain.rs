//! Plain-data serialization for canonical structs (spec.md §4.1, §6).
//!
//! "Plain data" means strings, numbers, booleans, sequences, and
//! string-keyed maps — exactly what `serde_json::Value` already models, so
//! `Plain` is a thin alias rather than a bespoke tree type. Every canonical
//! struct's `to_plain()` adds a `"__type__"` discriminator (spec.md §4.1:
//! "Every canonical struct's `to_map` adds a `"__type__": "<kind>"`
//! discriminator"); [`revive`] dispatches back on that tag (spec.md §6
//! *Serialization wire format*).
//!
//! Datetimes serialize as ISO8601 strings, sets as sorted sequences (there
//! are no true sets in the model below a `HashSet`-backed dedupe table, and
//! that table is serialized explicitly in `chat::Chat::to_plain`).

use serde_json::{Map, Value};

/// Plain-data representation: the JSON-shaped subset every canonical
/// struct's `to_plain`/`revive` pair traffics in.
pub type Plain = Value;

/// `"__type__"` tag values used across the wire format (spec.md §6).
pub mod tag {
    pub const CHAT: &str = "chat";
    pub const THREAD: &str = "thread";
    pub const CHANNEL: &str = "channel";
    pub const MESSAGE: &str = "message";
    pub const SENT_MESSAGE: &str = "sent_message";
    pub const EVENT_ENVELOPE: &str = "event_envelope";
    pub const INGRESS_RESULT: &str = "ingress_result";
    pub const MODAL_RESULT: &str = "modal_result";
    pub const CAPABILITY_MATRIX: &str = "capability_matrix";
    pub const WEBHOOK_REQUEST: &str = "webhook_request";
    pub const WEBHOOK_RESPONSE: &str = "webhook_response";
    pub const POST_PAYLOAD: &str = "post_payload";
}

/// Implemented by every canonical struct that can be flattened to plain
/// data for snapshotting (spec.md §4.1 serialization rules).
pub trait ToPlain {
    fn to_plain(&self) -> Plain;
}

/// The inverse of [`ToPlain`] for structs this crate can fully
/// reconstruct from their plain form. Not every `ToPlain` implementor
/// implements `Revive` — handler closures, for instance, are intentionally
/// one-way (spec.md §4.8: "function closures are intentionally not
/// serialized").
pub trait Revive: Sized {
    fn revive(plain: &Plain) -> crate::error::Result<Self>;
}

/// Read the `"__type__"` tag off a plain value, if present.
pub fn type_tag(plain: &Plain) -> Option<&str> {
    plain.as_object()?.get("__type__")?.as_str()
}

/// Build a tagged object from a field list, the common shape every
/// `to_plain` implementation below produces.
pub fn tagged(kind: &str, fields: impl IntoIterator<Item = (&'static str, Value)>) -> Value {
    let mut map = Map::new();
    map.insert("__type__".to_string(), Value::String(kind.to_string()));
    for (key, value) in fields {
        map.insert(key.to_string(), value);
    }
    Value::Object(map)
}

/// Helper for the "sets are emitted as sorted sequences" rule (spec.md
/// §4.1, §6).
pub fn sorted_string_seq<I: IntoIterator<Item = S>, S: Into<String>>(items: I) -> Value {
    let mut v: Vec<String> = items.into_iter().map(Into::into).collect();
    v.sort();
    Value::Array(v.into_iter().map(Value::String).collect())
}

/// Helper for reading back a field expected to be a plain string map
/// (used for `metadata` round-tripping).
pub fn string_map(value: Option<&Value>) -> std::collections::HashMap<String, Value> {
    value
        .and_then(Value::as_object)
        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tagged_inserts_type_discriminator() {
        let plain = tagged("message", [("id", json!("m1"))]);
        assert_eq!(type_tag(&plain), Some("message"));
        assert_eq!(plain.get("id").unwrap(), "m1");
    }

    #[test]
    fn sorted_string_seq_sorts() {
        let plain = sorted_string_seq(vec!["b".to_string(), "a".to_string()]);
        assert_eq!(plain, json!(["a", "b"]));
    }
}

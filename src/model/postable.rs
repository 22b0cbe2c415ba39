//! Outbound post content (spec.md §3, §4.1 `PostPayload`/`Postable`).

use super::plain::{tag, tagged, Plain, Revive, ToPlain};
use super::Metadata;
use crate::error::Result;
use serde_json::Value;

/// Anything a caller can hand to [`Thread::post`](crate::outbound::Thread::post).
#[derive(Debug, Clone)]
pub enum Postable {
    Text(String),
    Markdown(String),
    Raw(Value),
    Ast(Value),
    Card(Value),
}

impl Postable {
    /// Flatten any variant into a [`PostPayload`], applying spec.md §4.1's
    /// rules: `text` is always a string (best-effort projection; non-string
    /// `raw`/`ast`/`card` is JSON-encoded, falling back to `{:?}` debug
    /// formatting if that somehow fails), and `markdown`/`ast`/`card` tag
    /// `metadata.format`.
    pub fn to_payload(&self) -> PostPayload {
        match self {
            Postable::Text(text) => PostPayload::new(text.clone()),
            Postable::Markdown(text) => PostPayload::new(text.clone()).with_format("markdown"),
            Postable::Raw(value) => PostPayload::new(project_to_string(value)),
            Postable::Ast(value) => PostPayload::new(project_to_string(value)).with_format("ast"),
            Postable::Card(value) => {
                PostPayload::new(project_to_string(value)).with_format("card")
            }
        }
    }
}

impl From<String> for Postable {
    fn from(value: String) -> Self {
        Postable::Text(value)
    }
}

impl From<&str> for Postable {
    fn from(value: &str) -> Self {
        Postable::Text(value.to_string())
    }
}

impl From<Value> for Postable {
    /// A bare map coerces to a `Postable` by inspecting its `text`/`markdown`/
    /// `raw`/`ast`/`card` keys (spec.md §4.1: "a map coercible to `Postable`").
    /// Falls back to treating the whole map as `Raw`.
    fn from(value: Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Postable::Raw(value);
        };
        if let Some(text) = obj.get("markdown").and_then(|v| v.as_str()) {
            return Postable::Markdown(text.to_string());
        }
        if let Some(ast) = obj.get("ast") {
            return Postable::Ast(ast.clone());
        }
        if let Some(card) = obj.get("card") {
            return Postable::Card(card.clone());
        }
        if let Some(text) = obj.get("text").and_then(|v| v.as_str()) {
            return Postable::Text(text.to_string());
        }
        Postable::Raw(value)
    }
}

fn project_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_else(|_| format!("{other:?}")),
    }
}

/// The flattened, adapter-facing form of a [`Postable`]. `text` is always a
/// string, possibly empty — never absent (spec.md §4.1 invariant).
#[derive(Debug, Clone)]
pub struct PostPayload {
    pub text: String,
    pub metadata: Metadata,
}

impl PostPayload {
    pub fn new(text: String) -> Self {
        Self {
            text,
            metadata: Metadata::new(),
        }
    }

    fn with_format(mut self, format: &str) -> Self {
        self.metadata
            .insert("format".to_string(), Value::String(format.to_string()));
        self
    }
}

impl ToPlain for PostPayload {
    fn to_plain(&self) -> Plain {
        tagged(
            tag::POST_PAYLOAD,
            [
                ("text", Value::String(self.text.clone())),
                ("metadata", Value::Object(self.metadata.clone().into_iter().collect())),
            ],
        )
    }
}

impl Revive for PostPayload {
    fn revive(plain: &Plain) -> Result<Self> {
        let obj = plain.as_object().ok_or_else(|| {
            crate::error::ValidationError::single("PostPayload", plain.clone(), "$", "expected an object")
        })?;
        let text = obj.get("text").and_then(|v| v.as_str()).unwrap_or_default().to_string();
        Ok(Self {
            text,
            metadata: super::plain::string_map(obj.get("metadata")),
        })
    }
}

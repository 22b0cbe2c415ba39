//! HTTP-shape webhook request/response envelopes (spec.md §3, §6).

use super::plain::{tag, tagged, Plain, Revive, ToPlain};
use super::Metadata;
use crate::error::Result;
use serde_json::Value;
use std::collections::HashMap;

/// Inbound webhook request, normalized from whatever transport handed it to
/// the core. The core never sees a live connection — only this value
/// (spec.md §1 Non-goals: "HTTP server plumbing ... is out of scope").
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    pub adapter_name: Option<String>,
    pub method: String,
    pub path: Option<String>,
    /// Header names are lowercased on construction (spec.md §3: "Headers
    /// are normalized to lowercase keys").
    pub headers: HashMap<String, String>,
    pub payload: Value,
    pub query: HashMap<String, String>,
    pub raw: Value,
    pub metadata: Metadata,
}

impl WebhookRequest {
    /// Build a `WebhookRequest` from a loose JSON value, as the webhook
    /// pipeline does when normalizing whatever the caller handed in
    /// (spec.md §4.6 step 2).
    pub fn from_value(value: Value, adapter_name: Option<String>) -> Self {
        let obj = value.as_object();

        let method = obj
            .and_then(|o| o.get("method"))
            .and_then(|v| v.as_str())
            .unwrap_or("POST")
            .to_string();

        let path = obj
            .and_then(|o| o.get("path"))
            .and_then(|v| v.as_str())
            .map(String::from);

        let headers = obj
            .and_then(|o| o.get("headers"))
            .and_then(Value::as_object)
            .map(|h| {
                h.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.to_lowercase(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        let query = obj
            .and_then(|o| o.get("query"))
            .and_then(Value::as_object)
            .map(|q| {
                q.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        let payload = obj
            .and_then(|o| o.get("payload"))
            .cloned()
            .unwrap_or_else(|| value.clone());

        Self {
            adapter_name,
            method,
            path,
            headers,
            payload,
            query,
            raw: value,
            metadata: Metadata::new(),
        }
    }

    /// Case-insensitive header lookup (spec.md §6: `header(request, name)`).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }
}

impl ToPlain for WebhookRequest {
    fn to_plain(&self) -> Plain {
        tagged(
            tag::WEBHOOK_REQUEST,
            [
                (
                    "adapter_name",
                    self.adapter_name.clone().map(Value::String).unwrap_or(Value::Null),
                ),
                ("method", Value::String(self.method.clone())),
                ("path", self.path.clone().map(Value::String).unwrap_or(Value::Null)),
                (
                    "headers",
                    Value::Object(self.headers.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect()),
                ),
                ("payload", self.payload.clone()),
                (
                    "query",
                    Value::Object(self.query.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect()),
                ),
                ("raw", self.raw.clone()),
                ("metadata", Value::Object(self.metadata.clone().into_iter().collect())),
            ],
        )
    }
}

impl Revive for WebhookRequest {
    fn revive(plain: &Plain) -> Result<Self> {
        let adapter_name = plain
            .get("adapter_name")
            .and_then(|v| v.as_str())
            .map(String::from);
        Ok(Self::from_value(plain.clone(), adapter_name))
    }
}

/// Outbound webhook response. Canonical bodies are documented in spec.md
/// §6; the webhook pipeline (component C6) is the sole producer.
#[derive(Debug, Clone)]
pub struct WebhookResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Value,
    pub metadata: Metadata,
}

impl WebhookResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body,
            metadata: Metadata::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(200, serde_json::json!({"ok": true}))
    }

    pub fn noop() -> Self {
        Self::new(204, serde_json::json!({"ok": true, "noop": true}))
    }

    pub fn unknown_adapter(adapter_name: &str) -> Self {
        Self::new(
            404,
            serde_json::json!({"error": "unknown_adapter", "adapter_name": adapter_name}),
        )
    }

    pub fn invalid_secret() -> Self {
        Self::new(401, serde_json::json!({"error": "invalid_webhook_secret"}))
    }

    pub fn invalid_signature() -> Self {
        Self::new(401, serde_json::json!({"error": "invalid_signature"}))
    }

    pub fn invalid_request(reason: impl std::fmt::Debug) -> Self {
        Self::new(
            400,
            serde_json::json!({"error": "invalid_webhook_request", "reason": format!("{reason:?}")}),
        )
    }

    pub fn webhook_exception(reason: impl std::fmt::Debug) -> Self {
        Self::new(
            500,
            serde_json::json!({"error": "webhook_exception", "reason": format!("{reason:?}")}),
        )
    }

    pub fn response_format_error() -> Self {
        Self::new(500, serde_json::json!({"error": "webhook_response_format_error"}))
    }
}

impl ToPlain for WebhookResponse {
    fn to_plain(&self) -> Plain {
        tagged(
            tag::WEBHOOK_RESPONSE,
            [
                ("status", Value::Number(self.status.into())),
                (
                    "headers",
                    Value::Object(self.headers.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect()),
                ),
                ("body", self.body.clone()),
                ("metadata", Value::Object(self.metadata.clone().into_iter().collect())),
            ],
        )
    }
}

impl Revive for WebhookResponse {
    fn revive(plain: &Plain) -> Result<Self> {
        let obj = plain.as_object().ok_or_else(|| {
            crate::error::ValidationError::single(
                "WebhookResponse",
                plain.clone(),
                "$",
                "expected an object",
            )
        })?;
        let status = obj.get("status").and_then(Value::as_u64).unwrap_or(200) as u16;
        let body = obj.get("body").cloned().unwrap_or(Value::Null);
        let headers = obj
            .get("headers")
            .and_then(Value::as_object)
            .map(|h| h.iter().filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string()))).collect())
            .unwrap_or_default();
        Ok(Self {
            status,
            headers,
            body,
            metadata: super::plain::string_map(obj.get("metadata")),
        })
    }
}

/// Options for the paginated fetch operations (`fetch_messages`,
/// `fetch_channel_messages`, `list_threads`). Adapter-specific extras are
/// preserved in `extra`.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    pub extra: HashMap<String, Value>,
}

impl FetchOptions {
    pub fn with_cursor(cursor: impl Into<String>) -> Self {
        Self {
            cursor: Some(cursor.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lowercases_header_keys() {
        let req = WebhookRequest::from_value(
            json!({"headers": {"X-Signature": "abc"}}),
            Some("discord".to_string()),
        );
        assert_eq!(req.header("x-signature"), Some("abc"));
        assert_eq!(req.header("X-SIGNATURE"), Some("abc"));
    }

    #[test]
    fn defaults_method_to_post() {
        let req = WebhookRequest::from_value(json!({}), None);
        assert_eq!(req.method, "POST");
    }

    #[test]
    fn canonical_bodies_match_spec() {
        assert_eq!(WebhookResponse::unknown_adapter("missing").status, 404);
        assert_eq!(WebhookResponse::invalid_secret().status, 401);
        assert_eq!(WebhookResponse::noop().status, 204);
    }
}

//! Top-level error types for chatcore.

use serde_json::Value;
use std::fmt;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this is the `Err(:unsupported)` the outbound facade and the
    /// adapter wrappers branch on (spec.md §7 *Unsupported*).
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Adapter(AdapterError::Unsupported))
    }
}

/// Top-level error enum wrapping domain-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Webhook(#[from] WebhookError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Schema rejection at a value constructor (spec.md §4.1, §7 *Validation*).
///
/// Carries the subject (the kind of value being constructed), the raw input
/// that failed, and per-field error paths so callers can surface precise
/// diagnostics instead of a single opaque message.
#[derive(Debug, thiserror::Error)]
#[error("validation failed for {subject}: {}", format_field_errors(.errors))]
pub struct ValidationError {
    pub subject: String,
    pub input: Value,
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn new(subject: impl Into<String>, input: Value, errors: Vec<FieldError>) -> Self {
        Self {
            subject: subject.into(),
            input,
            errors,
        }
    }

    pub fn single(
        subject: impl Into<String>,
        input: Value,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(subject, input, vec![FieldError::new(path, message)])
    }
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.path, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// A single field-path validation failure.
#[derive(Debug, Clone)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Adapter-resolution and capability errors (spec.md §7 *Unknown-adapter*, *Unsupported*, *Adapter-error*).
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("unknown adapter: {0}")]
    UnknownAdapter(String),

    /// The requested operation is not available on this adapter; callers are
    /// expected to branch on the capability matrix before calling.
    #[error("unsupported operation")]
    Unsupported,

    #[error("adapter {adapter_name} declares {capabilities:?} as native but does not implement them")]
    CapabilityMismatch {
        adapter_name: String,
        capabilities: Vec<String>,
    },

    /// Opaque failure reported by an adapter callback.
    #[error("adapter error: {0}")]
    Reported(String),
}

/// Event-normalization failures (spec.md §4.3, §7 *Invalid-input*).
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("invalid incoming message: {0}")]
    InvalidIncoming(Value),

    #[error("invalid event envelope: {0}")]
    InvalidEventEnvelope(Value),

    #[error("invalid {kind} event: {value}")]
    InvalidEvent { kind: String, value: Value },

    #[error("unsupported event type: {0}")]
    UnsupportedEventType(String),
}

/// Webhook verification / formatting failures (spec.md §7 *Webhook-verification*, *Webhook-response-format-error*).
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("invalid webhook secret")]
    InvalidSecret,

    #[error("invalid webhook signature")]
    InvalidSignature,

    #[error("invalid webhook request: {0}")]
    InvalidRequest(String),

    #[error("webhook response formatter failed")]
    ResponseFormatError,
}

/// Transport-level failure classification for cross-transport diagnostics
/// (spec.md §7 *Ingress*). Not surfaced through [`Error`] directly — adapters
/// and listener supervisors may use it to classify failures before they ever
/// reach the core.
#[derive(Debug, Clone, thiserror::Error)]
#[error("ingress failure on {transport}: {reason}")]
pub struct IngressError {
    pub transport: String,
    pub adapter_name: String,
    pub reason: String,
}

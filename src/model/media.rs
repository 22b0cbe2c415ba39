//! Normalized media attachment (spec.md §3 `Incoming.media`).

use super::Metadata;
use serde::{Deserialize, Serialize};

/// A normalized media attachment carried on an inbound or outbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Media {
    pub kind: MediaKind,
    pub url: Option<String>,
    pub mime_type: Option<String>,
    pub filename: Option<String>,
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Coarse media category. Platforms disagree on finer classification, so
/// anything not recognized is preserved verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    File,
    Other(String),
}

impl Media {
    pub fn new(kind: MediaKind) -> Self {
        Self {
            kind,
            url: None,
            mime_type: None,
            filename: None,
            size_bytes: None,
            metadata: Metadata::new(),
        }
    }

    /// Coerce a loose JSON object (as adapters hand back in `raw` payloads)
    /// into a typed `Media` value. Unrecognized `kind` strings become
    /// `MediaKind::Other` rather than failing validation — media
    /// classification is advisory, not load-bearing.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        let obj = value.as_object()?;
        let kind = match obj.get("kind").and_then(|v| v.as_str()) {
            Some("image") => MediaKind::Image,
            Some("video") => MediaKind::Video,
            Some("audio") => MediaKind::Audio,
            Some("file") | None => MediaKind::File,
            Some(other) => MediaKind::Other(other.to_string()),
        };
        Some(Self {
            kind,
            url: obj.get("url").and_then(|v| v.as_str()).map(String::from),
            mime_type: obj
                .get("mime_type")
                .and_then(|v| v.as_str())
                .map(String::from),
            filename: obj
                .get("filename")
                .and_then(|v| v.as_str())
                .map(String::from),
            size_bytes: obj.get("size_bytes").and_then(|v| v.as_u64()),
            metadata: Metadata::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_known_and_unknown_kinds() {
        let image = Media::from_value(&json!({"kind": "image", "url": "https://x/1.png"})).unwrap();
        assert_eq!(image.kind, MediaKind::Image);
        assert_eq!(image.url.as_deref(), Some("https://x/1.png"));

        let sticker = Media::from_value(&json!({"kind": "sticker"})).unwrap();
        assert_eq!(sticker.kind, MediaKind::Other("sticker".to_string()));
    }

    #[test]
    fn missing_kind_defaults_to_file() {
        let media = Media::from_value(&json!({"url": "https://x/doc.pdf"})).unwrap();
        assert_eq!(media.kind, MediaKind::File);
    }
}

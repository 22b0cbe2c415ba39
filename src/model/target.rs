//! Reply-routing hints for an outbound post (spec.md §3, §4.1 `MessagingTarget`).

use serde_json::Value;
use std::collections::HashMap;

/// Where within a conversation a post should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Dm,
    Thread,
    Room,
}

/// Whether a reply-to hint should be honored or suppressed in favor of
/// whatever the platform does by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyMode {
    #[default]
    PlatformDefault,
    Always,
    Never,
}

/// Reply-routing hints derived from the triggering context.
#[derive(Debug, Clone)]
pub struct MessagingTarget {
    pub kind: TargetKind,
    pub reply_to_id: Option<String>,
    pub thread_id: Option<String>,
    pub reply_mode: ReplyMode,
}

impl MessagingTarget {
    /// Infer `kind` from a chat-type string the way spec.md §4.1 directs:
    /// `direct → dm`, `thread → thread`, else `room`.
    pub fn from_chat_type(chat_type: Option<&str>) -> TargetKind {
        match chat_type {
            Some("direct") => TargetKind::Dm,
            Some("thread") => TargetKind::Thread,
            _ => TargetKind::Room,
        }
    }

    pub fn new(chat_type: Option<&str>) -> Self {
        Self {
            kind: Self::from_chat_type(chat_type),
            reply_to_id: None,
            thread_id: None,
            reply_mode: ReplyMode::default(),
        }
    }

    /// Emit `reply_to_id`/`thread_id`/`reply_mode` send-options, iff the
    /// corresponding fields are present and `reply_mode != PlatformDefault`
    /// (spec.md §4.1 invariant).
    pub fn to_send_opts(&self) -> HashMap<String, Value> {
        let mut opts = HashMap::new();
        if self.reply_mode == ReplyMode::PlatformDefault {
            return opts;
        }
        if let Some(reply_to_id) = &self.reply_to_id {
            opts.insert("reply_to_id".to_string(), Value::String(reply_to_id.clone()));
        }
        if let Some(thread_id) = &self.thread_id {
            opts.insert("thread_id".to_string(), Value::String(thread_id.clone()));
        }
        opts.insert(
            "reply_mode".to_string(),
            Value::String(
                match self.reply_mode {
                    ReplyMode::Always => "always",
                    ReplyMode::Never => "never",
                    ReplyMode::PlatformDefault => unreachable!(),
                }
                .to_string(),
            ),
        );
        opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_kind_from_chat_type() {
        assert_eq!(MessagingTarget::from_chat_type(Some("direct")), TargetKind::Dm);
        assert_eq!(MessagingTarget::from_chat_type(Some("thread")), TargetKind::Thread);
        assert_eq!(MessagingTarget::from_chat_type(Some("group")), TargetKind::Room);
        assert_eq!(MessagingTarget::from_chat_type(None), TargetKind::Room);
    }

    #[test]
    fn send_opts_empty_at_platform_default() {
        let mut target = MessagingTarget::new(Some("direct"));
        target.reply_to_id = Some("m1".to_string());
        assert!(target.to_send_opts().is_empty());
    }

    #[test]
    fn send_opts_populated_when_reply_mode_set() {
        let mut target = MessagingTarget::new(Some("direct"));
        target.reply_to_id = Some("m1".to_string());
        target.reply_mode = ReplyMode::Always;
        let opts = target.to_send_opts();
        assert_eq!(opts.get("reply_to_id").unwrap(), "m1");
        assert_eq!(opts.get("reply_mode").unwrap(), "always");
    }
}

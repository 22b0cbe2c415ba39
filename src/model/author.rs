//! Normalized message author (spec.md §3 `Author`).

use super::{ExternalId, Metadata};
use serde::{Deserialize, Serialize};

/// The user who authored an [`Incoming`](super::Incoming) message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub user_id: String,
    pub user_name: Option<String>,
    pub full_name: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub is_me: bool,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Author {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: None,
            full_name: None,
            is_bot: false,
            is_me: false,
            metadata: Metadata::new(),
        }
    }

    /// Synthesize an author from the loose `(external_user_id, username,
    /// display_name)` triple that wire payloads carry, as directed by
    /// spec.md §4.1: "when `author` is absent, synthesize one from
    /// `(external_user_id, username, display_name)` if `external_user_id`
    /// is present".
    pub fn synthesize(
        external_user_id: &ExternalId,
        user_name: Option<String>,
        display_name: Option<String>,
    ) -> Self {
        Self {
            user_id: external_user_id.as_str().to_string(),
            user_name,
            full_name: display_name,
            is_bot: false,
            is_me: false,
            metadata: Metadata::new(),
        }
    }

    /// Render this author for `@mention` purposes — `@id` on non-Discord
    /// adapters, `<@id>` on Discord (spec.md §6 *Mention rendering*).
    pub fn mention(&self, adapter_name: &str) -> String {
        mention_id(adapter_name, &self.user_id)
    }
}

/// Shared id-to-mention-string rendering for [`Author::mention`] and
/// [`Thread::mention_user`](crate::outbound::Thread::mention_user).
pub fn mention_id(adapter_name: &str, id: &str) -> String {
    if adapter_name.eq_ignore_ascii_case("discord") {
        format!("<@{id}>")
    } else {
        format!("@{id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesizes_from_loose_fields() {
        let author = Author::synthesize(
            &ExternalId::from("u1"),
            Some("alice".to_string()),
            Some("Alice A.".to_string()),
        );
        assert_eq!(author.user_id, "u1");
        assert_eq!(author.user_name.as_deref(), Some("alice"));
        assert_eq!(author.full_name.as_deref(), Some("Alice A."));
    }

    #[test]
    fn mention_rendering_differs_for_discord() {
        let author = Author::new("123");
        assert_eq!(author.mention("discord"), "<@123>");
        assert_eq!(author.mention("telegram"), "@123");
        assert_eq!(author.mention("slack"), "@123");
    }
}

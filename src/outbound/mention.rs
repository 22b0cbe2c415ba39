//! `mention_user` input coercion (spec.md §6 *Mention rendering*).

use crate::model::Author;
use serde_json::Value;

/// Anything `Thread::mention_user`/`ChannelRef::mention_user` accepts: an
/// `Author`, a bare id, or a map carrying `user_id`.
pub enum MentionTarget {
    Author(Author),
    Id(String),
    Map(Value),
}

impl MentionTarget {
    /// Render as `@id` (or `<@id>` on Discord); unknown input yields
    /// `"@unknown"` (spec.md §6).
    pub fn render(&self, adapter_name: &str) -> String {
        match self {
            MentionTarget::Author(author) => author.mention(adapter_name),
            MentionTarget::Id(id) => crate::model::mention_id(adapter_name, id),
            MentionTarget::Map(value) => value
                .as_object()
                .and_then(|o| o.get("user_id"))
                .and_then(|v| v.as_str().map(String::from).or_else(|| v.as_i64().map(|n| n.to_string())))
                .map(|id| crate::model::mention_id(adapter_name, &id))
                .unwrap_or_else(|| "@unknown".to_string()),
        }
    }
}

impl From<Author> for MentionTarget {
    fn from(author: Author) -> Self {
        MentionTarget::Author(author)
    }
}

impl From<String> for MentionTarget {
    fn from(id: String) -> Self {
        MentionTarget::Id(id)
    }
}

impl From<&str> for MentionTarget {
    fn from(id: &str) -> Self {
        MentionTarget::Id(id.to_string())
    }
}

impl From<i64> for MentionTarget {
    fn from(id: i64) -> Self {
        MentionTarget::Id(id.to_string())
    }
}

impl From<Value> for MentionTarget {
    fn from(value: Value) -> Self {
        MentionTarget::Map(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn map_without_user_id_yields_unknown() {
        let target = MentionTarget::from(json!({"not_user_id": 1}));
        assert_eq!(target.render("discord"), "@unknown");
    }

    #[test]
    fn map_with_user_id_renders_per_adapter() {
        let target = MentionTarget::from(json!({"user_id": "42"}));
        assert_eq!(target.render("discord"), "<@42>");
        assert_eq!(target.render("telegram"), "@42");
    }
}

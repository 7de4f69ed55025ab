use std::fmt;

use serde::{Deserialize, Serialize};

use super::null_as_default;

/// Identifier of an account on the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub i64);

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A confirmed connection of the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEntry {
    #[serde(rename = "user_id")]
    pub subject_id: SubjectId,
    #[serde(rename = "username", default)]
    pub display_name: Option<String>,
    #[serde(rename = "avatar", default)]
    pub avatar_ref: Option<String>,
}

impl ConnectionEntry {
    /// Name shown in lists, falling back to `user#<id>` when the account has no username
    pub fn name(&self) -> String {
        match self.display_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("user#{}", self.subject_id),
        }
    }
}

/// One page of `GET /social/friends/{ownerId}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FriendsPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<ConnectionEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_friends_page() {
        let json = r#"{"items":[{"user_id":7,"username":"ploy","avatar":"/uploads/a.png"},{"user_id":9,"username":null}],"total":42}"#;
        let page: FriendsPage = serde_json::from_str(json).expect("valid friends page");

        assert_eq!(page.total, 42);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].subject_id, SubjectId(7));
        assert_eq!(page.items[0].avatar_ref.as_deref(), Some("/uploads/a.png"));
        assert_eq!(page.items[1].display_name, None);
    }

    #[test]
    fn test_parse_friends_page_null_items() {
        let page: FriendsPage = serde_json::from_str(r#"{"items":null}"#).expect("valid friends page");
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
    }

    #[test]
    fn test_connection_name_fallback() {
        let mut entry = ConnectionEntry {
            subject_id: SubjectId(12),
            display_name: Some("  ".to_string()),
            avatar_ref: None,
        };
        assert_eq!(entry.name(), "user#12");

        entry.display_name = Some("Nok".to_string());
        assert_eq!(entry.name(), "Nok");
    }
}

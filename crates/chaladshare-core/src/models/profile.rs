use serde::{Deserialize, Serialize};

use super::SubjectId;

/// Response of `GET /profile`, reduced to what the friends controller needs.
///
/// Depending on the endpoint version the caller's id arrives as `user_id` or `id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub user_id: Option<SubjectId>,
    #[serde(default)]
    pub id: Option<SubjectId>,
    #[serde(default)]
    pub username: Option<String>,
}

impl Profile {
    pub fn subject_id(&self) -> Option<SubjectId> {
        self.user_id.or(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_profile_variants() {
        let a: Profile = serde_json::from_str(r#"{"user_id":3,"username":"bam"}"#).expect("user_id form");
        let b: Profile = serde_json::from_str(r#"{"id":3,"email":"bam@example.com"}"#).expect("id form");
        assert_eq!(a.subject_id(), Some(SubjectId(3)));
        assert_eq!(b.subject_id(), Some(SubjectId(3)));
    }

    #[test]
    fn test_profile_without_id() {
        let p: Profile = serde_json::from_str(r#"{"username":"ghost"}"#).expect("no id form");
        assert_eq!(p.subject_id(), None);
    }
}

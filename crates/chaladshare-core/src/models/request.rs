use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{null_as_default, SubjectId};

/// Identifier of a pending friend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub i64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingRequest {
    pub request_id: RequestId,
    #[serde(rename = "requester_user_id")]
    pub requester_id: SubjectId,
    #[serde(rename = "username", default)]
    pub display_name: Option<String>,
    #[serde(rename = "avatar", default)]
    pub avatar_ref: Option<String>,
    #[serde(default)]
    pub requested_at: Option<DateTime<Utc>>,
    // Older service builds send this instead of requested_at
    #[serde(default, skip_serializing)]
    request_created_at: Option<DateTime<Utc>>,
}

impl IncomingRequest {
    pub fn new(
        request_id: RequestId,
        requester_id: SubjectId,
        display_name: Option<String>,
        requested_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            request_id,
            requester_id,
            display_name,
            avatar_ref: None,
            requested_at,
            request_created_at: None,
        }
    }

    /// When the request was sent, if the service reported it
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.requested_at.or(self.request_created_at)
    }

    pub fn name(&self) -> String {
        match self.display_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("user#{}", self.requester_id),
        }
    }
}

/// One page of `GET /social/requests/incoming`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestsPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<IncomingRequest>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_requests_page() {
        let json = r#"{"items":[
            {"request_id":123,"requester_user_id":5,"username":"mint","avatar":null,"requested_at":"2025-09-01T10:00:00Z"},
            {"request_id":124,"requester_user_id":6,"request_created_at":"2025-09-02T08:30:00Z"}
        ]}"#;
        let page: RequestsPage = serde_json::from_str(json).expect("valid requests page");

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].request_id, RequestId(123));
        assert_eq!(page.items[0].name(), "mint");
        assert!(page.items[1].sent_at().is_some());
        assert_eq!(page.items[1].name(), "user#6");
    }

    #[test]
    fn test_parse_requests_page_missing_timestamp() {
        let json = r#"{"items":[{"request_id":1,"requester_user_id":2}]}"#;
        let page: RequestsPage = serde_json::from_str(json).expect("valid requests page");
        assert_eq!(page.items[0].sent_at(), None);
    }
}

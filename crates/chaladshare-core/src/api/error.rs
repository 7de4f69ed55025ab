use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {}", describe(.0))]
    AccessDenied(Option<String>),

    #[error("Unauthorized - session may be expired")]
    Unauthorized,

    #[error("Resource not found: {}", describe(.0))]
    NotFound(Option<String>),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {}", describe(.0))]
    ServerError(Option<String>),

    #[error("Request rejected ({status}): {}", describe(.detail))]
    Rejected { status: u16, detail: Option<String> },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

fn describe(detail: &Option<String>) -> &str {
    detail.as_deref().unwrap_or("no details")
}

/// Error payload the service attaches to non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    detail: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Pull the human-readable `error` (or `detail`) field out of a response body
    fn extract_detail(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        parsed
            .error
            .or(parsed.detail)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let detail = Self::extract_detail(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(detail),
            404 => ApiError::NotFound(detail),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(detail),
            code => ApiError::Rejected { status: code, detail },
        }
    }

    /// Message supplied by the service itself, if any.
    ///
    /// Only messages taken from an `error`/`detail` field are returned, so callers
    /// can fall back to their own localized text otherwise.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::AccessDenied(detail)
            | ApiError::NotFound(detail)
            | ApiError::ServerError(detail)
            | ApiError::Rejected { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

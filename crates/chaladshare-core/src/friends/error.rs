use thiserror::Error;

use crate::api::ApiError;
use crate::messages::{Locale, Message};
use crate::models::{RequestId, SubjectId};

/// Listing calls (profile, friends, incoming requests) that did not update state.
#[derive(Error, Debug)]
pub enum FetchError {
    /// `GET /profile` has not completed; the fetch was skipped
    #[error("caller identity is not resolved yet")]
    IdentityUnresolved,

    #[error("a newer fetch superseded this one")]
    Superseded,

    #[error(transparent)]
    Remote(#[from] ApiError),
}

/// Accept, decline or unfriend that could not be carried out.
#[derive(Error, Debug)]
pub enum MutationError {
    #[error("user {0} is not in the friends list")]
    UnknownConnection(SubjectId),

    #[error("friend request {0} is not pending")]
    UnknownRequest(RequestId),

    #[error("friend request {0} already has a decision in flight")]
    AlreadyPending(RequestId),

    #[error(transparent)]
    Remote(#[from] ApiError),
}

impl FetchError {
    pub fn remote(&self) -> Option<&ApiError> {
        match self {
            FetchError::Remote(e) => Some(e),
            _ => None,
        }
    }
}

impl MutationError {
    pub fn remote(&self) -> Option<&ApiError> {
        match self {
            MutationError::Remote(e) => Some(e),
            _ => None,
        }
    }

    /// Text to show the user; local rejections describe themselves
    pub fn user_message(&self, fallback: Message, locale: Locale) -> String {
        match self.remote() {
            Some(api) => remote_message(api, fallback, locale),
            None => self.to_string(),
        }
    }
}

/// Server-provided text when present, otherwise the localized fallback
pub(crate) fn remote_message(err: &ApiError, fallback: Message, locale: Locale) -> String {
    if err.is_unauthorized() {
        return Message::SessionExpired.text(locale).to_string();
    }
    err.server_message()
        .map(str::to_string)
        .unwrap_or_else(|| fallback.text(locale).to_string())
}

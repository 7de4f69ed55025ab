//! Friends controller.
//!
//! Keeps the paginated, searchable connection list and the incoming request
//! queue in step with the remote connection graph:
//!
//! - `SearchDebouncer` coalesces search input into one fetch trigger
//! - `FetchGuard` lets only the newest fetch per view commit its result
//! - `TabCoordinator` owns the view and page state, runs remote calls as
//!   background tasks and applies optimistic accept/decline/unfriend
//!
//! The caches themselves live in [`crate::cache`].

pub mod coordinator;
pub mod debounce;
pub mod error;
pub mod guard;
pub mod notify;
pub mod state;

pub use coordinator::{Completion, TabCoordinator, Wakeup};
pub use debounce::{SearchDebouncer, DEFAULT_SEARCH_DEBOUNCE};
pub use error::{FetchError, MutationError};
pub use guard::{FetchGuard, FetchKey, FetchToken};
pub use notify::{NoticeKind, Notification};
pub use state::{PageState, View};

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::requests::DEFAULT_REQUEST_PAGE_SIZE;
use crate::messages::Locale;

/// Connections per page when nothing is configured
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// What to do with an optimistic removal when the remote call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Leave the entry removed; the next refresh shows the server's view
    #[default]
    KeepRemoved,
    /// Put the entry back where it was, unless the list was refreshed since
    Rollback,
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub page_size: u32,
    pub request_page_size: u32,
    pub search_debounce: Duration,
    pub failure_policy: FailurePolicy,
    pub locale: Locale,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            request_page_size: DEFAULT_REQUEST_PAGE_SIZE,
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
            failure_policy: FailurePolicy::default(),
            locale: Locale::default(),
        }
    }
}

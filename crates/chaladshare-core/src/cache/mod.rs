//! In-memory caches mirroring the remote connection graph.
//!
//! - `ConnectionListCache`: the current page of confirmed connections
//! - `IncomingRequestQueue`: pending incoming friend requests
//!
//! Both are filled only by fetches issued through a `FetchGuard` and are
//! mutated optimistically by the friends controller. Nothing is written to
//! disk; `CachedData` only records when a snapshot was taken.

pub mod connections;
pub mod requests;

pub use connections::{ConnectionListCache, PageKey, PendingRemoval};
pub use requests::{Decision, IncomingRequestQueue, PendingDecision, QueueEvent, RequestState};

use chrono::{DateTime, Utc};

use crate::utils::format_relative;

/// Outcome of applying a fetch result to a cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The result belonged to the latest fetch and replaced the cached data
    Committed,
    /// A newer fetch was issued; the result was dropped without touching the cache
    Discarded,
}

#[derive(Debug, Clone)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_display(&self) -> String {
        // Future timestamps (clock skew) read as "just now"
        format_relative(self.cached_at, Utc::now())
    }
}

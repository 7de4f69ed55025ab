//! Search-input debouncing against an injected clock.

use std::time::Duration;

use tokio::time::Instant;

/// Default quiescence window for search input.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
struct PendingSearch {
    text: String,
    due: Instant,
}

/// Coalesces bursts of query edits into one trigger carrying the last value.
///
/// Time is passed in by the caller, so the debouncer never sleeps itself;
/// the controller sleeps until `deadline()` and then calls `poll`.
#[derive(Debug)]
pub struct SearchDebouncer {
    window: Duration,
    pending: Option<PendingSearch>,
}

impl SearchDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Record the latest text and restart the window
    pub fn on_query_change(&mut self, text: impl Into<String>, now: Instant) {
        self.pending = Some(PendingSearch {
            text: text.into(),
            due: now + self.window,
        });
    }

    /// Returns the settled text once the window has elapsed, exactly once
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match self.pending {
            Some(ref pending) if now >= pending.due => self.pending.take().map(|p| p.text),
            _ => None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop the pending trigger, returning the text it would have fired with
    pub fn cancel(&mut self) -> Option<String> {
        self.pending.take().map(|p| p.text)
    }
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_DEBOUNCE)
    }
}

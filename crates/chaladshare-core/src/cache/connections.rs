use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::api::{ApiError, SocialApi};
use crate::friends::{FailurePolicy, FetchError, FetchGuard, FetchKey, FetchToken, MutationError};
use crate::models::{ConnectionEntry, FriendsPage, SubjectId};

use super::{Applied, CachedData};

/// Query and page a snapshot of the connection list was fetched for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageKey {
    pub query: String,
    pub page: u32,
}

/// Snapshot taken by an optimistic removal, used to reconcile once the
/// remote call settles.
#[derive(Debug, Clone)]
pub struct PendingRemoval {
    entry: ConnectionEntry,
    index: usize,
    generation: u64,
}

impl PendingRemoval {
    pub fn subject_id(&self) -> SubjectId {
        self.entry.subject_id
    }
}

/// The current page of confirmed connections.
///
/// Entries and total are replaced together by the latest fetch and never
/// partially. The cache does no client-side filtering and never pages on
/// its own; clamping the page after a shrink is the caller's job.
#[derive(Debug, Default)]
pub struct ConnectionListCache {
    entries: Vec<ConnectionEntry>,
    total_count: u64,
    loading: bool,
    last: Option<CachedData<PageKey>>,
    /// Bumped on every committed refresh
    generation: u64,
    removing: HashSet<SubjectId>,
    /// Entries the latest refresh carried but hid because their removal was
    /// still in flight, with the position they would have taken
    hidden: HashMap<SubjectId, (usize, ConnectionEntry)>,
    /// Confirmed removals, keyed to the last fetch seq issued before confirmation
    removed_before: HashMap<SubjectId, u64>,
}

impl ConnectionListCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ConnectionEntry] {
        &self.entries
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn contains(&self, subject_id: SubjectId) -> bool {
        self.entries.iter().any(|e| e.subject_id == subject_id)
    }

    /// When the cached page was fetched and for which query/page
    pub fn last_refreshed(&self) -> Option<&CachedData<PageKey>> {
        self.last.as_ref()
    }

    // ===== Refresh =====

    pub fn begin_refresh(&mut self, guard: &mut FetchGuard) -> FetchToken {
        self.loading = true;
        guard.begin_fetch(FetchKey::Connections)
    }

    /// Apply a listing result if `token` is still the latest connections fetch.
    pub fn apply_refresh(
        &mut self,
        guard: &mut FetchGuard,
        token: FetchToken,
        query: &str,
        page: u32,
        result: Result<FriendsPage, ApiError>,
    ) -> Result<Applied, FetchError> {
        if !guard.settle(token) {
            debug!(seq = token.seq(), query, page, "Discarding stale friends response");
            return Ok(Applied::Discarded);
        }
        self.loading = false;

        let FriendsPage { items, total } = result?;

        // The service may answer before it has processed a removal we already applied
        let mut kept = Vec::with_capacity(items.len());
        let mut hidden = 0u64;
        self.hidden.clear();
        for entry in items {
            if self.removing.contains(&entry.subject_id) {
                self.hidden.insert(entry.subject_id, (kept.len(), entry));
                hidden += 1;
            } else if self.removed_since(entry.subject_id, token.seq()) {
                hidden += 1;
            } else {
                kept.push(entry);
            }
        }

        self.entries = kept;
        self.total_count = total.saturating_sub(hidden);
        self.generation += 1;
        self.last = Some(CachedData::new(PageKey {
            query: query.to_string(),
            page,
        }));
        self.removed_before.retain(|_, seq| *seq >= token.seq());

        debug!(
            query,
            page,
            count = self.entries.len(),
            total = self.total_count,
            hidden,
            "Friends page applied"
        );
        Ok(Applied::Committed)
    }

    fn removed_since(&self, subject_id: SubjectId, fetch_seq: u64) -> bool {
        self.removed_before
            .get(&subject_id)
            .map(|seq| fetch_seq <= *seq)
            .unwrap_or(false)
    }

    /// Fetch and apply one page in a single call.
    pub async fn refresh(
        &mut self,
        api: &dyn SocialApi,
        guard: &mut FetchGuard,
        owner: SubjectId,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<FriendsPage, FetchError> {
        let token = self.begin_refresh(guard);
        let result = api.list_friends(owner, query, page, page_size).await;
        match self.apply_refresh(guard, token, query, page, result)? {
            Applied::Committed => Ok(FriendsPage {
                items: self.entries.clone(),
                total: self.total_count,
            }),
            Applied::Discarded => Err(FetchError::Superseded),
        }
    }

    // ===== Removal =====

    /// Optimistically drop `subject_id` and decrement the total before the
    /// remote call is made.
    pub fn remove(&mut self, subject_id: SubjectId) -> Result<PendingRemoval, MutationError> {
        let index = self
            .entries
            .iter()
            .position(|e| e.subject_id == subject_id)
            .ok_or(MutationError::UnknownConnection(subject_id))?;

        let entry = self.entries.remove(index);
        self.total_count = self.total_count.saturating_sub(1);
        self.removing.insert(subject_id);

        debug!(subject = %subject_id, total = self.total_count, "Friend removed optimistically");
        Ok(PendingRemoval {
            entry,
            index,
            generation: self.generation,
        })
    }

    /// Reconcile an optimistic removal with the remote outcome.
    pub fn finish_remove(
        &mut self,
        pending: PendingRemoval,
        result: Result<(), ApiError>,
        policy: FailurePolicy,
        guard: &FetchGuard,
    ) -> Result<(), MutationError> {
        let subject_id = pending.subject_id();
        self.removing.remove(&subject_id);
        let hidden = self.hidden.remove(&subject_id);

        match result {
            Ok(()) => {
                self.removed_before.insert(subject_id, guard.last_issued());
                info!(subject = %subject_id, "Friend removed");
                Ok(())
            }
            Err(e) => {
                warn!(subject = %subject_id, error = %e, ?policy, "Unfriend failed");
                if policy == FailurePolicy::Rollback {
                    self.restore(pending, hidden);
                }
                Err(MutationError::Remote(e))
            }
        }
    }

    /// Put a failed removal back. After a refresh the entry only returns if
    /// that refresh carried it; otherwise the page no longer shows it.
    fn restore(&mut self, pending: PendingRemoval, hidden: Option<(usize, ConnectionEntry)>) {
        let subject_id = pending.subject_id();
        if self.contains(subject_id) {
            return;
        }
        let (index, entry) = match hidden {
            Some(hidden) => hidden,
            None if pending.generation == self.generation => (pending.index, pending.entry),
            None => {
                debug!(subject = %subject_id, "Skipping rollback, refreshed page does not carry it");
                return;
            }
        };
        let index = index.min(self.entries.len());
        self.entries.insert(index, entry);
        self.total_count += 1;
    }

    /// Remove a friend: optimistic local removal, then the remote call.
    pub async fn unfriend(
        &mut self,
        api: &dyn SocialApi,
        guard: &FetchGuard,
        subject_id: SubjectId,
        policy: FailurePolicy,
    ) -> Result<(), MutationError> {
        let pending = self.remove(subject_id)?;
        let result = api.unfriend(subject_id).await;
        self.finish_remove(pending, result, policy, guard)
    }
}

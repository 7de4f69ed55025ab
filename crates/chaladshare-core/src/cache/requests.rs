use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::api::{ApiError, SocialApi};
use crate::friends::{FailurePolicy, FetchError, FetchGuard, FetchKey, FetchToken, MutationError};
use crate::models::{IncomingRequest, RequestId, RequestsPage, SubjectId};

use super::{Applied, CachedData};

/// Default page size for the incoming queue; a single page is fetched.
pub const DEFAULT_REQUEST_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Decline,
}

impl Decision {
    fn in_flight_state(self) -> RequestState {
        match self {
            Decision::Accept => RequestState::Accepting,
            Decision::Decline => RequestState::Declining,
        }
    }

    fn final_state(self) -> RequestState {
        match self {
            Decision::Accept => RequestState::Connected,
            Decision::Decline => RequestState::Removed,
        }
    }
}

/// Lifecycle of one incoming request.
///
/// `Pending -> Accepting -> Connected` or `Pending -> Declining -> Removed`.
/// Only a failed remote call leads back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Pending,
    Accepting,
    Declining,
    Connected,
    Removed,
}

/// Emitted by the queue for the coordinator to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    /// An accept was confirmed; the connection list is now out of date
    Connected {
        request_id: RequestId,
        requester: SubjectId,
    },
}

#[derive(Debug, Clone)]
pub struct PendingDecision {
    request: IncomingRequest,
    decision: Decision,
    index: usize,
    generation: u64,
}

impl PendingDecision {
    pub fn request_id(&self) -> RequestId {
        self.request.request_id
    }

    pub fn decision(&self) -> Decision {
        self.decision
    }
}

/// Pending incoming friend requests.
#[derive(Debug)]
pub struct IncomingRequestQueue {
    entries: Vec<IncomingRequest>,
    page_size: u32,
    loading: bool,
    last: Option<CachedData<()>>,
    generation: u64,
    in_flight: HashMap<RequestId, Decision>,
    /// Requests the latest refresh carried but hid while their decision was in flight
    hidden: HashMap<RequestId, (usize, IncomingRequest)>,
    /// Confirmed decisions with the last fetch seq issued before confirmation
    settled: HashMap<RequestId, (RequestState, u64)>,
}

impl IncomingRequestQueue {
    pub fn new(page_size: u32) -> Self {
        Self {
            entries: Vec::new(),
            page_size: page_size.max(1),
            loading: false,
            last: None,
            generation: 0,
            in_flight: HashMap::new(),
            hidden: HashMap::new(),
            settled: HashMap::new(),
        }
    }

    pub fn entries(&self) -> &[IncomingRequest] {
        &self.entries
    }

    /// Number of requests shown, for the tab badge
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn last_refreshed(&self) -> Option<&CachedData<()>> {
        self.last.as_ref()
    }

    pub fn get(&self, request_id: RequestId) -> Option<&IncomingRequest> {
        self.entries.iter().find(|r| r.request_id == request_id)
    }

    pub fn state(&self, request_id: RequestId) -> Option<RequestState> {
        if let Some(decision) = self.in_flight.get(&request_id) {
            return Some(decision.in_flight_state());
        }
        if let Some((state, _)) = self.settled.get(&request_id) {
            return Some(*state);
        }
        self.get(request_id).map(|_| RequestState::Pending)
    }

    // ===== Refresh =====

    pub fn begin_refresh(&mut self, guard: &mut FetchGuard) -> FetchToken {
        self.loading = true;
        guard.begin_fetch(FetchKey::Requests)
    }

    pub fn apply_refresh(
        &mut self,
        guard: &mut FetchGuard,
        token: FetchToken,
        result: Result<RequestsPage, ApiError>,
    ) -> Result<Applied, FetchError> {
        if !guard.settle(token) {
            debug!(seq = token.seq(), "Discarding stale requests response");
            return Ok(Applied::Discarded);
        }
        self.loading = false;

        let items = result?.items;
        let seq = token.seq();
        let mut kept = Vec::with_capacity(items.len());
        self.hidden.clear();
        for request in items {
            let decided = self
                .settled
                .get(&request.request_id)
                .map(|(_, watermark)| seq <= *watermark)
                .unwrap_or(false);
            if self.in_flight.contains_key(&request.request_id) {
                self.hidden.insert(request.request_id, (kept.len(), request));
            } else if !decided {
                kept.push(request);
            }
        }

        self.entries = kept;
        self.generation += 1;
        self.last = Some(CachedData::new(()));
        self.settled.retain(|_, (_, watermark)| *watermark >= seq);

        debug!(count = self.entries.len(), "Incoming requests applied");
        Ok(Applied::Committed)
    }

    pub async fn refresh(
        &mut self,
        api: &dyn SocialApi,
        guard: &mut FetchGuard,
    ) -> Result<Vec<IncomingRequest>, FetchError> {
        let token = self.begin_refresh(guard);
        let result = api.list_incoming_requests(1, self.page_size).await;
        match self.apply_refresh(guard, token, result)? {
            Applied::Committed => Ok(self.entries.clone()),
            Applied::Discarded => Err(FetchError::Superseded),
        }
    }

    // ===== Decisions =====

    pub fn accept(&mut self, request_id: RequestId) -> Result<PendingDecision, MutationError> {
        self.begin_decision(request_id, Decision::Accept)
    }

    pub fn decline(&mut self, request_id: RequestId) -> Result<PendingDecision, MutationError> {
        self.begin_decision(request_id, Decision::Decline)
    }

    fn begin_decision(
        &mut self,
        request_id: RequestId,
        decision: Decision,
    ) -> Result<PendingDecision, MutationError> {
        if self.in_flight.contains_key(&request_id) {
            return Err(MutationError::AlreadyPending(request_id));
        }
        let index = self
            .entries
            .iter()
            .position(|r| r.request_id == request_id)
            .ok_or(MutationError::UnknownRequest(request_id))?;

        let request = self.entries.remove(index);
        self.in_flight.insert(request_id, decision);
        debug!(request = %request_id, ?decision, "Request removed optimistically");

        Ok(PendingDecision {
            request,
            decision,
            index,
            generation: self.generation,
        })
    }

    /// Reconcile a decision with the remote outcome. A confirmed accept
    /// yields `QueueEvent::Connected`.
    pub fn finish_decision(
        &mut self,
        pending: PendingDecision,
        result: Result<(), ApiError>,
        policy: FailurePolicy,
        guard: &FetchGuard,
    ) -> Result<Option<QueueEvent>, MutationError> {
        let request_id = pending.request_id();
        self.in_flight.remove(&request_id);
        let hidden = self.hidden.remove(&request_id);

        match result {
            Ok(()) => {
                self.settled.insert(
                    request_id,
                    (pending.decision.final_state(), guard.last_issued()),
                );
                info!(request = %request_id, decision = ?pending.decision, "Request decided");
                Ok(match pending.decision {
                    Decision::Accept => Some(QueueEvent::Connected {
                        request_id,
                        requester: pending.request.requester_id,
                    }),
                    Decision::Decline => None,
                })
            }
            Err(e) => {
                warn!(request = %request_id, decision = ?pending.decision, error = %e, ?policy, "Request decision failed");
                if policy == FailurePolicy::Rollback {
                    self.restore(pending, hidden);
                }
                Err(MutationError::Remote(e))
            }
        }
    }

    fn restore(&mut self, pending: PendingDecision, hidden: Option<(usize, IncomingRequest)>) {
        let request_id = pending.request_id();
        if self.get(request_id).is_some() {
            return;
        }
        let (index, request) = match hidden {
            Some(hidden) => hidden,
            None if pending.generation == self.generation => (pending.index, pending.request),
            None => {
                debug!(request = %request_id, "Skipping rollback, refreshed queue does not carry it");
                return;
            }
        };
        let index = index.min(self.entries.len());
        self.entries.insert(index, request);
    }
}

impl Default for IncomingRequestQueue {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_PAGE_SIZE)
    }
}

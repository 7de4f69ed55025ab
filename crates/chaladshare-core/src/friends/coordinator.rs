//! Top-level friends controller.
//!
//! `TabCoordinator` owns all controller state and is driven from a single
//! task. Remote calls run as spawned tokio tasks and report back through an
//! mpsc channel; the owner awaits [`TabCoordinator::next_wakeup`] alongside
//! its own input and hands each wakeup to [`TabCoordinator::handle`].

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::api::{ApiError, SocialApi};
use crate::cache::{
    Applied, ConnectionListCache, Decision, IncomingRequestQueue, PendingDecision, PendingRemoval,
    QueueEvent,
};
use crate::messages::Message;
use crate::models::{FriendsPage, Profile, RequestId, RequestsPage, SubjectId};

use super::error::remote_message;
use super::{
    ControllerSettings, FetchError, FetchGuard, FetchKey, FetchToken, MutationError, Notification,
    PageState, SearchDebouncer, View,
};

/// Buffer size for completions from background tasks
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Result of a background remote call, waiting to be applied.
#[derive(Debug)]
pub struct Completion(CompletionKind);

#[derive(Debug)]
enum CompletionKind {
    Profile {
        token: FetchToken,
        result: Result<Profile, ApiError>,
    },
    Connections {
        token: FetchToken,
        query: String,
        page: u32,
        result: Result<FriendsPage, ApiError>,
    },
    Requests {
        token: FetchToken,
        result: Result<RequestsPage, ApiError>,
    },
    Removal {
        pending: PendingRemoval,
        result: Result<(), ApiError>,
    },
    Decision {
        pending: PendingDecision,
        result: Result<(), ApiError>,
    },
}

#[derive(Debug)]
pub enum Wakeup {
    Completed(Completion),
    /// The search debounce window elapsed
    SearchDue,
}

pub struct TabCoordinator {
    api: Arc<dyn SocialApi>,
    settings: ControllerSettings,
    view: View,
    page: PageState,
    /// Latest text in the search box, applied or not
    typed_query: String,
    identity: Option<SubjectId>,
    guard: FetchGuard,
    debouncer: SearchDebouncer,
    connections: ConnectionListCache,
    requests: IncomingRequestQueue,
    notifications: VecDeque<Notification>,
    tx: mpsc::Sender<Completion>,
    rx: mpsc::Receiver<Completion>,
    in_flight: usize,
}

impl TabCoordinator {
    pub fn new(api: Arc<dyn SocialApi>, settings: ControllerSettings) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        Self {
            api,
            page: PageState::new(settings.page_size),
            debouncer: SearchDebouncer::new(settings.search_debounce),
            requests: IncomingRequestQueue::new(settings.request_page_size),
            settings,
            view: View::default(),
            typed_query: String::new(),
            identity: None,
            guard: FetchGuard::new(),
            connections: ConnectionListCache::new(),
            notifications: VecDeque::new(),
            tx,
            rx,
            in_flight: 0,
        }
    }

    // ===== Accessors =====

    pub fn view(&self) -> View {
        self.view
    }

    pub fn page(&self) -> &PageState {
        &self.page
    }

    pub fn typed_query(&self) -> &str {
        &self.typed_query
    }

    pub fn identity(&self) -> Option<SubjectId> {
        self.identity
    }

    pub fn connections(&self) -> &ConnectionListCache {
        &self.connections
    }

    pub fn requests(&self) -> &IncomingRequestQueue {
        &self.requests
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn is_search_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Whether the active view is waiting on its latest fetch
    pub fn is_loading(&self) -> bool {
        match self.view {
            View::Connections => self.guard.has_outstanding(FetchKey::Connections),
            View::Requests => self.guard.has_outstanding(FetchKey::Requests),
            View::Add => false,
        }
    }

    /// Badge count for the requests tab
    pub fn request_badge(&self) -> usize {
        self.requests.len()
    }

    /// Hand queued toasts to the front end
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    // ===== Identity =====

    /// Fetch the caller's own id. Listing fetches are skipped until it lands.
    pub fn resolve_identity(&mut self) {
        let token = self.guard.begin_fetch(FetchKey::Profile);
        let api = Arc::clone(&self.api);
        self.spawn(async move {
            let result = api.fetch_profile().await;
            CompletionKind::Profile { token, result }
        });
    }

    /// Switch to a client carrying a new session. Results of calls made on
    /// the old session are dropped and identity is resolved again.
    pub fn reconnect(&mut self, api: Arc<dyn SocialApi>) {
        info!(in_flight = self.in_flight, "Reconnecting friends controller");
        self.api = api;
        for key in [FetchKey::Profile, FetchKey::Connections, FetchKey::Requests] {
            self.guard.invalidate(key);
        }
        self.identity = None;
        self.resolve_identity();
    }

    fn apply_profile(&mut self, token: FetchToken, result: Result<Profile, ApiError>) {
        if !self.guard.settle(token) {
            debug!(seq = token.seq(), "Discarding stale profile response");
            return;
        }
        match result {
            Ok(profile) => match profile.subject_id() {
                Some(id) => {
                    info!(user = %id, "Identity resolved");
                    self.identity = Some(id);
                    self.reload_requests();
                    if self.view == View::Connections {
                        self.reload_connections();
                    }
                }
                None => {
                    warn!("Profile response carried no user id");
                    self.push_message(Message::LoadProfileFailed);
                }
            },
            Err(e) => {
                warn!(error = %e, "Failed to load profile");
                self.push_remote_error(&e, Message::LoadProfileFailed);
            }
        }
    }

    // ===== View and search =====

    /// Switch tabs. Selecting the active tab does nothing.
    pub fn set_view(&mut self, view: View) {
        if view == self.view {
            return;
        }
        debug!(from = %self.view, to = %view, "Switching view");
        if self.view == View::Connections {
            self.debouncer.cancel();
        }
        self.view = view;

        match view {
            View::Connections => {
                // Text typed before leaving the tab is applied on return
                if self.typed_query != self.page.query {
                    self.page.query = self.typed_query.clone();
                    self.page.page_number = 1;
                }
                self.reload_connections();
            }
            View::Requests => self.reload_requests(),
            View::Add => {}
        }
    }

    /// Record search input. Ignored outside the connections view.
    pub fn on_query_change(&mut self, text: impl Into<String>) {
        if self.view != View::Connections {
            return;
        }
        self.typed_query = text.into();
        self.debouncer
            .on_query_change(self.typed_query.clone(), Instant::now());
    }

    fn apply_search(&mut self, text: String) {
        debug!(query = %text, "Search settled");
        self.page.query = text;
        self.page.page_number = 1;
        self.reload_connections();
    }

    // ===== Paging =====

    /// Go to page `n`, clamped to the known range. Returns false if the page
    /// did not change.
    pub fn set_page(&mut self, n: u32) -> bool {
        let target = n.clamp(1, self.page.total_pages());
        if target == self.page.page_number {
            return false;
        }
        self.page.page_number = target;
        self.reload_connections();
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.set_page(self.page.page_number.saturating_add(1))
    }

    pub fn prev_page(&mut self) -> bool {
        self.set_page(self.page.page_number.saturating_sub(1))
    }

    // ===== Fetching =====

    /// Fetch the current query/page of the connection list.
    pub fn refresh_connections(&mut self) -> Result<(), FetchError> {
        let owner = self.identity.ok_or(FetchError::IdentityUnresolved)?;
        if self.page.clamp_page() {
            debug!(page = self.page.page_number, "Clamped page before fetch");
        }

        let token = self.connections.begin_refresh(&mut self.guard);
        let query = self.page.query.clone();
        let page = self.page.page_number;
        let size = self.page.page_size;
        debug!(seq = token.seq(), query = %query, page, "Fetching friends");

        let api = Arc::clone(&self.api);
        self.spawn(async move {
            let result = api.list_friends(owner, &query, page, size).await;
            CompletionKind::Connections {
                token,
                query,
                page,
                result,
            }
        });
        Ok(())
    }

    /// Fetch the single page of incoming requests.
    pub fn refresh_requests(&mut self) -> Result<(), FetchError> {
        if self.identity.is_none() {
            return Err(FetchError::IdentityUnresolved);
        }
        let token = self.requests.begin_refresh(&mut self.guard);
        let size = self.requests.page_size();
        debug!(seq = token.seq(), "Fetching incoming requests");

        let api = Arc::clone(&self.api);
        self.spawn(async move {
            let result = api.list_incoming_requests(1, size).await;
            CompletionKind::Requests { token, result }
        });
        Ok(())
    }

    /// Refresh whatever the active view shows
    pub fn refresh(&mut self) {
        match self.view {
            View::Connections => self.reload_connections(),
            View::Requests => self.reload_requests(),
            View::Add => {}
        }
    }

    fn reload_connections(&mut self) {
        if let Err(e) = self.refresh_connections() {
            debug!(error = %e, "Friends fetch skipped");
        }
    }

    fn reload_requests(&mut self) {
        if let Err(e) = self.refresh_requests() {
            debug!(error = %e, "Requests fetch skipped");
        }
    }

    fn apply_connections(
        &mut self,
        token: FetchToken,
        query: String,
        page: u32,
        result: Result<FriendsPage, ApiError>,
    ) {
        match self
            .connections
            .apply_refresh(&mut self.guard, token, &query, page, result)
        {
            Ok(Applied::Committed) => {
                self.page.total_count = self.connections.total_count();
                if self.page.clamp_page() {
                    info!(
                        requested = page,
                        page = self.page.page_number,
                        total = self.page.total_count,
                        "Page beyond last page, refetching"
                    );
                    self.reload_connections();
                }
            }
            Ok(Applied::Discarded) => {}
            Err(e) => {
                warn!(error = %e, query = %query, page, "Failed to load friends");
                self.push_fetch_error(&e, Message::LoadFriendsFailed);
            }
        }
    }

    fn apply_requests(&mut self, token: FetchToken, result: Result<RequestsPage, ApiError>) {
        if let Err(e) = self.requests.apply_refresh(&mut self.guard, token, result) {
            warn!(error = %e, "Failed to load incoming requests");
            self.push_fetch_error(&e, Message::LoadRequestsFailed);
        }
    }

    // ===== Mutations =====

    /// Remove a friend from the list now and tell the service in the background.
    pub fn unfriend(&mut self, subject_id: SubjectId) -> Result<(), MutationError> {
        let pending = self.connections.remove(subject_id)?;
        self.page.total_count = self.connections.total_count();

        let api = Arc::clone(&self.api);
        self.spawn(async move {
            let result = api.unfriend(subject_id).await;
            CompletionKind::Removal { pending, result }
        });
        Ok(())
    }

    pub fn accept(&mut self, request_id: RequestId) -> Result<(), MutationError> {
        let pending = self.requests.accept(request_id)?;
        let api = Arc::clone(&self.api);
        self.spawn(async move {
            let result = api.accept_request(request_id).await;
            CompletionKind::Decision { pending, result }
        });
        Ok(())
    }

    pub fn decline(&mut self, request_id: RequestId) -> Result<(), MutationError> {
        let pending = self.requests.decline(request_id)?;
        let api = Arc::clone(&self.api);
        self.spawn(async move {
            let result = api.decline_request(request_id).await;
            CompletionKind::Decision { pending, result }
        });
        Ok(())
    }

    fn apply_removal(&mut self, pending: PendingRemoval, result: Result<(), ApiError>) {
        let policy = self.settings.failure_policy;
        if let Err(e) = self
            .connections
            .finish_remove(pending, result, policy, &self.guard)
        {
            self.page.total_count = self.connections.total_count();
            self.push_mutation_error(&e, Message::UnfriendFailed);
        }
    }

    fn apply_decision(&mut self, pending: PendingDecision, result: Result<(), ApiError>) {
        let fallback = match pending.decision() {
            Decision::Accept => Message::AcceptFailed,
            Decision::Decline => Message::DeclineFailed,
        };
        let policy = self.settings.failure_policy;
        match self
            .requests
            .finish_decision(pending, result, policy, &self.guard)
        {
            Ok(Some(event)) => self.on_queue_event(event),
            Ok(None) => {}
            Err(e) => self.push_mutation_error(&e, fallback),
        }
    }

    fn on_queue_event(&mut self, event: QueueEvent) {
        match event {
            QueueEvent::Connected {
                request_id,
                requester,
            } => {
                debug!(request = %request_id, user = %requester, "New friend, refreshing list");
                let text = Message::RequestAccepted.text(self.settings.locale);
                self.push(Notification::info(text));
                self.reload_connections();
            }
        }
    }

    // ===== Driving =====

    /// Wait for the next thing to apply. Returns `None` when nothing is in
    /// flight and no search is armed. Cancel-safe.
    pub async fn next_wakeup(&mut self) -> Option<Wakeup> {
        let deadline = self.debouncer.deadline();
        if self.in_flight == 0 && deadline.is_none() {
            return None;
        }
        let waiting = self.in_flight > 0;

        tokio::select! {
            Some(completion) = self.rx.recv(), if waiting => Some(Wakeup::Completed(completion)),
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                Some(Wakeup::SearchDue)
            }
            else => None,
        }
    }

    pub fn handle(&mut self, wakeup: Wakeup) {
        match wakeup {
            Wakeup::SearchDue => {
                if let Some(text) = self.debouncer.poll(Instant::now()) {
                    self.apply_search(text);
                }
            }
            Wakeup::Completed(Completion(kind)) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                match kind {
                    CompletionKind::Profile { token, result } => self.apply_profile(token, result),
                    CompletionKind::Connections {
                        token,
                        query,
                        page,
                        result,
                    } => self.apply_connections(token, query, page, result),
                    CompletionKind::Requests { token, result } => self.apply_requests(token, result),
                    CompletionKind::Removal { pending, result } => {
                        self.apply_removal(pending, result)
                    }
                    CompletionKind::Decision { pending, result } => {
                        self.apply_decision(pending, result)
                    }
                }
            }
        }
    }

    /// Drive until no call is in flight and no search is armed
    pub async fn settle(&mut self) {
        while let Some(wakeup) = self.next_wakeup().await {
            self.handle(wakeup);
        }
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = CompletionKind> + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let completion = Completion(task.await);
            if let Err(e) = tx.send(completion).await {
                // Only happens once the coordinator itself is gone
                debug!(error = %e, "Dropping completion - channel closed");
            }
        });
    }

    // ===== Notifications =====

    fn push(&mut self, notification: Notification) {
        self.notifications.push_back(notification);
    }

    fn push_message(&mut self, message: Message) {
        self.push(Notification::error(message.text(self.settings.locale)));
    }

    fn push_remote_error(&mut self, err: &ApiError, fallback: Message) {
        let text = remote_message(err, fallback, self.settings.locale);
        if err.is_unauthorized() {
            self.push(Notification::session_expired(text));
        } else {
            self.push(Notification::error(text));
        }
    }

    fn push_fetch_error(&mut self, err: &FetchError, fallback: Message) {
        match err.remote() {
            Some(api) => self.push_remote_error(api, fallback),
            None => self.push_message(fallback),
        }
    }

    fn push_mutation_error(&mut self, err: &MutationError, fallback: Message) {
        match err.remote() {
            Some(api) => self.push_remote_error(api, fallback),
            None => {
                let text = err.user_message(fallback, self.settings.locale);
                self.push(Notification::error(text));
            }
        }
    }
}

impl std::fmt::Debug for TabCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabCoordinator")
            .field("view", &self.view)
            .field("page", &self.page)
            .field("identity", &self.identity)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

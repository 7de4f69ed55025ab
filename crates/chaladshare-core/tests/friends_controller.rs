//! End-to-end behaviour of the friends controller against an in-memory
//! service, on tokio's paused clock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{advance, sleep, Instant};

use chaladshare_core::api::{ApiError, SocialApi};
use chaladshare_core::friends::{
    ControllerSettings, FailurePolicy, FetchError, MutationError, NoticeKind, TabCoordinator, View,
    Wakeup,
};
use chaladshare_core::models::{
    ConnectionEntry, FriendsPage, IncomingRequest, Profile, RequestId, RequestsPage, SubjectId,
};

const ME: i64 = 1;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Profile,
    Friends { query: String, page: u32, size: u32, at: Instant },
    Unfriend(i64),
    Requests,
    Accept(i64),
    Decline(i64),
}

#[derive(Default)]
struct FakeState {
    friends: Vec<ConnectionEntry>,
    requests: Vec<IncomingRequest>,
    calls: Vec<Call>,
    query_delays: HashMap<String, Duration>,
    mutation_delay: Duration,
    reject_session: bool,
    fail_mutations: bool,
}

struct FakeSocial {
    state: Mutex<FakeState>,
}

impl FakeSocial {
    fn new(friends: &[(i64, &str)]) -> Arc<Self> {
        let state = FakeState {
            friends: friends.iter().map(|&(id, name)| friend(id, name)).collect(),
            ..FakeState::default()
        };
        Arc::new(Self {
            state: Mutex::new(state),
        })
    }

    fn numbered(count: i64) -> Arc<Self> {
        let names: Vec<(i64, String)> = (1..=count).map(|i| (100 + i, format!("friend{:02}", i))).collect();
        let borrowed: Vec<(i64, &str)> = names.iter().map(|(id, n)| (*id, n.as_str())).collect();
        Self::new(&borrowed)
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake state poisoned")
    }

    fn add_request(&self, request_id: i64, requester: i64, name: &str) {
        self.state().requests.push(IncomingRequest::new(
            RequestId(request_id),
            SubjectId(requester),
            Some(name.to_string()),
            None,
        ));
    }

    fn friend_calls(&self) -> Vec<(String, u32)> {
        self.state()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Friends { query, page, .. } => Some((query.clone(), *page)),
                _ => None,
            })
            .collect()
    }

    fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    fn mutation_outcome(&self) -> (Duration, bool) {
        let state = self.state();
        (state.mutation_delay, state.fail_mutations)
    }
}

fn friend(id: i64, name: &str) -> ConnectionEntry {
    ConnectionEntry {
        subject_id: SubjectId(id),
        display_name: Some(name.to_string()),
        avatar_ref: None,
    }
}

#[async_trait]
impl SocialApi for FakeSocial {
    async fn fetch_profile(&self) -> Result<Profile, ApiError> {
        self.state().calls.push(Call::Profile);
        Ok(Profile {
            user_id: Some(SubjectId(ME)),
            ..Profile::default()
        })
    }

    async fn list_friends(
        &self,
        owner: SubjectId,
        search: &str,
        page: u32,
        size: u32,
    ) -> Result<FriendsPage, ApiError> {
        assert_eq!(owner, SubjectId(ME));
        let (result, delay) = {
            let mut state = self.state();
            state.calls.push(Call::Friends {
                query: search.to_string(),
                page,
                size,
                at: Instant::now(),
            });
            let delay = state.query_delays.get(search).copied().unwrap_or_default();
            let result = if state.reject_session {
                Err(ApiError::Unauthorized)
            } else {
                let needle = search.to_lowercase();
                let matching: Vec<ConnectionEntry> = state
                    .friends
                    .iter()
                    .filter(|f| f.name().to_lowercase().contains(&needle))
                    .cloned()
                    .collect();
                let skip = ((page.max(1) - 1) * size) as usize;
                Ok(FriendsPage {
                    total: matching.len() as u64,
                    items: matching.into_iter().skip(skip).take(size as usize).collect(),
                })
            };
            (result, delay)
        };
        sleep(delay).await;
        result
    }

    async fn unfriend(&self, target: SubjectId) -> Result<(), ApiError> {
        self.state().calls.push(Call::Unfriend(target.0));
        let (delay, fail) = self.mutation_outcome();
        sleep(delay).await;
        if fail {
            return Err(ApiError::ServerError(Some("unfriend exploded".to_string())));
        }
        self.state().friends.retain(|f| f.subject_id != target);
        Ok(())
    }

    async fn list_incoming_requests(&self, _page: u32, _size: u32) -> Result<RequestsPage, ApiError> {
        let mut state = self.state();
        state.calls.push(Call::Requests);
        Ok(RequestsPage {
            items: state.requests.clone(),
        })
    }

    async fn accept_request(&self, request_id: RequestId) -> Result<(), ApiError> {
        self.state().calls.push(Call::Accept(request_id.0));
        let (delay, fail) = self.mutation_outcome();
        sleep(delay).await;
        if fail {
            return Err(ApiError::ServerError(None));
        }
        let mut state = self.state();
        if let Some(pos) = state.requests.iter().position(|r| r.request_id == request_id) {
            let request = state.requests.remove(pos);
            let name = request.name();
            state.friends.push(friend(request.requester_id.0, &name));
        }
        Ok(())
    }

    async fn decline_request(&self, request_id: RequestId) -> Result<(), ApiError> {
        self.state().calls.push(Call::Decline(request_id.0));
        let (delay, fail) = self.mutation_outcome();
        sleep(delay).await;
        if fail {
            return Err(ApiError::ServerError(None));
        }
        self.state().requests.retain(|r| r.request_id != request_id);
        Ok(())
    }
}

fn settings(policy: FailurePolicy) -> ControllerSettings {
    ControllerSettings {
        failure_policy: policy,
        ..ControllerSettings::default()
    }
}

async fn started(fake: &Arc<FakeSocial>, settings: ControllerSettings) -> TabCoordinator {
    let mut coordinator = TabCoordinator::new(fake.clone(), settings);
    coordinator.resolve_identity();
    coordinator.settle().await;
    coordinator
}

fn shown(coordinator: &TabCoordinator) -> Vec<i64> {
    coordinator
        .connections()
        .entries()
        .iter()
        .map(|e| e.subject_id.0)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn fetches_wait_for_identity() {
    let fake = FakeSocial::new(&[(2, "ploy"), (3, "mint")]);
    fake.add_request(10, 4, "fah");
    let mut coordinator = TabCoordinator::new(fake.clone(), ControllerSettings::default());

    assert!(matches!(
        coordinator.refresh_connections(),
        Err(FetchError::IdentityUnresolved)
    ));
    assert!(matches!(
        coordinator.refresh_requests(),
        Err(FetchError::IdentityUnresolved)
    ));
    assert!(fake.calls().is_empty());

    coordinator.resolve_identity();
    coordinator.settle().await;

    assert_eq!(coordinator.identity(), Some(SubjectId(ME)));
    assert_eq!(shown(&coordinator), vec![2, 3]);
    assert_eq!(coordinator.page().total_count, 2);
    assert_eq!(coordinator.request_badge(), 1);
    assert_eq!(fake.friend_calls(), vec![(String::new(), 1)]);
    assert!(coordinator.drain_notifications().is_empty());
}

#[tokio::test(start_paused = true)]
async fn search_burst_issues_one_fetch_after_quiet_window() {
    let fake = FakeSocial::new(&[(2, "somchai"), (3, "somsak"), (4, "mint")]);
    let mut coordinator = started(&fake, ControllerSettings::default()).await;
    let t0 = Instant::now();

    coordinator.on_query_change("s");
    advance(Duration::from_millis(50)).await;
    coordinator.on_query_change("so");
    advance(Duration::from_millis(50)).await;
    coordinator.on_query_change("som");
    advance(Duration::from_millis(20)).await;
    coordinator.on_query_change("somc");
    coordinator.settle().await;

    let searches: Vec<(String, Instant)> = fake
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::Friends { query, at, .. } if !query.is_empty() => Some((query, at)),
            _ => None,
        })
        .collect();
    assert_eq!(searches.len(), 1);
    assert_eq!(searches[0].0, "somc");
    assert_eq!(searches[0].1 - t0, Duration::from_millis(420));

    assert_eq!(coordinator.page().query, "somc");
    assert_eq!(shown(&coordinator), vec![2]);
}

#[tokio::test(start_paused = true)]
async fn slower_older_search_is_discarded() {
    let fake = FakeSocial::new(&[(2, "xavier"), (3, "xena"), (4, "yuki")]);
    {
        let mut state = fake.state();
        state.query_delays.insert("x".to_string(), Duration::from_millis(800));
        state.query_delays.insert("y".to_string(), Duration::from_millis(20));
    }
    let mut coordinator = started(&fake, ControllerSettings::default()).await;

    coordinator.on_query_change("x");
    let wakeup = coordinator.next_wakeup().await.expect("search armed");
    assert!(matches!(wakeup, Wakeup::SearchDue));
    coordinator.handle(wakeup);
    assert!(coordinator.is_loading());

    coordinator.on_query_change("y");
    coordinator.settle().await;

    assert_eq!(
        fake.friend_calls(),
        vec![(String::new(), 1), ("x".to_string(), 1), ("y".to_string(), 1)]
    );
    assert_eq!(shown(&coordinator), vec![4]);
    assert_eq!(coordinator.page().total_count, 1);
    assert!(!coordinator.is_loading());
    assert!(coordinator.drain_notifications().is_empty());
}

#[tokio::test(start_paused = true)]
async fn paging_clamps_after_list_shrinks() {
    let fake = FakeSocial::numbered(45);
    let mut coordinator = started(&fake, ControllerSettings::default()).await;

    assert_eq!(coordinator.page().total_pages(), 3);
    assert!(coordinator.set_page(10));
    assert_eq!(coordinator.page().page_number, 3);
    assert!(!coordinator.set_page(3));
    coordinator.settle().await;
    assert_eq!(coordinator.connections().entries().len(), 5);
    assert!(!coordinator.next_page());

    // Five friends disappear elsewhere
    fake.state().friends.truncate(40);
    coordinator.refresh();
    coordinator.settle().await;

    assert_eq!(coordinator.page().total_count, 40);
    assert_eq!(coordinator.page().total_pages(), 2);
    assert_eq!(coordinator.page().page_number, 2);
    assert_eq!(coordinator.connections().entries().len(), 20);
    let calls = fake.friend_calls();
    assert_eq!(
        &calls[calls.len() - 2..],
        &[(String::new(), 3), (String::new(), 2)]
    );

    assert!(coordinator.prev_page());
    coordinator.settle().await;
    assert_eq!(coordinator.page().page_number, 1);
    assert_eq!(shown(&coordinator)[0], 101);
}

#[tokio::test(start_paused = true)]
async fn unfriend_on_last_page_clamps_next_fetch() {
    let fake = FakeSocial::numbered(41);
    let mut coordinator = started(&fake, ControllerSettings::default()).await;

    assert!(coordinator.set_page(3));
    coordinator.settle().await;
    assert_eq!(shown(&coordinator), vec![141]);

    coordinator.unfriend(SubjectId(141)).expect("friend is listed");
    coordinator.settle().await;
    assert_eq!(coordinator.page().total_count, 40);
    // Removing never refetches on its own
    assert_eq!(coordinator.page().page_number, 3);
    assert_eq!(fake.friend_calls().last(), Some(&(String::new(), 3)));

    coordinator.refresh();
    assert_eq!(coordinator.page().page_number, 2);
    coordinator.settle().await;

    assert_eq!(fake.friend_calls().last(), Some(&(String::new(), 2)));
    assert_eq!(fake.friend_calls().iter().filter(|(_, p)| *p == 3).count(), 1);
    assert_eq!(coordinator.connections().entries().len(), 20);
    assert_eq!(coordinator.page().total_count, 40);
}

#[tokio::test(start_paused = true)]
async fn accept_removes_now_and_refreshes_friends_once() {
    let fake = FakeSocial::new(&[(2, "ploy")]);
    fake.add_request(123, 77, "namtan");
    fake.add_request(124, 78, "bam");
    fake.state().mutation_delay = Duration::from_millis(100);
    let mut coordinator = started(&fake, ControllerSettings::default()).await;
    let before = fake.friend_calls().len();

    coordinator.accept(RequestId(123)).expect("request is pending");
    assert!(coordinator.requests().get(RequestId(123)).is_none());
    assert_eq!(coordinator.request_badge(), 1);

    coordinator.settle().await;

    assert_eq!(fake.friend_calls().len(), before + 1);
    assert_eq!(shown(&coordinator), vec![2, 77]);
    assert_eq!(coordinator.request_badge(), 1);
    let notices = coordinator.drain_notifications();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::Info);
    assert!(!notices[0].is_error());

    let again = coordinator.accept(RequestId(123));
    assert!(matches!(again, Err(MutationError::UnknownRequest(RequestId(123)))));
}

#[tokio::test(start_paused = true)]
async fn decline_never_touches_friend_list() {
    let fake = FakeSocial::new(&[(2, "ploy")]);
    fake.add_request(55, 9, "pim");
    let mut coordinator = started(&fake, ControllerSettings::default()).await;
    coordinator.set_view(View::Requests);
    coordinator.settle().await;
    let before = fake.friend_calls().len();

    coordinator.decline(RequestId(55)).expect("request is pending");
    assert_eq!(coordinator.request_badge(), 0);
    coordinator.settle().await;

    assert_eq!(fake.friend_calls().len(), before);
    assert!(fake.calls().contains(&Call::Decline(55)));
    assert_eq!(coordinator.request_badge(), 0);
}

#[tokio::test(start_paused = true)]
async fn empty_search_round_trip_restores_list() {
    let fake = FakeSocial::new(&[(2, "anan"), (3, "boon"), (4, "chai")]);
    let mut coordinator = started(&fake, ControllerSettings::default()).await;
    let initial = shown(&coordinator);
    let initial_total = coordinator.page().total_count;

    coordinator.on_query_change("boon");
    coordinator.settle().await;
    assert_eq!(shown(&coordinator), vec![3]);

    coordinator.on_query_change("");
    coordinator.settle().await;

    assert_eq!(shown(&coordinator), initial);
    assert_eq!(coordinator.page().total_count, initial_total);
    assert_eq!(coordinator.page().page_number, 1);
    assert_eq!(coordinator.page().query, "");
}

#[tokio::test(start_paused = true)]
async fn failed_unfriend_follows_failure_policy() {
    for (policy, expected, total) in [
        (FailurePolicy::KeepRemoved, vec![2, 4], 2),
        (FailurePolicy::Rollback, vec![2, 3, 4], 3),
    ] {
        let fake = FakeSocial::new(&[(2, "anan"), (3, "boon"), (4, "chai")]);
        fake.state().fail_mutations = true;
        let mut coordinator = started(&fake, settings(policy)).await;

        coordinator.unfriend(SubjectId(3)).expect("friend is listed");
        assert_eq!(shown(&coordinator), vec![2, 4]);
        assert_eq!(coordinator.page().total_count, 2);

        coordinator.settle().await;

        assert_eq!(shown(&coordinator), expected, "{:?}", policy);
        assert_eq!(coordinator.page().total_count, total, "{:?}", policy);
        let notices = coordinator.drain_notifications();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::Error);
        assert_eq!(notices[0].message, "unfriend exploded");
    }
}

#[tokio::test(start_paused = true)]
async fn failed_decline_rolls_back_when_configured() {
    let fake = FakeSocial::new(&[]);
    fake.add_request(1, 10, "a");
    fake.add_request(2, 11, "b");
    fake.state().fail_mutations = true;
    let mut coordinator = started(&fake, settings(FailurePolicy::Rollback)).await;

    coordinator.decline(RequestId(2)).expect("request is pending");
    assert_eq!(coordinator.request_badge(), 1);
    coordinator.settle().await;

    assert_eq!(coordinator.request_badge(), 2);
    let notices = coordinator.drain_notifications();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, "Could not decline the request");
}

#[tokio::test(start_paused = true)]
async fn refresh_during_unfriend_does_not_resurrect() {
    let fake = FakeSocial::new(&[(2, "anan"), (3, "boon"), (4, "chai")]);
    fake.state().mutation_delay = Duration::from_millis(200);
    let mut coordinator = started(&fake, ControllerSettings::default()).await;

    coordinator.unfriend(SubjectId(3)).expect("friend is listed");
    // Lands long before the service processes the delete
    coordinator.refresh();
    coordinator.settle().await;

    assert_eq!(shown(&coordinator), vec![2, 4]);
    assert_eq!(coordinator.page().total_count, 2);

    coordinator.refresh();
    coordinator.settle().await;
    assert_eq!(shown(&coordinator), vec![2, 4]);
    assert_eq!(coordinator.page().total_count, 2);
    assert!(coordinator.drain_notifications().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unauthorized_fetch_reports_session_expired() {
    let fake = FakeSocial::new(&[(2, "anan")]);
    let mut coordinator = started(&fake, ControllerSettings::default()).await;

    fake.state().reject_session = true;
    coordinator.refresh();
    coordinator.settle().await;

    assert_eq!(shown(&coordinator), vec![2]);
    let notices = coordinator.drain_notifications();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::SessionExpired);
}

#[tokio::test(start_paused = true)]
async fn switching_tabs_defers_typed_search() {
    let fake = FakeSocial::new(&[(2, "anan"), (3, "boon")]);
    let mut coordinator = started(&fake, ControllerSettings::default()).await;
    let before = fake.friend_calls().len();

    coordinator.set_view(View::Connections);
    assert_eq!(fake.friend_calls().len(), before);

    coordinator.on_query_change("boon");
    coordinator.set_view(View::Add);
    assert!(!coordinator.is_search_pending());
    coordinator.settle().await;
    assert_eq!(fake.friend_calls().len(), before);

    coordinator.on_query_change("ignored");
    assert_eq!(coordinator.typed_query(), "boon");

    coordinator.set_view(View::Connections);
    coordinator.settle().await;
    assert_eq!(fake.friend_calls().last(), Some(&("boon".to_string(), 1)));
    assert_eq!(shown(&coordinator), vec![3]);
}

#[tokio::test(start_paused = true)]
async fn rollback_survives_refresh_during_failed_unfriend() {
    let fake = FakeSocial::new(&[(2, "anan"), (3, "boon"), (4, "chai")]);
    {
        let mut state = fake.state();
        state.mutation_delay = Duration::from_millis(200);
        state.fail_mutations = true;
    }
    let mut coordinator = started(&fake, settings(FailurePolicy::Rollback)).await;

    coordinator.unfriend(SubjectId(3)).expect("friend is listed");
    coordinator.refresh();
    coordinator.settle().await;

    assert_eq!(shown(&coordinator), vec![2, 3, 4]);
    assert_eq!(coordinator.page().total_count, 3);
    assert_eq!(coordinator.drain_notifications().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn reconnect_drops_results_from_old_session() {
    let old = FakeSocial::new(&[(2, "anan")]);
    old.state()
        .query_delays
        .insert(String::new(), Duration::from_millis(500));
    let mut coordinator = TabCoordinator::new(old.clone(), ControllerSettings::default());
    coordinator.resolve_identity();
    // Profile lands; the slow friends fetch is still out
    let wakeup = coordinator.next_wakeup().await.expect("profile in flight");
    coordinator.handle(wakeup);
    assert!(coordinator.is_loading());

    let fresh = FakeSocial::new(&[(5, "dao")]);
    coordinator.reconnect(fresh.clone());
    coordinator.settle().await;

    assert_eq!(shown(&coordinator), vec![5]);
    assert_eq!(coordinator.identity(), Some(SubjectId(ME)));
    assert!(!coordinator.is_loading());
    assert_eq!(fresh.friend_calls(), vec![(String::new(), 1)]);
    assert!(coordinator.drain_notifications().is_empty());
}

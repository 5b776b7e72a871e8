//! A mounted, self-refreshing view over one derived resource.
//!
//! Mounting subscribes the view's channels on the [`ChangeFeed`] and runs the
//! initial load. Each notification starts a background re-fetch. Results are
//! applied in sequence order and only while the view is mounted.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::db::view_queries::{FetchError, ViewSource};
use crate::league::views::{ViewFetcher, TOP_SCORERS_LIMIT};
use crate::models::change::Table;
use crate::models::matches::{MatchDetail, MatchStatus, MatchWithTeams};
use crate::models::scorer::RankedScorer;
use crate::models::standing::StandingRow;
use crate::services::change_feed::{ChangeFeed, RowFilter, Subscription, SubscriptionError, TableBinding};

/// Payload a live view can hold.
pub trait ViewData: Clone + Default + Serialize + Send + Sync + 'static {
    fn is_empty(&self) -> bool;
}

impl<T: Clone + Serialize + Send + Sync + 'static> ViewData for Vec<T> {
    fn is_empty(&self) -> bool {
        <[T]>::is_empty(self)
    }
}

impl<T: Clone + Serialize + Send + Sync + 'static> ViewData for Option<T> {
    fn is_empty(&self) -> bool {
        self.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewStatus {
    Loading,
    Error,
    Empty,
    Ready,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewState<T> {
    pub data: T,
    pub loading: bool,
    pub error: Option<String>,
    #[serde(skip)]
    applied_seq: u64,
}

impl<T: Default> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            data: T::default(),
            loading: true,
            error: None,
            applied_seq: 0,
        }
    }
}

impl<T: ViewData> ViewState<T> {
    pub fn status(&self) -> ViewStatus {
        if self.loading {
            ViewStatus::Loading
        } else if self.error.is_some() {
            ViewStatus::Error
        } else if self.data.is_empty() {
            ViewStatus::Empty
        } else {
            ViewStatus::Ready
        }
    }
}

/// Who asked for a fetch decides what a failure does to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOrigin {
    /// Initial load or manual refresh: failures are surfaced.
    UserInitiated,
    /// Change notification: failures are logged and the current data stays.
    Notification,
}

type Loader<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, FetchError>> + Send + Sync>;

#[derive(Debug, Clone)]
struct ChannelListener {
    channel: String,
    bindings: Vec<TableBinding>,
}

struct ViewCore<T> {
    name: String,
    instance_id: Uuid,
    loader: Loader<T>,
    state: watch::Sender<ViewState<T>>,
    next_seq: AtomicU64,
    mounted: AtomicBool,
}

impl<T: ViewData> ViewCore<T> {
    fn begin(&self) -> (u64, BoxFuture<'static, Result<T, FetchError>>) {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        (seq, (self.loader)())
    }

    fn spawn_fetch(self: &Arc<Self>, origin: FetchOrigin) -> JoinHandle<bool> {
        let (seq, pending) = self.begin();
        let core = self.clone();
        tokio::spawn(async move { core.complete(seq, pending, origin).await })
    }

    /// Await `pending` and apply it. Returns whether the state changed.
    async fn complete(
        &self,
        seq: u64,
        pending: BoxFuture<'static, Result<T, FetchError>>,
        origin: FetchOrigin,
    ) -> bool {
        let result = pending.await;
        let name = &self.name;
        let mounted = &self.mounted;

        // The mounted check runs under the state lock, so it cannot race unmount
        self.state.send_if_modified(|state| {
            if !mounted.load(Ordering::SeqCst) {
                tracing::debug!("Discarding {} result #{} after unmount", name, seq);
                return false;
            }
            if seq < state.applied_seq {
                tracing::debug!("Discarding stale {} result #{} (applied #{})", name, seq, state.applied_seq);
                return false;
            }
            match result {
                Ok(data) => {
                    state.data = data;
                    state.error = None;
                    state.loading = false;
                    state.applied_seq = seq;
                    true
                }
                Err(e) if origin == FetchOrigin::UserInitiated => {
                    tracing::error!("Failed to load {}: {}", name, e);
                    state.data = T::default();
                    state.error = Some(e.to_string());
                    state.loading = false;
                    state.applied_seq = seq;
                    true
                }
                Err(e) => {
                    tracing::warn!("Background refresh of {} failed, keeping current data: {}", name, e);
                    false
                }
            }
        })
    }
}

pub struct LiveView<T: ViewData> {
    core: Arc<ViewCore<T>>,
    channels: Vec<ChannelListener>,
    subscriptions: Vec<Subscription>,
}

impl<T: ViewData> LiveView<T> {
    pub fn new<F, Fut>(name: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let (state, _) = watch::channel(ViewState::default());
        let loader: Loader<T> = Arc::new(move || loader().boxed());
        Self {
            core: Arc::new(ViewCore {
                name: name.into(),
                instance_id: Uuid::new_v4(),
                loader,
                state,
                next_seq: AtomicU64::new(0),
                mounted: AtomicBool::new(false),
            }),
            channels: Vec::new(),
            subscriptions: Vec::new(),
        }
    }

    /// Re-fetch whenever `channel` reports a change on any of `bindings`.
    pub fn listen(mut self, channel: impl Into<String>, bindings: Vec<TableBinding>) -> Self {
        self.channels.push(ChannelListener { channel: channel.into(), bindings });
        self
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn instance_id(&self) -> Uuid {
        self.core.instance_id
    }

    pub fn is_mounted(&self) -> bool {
        self.core.mounted.load(Ordering::SeqCst)
    }

    pub fn channels(&self) -> Vec<&str> {
        self.channels.iter().map(|listener| listener.channel.as_str()).collect()
    }

    pub fn snapshot(&self) -> ViewState<T> {
        self.core.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<ViewState<T>> {
        self.core.state.subscribe()
    }

    /// Show `data` until the first fetch result lands (stale-while-revalidate).
    /// Ignored once any result has been applied.
    pub fn seed(&self, data: T) -> bool {
        self.core.state.send_if_modified(|state| {
            if state.applied_seq > 0 {
                return false;
            }
            state.data = data;
            true
        })
    }

    /// Subscribe every channel, then run the initial load. Mounting an already
    /// mounted view does nothing.
    pub async fn mount(&mut self, feed: &ChangeFeed) -> Result<(), SubscriptionError> {
        if self.core.mounted.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::info!("🔗 Mounting {} view ({})", self.core.name, self.core.instance_id);

        let mut failure = None;
        for listener in &self.channels {
            let core = self.core.clone();
            let subscription = feed.subscribe(&listener.channel, self.core.instance_id, listener.bindings.clone(), move || {
                core.spawn_fetch(FetchOrigin::Notification);
            });
            match subscription {
                Ok(subscription) => self.subscriptions.push(subscription),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        if let Some(e) = failure {
            self.unmount();
            return Err(e);
        }

        self.load().await;
        Ok(())
    }

    /// User-initiated fetch: a failure clears the data and sets the error.
    pub async fn load(&self) -> bool {
        let core = &self.core;
        let mounted = &core.mounted;
        let started = core.state.send_if_modified(|state| {
            if !mounted.load(Ordering::SeqCst) {
                return false;
            }
            state.loading = true;
            state.error = None;
            true
        });
        if !started {
            return false;
        }
        let (seq, pending) = core.begin();
        core.complete(seq, pending, FetchOrigin::UserInitiated).await
    }

    /// Background fetch, as triggered by a change notification.
    pub fn spawn_refresh(&self) -> JoinHandle<bool> {
        self.core.spawn_fetch(FetchOrigin::Notification)
    }

    /// Release every channel. Fetches still in flight finish but are not applied.
    pub fn unmount(&mut self) {
        let mounted = &self.core.mounted;
        let mut was_mounted = false;
        // Flip the flag under the state lock so no in-flight result slips in after it
        self.core.state.send_if_modified(|_| {
            was_mounted = mounted.swap(false, Ordering::SeqCst);
            false
        });
        for mut subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }
        if was_mounted {
            tracing::info!("❌ Unmounted {} view ({})", self.core.name, self.core.instance_id);
        }
    }
}

impl<T: ViewData> Drop for LiveView<T> {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Standings re-fetch on `team_statistics` and on `matches`, as two
/// independent channels. Seeded from the offline cache when available.
pub fn standings_view<S: ViewSource>(fetcher: ViewFetcher<S>) -> LiveView<Vec<StandingRow>> {
    let cached = fetcher.cached_standings();
    let view = LiveView::new("standings", move || {
        let fetcher = fetcher.clone();
        async move { fetcher.fetch_standings().await }
    })
    .listen("standings-changes", vec![TableBinding::table(Table::TeamStatistics)])
    .listen("standings-matches-changes", vec![TableBinding::table(Table::Matches)]);

    if let Some(cached) = cached {
        view.seed(cached);
    }
    view
}

pub fn top_scorers_view<S: ViewSource>(fetcher: ViewFetcher<S>) -> LiveView<Vec<RankedScorer>> {
    LiveView::new("top-scorers", move || {
        let fetcher = fetcher.clone();
        async move { fetcher.fetch_top_scorers(TOP_SCORERS_LIMIT).await }
    })
    .listen("top-scorers-changes", vec![TableBinding::table(Table::MatchEvents)])
}

pub fn matches_view<S: ViewSource>(
    fetcher: ViewFetcher<S>,
    status: Option<MatchStatus>,
) -> LiveView<Vec<MatchWithTeams>> {
    LiveView::new("matches", move || {
        let fetcher = fetcher.clone();
        async move { fetcher.fetch_matches(status).await }
    })
    .listen("matches-changes", vec![TableBinding::table(Table::Matches)])
}

/// One match and its timeline; only changes to that match or its events count.
pub fn match_detail_view<S: ViewSource>(fetcher: ViewFetcher<S>, match_id: Uuid) -> LiveView<Option<MatchDetail>> {
    LiveView::new(format!("match-{}", match_id), move || {
        let fetcher = fetcher.clone();
        async move { fetcher.fetch_match_detail(match_id).await }
    })
    .listen(
        format!("match-{}", match_id),
        vec![TableBinding::filtered(Table::Matches, RowFilter::RecordId(match_id))],
    )
    .listen(
        format!("match-events-{}", match_id),
        vec![TableBinding::filtered(Table::MatchEvents, RowFilter::MatchId(match_id))],
    )
}

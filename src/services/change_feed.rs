use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::change::{ChangeEvent, Table};

/// Restricts a binding to the rows of a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFilter {
    /// The changed row itself has this id.
    RecordId(Uuid),
    /// The changed row belongs to this match.
    MatchId(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableBinding {
    pub table: Table,
    pub filter: Option<RowFilter>,
}

impl TableBinding {
    pub fn table(table: Table) -> Self {
        Self { table, filter: None }
    }

    pub fn filtered(table: Table, filter: RowFilter) -> Self {
        Self { table, filter: Some(filter) }
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if event.table != self.table {
            return false;
        }
        match self.filter {
            None => true,
            Some(RowFilter::RecordId(id)) => event.record_id == Some(id),
            Some(RowFilter::MatchId(id)) => event.match_id == Some(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Unsubscribed,
    Subscribing,
    Active,
}

impl SubscriptionState {
    fn as_u8(self) -> u8 {
        match self {
            SubscriptionState::Unsubscribed => 0,
            SubscriptionState::Subscribing => 1,
            SubscriptionState::Active => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => SubscriptionState::Subscribing,
            2 => SubscriptionState::Active,
            _ => SubscriptionState::Unsubscribed,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    #[error("Channel {channel} already has an active subscription for instance {instance_id}")]
    AlreadyActive { channel: String, instance_id: Uuid },
}

type Registry = Arc<Mutex<HashSet<(String, Uuid)>>>;

/// In-process fan-out of table change notifications. Cheap to clone; every
/// clone publishes to and subscribes from the same bus.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
    active: Registry,
}

impl fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("receivers", &self.sender.receiver_count())
            .field("active_channels", &self.active_channels())
            .finish()
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Deliver a notification to every live subscription. Returns how many
    /// receivers saw it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        tracing::debug!("📣 Change on {} ({:?})", event.table, event.kind);
        // No receivers is not an error: nobody is watching right now
        self.sender.send(event).unwrap_or(0)
    }

    pub fn active_channels(&self) -> usize {
        self.active.lock().map(|active| active.len()).unwrap_or(0)
    }

    /// Open `channel` for one consumer instance. `on_change` runs once per
    /// notification on any bound table, until the subscription is torn down.
    pub fn subscribe<F>(
        &self,
        channel: &str,
        instance_id: Uuid,
        bindings: Vec<TableBinding>,
        on_change: F,
    ) -> Result<Subscription, SubscriptionError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let registry_key = (channel.to_string(), instance_id);
        {
            let mut active = self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if !active.insert(registry_key.clone()) {
                return Err(SubscriptionError::AlreadyActive {
                    channel: channel.to_string(),
                    instance_id,
                });
            }
        }

        let state = Arc::new(AtomicU8::new(SubscriptionState::Subscribing.as_u8()));
        let gate = Arc::new(RwLock::new(false));
        let mut receiver = self.sender.subscribe();

        let task = {
            let state = state.clone();
            let gate = gate.clone();
            let channel = channel.to_string();
            tokio::spawn(async move {
                let _ = state.compare_exchange(
                    SubscriptionState::Subscribing.as_u8(),
                    SubscriptionState::Active.as_u8(),
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                );
                tracing::debug!("✅ Channel {} active for {}", channel, instance_id);

                loop {
                    match receiver.recv().await {
                        Ok(event) => {
                            if bindings.iter().any(|binding| binding.matches(&event))
                                && !deliver(&gate, &on_change)
                            {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(
                                "Channel {} lagged by {} notifications, forcing a refresh",
                                channel, skipped
                            );
                            if !deliver(&gate, &on_change) {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                    }
                }

                state.store(SubscriptionState::Unsubscribed.as_u8(), Ordering::SeqCst);
            })
        };

        Ok(Subscription {
            channel: registry_key.0.clone(),
            instance_id,
            state,
            gate,
            task: Some(task),
            registry: self.active.clone(),
        })
    }
}

/// Run `on_change` unless the subscription was closed. Returns `false` once closed.
fn deliver<F: Fn()>(gate: &RwLock<bool>, on_change: &F) -> bool {
    let closed = gate.read().unwrap_or_else(|poisoned| poisoned.into_inner());
    if *closed {
        return false;
    }
    on_change();
    true
}

/// Handle on one subscribed channel. Dropping it unsubscribes.
pub struct Subscription {
    channel: String,
    instance_id: Uuid,
    state: Arc<AtomicU8>,
    // `true` once unsubscribed; callbacks run under the read lock
    gate: Arc<RwLock<bool>>,
    task: Option<JoinHandle<()>>,
    registry: Registry,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("instance_id", &self.instance_id)
            .field("state", &self.state())
            .finish()
    }
}

impl Subscription {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn state(&self) -> SubscriptionState {
        SubscriptionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Stop delivery and release the channel. Waits for a callback that is
    /// already running; no callback starts after this returns. Must not be
    /// called from inside this subscription's own callback.
    pub fn unsubscribe(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        *self.gate.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = true;
        self.state.store(SubscriptionState::Unsubscribed.as_u8(), Ordering::SeqCst);
        task.abort();

        if let Ok(mut active) = self.registry.lock() {
            active.remove(&(self.channel.clone(), self.instance_id));
        }
        tracing::debug!("❌ Channel {} released by {}", self.channel, self.instance_id);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::change::ChangeKind;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    async fn wait_until_active(subscription: &Subscription) {
        for _ in 0..100 {
            if subscription.state() == SubscriptionState::Active {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("subscription never became active");
    }

    #[tokio::test]
    async fn test_matching_notification_triggers_exactly_one_callback() {
        let feed = ChangeFeed::new(16);
        let (count, on_change) = counter();
        let subscription = feed
            .subscribe("top-scorers-changes", Uuid::new_v4(), vec![TableBinding::table(Table::MatchEvents)], on_change)
            .unwrap();
        wait_until_active(&subscription).await;

        feed.publish(ChangeEvent::new(Table::MatchEvents, ChangeKind::Insert));
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unrelated_table_triggers_nothing() {
        let feed = ChangeFeed::new(16);
        let (count, on_change) = counter();
        let subscription = feed
            .subscribe("top-scorers-changes", Uuid::new_v4(), vec![TableBinding::table(Table::MatchEvents)], on_change)
            .unwrap();
        wait_until_active(&subscription).await;

        feed.publish(ChangeEvent::new(Table::Teams, ChangeKind::Update));
        feed.publish(ChangeEvent::new(Table::Matches, ChangeKind::Update));
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_every_event_kind_is_delivered_without_batching() {
        let feed = ChangeFeed::new(16);
        let (count, on_change) = counter();
        let subscription = feed
            .subscribe("matches-changes", Uuid::new_v4(), vec![TableBinding::table(Table::Matches)], on_change)
            .unwrap();
        wait_until_active(&subscription).await;

        for kind in [ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete] {
            feed.publish(ChangeEvent::new(Table::Matches, kind));
        }
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_row_filter_limits_to_current_match() {
        let feed = ChangeFeed::new(16);
        let match_id = Uuid::new_v4();
        let (count, on_change) = counter();
        let subscription = feed
            .subscribe(
                &format!("match-events-{}", match_id),
                Uuid::new_v4(),
                vec![TableBinding::filtered(Table::MatchEvents, RowFilter::MatchId(match_id))],
                on_change,
            )
            .unwrap();
        wait_until_active(&subscription).await;

        feed.publish(ChangeEvent::new(Table::MatchEvents, ChangeKind::Insert).with_match(Uuid::new_v4()));
        feed.publish(ChangeEvent::new(Table::MatchEvents, ChangeKind::Insert).with_match(match_id));
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery_and_releases_channel() {
        let feed = ChangeFeed::new(16);
        let (count, on_change) = counter();
        let instance_id = Uuid::new_v4();
        let mut subscription = feed
            .subscribe("standings-changes", instance_id, vec![TableBinding::table(Table::TeamStatistics)], on_change)
            .unwrap();
        wait_until_active(&subscription).await;
        assert_eq!(feed.active_channels(), 1);

        subscription.unsubscribe();
        assert_eq!(subscription.state(), SubscriptionState::Unsubscribed);
        assert_eq!(feed.active_channels(), 0);

        feed.publish(ChangeEvent::new(Table::TeamStatistics, ChangeKind::Update));
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        // The channel can be opened again by the same instance
        let (_, on_change) = counter();
        let again = feed.subscribe("standings-changes", instance_id, vec![TableBinding::table(Table::TeamStatistics)], on_change);
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_one_subscription_per_channel_and_instance() {
        let feed = ChangeFeed::new(16);
        let instance_id = Uuid::new_v4();
        let (_, first) = counter();
        let (_, second) = counter();
        let (_, other_instance) = counter();

        let _subscription = feed
            .subscribe("matches-changes", instance_id, vec![TableBinding::table(Table::Matches)], first)
            .unwrap();
        let duplicate = feed.subscribe("matches-changes", instance_id, vec![TableBinding::table(Table::Matches)], second);
        assert!(matches!(duplicate, Err(SubscriptionError::AlreadyActive { .. })));

        let other = feed.subscribe("matches-changes", Uuid::new_v4(), vec![TableBinding::table(Table::Matches)], other_instance);
        assert!(other.is_ok());
    }

    #[tokio::test]
    async fn test_drop_releases_channel() {
        let feed = ChangeFeed::new(16);
        let (_, on_change) = counter();
        {
            let _subscription = feed
                .subscribe("matches-changes", Uuid::new_v4(), vec![TableBinding::table(Table::Matches)], on_change)
                .unwrap();
            assert_eq!(feed.active_channels(), 1);
        }
        assert_eq!(feed.active_channels(), 0);
    }

    #[tokio::test]
    async fn test_independent_channels_each_trigger() {
        let feed = ChangeFeed::new(16);
        let instance_id = Uuid::new_v4();
        let (count, on_change) = counter();
        let on_change = Arc::new(on_change);
        let a = on_change.clone();
        let b = on_change.clone();
        let first = feed
            .subscribe("standings-changes", instance_id, vec![TableBinding::table(Table::TeamStatistics)], move || a())
            .unwrap();
        let second = feed
            .subscribe("standings-matches-changes", instance_id, vec![TableBinding::table(Table::Matches)], move || b())
            .unwrap();
        wait_until_active(&first).await;
        wait_until_active(&second).await;

        feed.publish(ChangeEvent::new(Table::Matches, ChangeKind::Update));
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        feed.publish(ChangeEvent::new(Table::TeamStatistics, ChangeKind::Update));
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unsubscribe_waits_for_running_callback() {
        let feed = ChangeFeed::new(16);
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let (s, f) = (started.clone(), finished.clone());
        let mut subscription = feed
            .subscribe("matches-changes", Uuid::new_v4(), vec![TableBinding::table(Table::Matches)], move || {
                s.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(100));
                f.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        wait_until_active(&subscription).await;

        feed.publish(ChangeEvent::new(Table::Matches, ChangeKind::Update));
        feed.publish(ChangeEvent::new(Table::Matches, ChangeKind::Update));
        for _ in 0..100 {
            if started.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(started.load(Ordering::SeqCst), 1);

        subscription.unsubscribe();
        // The running callback completed before unsubscribe returned
        assert_eq!(finished.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }
}

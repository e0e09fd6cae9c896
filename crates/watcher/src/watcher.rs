use std::sync::Arc;
use std::time::Duration;

use backend::{OrderRecord, OrdersApi, SessionApi};
use common::{Notifier, UserId, UserNotice};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Receiver side of the order list feed; always holds the latest poll
/// result.
pub type OrderFeed = watch::Receiver<Vec<OrderRecord>>;

/// Polls the remote order list for one user at a fixed interval.
///
/// Transient poll failures are logged and the loop keeps going. An
/// authentication-expired failure is different: the user is notified, the
/// remote session is terminated locally, and polling stops. A poll never
/// silently retries against an invalid session. The emitted sign-out auth
/// event is the shell's cue to navigate to the authentication entry point.
pub struct OrderStatusWatcher<O, S>
where
    O: OrdersApi,
    S: SessionApi,
{
    orders: O,
    session: S,
    notifier: Arc<dyn Notifier>,
    user: UserId,
    interval: Duration,
    feed: watch::Sender<Vec<OrderRecord>>,
}

/// Handle for stopping a spawned watcher.
pub struct WatcherHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Signals the watcher to stop and waits for it to finish.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }

    /// Waits for the watcher to finish on its own (e.g. session expiry).
    pub async fn join(self) {
        let _ = self.task.await;
    }

    /// Returns true once the watcher task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl<O, S> OrderStatusWatcher<O, S>
where
    O: OrdersApi + 'static,
    S: SessionApi + 'static,
{
    /// Creates a watcher for the given user and returns the order feed the
    /// order-list view renders from.
    pub fn new(
        orders: O,
        session: S,
        notifier: Arc<dyn Notifier>,
        user: UserId,
        interval: Duration,
    ) -> (Self, OrderFeed) {
        let (feed, receiver) = watch::channel(Vec::new());
        (
            Self {
                orders,
                session,
                notifier,
                user,
                interval,
                feed,
            },
            receiver,
        )
    }

    /// Spawns the polling loop.
    pub fn spawn(self) -> WatcherHandle {
        let (stop, stop_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(stop_rx));
        WatcherHandle { stop, task }
    }

    async fn run(self, mut stop: watch::Receiver<bool>) {
        tracing::debug!(user = %self.user, interval_ms = self.interval.as_millis() as u64, "order watcher started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.poll_once().await {
                        break;
                    }
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::debug!(user = %self.user, "order watcher stopped");
    }

    /// Polls once. Returns false when polling must stop.
    async fn poll_once(&self) -> bool {
        metrics::counter!("order_polls_total").increment(1);

        match self.orders.my_orders(self.user).await {
            Ok(orders) => {
                let _ = self.feed.send(orders);
                true
            }
            Err(e) if e.is_session_error() => {
                tracing::warn!(error = %e, "order poll rejected: session no longer valid");
                metrics::counter!("order_poll_session_expired_total").increment(1);
                self.notifier.notify(UserNotice::SessionExpired);
                if let Err(e) = self.session.sign_out().await {
                    tracing::warn!(error = %e, "sign-out after session expiry failed");
                }
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "order poll failed");
                metrics::counter!("order_poll_failures_total").increment(1);
                true
            }
        }
    }
}

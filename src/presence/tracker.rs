//! Public tracker handle
//!
//! `PresenceTracker` is a cheap-to-clone handle. Mutating calls enqueue a
//! command for the worker and return; reads come from the count snapshot the
//! worker publishes, so they never wait on the worker and may lag behind
//! registrations that are still queued.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::error::{PresenceError, Result};
use crate::registry::{SessionId, StreamId, SubscriberId};
use crate::store::{BroadcastLookup, ViewerStore};

use super::command::Command;
use super::config::PresenceConfig;
use super::sweep::SweepReport;
use super::worker::{PresenceWorker, ViewerCounts};

/// Handle to a running presence worker
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use viewer_presence::{MemoryStore, PresenceConfig, PresenceTracker, Settings};
///
/// # async fn example() -> Result<(), viewer_presence::PresenceError> {
/// let settings = Settings::with_fragment_duration("1");
/// let store = Arc::new(MemoryStore::new());
/// let (tracker, worker) = PresenceTracker::spawn(
///     PresenceConfig::from_settings(&settings),
///     Arc::clone(&store),
///     store,
/// );
///
/// tracker.register_viewer("stream1", "session-a", None)?;
/// tracker.register_viewer("stream1", "session-b", Some("bob"))?;
///
/// tracker.shutdown().await;
/// let _ = worker.await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    commands: mpsc::Sender<Command>,
    counts: watch::Receiver<ViewerCounts>,
}

impl PresenceTracker {
    /// Spawn a worker on the current tokio runtime and return its handle
    ///
    /// The worker stops after `shutdown` or once every handle is dropped.
    pub fn spawn<L, S>(
        config: PresenceConfig,
        lookup: Arc<L>,
        store: Arc<S>,
    ) -> (Self, JoinHandle<()>)
    where
        L: BroadcastLookup,
        S: ViewerStore,
    {
        let (command_tx, command_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (counts_tx, counts_rx) = watch::channel(ViewerCounts::new());

        let worker = PresenceWorker::new(config, lookup, store, command_rx, counts_tx);
        let handle = tokio::spawn(worker.run());

        (
            Self {
                commands: command_tx,
                counts: counts_rx,
            },
            handle,
        )
    }

    /// Record that a session is watching a stream
    ///
    /// Returns as soon as the registration is queued. A non-empty
    /// `subscriber_id` also emits a connect event for that subscriber. An
    /// empty subscriber id is treated as absent.
    pub fn register_viewer(
        &self,
        stream_id: &str,
        session_id: &str,
        subscriber_id: Option<&str>,
    ) -> Result<()> {
        if stream_id.is_empty() {
            return Err(PresenceError::EmptyIdentifier("stream_id"));
        }
        if session_id.is_empty() {
            return Err(PresenceError::EmptyIdentifier("session_id"));
        }

        let command = Command::Register {
            stream_id: StreamId::new(stream_id),
            session_id: SessionId::new(session_id),
            subscriber_id: subscriber_id
                .filter(|id| !id.is_empty())
                .map(SubscriberId::new),
        };

        self.commands.try_send(command).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                tracing::warn!(
                    stream = stream_id,
                    session = session_id,
                    "Presence queue full, registration dropped"
                );
                PresenceError::QueueFull
            }
            mpsc::error::TrySendError::Closed(_) => PresenceError::Closed,
        })
    }

    /// Active sessions of a stream (0 if unknown)
    pub fn viewer_count(&self, stream_id: &str) -> usize {
        self.counts.borrow().get(stream_id).copied().unwrap_or(0)
    }

    /// Active sessions across all streams
    pub fn total_viewer_count(&self) -> usize {
        self.counts.borrow().values().sum()
    }

    /// Snapshot of active sessions per stream
    pub fn viewer_counts(&self) -> ViewerCounts {
        self.counts.borrow().clone()
    }

    /// Forget every session, subscriber mapping and pending delta of a stream
    ///
    /// Resolves once the worker applied the reset. Unknown streams are a no-op.
    pub async fn reset_stream(&self, stream_id: &str) -> Result<()> {
        let (done, rx) = oneshot::channel();
        self.send(Command::Reset {
            stream_id: StreamId::new(stream_id),
            done,
        })
        .await?;
        rx.await.map_err(|_| PresenceError::Closed)
    }

    /// Run a reconciliation sweep now and return its report
    pub async fn sweep_now(&self) -> Result<SweepReport> {
        let (done, rx) = oneshot::channel();
        self.send(Command::Sweep { done }).await?;
        rx.await.map_err(|_| PresenceError::Closed)
    }

    /// Wait until every command queued before this call has been processed
    pub async fn barrier(&self) -> Result<()> {
        let (done, rx) = oneshot::channel();
        self.send(Command::Barrier { done }).await?;
        rx.await.map_err(|_| PresenceError::Closed)
    }

    /// Stop the worker after it processed everything queued before this call
    pub async fn shutdown(&self) {
        let (done, rx) = oneshot::channel();
        if self.send(Command::Shutdown { done }).await.is_ok() {
            let _ = rx.await;
        }
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PresenceError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::error::StoreError;
    use crate::store::{
        Broadcast, BroadcastStatus, ConnectionEvent, ConnectionEventType, MemoryStore,
    };

    const TIMEOUT: Duration = Duration::from_secs(20);

    /// Tracker whose timer never fires during a test; sweeps are explicit
    async fn manual_tracker(live: &[&str]) -> (PresenceTracker, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        for stream in live {
            store.set_status(*stream, BroadcastStatus::Broadcasting).await;
        }
        let config = PresenceConfig::default()
            .sweep_interval(Duration::from_secs(3600))
            .session_timeout(TIMEOUT);
        let (tracker, _worker) = PresenceTracker::spawn(config, Arc::clone(&store), Arc::clone(&store));
        (tracker, store)
    }

    /// Store whose connect events for one subscriber take `delay` to land
    struct SlowConnectStore {
        inner: MemoryStore,
        delay: Duration,
        slow_subscriber: &'static str,
    }

    impl BroadcastLookup for SlowConnectStore {
        async fn get(
            &self,
            stream_id: &StreamId,
        ) -> std::result::Result<Option<Broadcast>, StoreError> {
            self.inner.get(stream_id).await
        }
    }

    impl ViewerStore for SlowConnectStore {
        async fn update_viewer_count_delta(
            &self,
            stream_id: &StreamId,
            delta: i64,
        ) -> std::result::Result<(), StoreError> {
            self.inner.update_viewer_count_delta(stream_id, delta).await
        }

        async fn add_subscriber_connection_event(
            &self,
            stream_id: &StreamId,
            subscriber_id: &SubscriberId,
            event: ConnectionEvent,
        ) -> std::result::Result<(), StoreError> {
            if subscriber_id.as_str() == self.slow_subscriber {
                tokio::time::sleep(self.delay).await;
            }
            self.inner
                .add_subscriber_connection_event(stream_id, subscriber_id, event)
                .await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_and_count() {
        let (tracker, _store) = manual_tracker(&["x", "y"]).await;

        for session in ["a", "b", "c"] {
            assert_ok!(tracker.register_viewer("x", session, None));
        }
        assert_ok!(tracker.register_viewer("x", "a", None));
        assert_ok!(tracker.register_viewer("y", "a", None));
        assert_ok!(tracker.barrier().await);

        assert_eq!(tracker.viewer_count("x"), 3);
        assert_eq!(tracker.viewer_count("y"), 1);
        assert_eq!(tracker.viewer_count("unknown"), 0);
        assert_eq!(tracker.total_viewer_count(), 4);
        assert_eq!(tracker.viewer_counts().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_registration_counts_once() {
        let (tracker, store) = manual_tracker(&["x"]).await;

        assert_ok!(tracker.register_viewer("x", "a", None));
        assert_ok!(tracker.register_viewer("x", "a", None));
        let report = assert_ok!(tracker.sweep_now().await);

        assert_eq!(report.flushed("x"), Some(1));
        assert_eq!(store.viewer_count("x").await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejects_empty_identifiers() {
        let (tracker, _store) = manual_tracker(&[]).await;

        assert_eq!(
            tracker.register_viewer("", "a", None),
            Err(PresenceError::EmptyIdentifier("stream_id"))
        );
        assert_eq!(
            tracker.register_viewer("x", "", None),
            Err(PresenceError::EmptyIdentifier("session_id"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscriber_connect_event() {
        let (tracker, store) = manual_tracker(&["x"]).await;

        assert_ok!(tracker.register_viewer("x", "a", Some("alice")));
        assert_ok!(tracker.register_viewer("x", "b", Some("")));
        assert_ok!(tracker.barrier().await);

        let events = store.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].subscriber_id.as_str(), "alice");
        assert_eq!(events[0].stream_id.as_str(), "x");
        assert_eq!(events[0].event.event_type, ConnectionEventType::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_event_failure_still_registers() {
        let (tracker, store) = manual_tracker(&["x"]).await;
        store.fail_writes_for("x").await;

        assert_ok!(tracker.register_viewer("x", "a", Some("alice")));
        assert_ok!(tracker.barrier().await);

        assert_eq!(tracker.viewer_count("x"), 1);
        assert!(store.events().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_single_sweep() {
        let (tracker, store) = manual_tracker(&["x"]).await;

        for session in ["a", "b", "c"] {
            assert_ok!(tracker.register_viewer("x", session, None));
        }
        assert_ok!(tracker.barrier().await);
        assert_eq!(tracker.viewer_count("x"), 3);

        tokio::time::advance(Duration::from_secs(15)).await;
        assert_ok!(tracker.register_viewer("x", "b", None));
        assert_ok!(tracker.register_viewer("x", "c", None));
        assert_ok!(tracker.barrier().await);
        tokio::time::advance(Duration::from_secs(6)).await;

        let report = assert_ok!(tracker.sweep_now().await);

        assert_eq!(report.sessions_evicted, 1);
        assert_eq!(tracker.viewer_count("x"), 2);
        assert_eq!(store.deltas_for("x").await, vec![2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_two_sweeps() {
        let (tracker, store) = manual_tracker(&["x"]).await;

        for session in ["a", "b", "c"] {
            assert_ok!(tracker.register_viewer("x", session, None));
        }
        let first = assert_ok!(tracker.sweep_now().await);
        assert_eq!(first.flushed("x"), Some(3));

        tokio::time::advance(Duration::from_secs(15)).await;
        assert_ok!(tracker.register_viewer("x", "b", None));
        assert_ok!(tracker.register_viewer("x", "c", None));
        assert_ok!(tracker.barrier().await);
        tokio::time::advance(Duration::from_secs(6)).await;

        let second = assert_ok!(tracker.sweep_now().await);
        assert_eq!(second.flushed("x"), Some(-1));
        assert_eq!(tracker.viewer_count("x"), 2);
        assert_eq!(store.deltas_for("x").await, vec![3, -1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_stops_broadcasting() {
        let (tracker, store) = manual_tracker(&["x"]).await;

        assert_ok!(tracker.register_viewer("x", "a", Some("alice")));
        assert_ok!(tracker.register_viewer("x", "b", Some("bob")));
        assert_ok!(tracker.sweep_now().await);

        store.set_status("x", BroadcastStatus::Finished).await;
        let report = assert_ok!(tracker.sweep_now().await);

        assert_eq!(report.streams_removed, 1);
        assert_eq!(tracker.viewer_count("x"), 0);
        assert!(tracker.viewer_counts().is_empty());
        for subscriber in ["alice", "bob"] {
            let types: Vec<_> = store
                .events_for(subscriber)
                .await
                .iter()
                .map(|e| e.event.event_type)
                .collect();
            assert_eq!(
                types,
                vec![ConnectionEventType::Connected, ConnectionEventType::Disconnected]
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_stream() {
        let (tracker, store) = manual_tracker(&["x"]).await;

        assert_ok!(tracker.register_viewer("x", "a", Some("alice")));
        assert_ok!(tracker.register_viewer("x", "b", None));
        assert_ok!(tracker.reset_stream("x").await);

        assert_eq!(tracker.viewer_count("x"), 0);

        // Pending delta went with the stream: nothing to flush
        let report = assert_ok!(tracker.sweep_now().await);
        assert_eq!(report.streams_scanned, 0);
        assert!(store.deltas().await.is_empty());

        // Idempotent, and unknown streams are fine
        assert_ok!(tracker.reset_stream("x").await);
        assert_ok!(tracker.reset_stream("never-seen").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_drives_sweep() {
        let store = Arc::new(MemoryStore::new());
        store.set_status("x", BroadcastStatus::Broadcasting).await;
        let config = PresenceConfig::default();
        let period = config.sweep_interval;
        let (tracker, _worker) = PresenceTracker::spawn(config, Arc::clone(&store), Arc::clone(&store));

        assert_ok!(tracker.register_viewer("x", "a", None));
        assert_ok!(tracker.barrier().await);
        assert!(store.deltas().await.is_empty());

        tokio::time::sleep(period + Duration::from_millis(1)).await;
        assert_ok!(tracker.barrier().await);

        assert_eq!(store.deltas_for("x").await, vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_queued_before_due_tick_keeps_session() {
        let store = Arc::new(SlowConnectStore {
            inner: MemoryStore::new(),
            delay: Duration::from_secs(2),
            slow_subscriber: "slow",
        });
        store.inner.set_status("x", BroadcastStatus::Broadcasting).await;
        let config = PresenceConfig::default()
            .sweep_interval(Duration::from_secs(10))
            .session_timeout(Duration::from_secs(25));
        let (tracker, _worker) = PresenceTracker::spawn(config, Arc::clone(&store), Arc::clone(&store));

        assert_ok!(tracker.register_viewer("x", "a", Some("alice")));
        assert_ok!(tracker.barrier().await);

        // Ticks at 10s and 20s keep "a"; the next one is due at 30s
        tokio::time::sleep(Duration::from_secs(29)).await;

        // The slow connect event holds the worker past the 30s tick while the
        // refresh of "a" waits in the queue
        assert_ok!(tracker.register_viewer("x", "b", Some("slow")));
        assert_ok!(tracker.register_viewer("x", "a", Some("alice")));
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_ok!(tracker.barrier().await);

        assert_eq!(tracker.viewer_count("x"), 2);
        let types: Vec<_> = store
            .inner
            .events_for("alice")
            .await
            .iter()
            .map(|e| e.event.event_type)
            .collect();
        assert_eq!(
            types,
            vec![ConnectionEventType::Connected, ConnectionEventType::Connected]
        );
        // "a" was never evicted, so only "b" is added by the late sweep
        assert_eq!(store.inner.deltas_for("x").await, vec![1, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_sweep_interval_still_runs() {
        let store = Arc::new(MemoryStore::new());
        let config = PresenceConfig {
            sweep_interval: Duration::MAX,
            ..PresenceConfig::default()
        };
        let (tracker, worker) = PresenceTracker::spawn(config, Arc::clone(&store), store);

        assert_ok!(tracker.register_viewer("x", "a", None));
        assert_ok!(tracker.barrier().await);
        assert_eq!(tracker.viewer_count("x"), 1);

        tracker.shutdown().await;
        assert_ok!(worker.await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_full() {
        let store = Arc::new(MemoryStore::new());
        let config = PresenceConfig::default()
            .sweep_interval(Duration::from_secs(3600))
            .queue_capacity(1);
        let (tracker, _worker) = PresenceTracker::spawn(config, Arc::clone(&store), store);

        // The worker has not been polled yet, so the second send finds the queue full
        assert_ok!(tracker.register_viewer("x", "a", None));
        assert_eq!(
            tracker.register_viewer("x", "b", None),
            Err(PresenceError::QueueFull)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_closes_handle() {
        let (tracker, _store) = manual_tracker(&["x"]).await;

        tracker.shutdown().await;

        assert_err!(tracker.barrier().await);
        assert_eq!(
            tracker.register_viewer("x", "a", None),
            Err(PresenceError::Closed)
        );
    }
}

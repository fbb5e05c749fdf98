//! Reconciliation sweep
//!
//! Runs once per tick on the worker. For every known stream, in this order:
//!
//! 1. Look up the broadcast. A missing record counts as not broadcasting; a
//!    failed lookup skips the stream until the next tick.
//! 2. If the record exists, evict sessions silent for longer than the session
//!    timeout and send a disconnect event for each mapped subscriber.
//! 3. If broadcasting and anything changed, flush
//!    `pending_delta - evicted` as one viewer-count delta. Only a successful
//!    flush resets the pending delta; after a failed one the increments and
//!    evictions are both kept for the next sweep. This is the only place the
//!    persisted count is written.
//! 4. If not broadcasting, send a disconnect event for every remaining mapped
//!    subscriber and drop the stream from the registry.
//!
//! Collaborator failures are logged and counted; they never stop the sweep
//! for other streams. Connection events are not retried.

use tokio::time::Instant;

use crate::registry::{DroppedSession, PresenceRegistry, StreamId};
use crate::store::{BroadcastLookup, ConnectionEvent, ViewerStore};

use super::config::PresenceConfig;

/// Outcome of one reconciliation sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Streams examined
    pub streams_scanned: usize,
    /// Sessions evicted for silence
    pub sessions_evicted: usize,
    /// Disconnect events accepted by the store
    pub disconnect_events: usize,
    /// Streams dropped because they are no longer broadcasting
    pub streams_removed: usize,
    /// Viewer-count deltas accepted by the store
    pub flushes: Vec<(StreamId, i64)>,
    /// Broadcast lookups that failed
    pub lookup_failures: usize,
    /// Store writes that failed
    pub store_failures: usize,
}

impl SweepReport {
    /// Delta flushed for a stream in this sweep, if any
    pub fn flushed(&self, stream_id: &str) -> Option<i64> {
        self.flushes
            .iter()
            .find(|(id, _)| id.as_str() == stream_id)
            .map(|(_, delta)| *delta)
    }
}

/// Reconcile every stream in `registry` against the collaborators
pub(crate) async fn reconcile<L, S>(
    registry: &mut PresenceRegistry,
    lookup: &L,
    store: &S,
    config: &PresenceConfig,
    now: Instant,
) -> SweepReport
where
    L: BroadcastLookup,
    S: ViewerStore,
{
    let mut report = SweepReport::default();

    for stream_id in registry.stream_ids() {
        report.streams_scanned += 1;

        let broadcast = match lookup.get(&stream_id).await {
            Ok(broadcast) => broadcast,
            Err(e) => {
                tracing::warn!(
                    stream = %stream_id,
                    error = %e,
                    "Broadcast lookup failed, skipping stream this sweep"
                );
                report.lookup_failures += 1;
                continue;
            }
        };

        let mut is_broadcasting = false;

        if let Some(broadcast) = broadcast {
            let evicted = registry.evict_stale(
                &stream_id,
                now,
                config.session_timeout,
                config.prune_subscribers,
            );
            report.sessions_evicted += evicted.len();
            notify_disconnected(store, &stream_id, &evicted, &mut report).await;

            is_broadcasting = broadcast.is_broadcasting();

            let increments = registry.pending_delta(&stream_id);
            let decrements = registry
                .unflushed_evictions(&stream_id)
                .saturating_add(u32::try_from(evicted.len()).unwrap_or(u32::MAX));

            if is_broadcasting && (increments != 0 || decrements != 0) {
                let diff = i64::from(increments) - i64::from(decrements);

                tracing::info!(
                    stream = %stream_id,
                    increments = increments,
                    decrements = decrements,
                    diff = diff,
                    "Updating viewer count"
                );

                match store.update_viewer_count_delta(&stream_id, diff).await {
                    Ok(()) => {
                        registry.clear_pending(&stream_id);
                        report.flushes.push((stream_id.clone(), diff));
                    }
                    Err(e) => {
                        tracing::warn!(
                            stream = %stream_id,
                            diff = diff,
                            error = %e,
                            "Viewer count update failed, keeping delta for next sweep"
                        );
                        registry.defer_evictions(&stream_id, decrements);
                        report.store_failures += 1;
                    }
                }
            }
        }

        if !is_broadcasting {
            let remaining = registry.remove_stream(&stream_id, config.prune_subscribers);
            notify_disconnected(store, &stream_id, &remaining, &mut report).await;
            report.streams_removed += 1;

            tracing::info!(
                stream = %stream_id,
                sessions = remaining.len(),
                "Stream not broadcasting, removed from presence registry"
            );
        }
    }

    report
}

async fn notify_disconnected<S: ViewerStore>(
    store: &S,
    stream_id: &StreamId,
    sessions: &[DroppedSession],
    report: &mut SweepReport,
) {
    for dropped in sessions {
        let Some(subscriber) = &dropped.subscriber else {
            continue;
        };

        match store
            .add_subscriber_connection_event(stream_id, subscriber, ConnectionEvent::disconnected())
            .await
        {
            Ok(()) => report.disconnect_events += 1,
            Err(e) => {
                tracing::warn!(
                    stream = %stream_id,
                    session = %dropped.session,
                    subscriber = %subscriber,
                    error = %e,
                    "Disconnect event failed"
                );
                report.store_failures += 1;
            }
        }
    }
}

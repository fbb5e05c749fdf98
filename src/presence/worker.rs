//! Presence worker
//!
//! The single task that owns the registry. Commands and sweep ticks are
//! multiplexed in one `select!` loop, so a registration and a sweep never run
//! at the same time and no lock guards the registry. A due tick first drains
//! the commands already queued, keeping queue order between registrations
//! and sweeps. After every mutation the worker publishes fresh per-stream
//! viewer counts for readers.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::registry::{PresenceRegistry, SessionId, StreamId, SubscriberId};
use crate::store::{BroadcastLookup, ConnectionEvent, ViewerStore};

use super::command::Command;
use super::config::PresenceConfig;
use super::sweep::{self, SweepReport};

/// Snapshot of active sessions per stream
pub type ViewerCounts = HashMap<StreamId, usize>;

pub(crate) struct PresenceWorker<L, S> {
    config: PresenceConfig,
    registry: PresenceRegistry,
    lookup: Arc<L>,
    store: Arc<S>,
    commands: mpsc::Receiver<Command>,
    counts: watch::Sender<ViewerCounts>,
}

impl<L, S> PresenceWorker<L, S>
where
    L: BroadcastLookup,
    S: ViewerStore,
{
    pub(crate) fn new(
        config: PresenceConfig,
        lookup: Arc<L>,
        store: Arc<S>,
        commands: mpsc::Receiver<Command>,
        counts: watch::Sender<ViewerCounts>,
    ) -> Self {
        Self {
            config,
            registry: PresenceRegistry::new(),
            lookup,
            store,
            commands,
            counts,
        }
    }

    /// Process commands and sweep ticks until shut down
    ///
    /// Stops on a shutdown command or once every handle has been dropped.
    pub(crate) async fn run(mut self) {
        let period = self.config.sweep_period();
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            sweep_interval_ms = period.as_millis() as u64,
            session_timeout_ms = self.config.session_timeout.as_millis() as u64,
            "Presence worker started"
        );

        loop {
            let flow = tokio::select! {
                // A due tick wins the race, but runs after the backlog
                biased;

                _ = ticker.tick() => self.sweep_after_backlog().await,
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => ControlFlow::Break(()),
                },
            };

            if flow.is_break() {
                break;
            }
        }

        tracing::info!(
            streams = self.registry.stream_count(),
            viewers = self.registry.total_viewer_count(),
            "Presence worker stopped"
        );
    }

    /// Process the commands queued before a tick, then sweep
    ///
    /// Draining is bounded by the queue capacity so producers that keep the
    /// queue full cannot postpone the sweep indefinitely.
    async fn sweep_after_backlog(&mut self) -> ControlFlow<()> {
        for _ in 0..self.config.queue_capacity.max(1) {
            let command = match self.commands.try_recv() {
                Ok(command) => command,
                Err(_) => break,
            };
            if self.handle(command).await.is_break() {
                return ControlFlow::Break(());
            }
        }

        self.sweep().await;
        ControlFlow::Continue(())
    }

    async fn handle(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Register {
                stream_id,
                session_id,
                subscriber_id,
            } => {
                self.register(stream_id, session_id, subscriber_id).await;
            }
            Command::Reset { stream_id, done } => {
                self.reset(&stream_id);
                let _ = done.send(());
            }
            Command::Sweep { done } => {
                let report = self.sweep().await;
                let _ = done.send(report);
            }
            Command::Barrier { done } => {
                let _ = done.send(());
            }
            Command::Shutdown { done } => {
                let _ = done.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    async fn register(
        &mut self,
        stream_id: StreamId,
        session_id: SessionId,
        subscriber_id: Option<SubscriberId>,
    ) {
        let registration = self.registry.register(
            &stream_id,
            &session_id,
            subscriber_id.as_ref(),
            Instant::now(),
        );

        if registration.is_new {
            tracing::debug!(
                stream = %stream_id,
                session = %session_id,
                pending_delta = registration.pending_delta,
                "Viewer registered"
            );
            self.publish_count(&stream_id);
        }

        if let Some(subscriber_id) = subscriber_id {
            if let Err(e) = self
                .store
                .add_subscriber_connection_event(
                    &stream_id,
                    &subscriber_id,
                    ConnectionEvent::connected(),
                )
                .await
            {
                tracing::warn!(
                    stream = %stream_id,
                    session = %session_id,
                    subscriber = %subscriber_id,
                    error = %e,
                    "Connect event failed"
                );
            }
        }
    }

    fn reset(&mut self, stream_id: &StreamId) {
        match self.registry.reset(stream_id) {
            Some(summary) => {
                tracing::info!(
                    stream = %stream_id,
                    sessions = summary.sessions,
                    subscribers = summary.subscribers,
                    "Stream presence reset"
                );
                self.publish_count(stream_id);
            }
            None => {
                tracing::info!(stream = %stream_id, "Stream presence reset skipped, stream unknown");
            }
        }
    }

    async fn sweep(&mut self) -> SweepReport {
        let report = sweep::reconcile(
            &mut self.registry,
            self.lookup.as_ref(),
            self.store.as_ref(),
            &self.config,
            Instant::now(),
        )
        .await;

        tracing::debug!(
            streams = report.streams_scanned,
            evicted = report.sessions_evicted,
            removed = report.streams_removed,
            flushes = report.flushes.len(),
            failures = report.lookup_failures + report.store_failures,
            "Presence sweep complete"
        );

        self.publish_all();
        report
    }

    fn publish_count(&self, stream_id: &StreamId) {
        let count = self.registry.stream(stream_id).map(|s| s.viewer_count());
        self.counts.send_modify(|counts| match count {
            Some(count) => {
                counts.insert(stream_id.clone(), count);
            }
            None => {
                counts.remove(stream_id);
            }
        });
    }

    fn publish_all(&self) {
        let snapshot = self.registry.viewer_counts();
        self.counts.send_replace(snapshot);
    }
}

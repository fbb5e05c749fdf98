//! In-memory broadcast lookup and viewer store
//!
//! Keeps broadcast records, the persisted viewer count per stream, and every
//! delta and connection event it received. Writes and lookups can be made to
//! fail per stream, which lets callers exercise failure paths.

use std::collections::{HashMap, HashSet};

use tokio::sync::{Mutex, RwLock};

use crate::error::StoreError;
use crate::registry::{StreamId, SubscriberId};

use super::broadcast::{Broadcast, BroadcastStatus};
use super::event::ConnectionEvent;
use super::{BroadcastLookup, ViewerStore};

/// A connection event as received by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub stream_id: StreamId,
    pub subscriber_id: SubscriberId,
    pub event: ConnectionEvent,
}

#[derive(Debug, Default)]
struct Journal {
    deltas: Vec<(StreamId, i64)>,
    viewer_counts: HashMap<StreamId, i64>,
    events: Vec<RecordedEvent>,
}

#[derive(Debug, Default)]
struct Failures {
    lookups: HashSet<StreamId>,
    writes: HashSet<StreamId>,
}

/// In-memory implementation of both collaborator traits
#[derive(Debug, Default)]
pub struct MemoryStore {
    broadcasts: RwLock<HashMap<StreamId, BroadcastStatus>>,
    journal: Mutex<Journal>,
    failures: RwLock<Failures>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or update a broadcast record
    pub async fn set_status(&self, stream_id: impl Into<StreamId>, status: BroadcastStatus) {
        self.broadcasts
            .write()
            .await
            .insert(stream_id.into(), status);
    }

    /// Delete a broadcast record
    pub async fn remove_broadcast(&self, stream_id: &str) {
        self.broadcasts.write().await.remove(stream_id);
    }

    /// Every delta received, in order
    pub async fn deltas(&self) -> Vec<(StreamId, i64)> {
        self.journal.lock().await.deltas.clone()
    }

    /// Deltas received for one stream, in order
    pub async fn deltas_for(&self, stream_id: &str) -> Vec<i64> {
        self.journal
            .lock()
            .await
            .deltas
            .iter()
            .filter(|(id, _)| id.as_str() == stream_id)
            .map(|(_, delta)| *delta)
            .collect()
    }

    /// Persisted viewer count of a stream (sum of its deltas)
    pub async fn viewer_count(&self, stream_id: &str) -> i64 {
        self.journal
            .lock()
            .await
            .viewer_counts
            .get(stream_id)
            .copied()
            .unwrap_or(0)
    }

    /// Every connection event received, in order
    pub async fn events(&self) -> Vec<RecordedEvent> {
        self.journal.lock().await.events.clone()
    }

    /// Connection events received for one subscriber, in order
    pub async fn events_for(&self, subscriber_id: &str) -> Vec<RecordedEvent> {
        self.journal
            .lock()
            .await
            .events
            .iter()
            .filter(|e| e.subscriber_id.as_str() == subscriber_id)
            .cloned()
            .collect()
    }

    /// Make lookups of a stream fail until `clear_failures` is called
    pub async fn fail_lookups_for(&self, stream_id: impl Into<StreamId>) {
        self.failures.write().await.lookups.insert(stream_id.into());
    }

    /// Make writes for a stream fail until `clear_failures` is called
    pub async fn fail_writes_for(&self, stream_id: impl Into<StreamId>) {
        self.failures.write().await.writes.insert(stream_id.into());
    }

    pub async fn clear_failures(&self) {
        let mut failures = self.failures.write().await;
        failures.lookups.clear();
        failures.writes.clear();
    }

    async fn check_write(&self, stream_id: &StreamId) -> Result<(), StoreError> {
        if self.failures.read().await.writes.contains(stream_id) {
            return Err(StoreError::Unavailable(format!(
                "writes disabled for {}",
                stream_id
            )));
        }
        Ok(())
    }
}

impl BroadcastLookup for MemoryStore {
    async fn get(&self, stream_id: &StreamId) -> Result<Option<Broadcast>, StoreError> {
        if self.failures.read().await.lookups.contains(stream_id) {
            return Err(StoreError::Unavailable(format!(
                "lookups disabled for {}",
                stream_id
            )));
        }

        let broadcasts = self.broadcasts.read().await;
        Ok(broadcasts
            .get(stream_id)
            .map(|status| Broadcast::new(stream_id.clone(), *status)))
    }
}

impl ViewerStore for MemoryStore {
    async fn update_viewer_count_delta(
        &self,
        stream_id: &StreamId,
        delta: i64,
    ) -> Result<(), StoreError> {
        self.check_write(stream_id).await?;

        let mut journal = self.journal.lock().await;
        journal.deltas.push((stream_id.clone(), delta));
        *journal.viewer_counts.entry(stream_id.clone()).or_insert(0) += delta;
        Ok(())
    }

    async fn add_subscriber_connection_event(
        &self,
        stream_id: &StreamId,
        subscriber_id: &SubscriberId,
        event: ConnectionEvent,
    ) -> Result<(), StoreError> {
        self.check_write(stream_id).await?;

        self.journal.lock().await.events.push(RecordedEvent {
            stream_id: stream_id.clone(),
            subscriber_id: subscriber_id.clone(),
            event,
        });
        Ok(())
    }
}

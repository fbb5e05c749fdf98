//! Presence registry implementation
//!
//! Holds the session registry, the subscriber index and the pending-delta
//! counters. The registry is plain owned state with no locking; the presence
//! worker is its only owner and serializes every mutation.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use super::entry::StreamPresence;
use super::key::{SessionId, SessionKey, StreamId, SubscriberId};

/// Outcome of a single registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// The session was not tracked for this stream before
    pub is_new: bool,
    /// Pending delta of the stream after the registration
    pub pending_delta: u32,
}

/// A session dropped from the registry, with its subscriber if one was mapped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedSession {
    pub session: SessionId,
    pub subscriber: Option<SubscriberId>,
}

/// Summary of a `reset` call on a known stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetSummary {
    /// Sessions that were cleared
    pub sessions: usize,
    /// Subscriber index entries that were removed
    pub subscribers: usize,
}

/// Owned presence state for all streams
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    /// Map of stream id to its sessions and pending delta
    streams: HashMap<StreamId, StreamPresence>,

    /// Session to subscriber mapping, scoped by stream
    subscribers: HashMap<SessionKey, SubscriberId>,
}

impl PresenceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record activity of a viewer session
    ///
    /// Creates the stream entry on first use. A subscriber, when given,
    /// replaces any subscriber previously mapped to the session.
    pub fn register(
        &mut self,
        stream: &StreamId,
        session: &SessionId,
        subscriber: Option<&SubscriberId>,
        now: Instant,
    ) -> Registration {
        let entry = self
            .streams
            .entry(stream.clone())
            .or_insert_with(StreamPresence::new);

        let is_new = entry.touch(session.clone(), now);
        let pending_delta = entry.pending_delta();

        if let Some(subscriber) = subscriber {
            self.subscribers.insert(
                SessionKey::new(stream.clone(), session.clone()),
                subscriber.clone(),
            );
        }

        Registration {
            is_new,
            pending_delta,
        }
    }

    /// Remove a stream, its pending delta and its subscriber index entries
    ///
    /// Returns `None` if the stream is unknown.
    pub fn reset(&mut self, stream: &StreamId) -> Option<ResetSummary> {
        let mut entry = self.streams.remove(stream)?;
        let sessions = entry.drain_sessions();

        let subscribers = sessions
            .iter()
            .filter_map(|session| {
                self.subscribers
                    .remove(&SessionKey::new(stream.clone(), session.clone()))
            })
            .count();

        Some(ResetSummary {
            sessions: sessions.len(),
            subscribers,
        })
    }

    /// Evict sessions of `stream` not seen within `timeout`
    ///
    /// With `prune` set the evicted sessions also leave the subscriber index;
    /// otherwise their index entries are kept.
    pub fn evict_stale(
        &mut self,
        stream: &StreamId,
        now: Instant,
        timeout: Duration,
        prune: bool,
    ) -> Vec<DroppedSession> {
        let stale = match self.streams.get_mut(stream) {
            Some(entry) => entry.evict_stale(now, timeout),
            None => return Vec::new(),
        };

        stale
            .into_iter()
            .map(|session| self.detach(stream, session, prune))
            .collect()
    }

    /// Remove a stream entirely, returning the sessions it still held
    pub fn remove_stream(&mut self, stream: &StreamId, prune: bool) -> Vec<DroppedSession> {
        let sessions = match self.streams.remove(stream) {
            Some(mut entry) => entry.drain_sessions(),
            None => return Vec::new(),
        };

        sessions
            .into_iter()
            .map(|session| self.detach(stream, session, prune))
            .collect()
    }

    fn detach(&mut self, stream: &StreamId, session: SessionId, prune: bool) -> DroppedSession {
        let key = SessionKey::new(stream.clone(), session);
        let subscriber = if prune {
            self.subscribers.remove(&key)
        } else {
            self.subscribers.get(&key).cloned()
        };

        DroppedSession {
            session: key.session,
            subscriber,
        }
    }

    /// Unflushed new-session count for a stream (0 if unknown)
    pub fn pending_delta(&self, stream: &StreamId) -> u32 {
        self.streams
            .get(stream)
            .map(StreamPresence::pending_delta)
            .unwrap_or(0)
    }

    /// Evictions of a stream whose flush failed (0 if unknown)
    pub fn unflushed_evictions(&self, stream: &StreamId) -> u32 {
        self.streams
            .get(stream)
            .map(StreamPresence::unflushed_evictions)
            .unwrap_or(0)
    }

    /// Reset the pending delta of a stream after a successful flush
    pub fn clear_pending(&mut self, stream: &StreamId) {
        if let Some(entry) = self.streams.get_mut(stream) {
            entry.clear_pending();
        }
    }

    /// Keep `count` evictions for the next flush after a failed one
    ///
    /// Replaces the previous value; callers pass the total they tried to flush.
    pub fn defer_evictions(&mut self, stream: &StreamId, count: u32) {
        if let Some(entry) = self.streams.get_mut(stream) {
            entry.defer_evictions(count);
        }
    }

    /// Get a stream entry
    pub fn stream(&self, stream: &StreamId) -> Option<&StreamPresence> {
        self.streams.get(stream)
    }

    /// Ids of all known streams
    pub fn stream_ids(&self) -> Vec<StreamId> {
        self.streams.keys().cloned().collect()
    }

    /// Number of known streams
    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    /// Active sessions of a stream (0 if unknown)
    pub fn viewer_count(&self, stream: &StreamId) -> usize {
        self.streams
            .get(stream)
            .map(StreamPresence::viewer_count)
            .unwrap_or(0)
    }

    /// Active sessions across all streams
    pub fn total_viewer_count(&self) -> usize {
        self.streams.values().map(StreamPresence::viewer_count).sum()
    }

    /// Per-stream active session counts
    pub fn viewer_counts(&self) -> HashMap<StreamId, usize> {
        self.streams
            .iter()
            .map(|(id, entry)| (id.clone(), entry.viewer_count()))
            .collect()
    }

    /// Subscriber mapped to a session, if any
    pub fn subscriber_of(&self, stream: &StreamId, session: &SessionId) -> Option<&SubscriberId> {
        self.subscribers
            .get(&SessionKey::new(stream.clone(), session.clone()))
    }

    /// Number of subscriber index entries
    pub fn subscriber_index_len(&self) -> usize {
        self.subscribers.len()
    }
}

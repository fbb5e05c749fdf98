//! Per-stream presence state
//!
//! This module defines the state kept for each stream in the registry: its
//! active sessions with their last-seen instants, and the count of new
//! sessions not yet flushed to the viewer store.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use super::key::SessionId;

/// Entry for a single stream in the registry
#[derive(Debug, Default)]
pub struct StreamPresence {
    /// Active sessions and when each was last seen
    sessions: HashMap<SessionId, Instant>,

    /// New sessions registered since the last flush
    pending_delta: u32,

    /// Evictions whose flush failed, owed to the next flush
    unflushed_evictions: u32,
}

impl StreamPresence {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Number of active sessions
    pub fn viewer_count(&self) -> usize {
        self.sessions.len()
    }

    /// Unflushed new-session count
    pub fn pending_delta(&self) -> u32 {
        self.pending_delta
    }

    /// Evictions not yet reflected in the persisted count
    pub fn unflushed_evictions(&self) -> u32 {
        self.unflushed_evictions
    }

    /// Whether `session` is currently tracked
    pub fn contains(&self, session: &SessionId) -> bool {
        self.sessions.contains_key(session)
    }

    /// When `session` was last seen, if it is tracked
    pub fn last_seen(&self, session: &SessionId) -> Option<Instant> {
        self.sessions.get(session).copied()
    }

    /// Record activity for a session
    ///
    /// Returns true if the session was not tracked before; only then does
    /// the pending delta grow.
    pub(super) fn touch(&mut self, session: SessionId, now: Instant) -> bool {
        let is_new = self.sessions.insert(session, now).is_none();
        if is_new {
            self.pending_delta = self.pending_delta.saturating_add(1);
        }
        is_new
    }

    /// Remove and return every session not seen within `timeout` of `now`
    pub(super) fn evict_stale(&mut self, now: Instant, timeout: Duration) -> Vec<SessionId> {
        let stale: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, last_seen)| now.saturating_duration_since(**last_seen) > timeout)
            .map(|(session, _)| session.clone())
            .collect();

        for session in &stale {
            self.sessions.remove(session);
        }

        stale
    }

    pub(super) fn clear_pending(&mut self) {
        self.pending_delta = 0;
        self.unflushed_evictions = 0;
    }

    pub(super) fn defer_evictions(&mut self, count: u32) {
        self.unflushed_evictions = count;
    }

    /// Drain every session, leaving the entry empty
    pub(super) fn drain_sessions(&mut self) -> Vec<SessionId> {
        self.sessions.drain().map(|(session, _)| session).collect()
    }
}

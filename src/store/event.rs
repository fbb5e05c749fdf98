//! Subscriber connection events

use std::time::{SystemTime, UNIX_EPOCH};

/// Kind of connection event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEventType {
    Connected,
    Disconnected,
}

impl ConnectionEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionEventType::Connected => "connected",
            ConnectionEventType::Disconnected => "disconnected",
        }
    }
}

impl std::fmt::Display for ConnectionEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A connect or disconnect of a subscriber, stamped with wall-clock time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionEvent {
    pub event_type: ConnectionEventType,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
}

impl ConnectionEvent {
    pub fn new(event_type: ConnectionEventType, timestamp_ms: u64) -> Self {
        Self {
            event_type,
            timestamp_ms,
        }
    }

    /// Create an event stamped with the current time
    pub fn now(event_type: ConnectionEventType) -> Self {
        Self::new(event_type, unix_millis())
    }

    pub fn connected() -> Self {
        Self::now(ConnectionEventType::Connected)
    }

    pub fn disconnected() -> Self {
        Self::now(ConnectionEventType::Disconnected)
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

//! Broadcast record as seen by the tracker

use crate::registry::StreamId;

/// Lifecycle status of a broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastStatus {
    /// Created but no publisher yet
    Created,
    /// Publisher is connecting
    Preparing,
    /// Actively broadcasting
    Broadcasting,
    /// Publisher has stopped
    Finished,
}

impl BroadcastStatus {
    /// Parse the status names used by broadcast records
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "created" => Some(BroadcastStatus::Created),
            "preparing" => Some(BroadcastStatus::Preparing),
            "broadcasting" => Some(BroadcastStatus::Broadcasting),
            "finished" => Some(BroadcastStatus::Finished),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BroadcastStatus::Created => "created",
            BroadcastStatus::Preparing => "preparing",
            BroadcastStatus::Broadcasting => "broadcasting",
            BroadcastStatus::Finished => "finished",
        }
    }
}

impl std::fmt::Display for BroadcastStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A broadcast record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broadcast {
    pub stream_id: StreamId,
    pub status: BroadcastStatus,
}

impl Broadcast {
    pub fn new(stream_id: StreamId, status: BroadcastStatus) -> Self {
        Self { stream_id, status }
    }

    /// Create a record in the broadcasting state
    pub fn broadcasting(stream_id: StreamId) -> Self {
        Self::new(stream_id, BroadcastStatus::Broadcasting)
    }

    pub fn is_broadcasting(&self) -> bool {
        self.status == BroadcastStatus::Broadcasting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_names() {
        for status in [
            BroadcastStatus::Created,
            BroadcastStatus::Preparing,
            BroadcastStatus::Broadcasting,
            BroadcastStatus::Finished,
        ] {
            assert_eq!(BroadcastStatus::from_name(status.as_str()), Some(status));
        }
        assert_eq!(BroadcastStatus::from_name("live"), None);
    }

    #[test]
    fn test_only_broadcasting_counts_as_live() {
        let id = StreamId::new("live1");
        assert!(Broadcast::broadcasting(id.clone()).is_broadcasting());
        assert!(!Broadcast::new(id.clone(), BroadcastStatus::Preparing).is_broadcasting());
        assert!(!Broadcast::new(id, BroadcastStatus::Finished).is_broadcasting());
    }
}

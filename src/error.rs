//! Error types
//!
//! `PresenceError` is returned to callers of the tracker handle. `StoreError`
//! is returned by collaborator implementations and is only ever logged by the
//! tracker, never propagated to the caller that registered a viewer.

/// Result type alias for tracker operations
pub type Result<T> = std::result::Result<T, PresenceError>;

/// Error type for tracker handle operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceError {
    /// A required identifier was empty (names the argument)
    EmptyIdentifier(&'static str),
    /// The command queue is full; the registration was dropped
    QueueFull,
    /// The worker has stopped
    Closed,
}

impl std::fmt::Display for PresenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PresenceError::EmptyIdentifier(name) => write!(f, "Empty identifier: {}", name),
            PresenceError::QueueFull => write!(f, "Presence command queue is full"),
            PresenceError::Closed => write!(f, "Presence worker has stopped"),
        }
    }
}

impl std::error::Error for PresenceError {}

/// Error type for broadcast lookup and viewer store calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached
    Unavailable(String),
    /// The backing store refused the write
    Rejected(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable(reason) => write!(f, "Store unavailable: {}", reason),
            StoreError::Rejected(reason) => write!(f, "Store rejected write: {}", reason),
        }
    }
}

impl std::error::Error for StoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_error_display() {
        assert_eq!(
            PresenceError::EmptyIdentifier("stream_id").to_string(),
            "Empty identifier: stream_id"
        );
        assert_eq!(
            PresenceError::QueueFull.to_string(),
            "Presence command queue is full"
        );
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Unavailable("connection refused".into());
        assert_eq!(err.to_string(), "Store unavailable: connection refused");
    }
}

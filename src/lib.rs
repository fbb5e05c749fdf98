//! Live viewer presence tracking for streaming servers
//!
//! Tracks, per stream, which viewer sessions are currently watching, folds
//! registrations and timeouts into a single viewer-count delta per sweep, and
//! reports connect/disconnect events for named subscribers to a durable store.
//!
//! # Architecture
//!
//! ```text
//!   register_viewer() ──┐                      ┌──► BroadcastLookup::get()
//!   reset_stream()    ──┼──► mpsc::Sender ──►  │
//!   sweep_now()       ──┘        │       PresenceWorker ──► ViewerStore
//!                                │       (owns PresenceRegistry)
//!                    interval ───┘             │
//!                                              ▼
//!   viewer_count()  ◄──────────── watch::Receiver<ViewerCounts>
//! ```
//!
//! All mutations run on one worker task. Readers only ever see the snapshot
//! the worker publishes after each mutation.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use viewer_presence::{MemoryStore, PresenceConfig, PresenceTracker};
//!
//! # async fn example() -> Result<(), viewer_presence::PresenceError> {
//! let store = Arc::new(MemoryStore::new());
//! let (tracker, _worker) =
//!     PresenceTracker::spawn(PresenceConfig::default(), Arc::clone(&store), store);
//!
//! tracker.register_viewer("stream1", "session-a", Some("alice"))?;
//! tracker.barrier().await?;
//! assert_eq!(tracker.viewer_count("stream1"), 1);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod presence;
pub mod registry;
pub mod store;

pub use error::{PresenceError, StoreError};
pub use presence::{PresenceConfig, PresenceTracker, Settings, SweepReport};
pub use registry::{SessionId, StreamId, SubscriberId};
pub use store::{
    Broadcast, BroadcastLookup, BroadcastStatus, ConnectionEvent, ConnectionEventType,
    MemoryStore, ViewerStore,
};

//! Collaborator contracts
//!
//! The tracker never persists anything itself. It reads broadcast status
//! through [`BroadcastLookup`] and writes viewer-count deltas and subscriber
//! connection events through [`ViewerStore`]. Both are implemented by the
//! embedding server; [`MemoryStore`] implements both in memory.
//!
//! Implementations may use `async fn` directly:
//!
//! ```no_run
//! use viewer_presence::{Broadcast, BroadcastLookup, StoreError, StreamId};
//!
//! struct AlwaysLive;
//!
//! impl BroadcastLookup for AlwaysLive {
//!     async fn get(&self, stream_id: &StreamId) -> Result<Option<Broadcast>, StoreError> {
//!         Ok(Some(Broadcast::broadcasting(stream_id.clone())))
//!     }
//! }
//! ```

pub mod broadcast;
pub mod event;
pub mod memory;

use std::future::Future;

use crate::error::StoreError;
use crate::registry::{StreamId, SubscriberId};

pub use broadcast::{Broadcast, BroadcastStatus};
pub use event::{ConnectionEvent, ConnectionEventType};
pub use memory::MemoryStore;

/// Read access to broadcast records
pub trait BroadcastLookup: Send + Sync + 'static {
    /// Get the broadcast for a stream, or `None` if it no longer exists
    fn get(
        &self,
        stream_id: &StreamId,
    ) -> impl Future<Output = Result<Option<Broadcast>, StoreError>> + Send;
}

/// Durable sink for viewer statistics
pub trait ViewerStore: Send + Sync + 'static {
    /// Apply a signed change to the persisted viewer count of a stream
    fn update_viewer_count_delta(
        &self,
        stream_id: &StreamId,
        delta: i64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Append a connect/disconnect event to a subscriber's history
    fn add_subscriber_connection_event(
        &self,
        stream_id: &StreamId,
        subscriber_id: &SubscriberId,
        event: ConnectionEvent,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

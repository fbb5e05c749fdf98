//! Presence registry
//!
//! The registry holds everything the tracker knows about viewers:
//!
//! ```text
//!                    PresenceRegistry
//!     ┌────────────────────────────────────────────┐
//!     │ streams: HashMap<StreamId, StreamPresence {│
//!     │     sessions: HashMap<SessionId, Instant>, │
//!     │     pending_delta: u32,                    │
//!     │ }>                                         │
//!     │ subscribers: HashMap<SessionKey,           │
//!     │                      SubscriberId>         │
//!     └────────────────────────────────────────────┘
//! ```
//!
//! It is deliberately not thread-safe: the presence worker owns it and is the
//! only code that mutates it.

pub mod entry;
pub mod key;
pub mod store;

pub use entry::StreamPresence;
pub use key::{SessionId, SessionKey, StreamId, SubscriberId};
pub use store::{DroppedSession, PresenceRegistry, Registration, ResetSummary};

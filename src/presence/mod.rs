//! Presence tracking service
//!
//! A [`PresenceTracker`] handle feeds a bounded command queue drained by a
//! single worker task. The worker owns the registry, runs the reconciliation
//! sweep on its own timer, and publishes viewer counts for readers.
//!
//! Ordering: commands are processed in the order they were queued, one at a
//! time. A sweep tick is processed between two commands, never during one.
//! Collaborator calls are awaited on the worker, so a slow store delays every
//! later registration and sweep.

pub mod config;
pub mod sweep;
pub mod tracker;

mod command;
mod worker;

pub use config::{PresenceConfig, Settings};
pub use sweep::SweepReport;
pub use tracker::PresenceTracker;
pub use worker::ViewerCounts;

//! Messages processed by the presence worker

use tokio::sync::oneshot;

use crate::registry::{SessionId, StreamId, SubscriberId};

use super::sweep::SweepReport;

/// A unit of work for the worker, processed strictly in queue order
#[derive(Debug)]
pub(crate) enum Command {
    /// Record viewer activity
    Register {
        stream_id: StreamId,
        session_id: SessionId,
        subscriber_id: Option<SubscriberId>,
    },
    /// Forget everything about a stream
    Reset {
        stream_id: StreamId,
        done: oneshot::Sender<()>,
    },
    /// Reconcile now, outside the timer
    Sweep { done: oneshot::Sender<SweepReport> },
    /// Reply once every earlier command has been processed
    Barrier { done: oneshot::Sender<()> },
    /// Stop the worker
    Shutdown { done: oneshot::Sender<()> },
}

//! Gate event system.

use crate::access::RequesterId;
use tokio::sync::broadcast;

/// Events emitted by the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateEvent {
    /// Bot has started polling.
    Started,

    /// Bot is shutting down.
    ShuttingDown,

    /// A verification attempt finished.
    VerificationCompleted {
        /// Who asked.
        requester: RequesterId,
        /// Outcome label (`authorized`, `denied`, `rate_limited`, `oracle_failure`).
        outcome: &'static str,
    },

    /// The artifact was uploaded and its handle cached.
    ArtifactUploaded {
        /// Storage-issued handle.
        handle: String,
    },

    /// The artifact was sent to a requester.
    ArtifactDelivered {
        /// Who received it.
        requester: RequesterId,
        /// True if the cached handle was reused.
        cached: bool,
    },

    /// Error occurred.
    Error {
        /// Error message.
        message: String,
    },
}

/// Channel for receiving gate events.
pub type GateEventsChannel = broadcast::Receiver<GateEvent>;

/// Sender for gate events.
pub type GateEventsSender = broadcast::Sender<GateEvent>;

/// Create a new event channel pair.
#[must_use]
pub fn create_event_channel() -> (GateEventsSender, GateEventsChannel) {
    broadcast::channel(256)
}

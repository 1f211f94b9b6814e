//! Tokio broadcast event bus for connection lifecycle notifications.

use crate::platform::PlatformKind;
use crate::services::ConnectionStatus;
use crate::storage::CredentialStoreKind;
use tokio::sync::broadcast;

const DEFAULT_EVENT_BUS_CAPACITY: usize = 64;

/// Events emitted while a connection is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The connection state machine moved to a new state.
    StateChanged {
        /// The new state.
        status: ConnectionStatus,
    },
    /// Auth fell back to a non-durable session.
    PersistenceDegraded {
        /// Platform the connection was built for.
        platform: PlatformKind,
        /// Store that could not be bound.
        preferred: CredentialStoreKind,
        /// Why the preferred store was abandoned.
        reason: String,
    },
}

impl ConnectionEvent {
    /// Returns a stable event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::StateChanged { .. } => "state_changed",
            Self::PersistenceDegraded { .. } => "persistence_degraded",
        }
    }
}

/// Broadcast bus for [`ConnectionEvent`]s.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ConnectionEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUS_CAPACITY)
    }
}

impl EventBus {
    /// Creates a new event bus with the given buffer capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers (best effort).
    pub fn publish(&self, event: ConnectionEvent) {
        metrics::counter!("event_bus_publish_total", "event" => event.event_type()).increment(1);
        // No subscribers is the common case.
        let _ = self.sender.send(event);
    }

    /// Subscribes to the event bus.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.sender.subscribe()
    }
}

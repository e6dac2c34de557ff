//! Broadcast event bus for distributing `KernelEvent` to observers.
//!
//! Publishing is fire-and-forget: with no active subscribers the event is
//! dropped, and a lagging subscriber never blocks the publisher.

use larkit_types::event::KernelEvent;
use tokio::sync::broadcast;

/// Default channel capacity used by the binary.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Multi-consumer bus for kernel notifications.
///
/// Cloning the bus clones the sender, so the gateway, the token manager and
/// the application state can all publish to the same subscribers.
pub struct EventBus {
    sender: broadcast::Sender<KernelEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new subscriber that will receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<KernelEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: KernelEvent) {
        let _ = self.sender.send(event);
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}

//! Named events raised by devices and data points.
//!
//! Events carry nothing but the scheduled time of the cycle that raised them;
//! observers that need the associated state read it through attribute handles.
//! Fan-out uses a broadcast channel, so raising is non-blocking and an event
//! with no subscribers is a no-op.

use tokio::sync::broadcast;

use crate::timestamp::Timestamp;

/// Capacity of the per-event broadcast channel. Subscribers that fall further
/// behind than this lose the oldest notifications.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Receiving side of an event subscription.
pub type EventSubscription = broadcast::Receiver<Timestamp>;

/// A named event observers can subscribe to.
#[derive(Debug, Clone)]
pub struct Event {
    name: &'static str,
    sender: broadcast::Sender<Timestamp>,
}

impl Event {
    /// Creates a new event with the given reflection name.
    pub fn new(name: &'static str) -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { name, sender }
    }

    /// The reflection name of this event.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Raises the event at the given time.
    pub fn raise(&self, timestamp: Timestamp) {
        tracing::trace!(event = self.name, %timestamp, "event raised");
        // A send error only means nobody is subscribed right now.
        let _ = self.sender.send(timestamp);
    }

    /// Subscribes to future raises of this event.
    pub fn subscribe(&self) -> EventSubscription {
        self.sender.subscribe()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

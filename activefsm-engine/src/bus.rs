//! Synchronous notification bus.
//!
//! Subscribers are called in subscription order on the emitting thread.
//! Async consumers can additionally take a broadcast receiver.

use crate::event::EngineEvent;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Receives engine events.
pub trait Subscriber: Send + Sync {
    fn on_event(&self, event: &EngineEvent);
}

impl<F> Subscriber for F
where
    F: Fn(&EngineEvent) + Send + Sync,
{
    fn on_event(&self, event: &EngineEvent) {
        self(event)
    }
}

/// Fans events out to subscribers.
pub struct EventBus {
    subscribers: RwLock<Vec<(String, Arc<dyn Subscriber>)>>,
    channel: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    /// Creates a bus whose broadcast channel buffers `channel_capacity` events.
    pub fn new(channel_capacity: usize) -> Self {
        let (channel, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            subscribers: RwLock::new(Vec::new()),
            channel,
        }
    }

    /// Registers a subscriber. Returns its subscription id.
    pub fn subscribe(&self, subscriber: impl Subscriber + 'static) -> String {
        self.subscribe_arc(Arc::new(subscriber))
    }

    pub fn subscribe_arc(&self, subscriber: Arc<dyn Subscriber>) -> String {
        let subscription_id = format!("sub-{}", uuid::Uuid::new_v4());
        self.subscribers
            .write()
            .push((subscription_id.clone(), subscriber));
        subscription_id
    }

    /// Returns a receiver for every event published from now on.
    pub fn subscribe_channel(&self) -> broadcast::Receiver<EngineEvent> {
        self.channel.subscribe()
    }

    /// Removes a subscriber.
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&self, subscription_id: &str) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(id, _)| id != subscription_id);
        subscribers.len() != before
    }

    /// Returns the number of callback subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Delivers an event to every current subscriber, then to the channel.
    ///
    /// The subscriber list is snapshotted first, so subscribers may call
    /// back into the bus.
    pub fn publish(&self, event: EngineEvent) {
        tracing::trace!(
            name = %event.name,
            source = %event.source,
            "{}",
            event.info
        );

        let subscribers: Vec<Arc<dyn Subscriber>> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, s)| s.clone())
            .collect();

        for subscriber in subscribers {
            subscriber.on_event(&event);
        }

        // No receivers is not an error.
        let _ = self.channel.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

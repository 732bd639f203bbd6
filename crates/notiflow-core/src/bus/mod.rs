// ── Bounded multicast event bus ──
//
// Accepted events fan out through a `tokio::sync::broadcast` ring. Every
// subscriber gets its own read cursor over a fixed-size ring, and a send
// into a full ring overwrites the oldest slot: drop-oldest per subscriber,
// with a publish that never waits.

mod subscription;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::trace;

use crate::model::RawNotificationEvent;

pub use subscription::{EventStream, EventSubscription};

/// Bounded, multicast, non-blocking-publish channel for accepted events.
pub struct EventBus {
    tx: broadcast::Sender<Arc<RawNotificationEvent>>,
    capacity: usize,
}

impl EventBus {
    /// Create a bus whose per-subscriber buffer holds `capacity` events.
    ///
    /// The ring size is rounded up to the next power of two; a zero
    /// capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1).next_power_of_two();
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Effective per-subscriber capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Publish an event to every current subscriber without waiting.
    ///
    /// Returns `false` when admitting the event pushed an unconsumed older
    /// event out of some subscriber's buffer. With no subscribers the event
    /// is discarded and `true` is returned.
    ///
    /// The flag is exact for a single publisher. Concurrent publishers may
    /// both see room for one more event and both return `true`; the
    /// per-subscriber [`EventSubscription::dropped`] count stays exact.
    pub fn publish(&self, event: Arc<RawNotificationEvent>) -> bool {
        let overflow = self.tx.len() >= self.capacity;
        match self.tx.send(event) {
            Ok(receivers) => {
                trace!(receivers, overflow, "event published");
                !overflow
            }
            // No receivers: nothing to buffer for, nothing displaced.
            Err(_) => true,
        }
    }

    /// Subscribe to events published from now on. History is not replayed.
    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription::new(self.tx.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

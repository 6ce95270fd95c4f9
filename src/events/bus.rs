//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`] so that every tick loop can publish
//! without blocking and without knowing who listens.
//!
//! ```text
//! Publishers (many):                  Consumer (one):
//!   TickActor 1 ──┐
//!   TickActor 2 ──┼─────► Bus ───────► Scheduler listener ────► SubscriberSet
//!   Registry    ──┤  (broadcast chan)
//!   Reporter    ──┘
//! ```
//!
//! ## Rules
//! - `publish()` never blocks and never fails; with no receivers the event is dropped.
//! - Capacity is a single ring buffer shared by all receivers (min 1).
//! - Slow receivers observe `RecvError::Lagged(n)` and skip `n` events.
//! - The channel closes once every [`Bus`] is dropped; `WeakBus` handles
//!   do not keep it open.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus; `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers (fire-and-forget).
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Returns a handle that can publish without keeping the channel open.
    pub(crate) fn downgrade(&self) -> WeakBus {
        WeakBus {
            tx: self.tx.downgrade(),
        }
    }
}

/// Non-owning publisher for components that the bus' own consumer keeps alive.
#[derive(Clone)]
pub(crate) struct WeakBus {
    tx: broadcast::WeakSender<Event>,
}

impl WeakBus {
    /// Publishes if the bus is still alive; otherwise drops the event.
    pub(crate) fn publish(&self, ev: Event) {
        if let Some(tx) = self.tx.upgrade() {
            let _ = tx.send(ev);
        }
    }
}

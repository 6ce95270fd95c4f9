//! # Core subscriber trait
//!
//! Each subscriber is driven by a dedicated worker fed by a bounded queue owned
//! by the [`SubscriberSet`](crate::SubscriberSet). A slow subscriber never
//! blocks the tick loops nor other subscribers; on overflow its events are dropped.

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}

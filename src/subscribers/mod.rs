//! # Event subscribers.
//!
//! [`Subscribe`] is the extension point for plugging custom event handlers into
//! the scheduler; [`SubscriberSet`] fans every bus event out to all of them.
//!
//! ```text
//!   TickActor ── publish(Event) ──► Bus ──► Scheduler listener ──► SubscriberSet
//!                                                                      │
//!                                                       ┌──────────────┼──────────┐
//!                                                       ▼              ▼          ▼
//!                                                   LogWriter      Metrics     Custom
//! ```
//!
//! ## Implementing a subscriber
//! ```no_run
//! use async_trait::async_trait;
//! use pollvisor::{Event, EventKind, Subscribe};
//!
//! struct FailureCounter;
//!
//! #[async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::TickFailed {
//!             // increment a counter
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "failure-counter"
//!     }
//! }
//! ```

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;

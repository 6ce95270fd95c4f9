//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the registry, the tick loops and
//! the subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `TaskRegistry`, `TickActor`, `runner::run_tick`, the failure
//!   reporter, `Scheduler` (shutdown) and `SubscriberSet` workers.
//! - **Consumers**: `Scheduler`'s listener, which fans out to the `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub(crate) use bus::WeakBus;
pub use event::{Event, EventKind};

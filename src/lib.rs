//! # pollvisor
//!
//! **Pollvisor** supervises periodic polling jobs: one independently
//! scheduled, independently cancellable loop per
//! `(tenant, subscriber, provider)` key, each wrapping a pluggable work unit
//! and surviving its own failures without affecting its siblings.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   configuration change (new cadence, new subscriber, provider swap)
//!            │
//!            ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Scheduler                                                        │
//! │  - parse("5m") → Cadence          (rejects "abc" before any task) │
//! │  - WorkFactory → WorkRef<T>                                       │
//! │  - TaskRegistry: CompositeKey → TaskHandle (one per key)          │
//! │  - Bus + SubscriberSet (events → LogWriter / user subscribers)    │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  TickActor   │   │  TickActor   │   │  TickActor   │
//!     │ g1/u1/reddit │   │ g1/u1/twitch │   │ g2/u7/youtube│
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘
//!      │ sleep(cadence)   │                  │
//!      │ produce()        │   ...            │   ...
//!      │ on_tick(outcome) │                  │
//!      ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                   Bus (broadcast channel)                         │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                     SubscriberSet (per-subscriber queues)
//! ```
//!
//! ### Lifecycle of one key
//! ```text
//! start_or_replace(key, cadence, work, on_tick)
//!   ├─► old handle for key? ─► old.stop()   (no wait)
//!   └─► spawn TickActor
//!
//! loop {
//!   ├─► sleep(cadence)            (returns early on stop)
//!   ├─► produce()                 (bounded by the tick timeout)
//!   │     ├─ Ok(v)               ─► on_tick(key, work, Ok(v))
//!   │     ├─ Err(recoverable)    ─► on_tick(key, work, Err(e)); keep polling
//!   │     └─ Err(Fatal) / panic  ─► exit: Failed
//!   └─► stop() observed          ─► exit: Cancelled
//! }
//!
//! On exit: reporter logs the reason, on_finished fires once,
//!          the registry entry is released, TaskHandle::wait() resolves.
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                         |
//! |-------------------|----------------------------------------------------------|--------------------------------------------|
//! | **Intervals**     | Compact interval strings (`1w2d3h4m5s`).                 | [`parse`], [`Cadence`]                     |
//! | **Work units**    | What a task polls on each tick.                          | [`WorkUnit`], [`WorkFn`], [`WorkFactory`]  |
//! | **Callbacks**     | Per-tick and completion callbacks.                       | [`TickHandler`], [`TickFn`], [`FinishedFn`]|
//! | **Supervision**   | Start, replace, stop, shutdown.                          | [`Scheduler`], [`TaskRegistry`], [`TaskHandle`] |
//! | **Auth**          | Token cache composed in front of a provider.             | [`auth::TokenCache`], [`auth::Authorized`] |
//! | **Subscriber API**| Hook into lifecycle and tick events.                     | [`Subscribe`], [`LogWriter`]               |
//! | **Errors**        | Typed errors with stable labels.                         | [`ParseError`], [`ProviderError`], [`TaskError`] |
//! | **Configuration** | Runtime settings and subscriptions from TOML.            | [`SchedulerConfig`], [`ConfigFile`]        |
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use pollvisor::{
//!     CompositeKey, ProviderError, Scheduler, SchedulerConfig, TickFn, TickOutcome, WorkFn,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sched: Scheduler<u64> = Scheduler::builder(SchedulerConfig::default()).build();
//!
//!     let handle = sched
//!         .start_or_replace(
//!             CompositeKey::new("g1", "u1", "constant"),
//!             pollvisor::parse("1s")?,
//!             WorkFn::arc("constant", || async { Ok::<_, ProviderError>(42) }),
//!             TickFn::arc(|key, _work, outcome: TickOutcome<u64>| async move {
//!                 println!("{key}: {outcome:?}");
//!                 Ok(())
//!             }),
//!         )
//!         .await;
//!
//!     tokio::time::sleep(Duration::from_millis(2500)).await;
//!     assert!(handle.ticks() >= 2);
//!
//!     sched.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod cadence;
mod config;
mod core;
mod error;
mod events;
mod key;
mod subscribers;
mod tasks;

pub mod auth;

// ---- Public re-exports ----

pub use cadence::{Cadence, parse, parse_duration};
pub use config::{ConfigFile, SchedulerConfig, SubscriptionEntry};
pub use core::{
    ApplyReport, ExitReason, Scheduler, SchedulerBuilder, TaskHandle, TaskRegistry, TaskState,
};
pub use error::{ApplyError, ConfigError, ParseError, ProviderError, RuntimeError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use key::CompositeKey;
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use tasks::{
    FinishedFn, TaskSpec, TickFn, TickHandler, TickOutcome, TickRef, WorkFactory, WorkFn, WorkRef,
    WorkUnit,
};

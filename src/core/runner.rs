//! # Run a single tick of a task.
//!
//! Calls the work unit once, bounded by the optional per-tick timeout, and
//! publishes the tick outcome to the [`Bus`].
//!
//! ```text
//! Success:  work.produce() → Ok(v)                → publish TickSucceeded
//! Failure:  work.produce() → Err(recoverable)     → publish TickFailed
//! Timeout:  timeout elapsed → Err(Timeout)        → publish TickTimedOut
//! Fatal:    work.produce() → Err(Fatal)           → nothing here; the actor exits
//!                                                   and the reporter publishes TaskFailed
//! ```
//!
//! ## Rules
//! - Publishes **at most one** event per tick.
//! - A timed-out `produce()` future is dropped; a hung provider stalls only
//!   its own key, and only up to the timeout.

use std::time::Duration;

use tokio::time;

use crate::error::ProviderError;
use crate::events::{Bus, Event, EventKind};
use crate::key::CompositeKey;
use crate::tasks::{TickOutcome, WorkUnit};

/// Executes one tick of `work` and publishes its outcome.
pub(crate) async fn run_tick<T: Send + 'static>(
    work: &dyn WorkUnit<T>,
    timeout: Option<Duration>,
    key: &CompositeKey,
    tick: u64,
    bus: &Bus,
) -> TickOutcome<T> {
    let res = match timeout.filter(|d| !d.is_zero()) {
        Some(dur) => match time::timeout(dur, work.produce()).await {
            Ok(r) => r,
            Err(_elapsed) => {
                tracing::warn!(%key, tick, timeout = ?dur, "tick timed out");
                bus.publish(
                    Event::new(EventKind::TickTimedOut)
                        .with_key(key.clone())
                        .with_tick(tick)
                        .with_timeout(dur),
                );
                return Err(ProviderError::Timeout { timeout: dur });
            }
        },
        None => work.produce().await,
    };

    match &res {
        Ok(_) => {
            tracing::trace!(%key, tick, "tick succeeded");
            bus.publish(
                Event::new(EventKind::TickSucceeded)
                    .with_key(key.clone())
                    .with_tick(tick),
            );
        }
        Err(e) if e.is_fatal() => {}
        Err(e) => {
            tracing::warn!(%key, tick, label = e.as_label(), error = %e, "tick failed");
            bus.publish(
                Event::new(EventKind::TickFailed)
                    .with_key(key.clone())
                    .with_tick(tick)
                    .with_reason(e.to_string()),
            );
        }
    }
    res
}

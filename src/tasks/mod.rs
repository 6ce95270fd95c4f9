//! # Work units, tick callbacks and task specifications.
//!
//! - [`WorkUnit`] - capability polled once per tick (`produce() -> Result<T, ProviderError>`)
//! - [`WorkFn`] - closure-backed work unit
//! - [`TickHandler`] / [`TickFn`] - receives every tick outcome
//! - [`FinishedFn`] - fired once when a task terminates
//! - [`TaskSpec`] - everything the registry needs to start one task
//! - [`WorkFactory`] - builds work units from configured subscriptions

mod callbacks;
mod factory;
mod spec;
mod work;

pub use callbacks::{FinishedFn, TickFn, TickHandler, TickOutcome, TickRef};
pub use factory::WorkFactory;
pub use spec::TaskSpec;
pub use work::{WorkFn, WorkRef, WorkUnit};

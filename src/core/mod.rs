//! Runtime core: task lifecycle, supervision and shutdown.
//!
//! Public API: [`Scheduler`] (facade), [`TaskRegistry`], [`TaskHandle`].
//!
//! Internal modules:
//! - [`runner`]: runs one tick with timeout and event publishing;
//! - [`actor`]: the sleep → produce → callback loop of one task;
//! - [`reporter`]: classifies and logs a task's terminal outcome;
//! - [`registry`]: key → handle map, start/replace/stop;
//! - [`shutdown`]: cross-platform termination signals.

mod actor;
mod builder;
mod handle;
mod registry;
mod reporter;
mod runner;
mod scheduler;
mod shutdown;

pub use builder::SchedulerBuilder;
pub use handle::{ExitReason, TaskHandle, TaskState};
pub use registry::TaskRegistry;
pub use scheduler::{ApplyReport, Scheduler};

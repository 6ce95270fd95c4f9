//! # Task specification.
//!
//! [`TaskSpec`] bundles what the registry needs to start one periodic task:
//! identity, cadence, work unit, tick callback, and optionally a completion
//! callback and a per-tick timeout override.
//!
//! ## Timeout resolution
//! - `with_timeout(None)` (default) → inherit the registry's default tick timeout
//! - `with_timeout(Some(Duration::ZERO))` → no timeout for this task
//! - `with_timeout(Some(d))` → each `produce()` is bounded by `d`

use std::time::Duration;

use crate::cadence::Cadence;
use crate::key::CompositeKey;
use crate::tasks::callbacks::{FinishedFn, TickRef};
use crate::tasks::work::WorkRef;

/// Specification for one supervised periodic task.
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use pollvisor::{CompositeKey, ExitReason, ProviderError, TaskSpec, TickFn, TickOutcome, WorkFn};
///
/// let spec: TaskSpec<u64> = TaskSpec::new(
///     CompositeKey::new("g1", "u1", "constant"),
///     pollvisor::parse("5m").unwrap(),
///     WorkFn::arc("constant", || async { Ok::<u64, ProviderError>(42) }),
///     TickFn::arc(|_key, _work, _outcome: TickOutcome<u64>| async { Ok(()) }),
/// )
/// .with_timeout(Some(Duration::from_secs(10)))
/// .on_finished(Arc::new(|key: &CompositeKey, reason: &ExitReason| {
///     println!("{key} finished: {reason:?}");
/// }));
///
/// assert_eq!(spec.cadence().as_secs(), 300);
/// ```
pub struct TaskSpec<T: Send + 'static> {
    key: CompositeKey,
    cadence: Cadence,
    work: WorkRef<T>,
    on_tick: TickRef<T>,
    on_finished: Option<FinishedFn>,
    timeout: Option<Duration>,
}

impl<T: Send + 'static> TaskSpec<T> {
    /// Creates a specification with no completion callback and the default timeout.
    pub fn new(key: CompositeKey, cadence: Cadence, work: WorkRef<T>, on_tick: TickRef<T>) -> Self {
        Self {
            key,
            cadence,
            work,
            on_tick,
            on_finished: None,
            timeout: None,
        }
    }

    /// Sets the completion callback (fired exactly once when the loop exits).
    pub fn on_finished(mut self, f: FinishedFn) -> Self {
        self.on_finished = Some(f);
        self
    }

    /// Overrides the per-tick timeout (see module docs for the sentinel values).
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Task identity.
    pub fn key(&self) -> &CompositeKey {
        &self.key
    }

    /// Delay between ticks.
    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// Work unit polled on each tick.
    pub fn work(&self) -> &WorkRef<T> {
        &self.work
    }

    /// Resolves the effective tick timeout against a registry default.
    pub(crate) fn effective_timeout(&self, default: Option<Duration>) -> Option<Duration> {
        self.timeout.or(default).filter(|d| !d.is_zero())
    }

    pub(crate) fn into_parts(
        self,
    ) -> (CompositeKey, Cadence, WorkRef<T>, TickRef<T>, Option<FinishedFn>) {
        (self.key, self.cadence, self.work, self.on_tick, self.on_finished)
    }
}

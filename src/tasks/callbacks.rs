//! # Per-tick and completion callbacks.
//!
//! [`TickHandler`] receives the outcome of every tick, in tick order, one at a
//! time per key. In the full system it edits the subscriber's output message.
//! Its errors and panics are logged and swallowed: one bad tick never stops polling.
//!
//! [`FinishedFn`] is fired exactly once per task, when its loop exits.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::ExitReason;
use crate::error::ProviderError;
use crate::key::CompositeKey;
use crate::tasks::work::WorkRef;

/// Result of one `produce()` call, as handed to the tick callback.
pub type TickOutcome<T> = Result<T, ProviderError>;

/// Receives each tick's outcome.
#[async_trait]
pub trait TickHandler<T: Send + 'static>: Send + Sync + 'static {
    /// Handles one tick. The returned error is logged, never propagated.
    async fn on_tick(
        &self,
        key: &CompositeKey,
        work: &WorkRef<T>,
        outcome: TickOutcome<T>,
    ) -> anyhow::Result<()>;
}

/// Shared handle to a tick handler.
pub type TickRef<T> = Arc<dyn TickHandler<T>>;

/// Completion callback: `(key, why the loop exited)`.
pub type FinishedFn = Arc<dyn Fn(&CompositeKey, &ExitReason) + Send + Sync>;

/// Closure-backed tick handler.
///
/// ```
/// use pollvisor::{TickFn, TickOutcome, TickRef};
///
/// let on_tick: TickRef<u64> = TickFn::arc(|key, _work, outcome: TickOutcome<u64>| async move {
///     if let Ok(count) = outcome {
///         println!("{key}: {count}");
///     }
///     Ok(())
/// });
/// ```
pub struct TickFn<F> {
    f: F,
}

impl<F> TickFn<F> {
    /// Wraps a closure `Fn(key, work, outcome) -> Future<Output = anyhow::Result<()>>`.
    pub fn new<T, Fut>(f: F) -> Self
    where
        T: Send + 'static,
        F: Fn(CompositeKey, WorkRef<T>, TickOutcome<T>) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        Self { f }
    }

    /// Wraps the closure and returns it as a shared handle.
    pub fn arc<T, Fut>(f: F) -> Arc<Self>
    where
        T: Send + 'static,
        F: Fn(CompositeKey, WorkRef<T>, TickOutcome<T>) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        Arc::new(Self::new::<T, Fut>(f))
    }
}

#[async_trait]
impl<T, F, Fut> TickHandler<T> for TickFn<F>
where
    T: Send + 'static,
    F: Fn(CompositeKey, WorkRef<T>, TickOutcome<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn on_tick(
        &self,
        key: &CompositeKey,
        work: &WorkRef<T>,
        outcome: TickOutcome<T>,
    ) -> anyhow::Result<()> {
        (self.f)(key.clone(), Arc::clone(work), outcome).await
    }
}

//! # Work unit abstraction and closure-backed implementation.
//!
//! A [`WorkUnit`] is what a task polls on every tick: typically one HTTP call
//! to a provider returning a subscriber count. The scheduler never inspects it.
//! Each running task owns its work unit; reconfiguration replaces it wholesale.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ProviderError;

/// # Value-producing capability polled once per tick.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use pollvisor::{ProviderError, WorkUnit};
///
/// struct Fixed(u64);
///
/// #[async_trait]
/// impl WorkUnit<u64> for Fixed {
///     fn name(&self) -> &str { "fixed" }
///
///     async fn produce(&self) -> Result<u64, ProviderError> {
///         Ok(self.0)
///     }
/// }
/// ```
#[async_trait]
pub trait WorkUnit<T: Send + 'static>: Send + Sync + 'static {
    /// Stable, human-readable name (usually the provider name).
    fn name(&self) -> &str;

    /// Fetches the current value.
    ///
    /// Return [`ProviderError::Fatal`] only when further ticks are pointless;
    /// any other error is reported for this tick and polling continues.
    async fn produce(&self) -> Result<T, ProviderError>;

    /// Checks that the unit is usable by producing one value.
    async fn verify(&self) -> bool {
        self.produce().await.is_ok()
    }
}

/// Shared handle to a work unit.
pub type WorkRef<T> = Arc<dyn WorkUnit<T>>;

/// Closure-backed work unit: `F: Fn() -> Fut` creates a fresh future per tick.
///
/// ```
/// use pollvisor::{ProviderError, WorkFn, WorkRef};
///
/// let work: WorkRef<u64> = WorkFn::arc("constant", || async { Ok::<_, ProviderError>(42) });
/// assert_eq!(work.name(), "constant");
/// ```
#[derive(Debug)]
pub struct WorkFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> WorkFn<F> {
    /// Creates a new closure-backed work unit.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the work unit and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<T, F, Fut> WorkUnit<T> for WorkFn<F>
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ProviderError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn produce(&self) -> Result<T, ProviderError> {
        (self.f)().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_verify_reflects_produce() {
        let ok: WorkRef<u32> = WorkFn::arc("ok", || async { Ok::<_, ProviderError>(1) });
        let bad: WorkRef<u32> = WorkFn::arc("bad", || async {
            Err::<u32, _>(ProviderError::Auth("bad key".into()))
        });

        assert!(ok.verify().await);
        assert!(!bad.verify().await);
    }
}

//! # Building work units from configured subscriptions.

use crate::config::SubscriptionEntry;
use crate::error::ProviderError;
use crate::tasks::work::WorkRef;

/// Creates the work unit for one subscription (provider name + parameters).
///
/// Implemented for plain closures:
/// ```
/// use pollvisor::{ProviderError, SubscriptionEntry, WorkFactory, WorkFn, WorkRef};
///
/// let factory = |entry: &SubscriptionEntry| -> Result<WorkRef<u64>, ProviderError> {
///     match entry.provider.as_str() {
///         "constant" => Ok(WorkFn::arc("constant", || async { Ok::<_, ProviderError>(1) })),
///         other => Err(ProviderError::Fatal(format!("unknown provider {other}"))),
///     }
/// };
/// # fn takes<F: WorkFactory<u64>>(_: &F) {}
/// # takes(&factory);
/// ```
pub trait WorkFactory<T: Send + 'static>: Send + Sync {
    /// Builds a fresh work unit; errors reject the subscription.
    fn build(&self, entry: &SubscriptionEntry) -> Result<WorkRef<T>, ProviderError>;
}

impl<T, F> WorkFactory<T> for F
where
    T: Send + 'static,
    F: Fn(&SubscriptionEntry) -> Result<WorkRef<T>, ProviderError> + Send + Sync,
{
    fn build(&self, entry: &SubscriptionEntry) -> Result<WorkRef<T>, ProviderError> {
        self(entry)
    }
}

//! # Composite task identity.
//!
//! A [`CompositeKey`] is the `(tenant, subscriber, provider)` triple that
//! addresses at most one live task in the registry. Parts are opaque strings;
//! equality and hashing are structural over all three.

use std::fmt;
use std::sync::Arc;

/// Identity of one periodic task.
///
/// Cheap to clone (parts are `Arc<str>`).
///
/// ```
/// use pollvisor::CompositeKey;
///
/// let a = CompositeKey::new("g1", "u1", "reddit");
/// let b = CompositeKey::new("g1", "u1", "reddit");
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "g1/u1/reddit");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeKey {
    tenant: Arc<str>,
    subscriber: Arc<str>,
    provider: Arc<str>,
}

impl CompositeKey {
    /// Creates a key from its three parts.
    pub fn new(
        tenant: impl Into<Arc<str>>,
        subscriber: impl Into<Arc<str>>,
        provider: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            tenant: tenant.into(),
            subscriber: subscriber.into(),
            provider: provider.into(),
        }
    }

    /// Top-level grouping (a community/server).
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// End user the polling is configured for.
    pub fn subscriber(&self) -> &str {
        &self.subscriber
    }

    /// Name of the data source.
    pub fn provider(&self) -> &str {
        &self.provider
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.tenant, self.subscriber, self.provider)
    }
}

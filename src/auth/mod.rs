//! # Token-authenticated work units.
//!
//! Some providers need an app token that expires. Instead of wrapping every
//! provider call in re-authentication logic, a [`TokenCache`] is composed in
//! front of the provider:
//!
//! ```text
//! Authorized::produce()
//!   ├─► cache.token()            (refresh if expiring)
//!   ├─► provider.produce_with(&token)
//!   └─► Err(Auth) ─► cache.invalidate()   (next tick fetches a new token)
//! ```
//!
//! [`Authorized`] is itself a [`WorkUnit`], so the scheduler never sees tokens.
//!
//! ## Example
//! ```
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use pollvisor::ProviderError;
//! use pollvisor::auth::{AccessToken, Authorized, AuthorizedWork, TokenCache, TokenSource};
//!
//! struct ClientCredentials;
//!
//! #[async_trait]
//! impl TokenSource for ClientCredentials {
//!     async fn fetch(&self) -> Result<AccessToken, ProviderError> {
//!         Ok(AccessToken::new("app-token", "bearer", Duration::from_secs(3600)))
//!     }
//! }
//!
//! struct Followers;
//!
//! #[async_trait]
//! impl AuthorizedWork<u64> for Followers {
//!     fn name(&self) -> &str { "twitch" }
//!
//!     async fn produce_with(&self, token: &AccessToken) -> Result<u64, ProviderError> {
//!         assert_eq!(token.authorization(), "Bearer app-token");
//!         Ok(1234)
//!     }
//! }
//!
//! let work = Authorized::arc(TokenCache::new(ClientCredentials), Followers);
//! ```

mod token;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::tasks::WorkUnit;

pub use token::{AccessToken, TokenCache, TokenSource};

/// Provider call that needs a valid token.
#[async_trait]
pub trait AuthorizedWork<T: Send + 'static>: Send + Sync + 'static {
    /// Provider name.
    fn name(&self) -> &str;

    /// Fetches the value using `token`.
    ///
    /// Return [`ProviderError::Auth`] when the token is rejected.
    async fn produce_with(&self, token: &AccessToken) -> Result<T, ProviderError>;
}

/// Work unit composing a [`TokenCache`] in front of an [`AuthorizedWork`].
pub struct Authorized<S, P> {
    cache: TokenCache<S>,
    provider: P,
}

impl<S, P> Authorized<S, P>
where
    S: TokenSource,
{
    /// Composes `cache` in front of `provider`.
    pub fn new(cache: TokenCache<S>, provider: P) -> Self {
        Self { cache, provider }
    }

    /// Composes and returns a shared handle.
    pub fn arc(cache: TokenCache<S>, provider: P) -> Arc<Self> {
        Arc::new(Self::new(cache, provider))
    }

    /// Token cache in use.
    pub fn cache(&self) -> &TokenCache<S> {
        &self.cache
    }
}

#[async_trait]
impl<T, S, P> WorkUnit<T> for Authorized<S, P>
where
    T: Send + 'static,
    S: TokenSource,
    P: AuthorizedWork<T>,
{
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn produce(&self) -> Result<T, ProviderError> {
        let token = self.cache.token().await?;
        let res = self.provider.produce_with(&token).await;
        if let Err(ProviderError::Auth(reason)) = &res {
            tracing::debug!(
                provider = self.provider.name(),
                %reason,
                "token rejected; invalidating"
            );
            self.cache.invalidate().await;
        }
        res
    }
}

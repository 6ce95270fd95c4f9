//! # Access tokens and the refreshing cache in front of them.
//!
//! ```text
//! TokenCache::token()
//!   ├─► lock
//!   ├─► cached and valid for > margin? ─► clone
//!   └─► source.fetch() ─► store ─► clone
//! ```
//!
//! Refreshes are serialized by the lock: concurrent callers with an expired
//! token trigger one fetch, not one each.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::ProviderError;

/// Stand-in expiry for lifetimes past what `Instant` can represent.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Bearer-style credential with an expiry.
#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    token_type: String,
    expires_at: Instant,
}

impl AccessToken {
    /// Creates a token valid for `expires_in` from now.
    ///
    /// Lifetimes too large to represent are capped at roughly thirty years.
    pub fn new(
        secret: impl Into<String>,
        token_type: impl Into<String>,
        expires_in: Duration,
    ) -> Self {
        let now = Instant::now();
        let expires_at = now.checked_add(expires_in.min(FAR_FUTURE)).unwrap_or(now);
        Self {
            secret: secret.into(),
            token_type: token_type.into(),
            expires_at,
        }
    }

    /// Raw secret.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Token type as issued (`"bearer"`, ...).
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Instant after which the token is no longer accepted.
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// True while the token has not expired.
    pub fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }

    /// True if the token expires within `margin` from now (or already has).
    pub fn expires_within(&self, margin: Duration) -> bool {
        match Instant::now().checked_add(margin) {
            Some(deadline) => deadline >= self.expires_at,
            None => true,
        }
    }

    /// `Authorization` header value: `"<Type> <secret>"`, type capitalized.
    ///
    /// ```
    /// use std::time::Duration;
    /// use pollvisor::auth::AccessToken;
    ///
    /// let token = AccessToken::new("abc", "bearer", Duration::from_secs(60));
    /// assert_eq!(token.authorization(), "Bearer abc");
    /// ```
    pub fn authorization(&self) -> String {
        let mut chars = self.token_type.chars();
        let kind: String = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
            None => String::new(),
        };
        format!("{kind} {}", self.secret)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Issues fresh tokens (e.g. an OAuth client-credentials exchange).
#[async_trait]
pub trait TokenSource: Send + Sync + 'static {
    /// Requests a new token. Failures are usually [`ProviderError::Auth`].
    async fn fetch(&self) -> Result<AccessToken, ProviderError>;
}

/// Caches one token from a [`TokenSource`] and refreshes it before expiry.
pub struct TokenCache<S> {
    source: S,
    current: Mutex<Option<AccessToken>>,
    margin: Duration,
}

impl<S: TokenSource> TokenCache<S> {
    /// Default head start for refreshing an expiring token.
    pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(30);

    /// Creates an empty cache; the first [`token`](Self::token) call fetches.
    pub fn new(source: S) -> Self {
        Self {
            source,
            current: Mutex::new(None),
            margin: Self::DEFAULT_REFRESH_MARGIN,
        }
    }

    /// Sets how long before expiry a token is refreshed.
    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.margin = margin;
        self
    }

    /// Returns a token valid for at least the refresh margin, fetching if needed.
    pub async fn token(&self) -> Result<AccessToken, ProviderError> {
        let mut current = self.current.lock().await;
        if let Some(token) = current.as_ref() {
            if !token.expires_within(self.margin) {
                return Ok(token.clone());
            }
        }

        tracing::debug!("refreshing access token");
        let fresh = self.source.fetch().await?;
        *current = Some(fresh.clone());
        Ok(fresh)
    }

    /// Forgets the cached token; the next call fetches a new one.
    pub async fn invalidate(&self) {
        self.current.lock().await.take();
    }

    /// Underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }
}

//! # Scheduler and subscription configuration.
//!
//! [`SchedulerConfig`] tunes the runtime (event bus, shutdown grace, tick
//! timeout). [`SubscriptionEntry`] is one configured
//! `(tenant, subscriber, provider, interval, params)` tuple. [`ConfigFile`]
//! loads both from TOML.
//!
//! ```toml
//! [scheduler]
//! bus_capacity = 1024
//! grace = "30s"
//! tick_timeout = "1m"     # "0s" disables the per-tick timeout
//!
//! [[subscription]]
//! tenant = "g1"
//! subscriber = "u1"
//! provider = "reddit"
//! interval = "5m"
//! params = { subreddit = "rust" }
//! ```
//!
//! Durations accept either integer seconds or compact intervals (`1h30m`).

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::cadence::{self, Cadence, serde_duration};
use crate::error::{ConfigError, ParseError};
use crate::key::CompositeKey;

/// Runtime configuration of a [`Scheduler`](crate::Scheduler).
///
/// ```
/// use std::time::Duration;
/// use pollvisor::SchedulerConfig;
///
/// let mut cfg = SchedulerConfig::default();
/// cfg.tick_timeout = Duration::ZERO;
///
/// assert_eq!(cfg.tick_timeout(), None);
/// assert_eq!(cfg.grace, Duration::from_secs(30));
/// ```
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Capacity of the event bus channel.
    pub bus_capacity: usize,
    /// Maximum time to wait for all loops to exit on shutdown.
    #[serde(deserialize_with = "serde_duration::deserialize")]
    pub grace: Duration,
    /// Default bound on one `produce()` call (0 = no timeout).
    #[serde(deserialize_with = "serde_duration::deserialize")]
    pub tick_timeout: Duration,
}

impl Default for SchedulerConfig {
    /// - `bus_capacity = 1024`
    /// - `grace = 30s`
    /// - `tick_timeout = 60s`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            grace: Duration::from_secs(30),
            tick_timeout: Duration::from_secs(60),
        }
    }
}

impl SchedulerConfig {
    /// Tick timeout as an option (`None` when zero).
    pub fn tick_timeout(&self) -> Option<Duration> {
        if self.tick_timeout.is_zero() {
            None
        } else {
            Some(self.tick_timeout)
        }
    }

    /// Bus capacity, at least 1.
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

/// One configured polling subscription.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SubscriptionEntry {
    /// Top-level grouping (e.g. a community/server).
    pub tenant: String,
    /// End user the subscription belongs to.
    pub subscriber: String,
    /// Provider name, used to pick a work unit.
    pub provider: String,
    /// Interval string as written by the user (`"5m"`, `"1d12h"`).
    pub interval: String,
    /// Provider-specific parameters (channel id, account name, ...).
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl SubscriptionEntry {
    /// Creates an entry with no parameters.
    pub fn new(
        tenant: impl Into<String>,
        subscriber: impl Into<String>,
        provider: impl Into<String>,
        interval: impl Into<String>,
    ) -> Self {
        Self {
            tenant: tenant.into(),
            subscriber: subscriber.into(),
            provider: provider.into(),
            interval: interval.into(),
            params: BTreeMap::new(),
        }
    }

    /// Adds one provider parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Identity of the task this entry drives.
    pub fn key(&self) -> CompositeKey {
        CompositeKey::new(
            self.tenant.as_str(),
            self.subscriber.as_str(),
            self.provider.as_str(),
        )
    }

    /// Parses the interval.
    pub fn cadence(&self) -> Result<Cadence, ParseError> {
        cadence::parse(&self.interval)
    }

    /// Looks up one provider parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// Whole configuration file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Runtime settings.
    pub scheduler: SchedulerConfig,
    /// Configured subscriptions, in file order.
    #[serde(rename = "subscription")]
    pub subscriptions: Vec<SubscriptionEntry>,
}

impl ConfigFile {
    /// Parses a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks every subscription interval; reports the first invalid one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for entry in &self.subscriptions {
            entry.cadence().map_err(|source| ConfigError::Cadence {
                key: entry.key(),
                source,
            })?;
        }
        Ok(())
    }
}

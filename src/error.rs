//! Error types used by the pollvisor runtime, its work units and its configuration.
//!
//! - [`ParseError`] — a cadence string could not be turned into a [`Cadence`](crate::Cadence).
//! - [`ProviderError`] — one `produce()` call of a work unit failed.
//! - [`TaskError`] — a supervised loop terminated for a reason other than `stop()`
//!   (cancellation is not an error; see [`ExitReason`](crate::ExitReason)).
//! - [`RuntimeError`] — the scheduler itself failed (shutdown grace exceeded).
//! - [`ConfigError`] / [`ApplyError`] — loading or applying subscriptions failed.
//!
//! Every enum provides `as_label()` (stable snake_case label for logs).

use std::time::Duration;

use thiserror::Error;

use crate::key::CompositeKey;

/// # Errors produced while parsing a compact duration string (`1w2d3h4m5s`).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Input was empty or whitespace only.
    #[error("empty interval")]
    Empty,

    /// Input does not follow the `[Nw][Nd][Nh][Nm][Ns]` grammar.
    #[error("invalid interval {input:?}: expected format like 1d2h3m4s")]
    Malformed {
        /// The rejected input.
        input: String,
    },

    /// All components were present but summed to zero.
    #[error("interval {input:?} must be greater than zero")]
    Zero {
        /// The rejected input.
        input: String,
    },

    /// The total does not fit in a duration.
    #[error("interval {input:?} is too large")]
    Overflow {
        /// The rejected input.
        input: String,
    },
}

impl ParseError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ParseError::Empty => "interval_empty",
            ParseError::Malformed { .. } => "interval_malformed",
            ParseError::Zero { .. } => "interval_zero",
            ParseError::Overflow { .. } => "interval_overflow",
        }
    }
}

/// # Errors produced by a work unit's `produce()`.
///
/// All variants except [`ProviderError::Fatal`] are contained within one tick:
/// the tick callback sees the error and the next tick is still scheduled.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Transport-level failure (connection refused, HTTP status, ...).
    #[error("request failed: {0}")]
    Request(String),

    /// Credentials were rejected or could not be obtained.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The provider answered with something we could not interpret.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The call did not finish within the per-tick timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// Unrecoverable error; terminates the task that produced it.
    #[error("fatal provider error: {0}")]
    Fatal(String),
}

impl ProviderError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ProviderError::Request(_) => "provider_request",
            ProviderError::Auth(_) => "provider_auth",
            ProviderError::Malformed(_) => "provider_malformed",
            ProviderError::Timeout { .. } => "provider_timeout",
            ProviderError::Fatal(_) => "provider_fatal",
        }
    }

    /// True if the error must terminate the task instead of being retried next tick.
    ///
    /// ```
    /// use pollvisor::ProviderError;
    ///
    /// assert!(!ProviderError::Request("503".into()).is_fatal());
    /// assert!(ProviderError::Fatal("channel deleted".into()).is_fatal());
    /// ```
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProviderError::Fatal(_))
    }
}

/// # Terminal failures of a supervised task.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The work unit returned a fatal [`ProviderError`].
    #[error("fatal error (no further ticks): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// The work unit panicked.
    #[error("task panicked: {info}")]
    Panicked {
        /// Panic payload, if it was a string.
        info: String,
    },

    /// The spawned loop was dropped by the runtime without reporting a result.
    #[error("task disconnected: {detail}")]
    Disconnected {
        /// Join error detail.
        detail: String,
    },
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// ```
    /// use pollvisor::TaskError;
    ///
    /// let err = TaskError::Fatal { error: "gone".into() };
    /// assert_eq!(err.as_label(), "task_fatal");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fatal { .. } => "task_fatal",
            TaskError::Panicked { .. } => "task_panicked",
            TaskError::Disconnected { .. } => "task_disconnected",
        }
    }
}

impl From<ProviderError> for TaskError {
    fn from(e: ProviderError) -> Self {
        TaskError::Fatal {
            error: e.to_string(),
        }
    }
}

/// # Errors produced by the scheduler runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some loops had not exited yet.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Keys of the tasks that did not exit in time.
        stuck: Vec<CompositeKey>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

/// # Errors produced while loading configuration.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for the expected schema.
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A subscription carries an invalid interval.
    #[error("subscription {key}: {source}")]
    Cadence {
        /// Subscription the interval belongs to.
        key: CompositeKey,
        /// Why the interval was rejected.
        #[source]
        source: ParseError,
    },
}

/// # Per-subscription failure while applying configuration.
///
/// No task is created for an entry that fails.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// The interval string was rejected.
    #[error(transparent)]
    Cadence(#[from] ParseError),

    /// The work unit could not be built from the subscription parameters.
    #[error("cannot build provider: {0}")]
    Provider(#[from] ProviderError),
}

impl ApplyError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ApplyError::Cadence(e) => e.as_label(),
            ApplyError::Provider(e) => e.as_label(),
        }
    }
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

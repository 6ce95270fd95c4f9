//! # Runtime events emitted by the registry and the tick loops.
//!
//! [`EventKind`] classifies events in four groups:
//! - **Task lifecycle**: started, replaced, cancelled, failed, removed
//! - **Tick outcomes**: succeeded, failed, timed out, callback failed
//! - **Shutdown**: stop-all, signal, grace results
//! - **Subscriber health**: overflow, panic
//!
//! [`Event`] carries the optional metadata (key, tick number, reason, ...).
//!
//! ## Ordering guarantees
//! Every event gets a process-wide monotonic `seq`. Ticks of one key are
//! published in tick order because one key's loop is strictly sequential.
//!
//! ## Example
//! ```rust
//! use pollvisor::{CompositeKey, Event, EventKind};
//!
//! let ev = Event::new(EventKind::TickFailed)
//!     .with_key(CompositeKey::new("g1", "u1", "reddit"))
//!     .with_tick(3)
//!     .with_reason("request failed: 503");
//!
//! assert_eq!(ev.kind, EventKind::TickFailed);
//! assert_eq!(ev.tick, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::cadence::Cadence;
use crate::key::CompositeKey;

static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Task lifecycle ===
    /// A new loop was spawned for a key. Sets `key`, `cadence_secs`.
    TaskStarted,

    /// An existing loop was cancelled because its key was started again.
    /// Sets `key`, `cadence_secs` (of the new task).
    TaskReplaced,

    /// A loop observed its cancellation and exited. Sets `key`, `tick` (last tick).
    TaskCancelled,

    /// A loop exited because of an unrecoverable error. Sets `key`, `tick`, `reason`.
    TaskFailed,

    /// A handle was dropped from the registry. Sets `key`.
    TaskRemoved,

    // === Tick outcomes ===
    /// `produce()` returned a value and the tick callback was invoked. Sets `key`, `tick`.
    TickSucceeded,

    /// `produce()` returned a recoverable error. Sets `key`, `tick`, `reason`.
    TickFailed,

    /// `produce()` exceeded the per-tick timeout. Sets `key`, `tick`, `timeout_ms`.
    TickTimedOut,

    /// The tick callback returned an error or panicked. Sets `key`, `tick`, `reason`.
    CallbackFailed,

    // === Shutdown ===
    /// `stop_all()` was called.
    StopAllRequested,

    /// Shutdown requested (OS signal observed).
    ShutdownRequested,

    /// Every loop exited within the grace period.
    AllStoppedWithin,

    /// The grace period elapsed with loops still running. Sets `reason` (stuck keys).
    GraceExceeded,

    // === Subscriber health ===
    /// A subscriber's queue was full or closed. Sets `reason`.
    SubscriberOverflow,

    /// A subscriber panicked while handling an event. Sets `reason`.
    SubscriberPanicked,
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Task the event is about.
    pub key: Option<CompositeKey>,
    /// Tick number (1-based, per task).
    pub tick: Option<u64>,
    /// Cadence of the task, in seconds.
    pub cadence_secs: Option<u64>,
    /// Per-tick timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Human-readable reason (errors, overflow details, ...).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates an event of the given kind with the current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            key: None,
            tick: None,
            cadence_secs: None,
            timeout_ms: None,
            reason: None,
        }
    }

    /// Attaches the task key.
    #[inline]
    pub fn with_key(mut self, key: CompositeKey) -> Self {
        self.key = Some(key);
        self
    }

    /// Attaches a tick number.
    #[inline]
    pub fn with_tick(mut self, tick: u64) -> Self {
        self.tick = Some(tick);
        self
    }

    /// Attaches the task cadence.
    #[inline]
    pub fn with_cadence(mut self, cadence: Cadence) -> Self {
        self.cadence_secs = Some(cadence.as_secs());
        self
    }

    /// Attaches a timeout (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(d.as_millis().min(u128::from(u64::MAX)) as u64);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }
}

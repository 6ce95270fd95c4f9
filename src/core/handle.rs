//! # Task handle: one running periodic job.
//!
//! A [`TaskHandle`] is the caller-side view of a tick loop spawned by the
//! [`TaskRegistry`](crate::TaskRegistry). It owns the loop's cancellation
//! token and a completion channel, so "this task finished, and here is why"
//! is something the owner can `wait()` for.
//!
//! ## States
//! ```text
//!            stop()               loop observes cancellation
//! Running ────────────► (stopping) ─────────────────────────► Cancelled
//!    │
//!    └── fatal provider error / panic / runtime drop ─────────► Failed
//! ```
//! `Completed` exists for completeness: the loop is unbounded and never
//! finishes on its own.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::cadence::Cadence;
use crate::error::TaskError;
use crate::key::CompositeKey;
use crate::tasks::WorkRef;

/// Lifecycle state of a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    /// The loop is alive (possibly already asked to stop).
    Running,
    /// The loop exited after `stop()`.
    Cancelled,
    /// The loop exited because of an unrecoverable error.
    Failed,
    /// The loop ran to completion. Not reachable with an unbounded loop.
    Completed,
}

impl TaskState {
    /// True for every state but `Running`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskState::Running)
    }
}

/// Why a task's loop exited.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExitReason {
    /// Expected termination requested through `stop()` (or registry shutdown).
    Cancelled,
    /// The work unit or the loop failed; contains the cause.
    Errored(TaskError),
}

impl ExitReason {
    /// State the handle ends up in for this reason.
    pub fn state(&self) -> TaskState {
        match self {
            ExitReason::Cancelled => TaskState::Cancelled,
            ExitReason::Errored(_) => TaskState::Failed,
        }
    }
}

struct Inner<T: Send + 'static> {
    id: u64,
    key: CompositeKey,
    cadence: Cadence,
    work: WorkRef<T>,
    cancel: CancellationToken,
    ticks: Arc<AtomicU64>,
    exit: watch::Receiver<Option<ExitReason>>,
}

/// Handle to one running periodic task. Cheap to clone.
pub struct TaskHandle<T: Send + 'static> {
    inner: Arc<Inner<T>>,
}

impl<T: Send + 'static> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> std::fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.inner.id)
            .field("key", &self.inner.key)
            .field("cadence", &self.inner.cadence)
            .field("state", &self.state())
            .finish()
    }
}

impl<T: Send + 'static> TaskHandle<T> {
    pub(crate) fn new(
        id: u64,
        key: CompositeKey,
        cadence: Cadence,
        work: WorkRef<T>,
        cancel: CancellationToken,
        ticks: Arc<AtomicU64>,
        exit: watch::Receiver<Option<ExitReason>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                id,
                key,
                cadence,
                work,
                cancel,
                ticks,
                exit,
            }),
        }
    }

    /// Registry-unique generation id of this handle.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Task identity.
    pub fn key(&self) -> &CompositeKey {
        &self.inner.key
    }

    /// Delay between ticks.
    pub fn cadence(&self) -> Cadence {
        self.inner.cadence
    }

    /// Work unit owned by this task.
    pub fn work(&self) -> &WorkRef<T> {
        &self.inner.work
    }

    /// Number of ticks started so far.
    pub fn ticks(&self) -> u64 {
        self.inner.ticks.load(Ordering::Acquire)
    }

    /// Requests cooperative cancellation.
    ///
    /// Idempotent: calling it again, or after the loop already exited, is a no-op.
    /// Does not wait; use [`wait`](Self::wait) for that.
    pub fn stop(&self) {
        self.inner.cancel.cancel();
    }

    /// True once `stop()` was called (the loop may still be finishing its tick).
    pub fn is_stopping(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        match &*self.inner.exit.borrow() {
            None => TaskState::Running,
            Some(reason) => reason.state(),
        }
    }

    /// Exit reason, if the loop already exited.
    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.inner.exit.borrow().clone()
    }

    /// Waits until the loop exits and returns why.
    pub async fn wait(&self) -> ExitReason {
        let mut rx = self.inner.exit.clone();
        let res = rx.wait_for(Option::is_some).await;
        match res.as_deref() {
            Ok(Some(reason)) => reason.clone(),
            _ => ExitReason::Errored(TaskError::Disconnected {
                detail: "completion channel closed".to_string(),
            }),
        }
    }
}

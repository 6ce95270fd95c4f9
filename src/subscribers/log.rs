//! # LogWriter: renders runtime events through `tracing`.
//!
//! Tick-level noise goes to `debug`/`trace`, contained failures to `warn`,
//! terminal failures and shutdown problems to `error`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  pollvisor: task started key=g1/u1/reddit cadence_secs=300
//! DEBUG pollvisor: tick succeeded key=g1/u1/reddit tick=1
//! WARN  pollvisor: tick failed key=g1/u1/reddit tick=2 reason="request failed: 503"
//! WARN  pollvisor: tick timed out key=g1/u1/reddit tick=3 timeout_ms=60000
//! INFO  pollvisor: task replaced key=g1/u1/reddit cadence_secs=600
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, trace, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let key = e.key.as_ref().map(ToString::to_string).unwrap_or_default();
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::TaskStarted => {
                info!(target: "pollvisor", %key, cadence_secs = e.cadence_secs, "task started");
            }
            EventKind::TaskReplaced => {
                info!(target: "pollvisor", %key, cadence_secs = e.cadence_secs, "task replaced");
            }
            EventKind::TaskCancelled => {
                debug!(target: "pollvisor", %key, tick = e.tick, "task cancelled");
            }
            EventKind::TaskFailed => {
                error!(target: "pollvisor", %key, tick = e.tick, reason, "task failed");
            }
            EventKind::TaskRemoved => {
                trace!(target: "pollvisor", %key, "task removed");
            }
            EventKind::TickSucceeded => {
                debug!(target: "pollvisor", %key, tick = e.tick, "tick succeeded");
            }
            EventKind::TickFailed => {
                warn!(target: "pollvisor", %key, tick = e.tick, reason, "tick failed");
            }
            EventKind::TickTimedOut => {
                warn!(
                    target: "pollvisor",
                    %key,
                    tick = e.tick,
                    timeout_ms = e.timeout_ms,
                    "tick timed out"
                );
            }
            EventKind::CallbackFailed => {
                warn!(target: "pollvisor", %key, tick = e.tick, reason, "tick callback failed");
            }
            EventKind::StopAllRequested => {
                info!(target: "pollvisor", "stop-all requested");
            }
            EventKind::ShutdownRequested => {
                info!(target: "pollvisor", "shutdown requested");
            }
            EventKind::AllStoppedWithin => {
                info!(target: "pollvisor", "all tasks stopped within grace");
            }
            EventKind::GraceExceeded => {
                error!(target: "pollvisor", reason, "shutdown grace exceeded");
            }
            EventKind::SubscriberOverflow => {
                warn!(target: "pollvisor", reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                error!(target: "pollvisor", reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

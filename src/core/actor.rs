//! # TickActor: the supervisor loop of one task.
//!
//! Drives one [`TaskHandle`](crate::TaskHandle): waits the cadence, runs one
//! tick, hands the outcome to the tick callback, repeats until cancelled.
//!
//! ## Loop
//! ```text
//! loop {
//!   ├─► cancelled? ─────────────────────────────► return Cancelled
//!   ├─► select { cancelled() ─► return Cancelled
//!   │            sleep(cadence) }
//!   ├─► tick += 1
//!   ├─► run_tick(work, timeout)
//!   │     └─► Err(Fatal) ───────────────────────► return Errored(Fatal)
//!   ├─► cancelled while producing? ─────────────► return Cancelled (outcome dropped)
//!   └─► on_tick(key, work, outcome)
//!         └─► Err / panic ─► warn + CallbackFailed (loop continues)
//! }
//! ```
//!
//! ## Rules
//! - Ticks of one key are **strictly sequential**: tick N+1 never sleeps
//!   before tick N's callback returned.
//! - The loop never speeds up: a failing `produce()` still waits a full cadence.
//! - In-flight `produce()` is not interrupted by `stop()`; its outcome is
//!   dropped so a replaced task never delivers after its successor started.
//! - A panic in `produce()` unwinds the actor; the watcher reports it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::FutureExt;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::cadence::Cadence;
use crate::core::handle::ExitReason;
use crate::core::runner::run_tick;
use crate::error::{TaskError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::key::CompositeKey;
use crate::tasks::{TickOutcome, TickRef, WorkRef};

/// Supervises the periodic execution of one work unit.
pub(crate) struct TickActor<T: Send + 'static> {
    pub key: CompositeKey,
    pub cadence: Cadence,
    pub work: WorkRef<T>,
    pub on_tick: TickRef<T>,
    pub timeout: Option<Duration>,
    pub bus: Bus,
    /// Shared with the handle so callers can observe progress.
    pub ticks: Arc<AtomicU64>,
}

impl<T: Send + 'static> TickActor<T> {
    /// Runs the loop until cancellation or a fatal error.
    pub async fn run(self, token: CancellationToken) -> ExitReason {
        let period = self.cadence.as_duration();

        loop {
            if token.is_cancelled() {
                return ExitReason::Cancelled;
            }

            let sleep = time::sleep(period);
            tokio::pin!(sleep);
            select! {
                biased;
                _ = token.cancelled() => return ExitReason::Cancelled,
                _ = &mut sleep => {}
            }

            let tick = self.ticks.fetch_add(1, Ordering::AcqRel) + 1;
            let outcome =
                run_tick(self.work.as_ref(), self.timeout, &self.key, tick, &self.bus).await;

            if let Err(e) = &outcome {
                if e.is_fatal() {
                    return ExitReason::Errored(TaskError::from(e.clone()));
                }
            }
            if token.is_cancelled() {
                tracing::debug!(key = %self.key, tick, "outcome dropped after stop");
                return ExitReason::Cancelled;
            }

            self.deliver(tick, outcome).await;
        }
    }

    /// Hands one outcome to the tick callback, containing its failures.
    async fn deliver(&self, tick: u64, outcome: TickOutcome<T>) {
        let fut = self.on_tick.on_tick(&self.key, &self.work, outcome);
        let reason = match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
            Ok(Ok(())) => return,
            Ok(Err(e)) => format!("{e:#}"),
            Err(payload) => format!("callback panicked: {}", panic_message(payload.as_ref())),
        };

        tracing::warn!(key = %self.key, tick, %reason, "tick callback failed");
        self.bus.publish(
            Event::new(EventKind::CallbackFailed)
                .with_key(self.key.clone())
                .with_tick(tick)
                .with_reason(reason),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::tasks::{TickFn, WorkFn};
    use tokio::sync::mpsc;

    fn actor<T: Send + 'static>(
        cadence_secs: u64,
        work: WorkRef<T>,
        on_tick: TickRef<T>,
    ) -> TickActor<T> {
        TickActor {
            key: CompositeKey::new("g", "u", "p"),
            cadence: Cadence::from_secs(cadence_secs).unwrap(),
            work,
            on_tick,
            timeout: None,
            bus: Bus::new(64),
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_sleep_exits_immediately() {
        let work: WorkRef<u8> = WorkFn::arc("w", || async { Ok::<_, ProviderError>(1) });
        let on_tick: TickRef<u8> = TickFn::arc(|_k, _w, _o: TickOutcome<u8>| async { Ok(()) });
        let a = actor(3600, work, on_tick);
        let ticks = a.ticks.clone();
        let token = CancellationToken::new();

        let join = tokio::spawn(a.run(token.clone()));
        time::sleep(Duration::from_secs(10)).await;
        token.cancel();

        assert_eq!(join.await.unwrap(), ExitReason::Cancelled);
        assert_eq!(ticks.load(Ordering::Acquire), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_ends_loop() {
        let work: WorkRef<u8> =
            WorkFn::arc("w", || async { Err::<u8, _>(ProviderError::Fatal("revoked".into())) });
        let on_tick: TickRef<u8> = TickFn::arc(|_k, _w, _o: TickOutcome<u8>| async { Ok(()) });

        let reason = actor(1, work, on_tick).run(CancellationToken::new()).await;

        assert_eq!(
            reason,
            ExitReason::Errored(TaskError::Fatal {
                error: ProviderError::Fatal("revoked".into()).to_string()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_failures_do_not_stop_polling() {
        let (tx, mut rx) = mpsc::unbounded_channel::<u64>();
        let calls = Arc::new(AtomicU64::new(0));
        let work: WorkRef<u8> = WorkFn::arc("w", || async { Ok::<_, ProviderError>(7) });
        let on_tick: TickRef<u8> = TickFn::arc(move |_k, _w, _o: TickOutcome<u8>| {
            let tx = tx.clone();
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                let _ = tx.send(n);
                if n % 2 == 1 {
                    panic!("odd delivery blows up");
                }
                anyhow::bail!("even delivery fails")
            }
        });
        let a = actor(1, work, on_tick);
        let mut events = a.bus.subscribe();
        let token = CancellationToken::new();
        let join = tokio::spawn(a.run(token.clone()));

        for expected in 1..=3 {
            assert_eq!(rx.recv().await, Some(expected));
        }
        token.cancel();
        assert_eq!(join.await.unwrap(), ExitReason::Cancelled);

        let mut callback_failures = 0;
        while let Ok(ev) = events.try_recv() {
            if ev.kind == EventKind::CallbackFailed {
                callback_failures += 1;
            }
        }
        assert!(callback_failures >= 2);
    }
}

//! # Failure reporter: classifies and surfaces terminal task outcomes.
//!
//! ```text
//! join(actor) ─► Ok(Cancelled)        ─► debug!  + TaskCancelled
//!            ├─► Ok(Errored(e))       ─► error!  + TaskFailed
//!            ├─► Err(join: panic)     ─► Errored(Panicked)     ─► error! + TaskFailed
//!            └─► Err(join: cancelled) ─► Errored(Disconnected) ─► error! + TaskFailed
//! ```
//!
//! Nothing here is re-raised: a failed task is logged and published, and the
//! caller that started it is never affected.

use tokio::task::JoinError;

use crate::core::handle::ExitReason;
use crate::error::{TaskError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::key::CompositeKey;

/// Maps the join result of an actor to its exit reason.
pub(crate) fn classify(res: Result<ExitReason, JoinError>) -> ExitReason {
    match res {
        Ok(reason) => reason,
        Err(je) if je.is_panic() => {
            let payload = je.into_panic();
            ExitReason::Errored(TaskError::Panicked {
                info: panic_message(payload.as_ref()),
            })
        }
        Err(je) => ExitReason::Errored(TaskError::Disconnected {
            detail: je.to_string(),
        }),
    }
}

/// Logs and publishes a terminal outcome.
pub(crate) fn report(bus: &Bus, key: &CompositeKey, last_tick: u64, reason: &ExitReason) {
    match reason {
        ExitReason::Cancelled => {
            tracing::debug!(%key, last_tick, "task cancelled");
            bus.publish(
                Event::new(EventKind::TaskCancelled)
                    .with_key(key.clone())
                    .with_tick(last_tick),
            );
        }
        ExitReason::Errored(err) => {
            tracing::error!(%key, last_tick, label = err.as_label(), error = %err, "task failed");
            bus.publish(
                Event::new(EventKind::TaskFailed)
                    .with_key(key.clone())
                    .with_tick(last_tick)
                    .with_reason(err.to_string()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> CompositeKey {
        CompositeKey::new("g", "u", "p")
    }

    #[tokio::test]
    async fn test_classify_panic() {
        let join = tokio::spawn(async {
            if true {
                panic!("provider exploded");
            }
            ExitReason::Cancelled
        });

        let reason = classify(join.await);

        assert_eq!(
            reason,
            ExitReason::Errored(TaskError::Panicked {
                info: "provider exploded".into()
            })
        );
    }

    #[tokio::test]
    async fn test_classify_aborted_is_disconnected() {
        let join = tokio::spawn(async {
            std::future::pending::<()>().await;
            ExitReason::Cancelled
        });
        join.abort();

        assert!(matches!(
            classify(join.await),
            ExitReason::Errored(TaskError::Disconnected { .. })
        ));
    }

    #[test]
    fn test_report_publishes_kind_per_reason() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();

        report(&bus, &key(), 3, &ExitReason::Cancelled);
        report(
            &bus,
            &key(),
            4,
            &ExitReason::Errored(TaskError::Fatal {
                error: "gone".into(),
            }),
        );

        let cancelled = rx.try_recv().unwrap();
        assert_eq!(cancelled.kind, EventKind::TaskCancelled);
        assert_eq!(cancelled.tick, Some(3));

        let failed = rx.try_recv().unwrap();
        assert_eq!(failed.kind, EventKind::TaskFailed);
        assert_eq!(failed.key, Some(key()));
        assert!(failed.reason.as_deref().unwrap().contains("gone"));
    }
}

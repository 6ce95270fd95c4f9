//! # Scheduler: registry, event fan-out and graceful shutdown in one place.
//!
//! The [`Scheduler`] owns the event [`Bus`], a [`SubscriberSet`] and the
//! [`TaskRegistry`]. It is what an application holds: configuration changes
//! go through [`apply`](Scheduler::apply) or
//! [`start_or_replace`](Scheduler::start_or_replace), shutdown through
//! [`shutdown`](Scheduler::shutdown) or [`run_until_signal`](Scheduler::run_until_signal).
//!
//! ## Architecture
//! ```text
//! config change ──► Scheduler::apply(entries)
//!                     ├─► entry.cadence()        (ParseError → rejected, no task)
//!                     ├─► factory.build(entry)   (ProviderError → rejected, no task)
//!                     └─► registry.start_or_replace(key, cadence, work, on_tick)
//!
//! TickActor / Registry ── publish ──► Bus ──► listener ──► SubscriberSet::emit
//!                                                            ├─► [queue] LogWriter
//!                                                            └─► [queue] user subscribers
//!
//! run_until_signal():
//!   wait_for_shutdown_signal() ─► ShutdownRequested ─► registry.shutdown(grace)
//!                                                        ├─ all exited ─► AllStoppedWithin
//!                                                        └─ timeout    ─► GraceExceeded
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use pollvisor::{
//!     LogWriter, ProviderError, Scheduler, SchedulerConfig, Subscribe, SubscriptionEntry, TickFn,
//!     TickOutcome, WorkFn, WorkRef,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!     let sched: Scheduler<u64> = Scheduler::builder(SchedulerConfig::default())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     let factory = |_: &SubscriptionEntry| -> Result<WorkRef<u64>, ProviderError> {
//!         Ok(WorkFn::arc("constant", || async { Ok::<_, ProviderError>(42) }))
//!     };
//!     let on_tick = TickFn::arc(|key, _work, outcome: TickOutcome<u64>| async move {
//!         println!("{key}: {outcome:?}");
//!         Ok(())
//!     });
//!
//!     let report = sched
//!         .apply(&[SubscriptionEntry::new("g1", "u1", "constant", "5m")], &factory, on_tick)
//!         .await;
//!     assert_eq!(report.started.len(), 1);
//!
//!     sched.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;

use crate::cadence::Cadence;
use crate::config::{SchedulerConfig, SubscriptionEntry};
use crate::core::builder::SchedulerBuilder;
use crate::core::handle::TaskHandle;
use crate::core::registry::TaskRegistry;
use crate::core::shutdown;
use crate::error::{ApplyError, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::key::CompositeKey;
use crate::subscribers::SubscriberSet;
use crate::tasks::{TaskSpec, TickRef, WorkFactory, WorkRef};

/// Outcome of [`Scheduler::apply`].
pub struct ApplyReport<T: Send + 'static> {
    /// Handles of the tasks started (or replaced), in entry order.
    pub started: Vec<TaskHandle<T>>,
    /// Entries that created no task, with the reason.
    pub rejected: Vec<(CompositeKey, ApplyError)>,
}

impl<T: Send + 'static> ApplyReport<T> {
    /// True if every entry started a task.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

impl<T: Send + 'static> std::fmt::Debug for ApplyReport<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplyReport")
            .field("started", &self.started)
            .field("rejected", &self.rejected)
            .finish()
    }
}

/// Supervises periodic polling tasks for one value type `T`.
pub struct Scheduler<T: Send + 'static> {
    cfg: SchedulerConfig,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    registry: TaskRegistry<T>,
}

impl<T: Send + 'static> Scheduler<T> {
    /// Starts building a scheduler.
    pub fn builder(cfg: SchedulerConfig) -> SchedulerBuilder<T> {
        SchedulerBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: SchedulerConfig,
        bus: Bus,
        subs: Arc<SubscriberSet>,
        registry: TaskRegistry<T>,
    ) -> Self {
        Self {
            cfg,
            bus,
            subs,
            registry,
        }
    }

    /// Forwards bus events to the subscriber set until the bus closes.
    pub(crate) fn spawn_listener(&self) {
        let mut rx = self.bus.subscribe();
        let subs = Arc::clone(&self.subs);

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => subs.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    /// Runtime configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.cfg
    }

    /// Event bus (subscribe here for raw events).
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Underlying registry.
    pub fn registry(&self) -> &TaskRegistry<T> {
        &self.registry
    }

    /// See [`TaskRegistry::start_or_replace`].
    pub async fn start_or_replace(
        &self,
        key: CompositeKey,
        cadence: Cadence,
        work: WorkRef<T>,
        on_tick: TickRef<T>,
    ) -> TaskHandle<T> {
        self.registry.start_or_replace(key, cadence, work, on_tick).await
    }

    /// See [`TaskRegistry::start`].
    pub async fn start(&self, spec: TaskSpec<T>) -> TaskHandle<T> {
        self.registry.start(spec).await
    }

    /// See [`TaskRegistry::find`].
    pub async fn find(&self, key: &CompositeKey) -> Option<TaskHandle<T>> {
        self.registry.find(key).await
    }

    /// See [`TaskRegistry::stop`].
    pub async fn stop(&self, key: &CompositeKey) -> bool {
        self.registry.stop(key).await
    }

    /// See [`TaskRegistry::stop_all`].
    pub async fn stop_all(&self) -> Vec<TaskHandle<T>> {
        self.registry.stop_all().await
    }

    /// Starts (or restarts) one task per configured subscription.
    ///
    /// Entries whose interval does not parse, or whose work unit cannot be
    /// built, are reported and create no task; the others are unaffected.
    pub async fn apply<F>(
        &self,
        entries: &[SubscriptionEntry],
        factory: &F,
        on_tick: TickRef<T>,
    ) -> ApplyReport<T>
    where
        F: WorkFactory<T> + ?Sized,
    {
        let mut report = ApplyReport {
            started: Vec::with_capacity(entries.len()),
            rejected: Vec::new(),
        };

        for entry in entries {
            let key = entry.key();
            let built = entry
                .cadence()
                .map_err(ApplyError::from)
                .and_then(|cadence| Ok((cadence, factory.build(entry)?)));

            match built {
                Ok((cadence, work)) => {
                    let handle = self
                        .registry
                        .start_or_replace(key, cadence, work, Arc::clone(&on_tick))
                        .await;
                    report.started.push(handle);
                }
                Err(e) => {
                    tracing::warn!(
                        %key,
                        interval = %entry.interval,
                        label = e.as_label(),
                        error = %e,
                        "subscription rejected"
                    );
                    report.rejected.push((key, e));
                }
            }
        }
        report
    }

    /// Stops every task and waits up to the configured grace period.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.registry.shutdown(self.cfg.grace).await
    }

    /// Waits for SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere), then shuts down.
    pub async fn run_until_signal(&self) -> Result<(), RuntimeError> {
        if let Err(e) = shutdown::wait_for_shutdown_signal().await {
            tracing::error!(error = %e, "cannot listen for shutdown signals; shutting down");
        }
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.shutdown().await
    }
}

//! # Task registry: at most one live task per key.
//!
//! Owns the `CompositeKey → TaskHandle` map and is the only place that spawns
//! tick loops. Every mutation takes the write lock, so concurrent
//! reconfiguration is serialized and the last `start_or_replace` for a key wins.
//!
//! ## Architecture
//! ```text
//! start_or_replace(key, ...) ──► write lock
//!                                  ├─► remove old handle ─► old.stop()   (fire-and-forget)
//!                                  ├─► spawn TickActor on child token
//!                                  ├─► spawn watcher
//!                                  └─► insert new handle
//!
//! watcher:  join(actor) ─► classify ─► report ─► on_finished ─► release(key, id) ─► exit
//!                                                                   └─► removes the entry only
//!                                                                       if it is still this handle
//! ```
//!
//! ## Rules
//! - Replacing never waits for the old loop; the old loop drops any outcome
//!   it produces after being stopped.
//! - Every handle carries a generation id; a finishing old handle never
//!   evicts the handle that replaced it.
//! - All task tokens are children of one root token, cancelled when the last
//!   registry clone is dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{RwLock, watch};
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::cadence::Cadence;
use crate::core::actor::TickActor;
use crate::core::handle::TaskHandle;
use crate::core::reporter;
use crate::error::{RuntimeError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::key::CompositeKey;
use crate::tasks::{FinishedFn, TaskSpec, TickRef, WorkRef};

struct Shared<T: Send + 'static> {
    tasks: RwLock<HashMap<CompositeKey, TaskHandle<T>>>,
    bus: Bus,
    next_id: AtomicU64,
    default_timeout: Option<Duration>,
    root: CancellationToken,
}

impl<T: Send + 'static> Shared<T> {
    /// Drops the entry for `key` if it still belongs to handle `id`.
    async fn release(&self, key: &CompositeKey, id: u64) {
        let mut tasks = self.tasks.write().await;
        if tasks.get(key).is_some_and(|h| h.id() == id) {
            tasks.remove(key);
            drop(tasks);
            self.bus
                .publish(Event::new(EventKind::TaskRemoved).with_key(key.clone()));
        }
    }
}

impl<T: Send + 'static> Drop for Shared<T> {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

/// Registry of running periodic tasks. Cheap to clone; clones share state.
pub struct TaskRegistry<T: Send + 'static> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> Clone for TaskRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> TaskRegistry<T> {
    /// Creates an empty registry publishing to `bus`.
    ///
    /// `default_timeout` bounds every `produce()` call unless the task overrides it
    /// (`None` or zero = unbounded).
    pub fn new(bus: Bus, default_timeout: Option<Duration>) -> Self {
        Self {
            shared: Arc::new(Shared {
                tasks: RwLock::new(HashMap::new()),
                bus,
                next_id: AtomicU64::new(0),
                default_timeout: default_timeout.filter(|d| !d.is_zero()),
                root: CancellationToken::new(),
            }),
        }
    }

    /// Starts a task for `key`, cancelling the one already running under it.
    pub async fn start_or_replace(
        &self,
        key: CompositeKey,
        cadence: Cadence,
        work: WorkRef<T>,
        on_tick: TickRef<T>,
    ) -> TaskHandle<T> {
        self.start(TaskSpec::new(key, cadence, work, on_tick)).await
    }

    /// Starts a task from a full specification (same replace semantics).
    pub async fn start(&self, spec: TaskSpec<T>) -> TaskHandle<T> {
        let timeout = spec.effective_timeout(self.shared.default_timeout);
        let (key, cadence, work, on_tick, on_finished) = spec.into_parts();

        let mut tasks = self.shared.tasks.write().await;
        let replaced = tasks.remove(&key);
        if let Some(old) = &replaced {
            old.stop();
        }
        let handle = self.spawn(key.clone(), cadence, work, on_tick, on_finished, timeout);
        tasks.insert(key.clone(), handle.clone());
        drop(tasks);

        if let Some(old) = replaced {
            tracing::debug!(%key, old_id = old.id(), new_id = handle.id(), "task replaced");
            self.shared.bus.publish(
                Event::new(EventKind::TaskReplaced)
                    .with_key(key.clone())
                    .with_cadence(cadence),
            );
        }
        self.shared.bus.publish(
            Event::new(EventKind::TaskStarted)
                .with_key(key)
                .with_cadence(cadence),
        );
        handle
    }

    /// Returns the live handle for `key`, if any.
    pub async fn find(&self, key: &CompositeKey) -> Option<TaskHandle<T>> {
        self.shared.tasks.read().await.get(key).cloned()
    }

    /// Removes and cancels the task for `key`. Returns false if there was none.
    pub async fn stop(&self, key: &CompositeKey) -> bool {
        let removed = self.shared.tasks.write().await.remove(key);
        match removed {
            Some(handle) => {
                handle.stop();
                self.shared
                    .bus
                    .publish(Event::new(EventKind::TaskRemoved).with_key(key.clone()));
                true
            }
            None => false,
        }
    }

    /// Cancels every task and clears the registry.
    ///
    /// Returns the drained handles so the caller can wait for them.
    pub async fn stop_all(&self) -> Vec<TaskHandle<T>> {
        self.shared
            .bus
            .publish(Event::new(EventKind::StopAllRequested));

        let drained: Vec<TaskHandle<T>> = {
            let mut tasks = self.shared.tasks.write().await;
            tasks.drain().map(|(_, h)| h).collect()
        };
        for h in &drained {
            h.stop();
            self.shared
                .bus
                .publish(Event::new(EventKind::TaskRemoved).with_key(h.key().clone()));
        }
        drained
    }

    /// Stops every task and waits up to `grace` for all loops to exit.
    pub async fn shutdown(&self, grace: Duration) -> Result<(), RuntimeError> {
        let handles = self.stop_all().await;
        let all_done = futures::future::join_all(handles.iter().map(|h| h.wait()));

        match time::timeout(grace, all_done).await {
            Ok(_) => {
                self.shared
                    .bus
                    .publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_elapsed) => {
                let mut stuck: Vec<CompositeKey> = handles
                    .iter()
                    .filter(|h| !h.state().is_terminal())
                    .map(|h| h.key().clone())
                    .collect();
                stuck.sort_unstable();

                let listed = stuck
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                self.shared
                    .bus
                    .publish(Event::new(EventKind::GraceExceeded).with_reason(listed));
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }

    /// Sorted keys of all live tasks.
    pub async fn keys(&self) -> Vec<CompositeKey> {
        let mut keys: Vec<CompositeKey> =
            self.shared.tasks.read().await.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Number of live tasks.
    pub async fn len(&self) -> usize {
        self.shared.tasks.read().await.len()
    }

    /// True if no task is registered.
    pub async fn is_empty(&self) -> bool {
        self.shared.tasks.read().await.is_empty()
    }

    fn spawn(
        &self,
        key: CompositeKey,
        cadence: Cadence,
        work: WorkRef<T>,
        on_tick: TickRef<T>,
        on_finished: Option<FinishedFn>,
        timeout: Option<Duration>,
    ) -> TaskHandle<T> {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let token = self.shared.root.child_token();
        let ticks = Arc::new(AtomicU64::new(0));
        let (exit_tx, exit_rx) = watch::channel(None);

        let actor = TickActor {
            key: key.clone(),
            cadence,
            work: Arc::clone(&work),
            on_tick,
            timeout,
            bus: self.shared.bus.clone(),
            ticks: Arc::clone(&ticks),
        };
        let join = tokio::spawn(actor.run(token.clone()));

        let handle = TaskHandle::new(
            id,
            key.clone(),
            cadence,
            work,
            token,
            Arc::clone(&ticks),
            exit_rx,
        );

        let bus = self.shared.bus.clone();
        let registry: Weak<Shared<T>> = Arc::downgrade(&self.shared);
        tokio::spawn(async move {
            let reason = reporter::classify(join.await);
            reporter::report(&bus, &key, ticks.load(Ordering::Acquire), &reason);

            if let Some(f) = on_finished {
                let call = std::panic::AssertUnwindSafe(|| f(&key, &reason));
                if let Err(payload) = std::panic::catch_unwind(call) {
                    let info = panic_message(payload.as_ref());
                    tracing::warn!(%key, %info, "on_finished callback panicked");
                }
            }
            if let Some(shared) = registry.upgrade() {
                shared.release(&key, id).await;
            }
            exit_tx.send_replace(Some(reason));
        });

        handle
    }
}

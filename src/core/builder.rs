use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::core::registry::TaskRegistry;
use crate::core::scheduler::Scheduler;
use crate::events::Bus;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for a [`Scheduler`].
pub struct SchedulerBuilder<T: Send + 'static> {
    cfg: SchedulerConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    _values: std::marker::PhantomData<fn() -> T>,
}

impl<T: Send + 'static> SchedulerBuilder<T> {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SchedulerConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            _values: std::marker::PhantomData,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (task lifecycle, tick outcomes,
    /// shutdown) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the scheduler and spawns its event listener.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn build(self) -> Scheduler<T> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, &bus));
        let registry = TaskRegistry::new(bus.clone(), self.cfg.tick_timeout());

        let sched = Scheduler::new_internal(self.cfg, bus, subs, registry);
        sched.spawn_listener();
        sched
    }
}

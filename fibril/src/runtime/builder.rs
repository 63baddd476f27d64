use super::Runtime;
use super::driver::TransitionHook;
use super::scheduler::Scheduler;
use super::task::Transition;
use crate::time::{Clock, Timers};

use std::rc::Rc;

/// Number of arena slots preallocated by default.
const DEFAULT_CAPACITY: usize = 64;

/// Builder for configuring and creating a [`Scheduler`].
///
/// # Examples
///
/// ```rust,ignore
/// let scheduler = SchedulerBuilder::new()
///     .capacity(256)
///     .on_transition(|t| println!("{t}"))
///     .build::<&str>();
/// ```
pub struct SchedulerBuilder {
    /// Arena slots preallocated for task nodes.
    capacity: usize,

    /// Diagnostics hook receiving every node transition.
    hook: Option<TransitionHook>,
}

impl SchedulerBuilder {
    /// Creates a new `SchedulerBuilder` with default configuration.
    pub fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            hook: None,
        }
    }

    /// Sets how many node slots the arena preallocates.
    ///
    /// The arena still grows on demand past this size.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Installs a hook called on every node state transition.
    ///
    /// The hook only observes: it runs while the scheduler holds its tree,
    /// so it must not schedule or settle anything.
    pub fn on_transition(mut self, hook: impl Fn(&Transition) + 'static) -> Self {
        self.hook = Some(Rc::new(hook));
        self
    }

    /// Builds the scheduler with the configured options.
    pub fn build<E: Clone + 'static>(self) -> Scheduler<E> {
        Scheduler::from_parts(self.capacity, self.hook)
    }
}

impl Default for SchedulerBuilder {
    /// Creates a default `SchedulerBuilder`.
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for configuring and creating a [`Runtime`].
///
/// By default the runtime uses a [`Clock::Virtual`] timer queue, which makes
/// timer-driven programs deterministic and instant.
///
/// # Examples
///
/// ```rust,ignore
/// let runtime = RuntimeBuilder::new()
///     .clock(Clock::System)
///     .build::<&str>();
/// ```
pub struct RuntimeBuilder {
    scheduler: SchedulerBuilder,

    /// Clock driving the timer queue.
    clock: Clock,
}

impl RuntimeBuilder {
    /// Creates a new `RuntimeBuilder` with default configuration.
    pub fn new() -> Self {
        Self {
            scheduler: SchedulerBuilder::new(),
            clock: Clock::Virtual,
        }
    }

    /// Selects the clock of the runtime's timer queue.
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// See [`SchedulerBuilder::capacity`].
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.scheduler = self.scheduler.capacity(capacity);
        self
    }

    /// See [`SchedulerBuilder::on_transition`].
    pub fn on_transition(mut self, hook: impl Fn(&Transition) + 'static) -> Self {
        self.scheduler = self.scheduler.on_transition(hook);
        self
    }

    /// Builds the runtime with the configured options.
    pub fn build<E: Clone + 'static>(self) -> Runtime<E> {
        Runtime::from_parts(self.scheduler.build(), Timers::new(self.clock))
    }
}

impl Default for RuntimeBuilder {
    /// Creates a default `RuntimeBuilder`.
    fn default() -> Self {
        Self::new()
    }
}

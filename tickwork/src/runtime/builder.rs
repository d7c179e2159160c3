use super::clock::{Clock, SystemClock};
use super::core::Scheduler;
use super::queue::TickBudget;
use super::shared::Shared;
use crate::worker::WorkerPool;

use std::sync::Arc;
use std::thread;

/// Builder for configuring and creating a scheduler.
///
/// `SchedulerBuilder` allows customizing the scheduler before
/// constructing it: the time source, the poll bucket budget, the pool
/// capacities and the background worker threads.
///
/// The scheduler is bound to the thread that calls [`build`](Self::build).
///
/// # Examples
///
/// ```rust,ignore
/// let scheduler = SchedulerBuilder::new()
///     .clock(ManualClock::with_step(1.0 / 60.0))
///     .budget_ms(2.0)
///     .worker_threads(2)
///     .build();
/// ```
pub struct SchedulerBuilder {
    clock: Arc<dyn Clock>,
    budget: TickBudget,

    /// Capacity of the handle and waiter pools.
    pool_capacity: usize,

    /// Number of background worker threads.
    worker_threads: usize,

    threading: bool,
}

impl SchedulerBuilder {
    /// Creates a new `SchedulerBuilder` with default configuration.
    ///
    /// By default the scheduler reads a [`SystemClock`], gives the poll
    /// bucket one millisecond per tick with a minimum share of 10%, pools
    /// up to 100 handles and waiters of each kind, and runs one worker per
    /// available logical CPU (falling back to `1` if unknown). Threading
    /// is off on `wasm` targets.
    pub fn new() -> Self {
        let worker_threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            clock: Arc::new(SystemClock::new()),
            budget: TickBudget {
                budget_ms: 1.0,
                min_fraction: 0.1,
                predicates_in_budget: true,
            },
            pool_capacity: 100,
            worker_threads,
            threading: !cfg!(target_family = "wasm"),
        }
    }

    /// Sets the time source read at the start of every tick.
    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Sets the wall-clock milliseconds the poll bucket may use per tick.
    pub fn budget_ms(mut self, budget_ms: f64) -> Self {
        self.budget.budget_ms = budget_ms.max(0.0);
        self
    }

    /// Sets the share of the poll bucket serviced every tick regardless
    /// of the budget, clamped to `0.0..=1.0`.
    pub fn min_fraction(mut self, min_fraction: f64) -> Self {
        self.budget.min_fraction = min_fraction.clamp(0.0, 1.0);
        self
    }

    /// Chooses whether predicate waiters count against the budget.
    pub fn predicates_in_budget(mut self, counted: bool) -> Self {
        self.budget.predicates_in_budget = counted;
        self
    }

    /// Sets how many released handles and waiters are kept for reuse.
    pub fn pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    /// Sets the number of background worker threads.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn worker_threads(mut self, n: usize) -> Self {
        assert!(n > 0, "worker_threads must be > 0");

        self.worker_threads = n;
        self
    }

    /// Enables or disables background threads.
    ///
    /// Without threads, background and dedicated switches keep the
    /// coroutine on the driver and jobs run inline.
    pub fn threading(mut self, enabled: bool) -> Self {
        self.threading = enabled;
        self
    }

    /// Builds the scheduler with the configured options.
    ///
    /// This starts the background workers, if any.
    pub fn build(self) -> Scheduler {
        let workers = if self.threading {
            WorkerPool::new(self.worker_threads)
        } else {
            None
        };

        let sender = workers.as_ref().map(WorkerPool::sender);
        let shared = Arc::new(Shared::new(self.clock, self.pool_capacity, sender));

        Scheduler::from_parts(shared, workers, self.budget, self.pool_capacity)
    }
}

impl Default for SchedulerBuilder {
    /// Creates a default `SchedulerBuilder`.
    fn default() -> Self {
        Self::new()
    }
}

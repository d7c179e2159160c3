use super::builder::SchedulerBuilder;
use super::clock::Now;
use super::detached::run_detached;
use super::entry::{Entry, settle};
use super::injector::Inbound;
use super::queue::{PollBucket, RunQueue, ServiceReport, TickBudget};
use super::shared::Shared;
use super::spawner::Spawner;
use crate::coroutine::{
    CancellationToken, Coroutine, CoroutineState, ExecutionMode, Guarded, Liveness, Owner, Route,
    StepContext, YieldInstruction, from_future,
};
use crate::error::Fault;
use crate::handle::CoroutineHandle;
use crate::switch::{SwitchOutcome, Switcher, ThreadSwitch};
use crate::task::JobHandle;
use crate::waiter::WaiterPools;
use crate::watcher::{Action, CompletionWatcher, KeyedWatcher};
use crate::worker::{PoolJob, WorkerPool};

use log::{debug, trace, warn};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

/// Counters describing the scheduler between two ticks.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Ticks run so far.
    pub ticks: u64,
    /// Started, not yet stepped.
    pub pending: usize,
    /// Scheduled to step on the next tick.
    pub runnable: usize,
    /// Parked until their state changes.
    pub suspended: usize,
    /// Bound to a waiter in the poll bucket.
    pub waiting: usize,
    /// Running off the driver thread.
    pub detached: usize,
    /// Posted to the driver, not yet drained.
    pub inbound: usize,
    /// Jobs watched by the completion watchers.
    pub watched: usize,
    /// Step faults queued for later ticks.
    pub queued_faults: usize,
    /// Completion handles ready for reuse.
    pub pooled_handles: usize,
    /// Waiters ready for reuse.
    pub pooled_waiters: usize,
}

/// A tick-driven coroutine scheduler.
///
/// The scheduler belongs to the thread that created it, which is the
/// *driver*: every call to [`tick`](Self::tick) advances each runnable
/// coroutine by one step, checks the coroutines that are waiting, and
/// polls the completion watchers. Other threads interact with it through a
/// [`Spawner`] or a [`Switcher`].
///
/// # Examples
///
/// ```rust,ignore
/// let mut scheduler = Scheduler::new();
///
/// let handle = scheduler.start_with_handle(tickwork::from_future(async {
///     tickwork::wait::seconds(1.0).await;
///     Ok(())
/// }));
///
/// while !handle.is_completed() {
///     scheduler.tick()?;
/// }
/// ```
pub struct Scheduler {
    shared: Arc<Shared>,
    queue: RunQueue,
    suspended: Vec<Entry>,
    bucket: PollBucket,
    waiters: WaiterPools,
    watcher: CompletionWatcher,
    keyed: KeyedWatcher,
    budget: TickBudget,

    /// Faults drained from the injector, returned one per tick.
    faults: VecDeque<Fault>,

    /// Drain buffer for the injector.
    inbound: VecDeque<Inbound>,

    /// Coroutines started from inside steps of the current tick.
    spawned: Vec<Entry>,

    last_service: ServiceReport,

    /// Dropped after everything that could still post work.
    workers: Option<WorkerPool>,

    /// Ties the scheduler to its driver thread.
    _driver: PhantomData<Rc<()>>,
}

impl Scheduler {
    /// Creates a scheduler with the default configuration.
    pub fn new() -> Self {
        SchedulerBuilder::new().build()
    }

    /// Returns a builder to configure a scheduler.
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::new()
    }

    pub(crate) fn from_parts(
        shared: Arc<Shared>,
        workers: Option<WorkerPool>,
        budget: TickBudget,
        pool_capacity: usize,
    ) -> Self {
        Self {
            shared,
            queue: RunQueue::default(),
            suspended: Vec::new(),
            bucket: PollBucket::default(),
            waiters: WaiterPools::new(pool_capacity),
            watcher: CompletionWatcher::new(),
            keyed: KeyedWatcher::new(),
            budget,
            faults: VecDeque::new(),
            inbound: VecDeque::new(),
            spawned: Vec::new(),
            last_service: ServiceReport::default(),
            workers,
            _driver: PhantomData,
        }
    }

    /// Starts `coroutine`; its first step happens on the next tick.
    pub fn start<C: Coroutine>(&mut self, coroutine: C) {
        let entry = self.shared.new_entry(Box::new(coroutine));
        debug!("{} started", entry.id);
        self.queue.admit(entry);
    }

    /// Like [`start`](Self::start), returning a completion handle.
    pub fn start_with_handle<C: Coroutine>(&mut self, coroutine: C) -> CoroutineHandle {
        let (entry, handle) = self.shared.new_entry_with_handle(Box::new(coroutine));
        debug!("{} started with a handle", entry.id);
        self.queue.admit(entry);
        handle
    }

    /// Starts `coroutine` merged with an external liveness condition.
    pub fn start_guarded<C: Coroutine, L: Liveness>(&mut self, coroutine: C, liveness: L) {
        self.start(Guarded::new(coroutine, liveness));
    }

    /// Like [`start_guarded`](Self::start_guarded), returning a handle.
    pub fn start_guarded_with_handle<C: Coroutine, L: Liveness>(
        &mut self,
        coroutine: C,
        liveness: L,
    ) -> CoroutineHandle {
        self.start_with_handle(Guarded::new(coroutine, liveness))
    }

    /// Starts `coroutine` so that cancelling `token` finalizes it.
    pub fn start_cancellable<C: Coroutine>(&mut self, coroutine: C, token: CancellationToken) {
        self.start_guarded(coroutine, token);
    }

    pub fn start_cancellable_with_handle<C: Coroutine>(
        &mut self,
        coroutine: C,
        token: CancellationToken,
    ) -> CoroutineHandle {
        self.start_guarded_with_handle(coroutine, token)
    }

    /// Starts `coroutine` bound to `owner`: parked while the owner is
    /// inactive, finalized once it is destroyed.
    pub fn start_owned<C: Coroutine>(&mut self, coroutine: C, owner: &Owner) {
        self.start_guarded(coroutine, owner.clone());
    }

    pub fn start_owned_with_handle<C: Coroutine>(
        &mut self,
        coroutine: C,
        owner: &Owner,
    ) -> CoroutineHandle {
        self.start_guarded_with_handle(coroutine, owner.clone())
    }

    /// A thread-safe way to start coroutines on this scheduler.
    pub fn spawner(&self) -> Spawner {
        Spawner::new(self.shared.clone())
    }

    /// Thread-switch helper bound to this scheduler.
    pub fn switcher(&self) -> Switcher {
        Switcher::new(self.shared.clone())
    }

    /// Runs `f` on the background pool and returns a handle to wait on.
    ///
    /// Without threading support `f` runs before this returns.
    pub fn schedule_job<F>(&self, f: F) -> PoolJob
    where
        F: FnOnce() -> Result<(), Fault> + Send + 'static,
    {
        PoolJob::spawn(self.shared.workers(), f)
    }

    /// Runs `continuation` on the driver once `job` completes.
    pub fn watch<H, F>(&mut self, job: H, continuation: F)
    where
        H: JobHandle,
        F: FnOnce(Result<(), Fault>) + Send + 'static,
    {
        self.watcher.watch(job, continuation);
    }

    /// Runs `action` on the driver with `job` once it completes.
    pub fn watch_keyed<H, A>(&mut self, job: H, action: A)
    where
        H: JobHandle,
        A: Action<H>,
    {
        self.keyed.register(job, action);
    }

    /// Wall-clock milliseconds the poll bucket may use per tick.
    pub fn budget_ms(&self) -> f64 {
        self.budget.budget_ms
    }

    pub fn set_budget_ms(&mut self, budget_ms: f64) {
        self.budget.budget_ms = budget_ms.max(0.0);
    }

    /// Share of the poll bucket checked every tick regardless of the budget.
    pub fn min_fraction(&self) -> f64 {
        self.budget.min_fraction
    }

    /// Sets the minimum serviced share, clamped to `0.0..=1.0`.
    pub fn set_min_fraction(&mut self, min_fraction: f64) {
        self.budget.min_fraction = min_fraction.clamp(0.0, 1.0);
    }

    pub fn predicates_in_budget(&self) -> bool {
        self.budget.predicates_in_budget
    }

    /// Chooses whether predicate waiters count against the budget.
    pub fn set_predicates_in_budget(&mut self, counted: bool) {
        self.budget.predicates_in_budget = counted;
    }

    /// Number of background worker threads; `0` without threading.
    pub fn worker_threads(&self) -> usize {
        self.workers.as_ref().map_or(0, WorkerPool::threads)
    }

    /// Clock snapshot as of now.
    pub fn now(&self) -> Now {
        self.shared.now()
    }

    /// What the last poll bucket service did.
    pub fn last_service(&self) -> ServiceReport {
        self.last_service
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            ticks: self.shared.tick(),
            pending: self.queue.pending(),
            runnable: self.queue.runnable(),
            suspended: self.suspended.len(),
            waiting: self.bucket.len(),
            detached: self.shared.detached(),
            inbound: self.shared.injector.len(),
            watched: self.watcher.len() + self.keyed.len(),
            queued_faults: self.faults.len(),
            pooled_handles: self.shared.handles.available(),
            pooled_waiters: self.waiters.available(),
        }
    }

    /// Returns `true` when no coroutine, watched job or posted work is left.
    pub fn is_idle(&self) -> bool {
        self.queue.pending() == 0
            && self.queue.runnable() == 0
            && self.suspended.is_empty()
            && self.bucket.len() == 0
            && self.shared.detached() == 0
            && self.shared.injector.is_empty()
            && self.watcher.is_empty()
            && self.keyed.is_empty()
            && self.faults.is_empty()
    }

    /// Advances every coroutine by one tick.
    ///
    /// In order: new coroutines join the active list, work posted from
    /// other threads is drained, suspended coroutines are re-polled, the
    /// poll bucket is serviced, every active coroutine is stepped once, and
    /// the completion watchers are ticked.
    ///
    /// # Errors
    ///
    /// Returns the first step fault. The faulting coroutine is finalized;
    /// the coroutines not stepped yet keep their place for the next tick.
    pub fn tick(&mut self) -> Result<(), Fault> {
        self.shared.clock.on_tick();
        let now = self.shared.now();
        let tick = self.shared.advance_tick();

        trace!("tick {tick} at {:.3}s", now.time);

        self.queue.swap();
        self.drain_injector(&now);
        self.poll_suspended();
        self.service_bucket(&now);

        if let Some(fault) = self.faults.pop_front() {
            self.defer_active();
            return Err(fault);
        }

        self.step_active(&now)?;

        self.watcher.tick();
        self.keyed.tick();

        Ok(())
    }

    /// Ticks until idle, or at most `max_ticks` times.
    ///
    /// Returns the number of ticks run. Sleeps for about a millisecond
    /// between ticks while only background work is outstanding.
    pub fn run_until_idle(&mut self, max_ticks: u64) -> Result<u64, Fault> {
        let mut ticks = 0;

        while ticks < max_ticks && !self.is_idle() {
            self.tick()?;
            ticks += 1;
            self.park_if_waiting_on_threads();
        }

        Ok(ticks)
    }

    /// Runs `future` as a coroutine and ticks until it returns.
    ///
    /// # Errors
    ///
    /// Returns the future's own error, or the first step fault raised by
    /// any coroutine during the ticks it took.
    pub fn block_on<F, T>(&mut self, future: F) -> Result<T, Fault>
    where
        F: Future<Output = Result<T, Fault>> + Send + 'static,
        T: Send + 'static,
    {
        let slot = Arc::new(Mutex::new(None));
        let out = slot.clone();

        let handle = self.start_with_handle(from_future(async move {
            let result = future.await;
            *out.lock() = Some(result);
            Ok(())
        }));

        while !handle.is_completed() {
            self.tick()?;
            self.park_if_waiting_on_threads();
        }

        slot.lock().take().unwrap_or(Err(Fault::Detached))
    }

    fn park_if_waiting_on_threads(&self) {
        let driver_side = self.queue.pending() + self.queue.runnable() + self.suspended.len();

        if driver_side == 0 && self.bucket.len() == 0 && self.shared.detached() > 0 {
            self.shared.injector.park(Duration::from_millis(1));
        }
    }

    fn drain_injector(&mut self, now: &Now) {
        self.shared.injector.drain_into(&mut self.inbound);

        while let Some(item) = self.inbound.pop_front() {
            match item {
                Inbound::Start(entry) => {
                    debug!("{} started from another thread", entry.id);
                    self.queue.resume(entry);
                }
                Inbound::Resume(entry, instruction) => {
                    trace!("{} back on the driver", entry.id);
                    self.route(entry, instruction, now);
                }
                Inbound::Fault(entry, fault) => {
                    warn!("{} failed off the driver: {fault}", entry.id);
                    entry.finish();
                    self.faults.push_back(fault);
                }
                Inbound::Call(continuation) => continuation(),
            }
        }
    }

    fn poll_suspended(&mut self) {
        let parked = std::mem::take(&mut self.suspended);

        for entry in parked {
            match entry.state(ExecutionMode::Driver) {
                CoroutineState::Continue => self.queue.resume(entry),
                CoroutineState::Suspended => self.suspended.push(entry),
                CoroutineState::Finalized => entry.finish(),
            }
        }
    }

    fn service_bucket(&mut self, now: &Now) {
        let queue = &mut self.queue;

        self.last_service = self
            .bucket
            .service(now, &self.budget, &mut self.waiters, |entry| queue.resume(entry));
    }

    fn step_active(&mut self, now: &Now) -> Result<(), Fault> {
        let mut active = self.queue.take_active();
        let mut iter = active.drain(..);

        while let Some(mut entry) = iter.next() {
            match entry.state(ExecutionMode::Driver) {
                CoroutineState::Finalized => {
                    entry.finish();
                    continue;
                }
                CoroutineState::Suspended => {
                    self.suspended.push(entry);
                    continue;
                }
                CoroutineState::Continue => {}
            }

            let fault = entry.fault.take();
            let mut cx = StepContext::new(
                &self.shared,
                &mut self.spawned,
                ExecutionMode::Driver,
                *now,
                fault,
            );

            let result = panic::catch_unwind(AssertUnwindSafe(|| entry.step(&mut cx)))
                .unwrap_or_else(|payload| Err(Fault::from_panic(payload)));
            let result = settle(entry.id, result, cx.into_fault());

            for started in self.spawned.drain(..) {
                self.queue.admit(started);
            }

            match result {
                Ok(instruction) => self.route(entry, instruction, now),
                Err(fault) => {
                    warn!("{} failed: {fault}", entry.id);
                    entry.finish();
                    self.queue.defer(iter);
                    return Err(fault);
                }
            }
        }

        drop(iter);
        self.queue.restore_active(active);

        Ok(())
    }

    /// Pushes the whole active list back to the next tick.
    fn defer_active(&mut self) {
        let active = self.queue.take_active();
        self.queue.defer(active);
    }

    fn route(&mut self, mut entry: Entry, instruction: YieldInstruction, now: &Now) {
        trace!("{} yielded {instruction:?}", entry.id);

        match instruction.into_route() {
            Route::Continue => self.queue.requeue(entry),
            Route::Suspend => self.suspended.push(entry),
            Route::Finalize => entry.finish(),
            // `Entry::step` runs delegated frames itself.
            Route::Delegate(_) => unreachable!("{} returned an unresolved delegate", entry.id),
            Route::Switch(ThreadSwitch::Driver) => self.queue.requeue(entry),
            Route::Switch(target) => self.detach(entry, target),
            Route::Wait(request) => {
                let waiter = self.waiters.create(request, now);
                self.bucket.push(entry, waiter);
            }
        }
    }

    fn detach(&mut self, entry: Entry, target: ThreadSwitch) {
        if !self.shared.threading() {
            debug!("{} stays on the driver: threading unavailable", entry.id);
            self.queue.requeue(entry);
            return;
        }

        let id = entry.id;
        let guard = self.shared.detach_guard();
        let outcome = self
            .switcher()
            .on_completed(target, move || run_detached(entry, target, guard));

        if outcome == SwitchOutcome::Degraded {
            debug!("{id} ran inline: {target:?} unavailable");
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scheduler {
    /// Shuts the scheduler down.
    ///
    /// Detached coroutines stop at their next step; every coroutine still
    /// owned by the scheduler is dropped, completing its handle.
    fn drop(&mut self) {
        self.shared.close();

        let waiting = self.bucket.drain(&mut self.waiters);
        drop(waiting);

        self.suspended.clear();
        self.queue = RunQueue::default();

        let mut inbound = VecDeque::new();
        self.shared.injector.drain_into(&mut inbound);
        for item in inbound {
            if let Inbound::Call(continuation) = item {
                continuation();
            }
        }

        self.workers.take();
    }
}

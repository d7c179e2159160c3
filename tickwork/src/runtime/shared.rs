use super::clock::{Clock, Now};
use super::entry::{CoroutineId, Entry};
use super::injector::{Inbound, Injector};
use crate::coroutine::Coroutine;
use crate::handle::{Continuation, CoroutineHandle, HandlePool};
use crate::worker::JobSender;

use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, ThreadId};

/// State shared between a [`Scheduler`](crate::Scheduler) and everything
/// that may outlive a single tick or run on another thread: spawners,
/// switchers, handles and detached coroutines.
pub(crate) struct Shared {
    /// Cross-thread inbox of the driver.
    pub(crate) injector: Injector,

    /// Recycled completion handles.
    pub(crate) handles: HandlePool,

    /// Time source read at the start of every tick.
    pub(crate) clock: Arc<dyn Clock>,

    /// Background worker queue, absent when threading is disabled.
    workers: Option<JobSender>,

    /// Thread that owns the scheduler.
    driver: ThreadId,

    /// Monotonic coroutine id source.
    next_id: AtomicU64,

    /// Coroutines currently running off the driver thread.
    detached: AtomicUsize,

    /// Index of the tick in progress, or of the last one.
    ticks: AtomicU64,

    /// Set when the scheduler is dropped.
    closed: AtomicBool,
}

impl Shared {
    pub(crate) fn new(
        clock: Arc<dyn Clock>,
        handle_capacity: usize,
        workers: Option<JobSender>,
    ) -> Self {
        Self {
            injector: Injector::new(),
            handles: HandlePool::new(handle_capacity),
            clock,
            workers,
            driver: thread::current().id(),
            next_id: AtomicU64::new(1),
            detached: AtomicUsize::new(0),
            ticks: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns `true` when called from the thread that owns the scheduler.
    pub(crate) fn is_driver_thread(&self) -> bool {
        thread::current().id() == self.driver
    }

    /// Returns `true` if background workers are available.
    pub(crate) fn threading(&self) -> bool {
        self.workers.is_some()
    }

    pub(crate) fn workers(&self) -> Option<&JobSender> {
        self.workers.as_ref()
    }

    /// Schedules `continuation` to run on the driver at the next tick.
    pub(crate) fn post_call(&self, continuation: Continuation) {
        self.post(Inbound::Call(continuation));
    }

    /// Posts work to the driver.
    ///
    /// Once the scheduler is gone there is no driver left: continuations
    /// run on the calling thread, and coroutines are dropped, which
    /// completes their handles.
    pub(crate) fn post(&self, item: Inbound) {
        if !self.is_closed() {
            self.injector.push(item);
            return;
        }

        match item {
            Inbound::Call(continuation) => continuation(),
            Inbound::Start(entry) | Inbound::Resume(entry, _) | Inbound::Fault(entry, _) => {
                debug!("scheduler closed; dropping {}", entry.id);
            }
        }
    }

    /// Reads the clock.
    pub(crate) fn now(&self) -> Now {
        Now::read(&*self.clock)
    }

    /// Builds a scheduler entry without a handle.
    pub(crate) fn new_entry(&self, coroutine: Box<dyn Coroutine>) -> Entry {
        Entry::new(self.next_id(), coroutine, None)
    }

    /// Builds a scheduler entry bound to a freshly acquired handle.
    pub(crate) fn new_entry_with_handle(
        self: &Arc<Self>,
        coroutine: Box<dyn Coroutine>,
    ) -> (Entry, CoroutineHandle) {
        let handle = self.handles.acquire(&Arc::downgrade(self));
        let view = CoroutineHandle::new(handle.clone());

        (Entry::new(self.next_id(), coroutine, Some(handle)), view)
    }

    fn next_id(&self) -> CoroutineId {
        CoroutineId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn tick(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    pub(crate) fn advance_tick(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn detached(&self) -> usize {
        self.detached.load(Ordering::Acquire)
    }

    /// Counts a coroutine leaving the driver until the returned guard drops.
    pub(crate) fn detach_guard(self: &Arc<Self>) -> DetachGuard {
        self.detached.fetch_add(1, Ordering::AcqRel);
        DetachGuard {
            shared: self.clone(),
        }
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Keeps a detached coroutine counted while it runs off the driver.
///
/// Dropped only after the coroutine has been posted back, so the scheduler
/// never looks idle in between.
pub(crate) struct DetachGuard {
    shared: Arc<Shared>,
}

impl DetachGuard {
    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }
}

impl Drop for DetachGuard {
    fn drop(&mut self) {
        self.shared.detached.fetch_sub(1, Ordering::AcqRel);
    }
}

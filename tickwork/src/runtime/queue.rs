use super::clock::Now;
use super::entry::Entry;
use crate::coroutine::{CoroutineState, ExecutionMode};
use crate::waiter::{Waiter, WaiterPools};

use std::mem;
use std::time::{Duration, Instant};

/// Double-buffered run queue.
///
/// Coroutines started during a tick land in `pending` and coroutines that
/// asked to run again land in `next`; neither is stepped before the
/// following tick. [`swap`](Self::swap) builds the new active list from
/// `next` followed by `pending`, so admission order is preserved.
#[derive(Default)]
pub(crate) struct RunQueue {
    pending: Vec<Entry>,
    active: Vec<Entry>,
    next: Vec<Entry>,
}

impl RunQueue {
    /// Admits a freshly started coroutine.
    pub(crate) fn admit(&mut self, entry: Entry) {
        self.pending.push(entry);
    }

    /// Schedules a coroutine for the next tick.
    pub(crate) fn requeue(&mut self, entry: Entry) {
        self.next.push(entry);
    }

    /// Adds a coroutine to the tick in progress.
    pub(crate) fn resume(&mut self, entry: Entry) {
        self.active.push(entry);
    }

    /// Starts a new tick.
    pub(crate) fn swap(&mut self) {
        debug_assert!(self.active.is_empty(), "previous tick left active entries");

        mem::swap(&mut self.active, &mut self.next);
        self.active.append(&mut self.pending);
    }

    /// Hands out this tick's active list.
    pub(crate) fn take_active(&mut self) -> Vec<Entry> {
        mem::take(&mut self.active)
    }

    /// Gives the (drained) active buffer back for reuse.
    pub(crate) fn restore_active(&mut self, buffer: Vec<Entry>) {
        debug_assert!(buffer.is_empty());

        if self.active.is_empty() {
            self.active = buffer;
        }
    }

    /// Pushes entries that were never stepped to the next tick, in order
    /// and ahead of everything requeued since.
    pub(crate) fn defer(&mut self, unstepped: impl IntoIterator<Item = Entry>) {
        let requeued = mem::take(&mut self.next);
        self.next.extend(unstepped);
        self.next.extend(requeued);
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn runnable(&self) -> usize {
        self.active.len() + self.next.len()
    }
}

/// Tick budget of the poll bucket.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TickBudget {
    /// Wall-clock milliseconds the bucket may take per tick.
    pub(crate) budget_ms: f64,

    /// Share of the bucket serviced every tick regardless of the budget.
    pub(crate) min_fraction: f64,

    /// Whether predicate waiters count against the budget.
    pub(crate) predicates_in_budget: bool,
}

impl TickBudget {
    /// Entries serviced regardless of time: `ceil(len * min_fraction)`,
    /// and at least one.
    pub(crate) fn floor(&self, len: usize) -> usize {
        let share = (len as f64 * self.min_fraction).ceil() as usize;
        share.clamp(1, len.max(1))
    }

    pub(crate) fn limit(&self) -> Duration {
        Duration::from_secs_f64(self.budget_ms.max(0.0) / 1000.0)
    }
}

/// Outcome of one bucket service.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServiceReport {
    /// Waiters checked this tick.
    pub serviced: usize,
    /// Waiters skipped because the budget ran out.
    pub deferred: usize,
    /// Coroutines whose wait ended.
    pub resumed: usize,
    /// Coroutines dropped because their state became `Finalized`.
    pub finalized: usize,
}

/// Suspended coroutines with the waiter each is bound to.
#[derive(Default)]
pub(crate) struct PollBucket {
    entries: Vec<(Entry, Waiter)>,
    scratch: Vec<(Entry, Waiter)>,
}

impl PollBucket {
    pub(crate) fn push(&mut self, entry: Entry, waiter: Waiter) {
        self.entries.push((entry, waiter));
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks waiters in FIFO order under `budget`.
    ///
    /// The first `budget.floor(len)` counted checks always run; after that
    /// checking stops once the accumulated time exceeds the budget. Exempt
    /// predicate waiters are always checked and never counted. The next
    /// tick starts with the skipped entries, followed by the checked ones
    /// that keep waiting, each group in its original order.
    ///
    /// Finished waits hand their coroutine (and the fault raised, if any)
    /// to `resume`; the waiter is recycled right after.
    pub(crate) fn service<F>(
        &mut self,
        now: &Now,
        budget: &TickBudget,
        pools: &mut WaiterPools,
        mut resume: F,
    ) -> ServiceReport
    where
        F: FnMut(Entry),
    {
        let mut report = ServiceReport::default();

        if self.entries.is_empty() {
            return report;
        }

        let floor = budget.floor(self.entries.len());
        let limit = budget.limit();
        let mut counted = 0;
        let mut spent = Duration::ZERO;

        let mut incoming = mem::take(&mut self.entries);

        for (mut entry, mut waiter) in incoming.drain(..) {
            if entry.state(ExecutionMode::Driver) == CoroutineState::Finalized {
                pools.recycle(waiter);
                entry.finish();
                report.finalized += 1;
                continue;
            }

            let exempt = !budget.predicates_in_budget && waiter.is_predicate();

            if !exempt && counted >= floor && spent >= limit {
                self.entries.push((entry, waiter));
                report.deferred += 1;
                continue;
            }

            let started = Instant::now();
            let outcome = waiter.keep_waiting(now);

            if !exempt {
                counted += 1;
                spent += started.elapsed();
            }

            report.serviced += 1;

            match outcome {
                Ok(true) => self.scratch.push((entry, waiter)),
                Ok(false) => {
                    pools.recycle(waiter);
                    resume(entry);
                    report.resumed += 1;
                }
                Err(fault) => {
                    entry.fault = Some(fault);
                    pools.recycle(waiter);
                    resume(entry);
                    report.resumed += 1;
                }
            }
        }

        self.entries.append(&mut self.scratch);
        self.scratch = incoming;

        report
    }

    /// Moves every entry out, for shutdown.
    pub(crate) fn drain(&mut self, pools: &mut WaiterPools) -> Vec<Entry> {
        self.entries
            .drain(..)
            .map(|(entry, waiter)| {
                pools.recycle(waiter);
                entry
            })
            .collect()
    }
}

//! Suspension objects.
//!
//! When a coroutine yields a wait instruction the scheduler binds it to a
//! waiter and parks the pair in its poll bucket. The waiter is checked on
//! later ticks until [`Wait::keep_waiting`] returns `false` (or an error),
//! after which the coroutine resumes and the waiter goes back to its pool.
//!
//! Every built-in kind has its own bounded [`Pool`]; custom waiters
//! (yielded with [`YieldInstruction::Custom`](crate::YieldInstruction::Custom))
//! are used once and dropped.

mod delay;
mod external;
mod pool;
mod predicate;

use delay::{DelayWaiter, RealtimeWaiter};
use external::{HandleWaiter, JobWaiter, TaskWaiter, ValueTaskWaiter};
use pool::{Pool, Poolable};
use predicate::{UntilWaiter, WhileWaiter};

use crate::coroutine::WaitRequest;
use crate::error::Fault;
use crate::runtime::Now;

/// A condition a coroutine can be suspended on.
pub trait Wait: Send + 'static {
    /// Returns `Ok(true)` while the coroutine must keep waiting.
    ///
    /// A failure of whatever is being waited on is returned as an error
    /// the first time it is observed; it is then delivered to the
    /// coroutine and the wait is over.
    fn keep_waiting(&mut self, now: &Now) -> Result<bool, Fault>;

    /// Returns `true` if the check runs user code of unknown cost.
    ///
    /// Such waiters can be exempted from the tick budget.
    fn is_predicate(&self) -> bool {
        false
    }
}

impl<W: Wait + ?Sized> Wait for Box<W> {
    fn keep_waiting(&mut self, now: &Now) -> Result<bool, Fault> {
        (**self).keep_waiting(now)
    }

    fn is_predicate(&self) -> bool {
        (**self).is_predicate()
    }
}

/// A bound waiter, tagged by the pool it came from.
pub(crate) enum Waiter {
    Delay(Box<DelayWaiter>),
    Realtime(Box<RealtimeWaiter>),
    Until(Box<UntilWaiter>),
    While(Box<WhileWaiter>),
    Job(Box<JobWaiter>),
    Task(Box<TaskWaiter>),
    ValueTask(Box<ValueTaskWaiter>),
    Coroutine(Box<HandleWaiter>),
    Custom(Box<dyn Wait>),
}

impl Waiter {
    fn as_wait(&mut self) -> &mut dyn Wait {
        match self {
            Waiter::Delay(w) => &mut **w,
            Waiter::Realtime(w) => &mut **w,
            Waiter::Until(w) => &mut **w,
            Waiter::While(w) => &mut **w,
            Waiter::Job(w) => &mut **w,
            Waiter::Task(w) => &mut **w,
            Waiter::ValueTask(w) => &mut **w,
            Waiter::Coroutine(w) => &mut **w,
            Waiter::Custom(w) => &mut **w,
        }
    }

    pub(crate) fn keep_waiting(&mut self, now: &Now) -> Result<bool, Fault> {
        self.as_wait().keep_waiting(now)
    }

    pub(crate) fn is_predicate(&mut self) -> bool {
        self.as_wait().is_predicate()
    }
}

/// One pool per built-in waiter kind.
pub(crate) struct WaiterPools {
    delay: Pool<DelayWaiter>,
    realtime: Pool<RealtimeWaiter>,
    until: Pool<UntilWaiter>,
    while_: Pool<WhileWaiter>,
    job: Pool<JobWaiter>,
    task: Pool<TaskWaiter>,
    value_task: Pool<ValueTaskWaiter>,
    coroutine: Pool<HandleWaiter>,
}

impl WaiterPools {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            delay: Pool::new(capacity),
            realtime: Pool::new(capacity),
            until: Pool::new(capacity),
            while_: Pool::new(capacity),
            job: Pool::new(capacity),
            task: Pool::new(capacity),
            value_task: Pool::new(capacity),
            coroutine: Pool::new(capacity),
        }
    }

    /// Takes a waiter of the matching kind and binds it to `request`.
    ///
    /// Time-based waiters measure from `now`.
    pub(crate) fn create(&mut self, request: WaitRequest, now: &Now) -> Waiter {
        match request {
            WaitRequest::Seconds(secs) => {
                let mut w = self.delay.take();
                w.bind(now, secs);
                Waiter::Delay(w)
            }
            WaitRequest::Realtime(secs) => {
                let mut w = self.realtime.take();
                w.bind(now, secs);
                Waiter::Realtime(w)
            }
            WaitRequest::Until(predicate) => {
                let mut w = self.until.take();
                w.bind(predicate);
                Waiter::Until(w)
            }
            WaitRequest::While(predicate) => {
                let mut w = self.while_.take();
                w.bind(predicate);
                Waiter::While(w)
            }
            WaitRequest::Job(job) => {
                let mut w = self.job.take();
                w.bind(job);
                Waiter::Job(w)
            }
            WaitRequest::Task(task) => {
                let mut w = self.task.take();
                w.bind(task);
                Waiter::Task(w)
            }
            WaitRequest::ValueTask(task) => {
                let mut w = self.value_task.take();
                w.bind(task);
                Waiter::ValueTask(w)
            }
            WaitRequest::Coroutine(handle) => {
                let mut w = self.coroutine.take();
                w.bind(handle);
                Waiter::Coroutine(w)
            }
            WaitRequest::Custom(waiter) => Waiter::Custom(waiter),
        }
    }

    /// Returns a waiter whose result has been delivered to its pool.
    pub(crate) fn recycle(&mut self, waiter: Waiter) {
        match waiter {
            Waiter::Delay(w) => self.delay.give_back(w),
            Waiter::Realtime(w) => self.realtime.give_back(w),
            Waiter::Until(w) => self.until.give_back(w),
            Waiter::While(w) => self.while_.give_back(w),
            Waiter::Job(w) => self.job.give_back(w),
            Waiter::Task(w) => self.task.give_back(w),
            Waiter::ValueTask(w) => self.value_task.give_back(w),
            Waiter::Coroutine(w) => self.coroutine.give_back(w),
            Waiter::Custom(_) => {}
        }
    }

    /// Total number of pooled, idle waiters.
    pub(crate) fn available(&self) -> usize {
        self.delay.available()
            + self.realtime.available()
            + self.until.available()
            + self.while_.available()
            + self.job.available()
            + self.task.available()
            + self.value_task.available()
            + self.coroutine.available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recycled_delay_is_rebound_from_scratch() {
        let mut pools = WaiterPools::new(4);
        let start = Now {
            time: 10.0,
            realtime: 10.0,
        };

        let mut first = pools.create(WaitRequest::Seconds(5.0), &start);
        assert!(first.keep_waiting(&start).unwrap());
        pools.recycle(first);
        assert_eq!(pools.available(), 1);

        let mut second = pools.create(WaitRequest::Seconds(0.0), &start);
        assert_eq!(pools.available(), 0);
        assert!(!second.keep_waiting(&start).unwrap());
    }
}

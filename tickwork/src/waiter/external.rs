use super::{Poolable, Wait};
use crate::error::Fault;
use crate::handle::CoroutineHandle;
use crate::runtime::Now;
use crate::task::{ExternalTask, JobHandle, TaskStatus};

/// Waits for a background job, then joins it.
///
/// The job's failure is reported by the check that first sees it done.
#[derive(Default)]
pub(crate) struct JobWaiter {
    job: Option<Box<dyn JobHandle>>,
}

impl JobWaiter {
    pub(crate) fn bind(&mut self, job: Box<dyn JobHandle>) {
        self.job = Some(job);
    }
}

impl Wait for JobWaiter {
    fn keep_waiting(&mut self, _now: &Now) -> Result<bool, Fault> {
        let Some(job) = self.job.as_mut() else {
            return Ok(false);
        };

        if !job.is_completed() {
            return Ok(true);
        }

        let outcome = job.complete();
        self.job = None;

        outcome.map(|()| false)
    }
}

impl Poolable for JobWaiter {
    fn clear(&mut self) {
        self.job = None;
    }
}

/// Waits for an external task.
#[derive(Default)]
pub(crate) struct TaskWaiter {
    task: Option<Box<dyn ExternalTask>>,
}

impl TaskWaiter {
    pub(crate) fn bind(&mut self, task: Box<dyn ExternalTask>) {
        self.task = Some(task);
    }
}

impl Wait for TaskWaiter {
    fn keep_waiting(&mut self, _now: &Now) -> Result<bool, Fault> {
        poll_task(&mut self.task)
    }
}

impl Poolable for TaskWaiter {
    fn clear(&mut self) {
        self.task = None;
    }
}

/// Waits for an external task carrying a value.
///
/// Only the status is observed; the value stays in the task for the
/// coroutine to take.
#[derive(Default)]
pub(crate) struct ValueTaskWaiter {
    task: Option<Box<dyn ExternalTask>>,
}

impl ValueTaskWaiter {
    pub(crate) fn bind(&mut self, task: Box<dyn ExternalTask>) {
        self.task = Some(task);
    }
}

impl Wait for ValueTaskWaiter {
    fn keep_waiting(&mut self, _now: &Now) -> Result<bool, Fault> {
        poll_task(&mut self.task)
    }
}

impl Poolable for ValueTaskWaiter {
    fn clear(&mut self) {
        self.task = None;
    }
}

/// Releases the task once it is finished, reporting failure at most once.
fn poll_task(slot: &mut Option<Box<dyn ExternalTask>>) -> Result<bool, Fault> {
    let Some(task) = slot.as_mut() else {
        return Ok(false);
    };

    let status = task.status();
    if !status.is_finished() {
        return Ok(true);
    }

    *slot = None;

    match status {
        TaskStatus::Faulted(fault) => Err(fault),
        TaskStatus::Cancelled => Err(Fault::Cancelled),
        TaskStatus::Pending | TaskStatus::Completed => Ok(false),
    }
}

/// Waits for a nested coroutine to finalize.
#[derive(Default)]
pub(crate) struct HandleWaiter {
    handle: Option<CoroutineHandle>,
}

impl HandleWaiter {
    pub(crate) fn bind(&mut self, handle: CoroutineHandle) {
        self.handle = Some(handle);
    }
}

impl Wait for HandleWaiter {
    fn keep_waiting(&mut self, _now: &Now) -> Result<bool, Fault> {
        Ok(self.handle.as_ref().is_some_and(|h| !h.is_completed()))
    }
}

impl Poolable for HandleWaiter {
    fn clear(&mut self) {
        self.handle = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::task::value_task;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FlagJob {
        done: Arc<AtomicBool>,
        outcome: Option<Result<(), Fault>>,
    }

    impl JobHandle for FlagJob {
        fn is_completed(&self) -> bool {
            self.done.load(Ordering::SeqCst)
        }

        fn complete(&mut self) -> Result<(), Fault> {
            self.outcome.take().expect("completed twice")
        }
    }

    #[test]
    fn job_failure_is_reported_once() {
        let done = Arc::new(AtomicBool::new(false));
        let mut waiter = JobWaiter::default();
        waiter.bind(Box::new(FlagJob {
            done: done.clone(),
            outcome: Some(Err(Fault::job("corrupt archive"))),
        }));

        let now = Now::default();
        assert!(waiter.keep_waiting(&now).unwrap());

        done.store(true, Ordering::SeqCst);
        assert!(matches!(waiter.keep_waiting(&now), Err(Fault::Job(_))));
        assert!(!waiter.keep_waiting(&now).unwrap());
    }

    #[test]
    fn cancelled_task_raises() {
        let (completer, task) = value_task::<u8>();
        let mut waiter = TaskWaiter::default();
        waiter.bind(Box::new(task));

        let now = Now::default();
        assert!(waiter.keep_waiting(&now).unwrap());

        completer.cancel();
        assert!(matches!(waiter.keep_waiting(&now), Err(Fault::Cancelled)));
    }

    #[test]
    fn value_task_waiter_leaves_the_value() {
        let (completer, task) = value_task::<&str>();
        let mut waiter = ValueTaskWaiter::default();
        waiter.bind(Box::new(task.clone()));

        completer.complete("level-3");

        assert!(!waiter.keep_waiting(&Now::default()).unwrap());
        assert_eq!(task.try_take().unwrap().unwrap(), "level-3");
    }
}

use super::JobSender;
use crate::error::Fault;
use crate::runtime::context::enter_dedicated;
use crate::task::JobHandle;

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

enum Outcome {
    Running,
    Finished(Result<(), Fault>),
    Joined,
}

struct JobState {
    outcome: Mutex<Outcome>,
    done: Condvar,
}

/// A closure running on the scheduler's background pool.
///
/// Created by [`Scheduler::schedule_job`](crate::Scheduler::schedule_job).
/// A panic inside the closure is reported as [`Fault::Panicked`].
pub struct PoolJob {
    state: Arc<JobState>,
}

impl PoolJob {
    /// Queues `f` on `workers`, or runs it right here without them.
    pub(crate) fn spawn<F>(workers: Option<&JobSender>, f: F) -> Self
    where
        F: FnOnce() -> Result<(), Fault> + Send + 'static,
    {
        let state = Arc::new(JobState {
            outcome: Mutex::new(Outcome::Running),
            done: Condvar::new(),
        });

        let body = {
            let state = state.clone();
            move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(f))
                    .unwrap_or_else(|payload| Err(Fault::from_panic(payload)));

                *state.outcome.lock() = Outcome::Finished(outcome);
                state.done.notify_all();
            }
        };

        match workers {
            Some(workers) => {
                if let Err(body) = workers.execute(Box::new(body)) {
                    body();
                }
            }
            None => body(),
        }

        Self { state }
    }
}

impl JobHandle for PoolJob {
    fn is_completed(&self) -> bool {
        !matches!(*self.state.outcome.lock(), Outcome::Running)
    }

    fn complete(&mut self) -> Result<(), Fault> {
        let mut outcome = self.state.outcome.lock();

        while matches!(*outcome, Outcome::Running) {
            self.state.done.wait(&mut outcome);
        }

        match mem::replace(&mut *outcome, Outcome::Joined) {
            Outcome::Finished(result) => result,
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for PoolJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolJob")
            .field("completed", &self.is_completed())
            .finish()
    }
}

/// A closure running on a thread of its own. See [`spawn_thread`].
pub struct ThreadJob {
    state: ThreadState,
}

enum ThreadState {
    Running(JoinHandle<Result<(), Fault>>),
    Failed(Fault),
    Joined,
}

/// Runs `f` on a new thread and returns a handle a coroutine can wait on.
///
/// A thread that fails to start is reported through the handle.
pub fn spawn_thread<F>(f: F) -> ThreadJob
where
    F: FnOnce() -> Result<(), Fault> + Send + 'static,
{
    let spawned = thread::Builder::new()
        .name("tickwork-job".to_owned())
        .spawn(move || {
            enter_dedicated();
            f()
        });

    let state = match spawned {
        Ok(handle) => ThreadState::Running(handle),
        Err(err) => ThreadState::Failed(Fault::job(err)),
    };

    ThreadJob { state }
}

impl JobHandle for ThreadJob {
    fn is_completed(&self) -> bool {
        match &self.state {
            ThreadState::Running(handle) => handle.is_finished(),
            ThreadState::Failed(_) | ThreadState::Joined => true,
        }
    }

    fn complete(&mut self) -> Result<(), Fault> {
        match mem::replace(&mut self.state, ThreadState::Joined) {
            ThreadState::Running(handle) => handle
                .join()
                .unwrap_or_else(|payload| Err(Fault::from_panic(payload))),
            ThreadState::Failed(fault) => Err(fault),
            ThreadState::Joined => Ok(()),
        }
    }
}

impl fmt::Debug for ThreadJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadJob")
            .field("completed", &self.is_completed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_job_reports_panic() {
        let mut job = PoolJob::spawn(None, || panic!("shader compile"));

        assert!(job.is_completed());
        assert!(matches!(job.complete(), Err(Fault::Panicked(msg)) if msg == "shader compile"));
        assert!(job.complete().is_ok());
    }

    #[test]
    fn thread_job_joins_its_result() {
        let mut job = spawn_thread(|| Err(Fault::job("no space left")));

        while !job.is_completed() {
            thread::yield_now();
        }

        assert!(matches!(job.complete(), Err(Fault::Job(_))));
    }
}

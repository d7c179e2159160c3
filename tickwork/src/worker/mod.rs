//! Background execution.
//!
//! The scheduler owns a small work-stealing pool that runs two kinds of
//! work: coroutines that switched to the background, and closures
//! submitted with [`Scheduler::schedule_job`](crate::Scheduler::schedule_job).
//!
//! Queues only carry integer keys; the jobs themselves are stored in a
//! process-wide slot table and drained exactly once, by whichever thread
//! claims the key.
//!
//! [`spawn_thread`] is the one-thread-per-job alternative for long,
//! blocking work.

mod job;
mod pool;
mod queue;
mod worker;

pub use job::{PoolJob, ThreadJob, spawn_thread};

pub(crate) use pool::{JobSender, WorkerPool};
pub(crate) use queue::{JobQueue, LocalQueue};

use crate::error::Fault;
use crate::utils::{SlabKey, SlotTable};

use log::error;
use std::panic::{self, AssertUnwindSafe};

/// A unit of background work.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Every queued job, keyed by what the queues carry.
static JOBS: SlotTable<Job> = SlotTable::new();

/// Claims and runs the job behind `key`.
///
/// Jobs handle their own failures; a panic that still escapes is logged
/// and the worker carries on.
fn run_job(key: SlabKey) {
    let Some(job) = JOBS.take(key) else {
        return;
    };

    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        error!("background job panicked: {}", Fault::from_panic(payload));
    }
}

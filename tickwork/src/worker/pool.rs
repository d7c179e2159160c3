use super::queue::{JobQueue, LocalQueue};
use super::worker::Worker;
use super::{JOBS, Job};
use crate::runtime::context::current_worker;

use log::{debug, warn};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Cloneable handle for submitting jobs to a [`WorkerPool`].
#[derive(Clone)]
pub(crate) struct JobSender {
    queue: Arc<JobQueue>,
}

impl JobSender {
    /// Queues `job` on the pool.
    ///
    /// From one of the pool's own workers the job goes to that worker's
    /// local queue. Hands the job back if the pool is shutting down.
    pub(crate) fn execute(&self, job: Job) -> Result<(), Job> {
        if self.queue.is_shutdown() {
            return Err(job);
        }

        let key = JOBS.store(job);

        match current_worker() {
            Some(cx) if Arc::ptr_eq(&cx.queue, &self.queue) => cx.locals[cx.id].push(key),
            _ => self.queue.push(key),
        }

        Ok(())
    }
}

/// Fixed set of background threads with work stealing.
///
/// Dropping the pool stops and joins the workers, then drops every job
/// that never ran.
pub(crate) struct WorkerPool {
    queue: Arc<JobQueue>,
    locals: Arc<Vec<Arc<LocalQueue>>>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Starts up to `threads` workers.
    ///
    /// Returns `None` if not a single thread could be spawned.
    pub(crate) fn new(threads: usize) -> Option<Self> {
        let queue = Arc::new(JobQueue::new());
        let locals: Arc<Vec<_>> = Arc::new((0..threads).map(|_| Arc::new(LocalQueue::new())).collect());

        let mut handles = Vec::with_capacity(threads);

        for id in 0..threads {
            let worker = Worker::new(id, locals.clone(), queue.clone());

            let spawned = thread::Builder::new()
                .name(format!("tickwork-worker-{id}"))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => warn!("failed to spawn background worker {id}: {err}"),
            }
        }

        if handles.is_empty() {
            queue.shutdown();
            return None;
        }

        debug!("started {} background workers", handles.len());

        Some(Self {
            queue,
            locals,
            handles,
        })
    }

    pub(crate) fn sender(&self) -> JobSender {
        JobSender {
            queue: self.queue.clone(),
        }
    }

    pub(crate) fn threads(&self) -> usize {
        self.handles.len()
    }

    /// Signals all workers to stop.
    pub(crate) fn shutdown(&self) {
        self.queue.shutdown();
    }

    /// Waits for every worker to exit.
    pub(crate) fn join(&mut self) {
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
        self.join();

        let mut dropped = 0;
        let leftovers = std::iter::from_fn(|| self.queue.steal())
            .chain(self.locals.iter().flat_map(|local| std::iter::from_fn(|| local.steal())));

        for key in leftovers {
            if JOBS.take(key).is_some() {
                dropped += 1;
            }
        }

        if dropped > 0 {
            debug!("dropped {dropped} background jobs that never ran");
        }
    }
}

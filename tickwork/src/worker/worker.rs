use super::queue::{JobQueue, LocalQueue};
use super::run_job;
use crate::runtime::context::{WorkerContext, enter_worker};
use crate::utils::SlabKey;

use std::sync::Arc;

/// A background worker thread.
///
/// The lookup order is:
/// 1. pop from the local queue,
/// 2. take from the pool's global queue,
/// 3. steal from another worker,
/// 4. park.
pub(crate) struct Worker {
    id: usize,
    locals: Arc<Vec<Arc<LocalQueue>>>,
    queue: Arc<JobQueue>,
}

impl Worker {
    pub(crate) fn new(id: usize, locals: Arc<Vec<Arc<LocalQueue>>>, queue: Arc<JobQueue>) -> Self {
        Self { id, locals, queue }
    }

    /// Runs jobs until the pool shuts down.
    pub(crate) fn run(self) {
        enter_worker(WorkerContext {
            id: self.id,
            queue: self.queue.clone(),
            locals: self.locals.clone(),
        });

        while !self.queue.is_shutdown() {
            let next = self.locals[self.id]
                .pop()
                .or_else(|| self.queue.steal())
                .or_else(|| self.try_steal());

            match next {
                Some(key) => run_job(key),
                None => self.queue.park(),
            }
        }
    }

    /// Visits peers round-robin, starting after this worker.
    fn try_steal(&self) -> Option<SlabKey> {
        let len = self.locals.len();

        if len <= 1 {
            return None;
        }

        (1..len).find_map(|offset| self.locals[(self.id + offset) % len].steal())
    }
}

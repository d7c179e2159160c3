use crate::utils::SlabKey;

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Global job queue shared by the workers of one pool.
///
/// Jobs themselves live in the process-wide job table; the queue only
/// carries their keys. Idle workers park on the condition variable with a
/// short timeout so that work pushed to a peer's local queue is still
/// picked up.
pub(crate) struct JobQueue {
    /// Keys of jobs not yet claimed by a worker.
    queue: Mutex<VecDeque<SlabKey>>,

    /// Wakes parked workers.
    condvar: Condvar,

    /// Set once the owning pool starts shutting down.
    shutdown: AtomicBool,
}

impl JobQueue {
    pub(crate) fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Signals shutdown and wakes all parked workers.
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.condvar.notify_all();
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Enqueues a job key and wakes one worker.
    pub(crate) fn push(&self, key: SlabKey) {
        self.queue.lock().push_back(key);
        self.condvar.notify_one();
    }

    /// Parks the calling worker until a push, shutdown, or a 1ms timeout.
    pub(crate) fn park(&self) {
        if self.is_shutdown() {
            return;
        }

        let mut queue = self.queue.lock();
        if !queue.is_empty() {
            return;
        }

        let _ = self.condvar.wait_for(&mut queue, Duration::from_millis(1));
    }

    /// Takes the oldest key.
    pub(crate) fn steal(&self) -> Option<SlabKey> {
        self.queue.lock().pop_front()
    }
}

/// Per-worker queue.
///
/// The owner pushes and pops at the back (LIFO, for locality); peers steal
/// from the front.
pub(crate) struct LocalQueue {
    inner: Mutex<VecDeque<SlabKey>>,
}

impl LocalQueue {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn push(&self, key: SlabKey) {
        self.inner.lock().push_back(key);
    }

    pub(crate) fn pop(&self) -> Option<SlabKey> {
        self.inner.lock().pop_back()
    }

    pub(crate) fn steal(&self) -> Option<SlabKey> {
        self.inner.lock().pop_front()
    }
}

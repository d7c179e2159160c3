use super::Handle;
use crate::runtime::Shared;

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Bounded free list of [`Handle`]s.
///
/// Handles beyond `capacity` are simply dropped on release; that only costs
/// reuse, never correctness.
pub(crate) struct HandlePool {
    free: Mutex<Vec<Arc<Handle>>>,
    capacity: usize,
}

impl HandlePool {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    /// Pops a free handle, or allocates one bound to `shared`.
    pub(crate) fn acquire(&self, shared: &Weak<Shared>) -> Arc<Handle> {
        let recycled = self.free.lock().pop();

        match recycled {
            Some(handle) => {
                handle.rearm();
                handle
            }
            None => Arc::new(Handle::new(shared.clone())),
        }
    }

    /// Returns a completed handle to the pool.
    pub(crate) fn release(&self, handle: Arc<Handle>) {
        if !handle.mark_pooled() {
            debug_assert!(false, "handle returned to the pool twice");
            return;
        }

        let mut free = self.free.lock();
        if free.len() < self.capacity {
            free.push(handle);
        }
    }

    /// Number of handles ready for reuse.
    pub(crate) fn available(&self) -> usize {
        self.free.lock().len()
    }
}

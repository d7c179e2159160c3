use super::entry::Entry;
use crate::coroutine::YieldInstruction;
use crate::error::Fault;
use crate::handle::Continuation;

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::Duration;

/// Work handed to the driver thread from elsewhere.
pub(crate) enum Inbound {
    /// A coroutine started through a [`Spawner`](crate::Spawner).
    Start(Entry),

    /// A detached coroutine coming back with the instruction it yielded.
    Resume(Entry, YieldInstruction),

    /// A detached coroutine whose step failed.
    Fault(Entry, Fault),

    /// A continuation that must run on the driver thread.
    Call(Continuation),
}

/// Multi-producer queue drained by the driver once per tick.
///
/// Any thread may push. Only the driver drains, so the lock is held just
/// long enough to swap the backing buffer out.
pub(crate) struct Injector {
    /// Items posted since the last drain.
    queue: Mutex<VecDeque<Inbound>>,

    /// Wakes a driver parked in [`park`](Self::park).
    condvar: Condvar,
}

impl Injector {
    pub(crate) fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
        }
    }

    /// Posts an item and wakes the driver if it is parked.
    pub(crate) fn push(&self, item: Inbound) {
        self.queue.lock().push_back(item);
        self.condvar.notify_all();
    }

    /// Moves everything posted so far into `out`, preserving order.
    pub(crate) fn drain_into(&self, out: &mut VecDeque<Inbound>) {
        let mut queue = self.queue.lock();

        if out.is_empty() {
            std::mem::swap(&mut *queue, out);
        } else {
            out.append(&mut queue);
        }
    }

    /// Blocks until something is posted or `timeout` elapses.
    ///
    /// Returns immediately if the queue is not empty.
    pub(crate) fn park(&self, timeout: Duration) {
        let mut queue = self.queue.lock();

        if !queue.is_empty() {
            return;
        }

        let _ = self.condvar.wait_for(&mut queue, timeout);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.lock().len()
    }
}

use crate::runtime::Shared;
use crate::utils::{SpinGuard, wait_released};

use std::cell::UnsafeCell;
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// A callback attached to a [`Handle`].
pub type Continuation = Box<dyn FnOnce() + Send + 'static>;

/// Pooled, generation-tagged completion token.
///
/// A `Handle` is owned by the scheduler entry of the coroutine it tracks
/// (which alone may complete it) and observed by any number of awaiters
/// through a remembered generation. Completing a handle bumps its
/// generation and returns it to the pool, so an awaiter whose generation no
/// longer matches treats the handle as already completed.
pub struct Handle {
    /// Continuations queued for the current generation, in attachment order.
    ///
    /// Only touched while `is_adding` is held, or by `complete` after it
    /// observed `is_adding` released with `is_completed` already set.
    continuations: UnsafeCell<Vec<Continuation>>,

    /// Spin flag guarding `continuations`.
    is_adding: AtomicBool,

    /// Set by `complete` before any continuation fires.
    is_completed: AtomicBool,

    /// Incremented once per completion.
    generation: AtomicU64,

    /// Set while the handle sits in its pool.
    pooled: AtomicBool,

    /// Scheduler state used to recycle the handle and marshal continuations
    /// back to the driver thread.
    shared: Weak<Shared>,
}

// Safety: `continuations` is only accessed under the `is_adding` protocol.
unsafe impl Send for Handle {}
unsafe impl Sync for Handle {}

impl Handle {
    pub(crate) fn new(shared: Weak<Shared>) -> Self {
        Self {
            continuations: UnsafeCell::new(Vec::new()),
            is_adding: AtomicBool::new(false),
            is_completed: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            pooled: AtomicBool::new(false),
            shared,
        }
    }

    /// Returns the current generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Returns `true` if the coroutine observed at `generation` has
    /// completed.
    ///
    /// Any generation older than the current one is always completed.
    pub fn is_completed(&self, generation: u64) -> bool {
        // Flag first: a recycle clears it only after bumping the generation.
        let done = self.is_completed.load(Ordering::Acquire);
        done || self.generation.load(Ordering::Acquire) != generation
    }

    /// Attaches `continuation` to the completion observed at `generation`.
    ///
    /// If that completion already happened the continuation runs right
    /// away on the calling thread. Otherwise it is queued and will run on
    /// the driver thread once the handle completes.
    pub fn on_completed(&self, continuation: Continuation, generation: u64) {
        if self.generation.load(Ordering::Acquire) != generation {
            continuation();
            return;
        }

        let guard = SpinGuard::acquire(&self.is_adding);

        if self.generation.load(Ordering::SeqCst) != generation
            || self.is_completed.load(Ordering::SeqCst)
        {
            drop(guard);
            continuation();
            return;
        }

        // Safety: `is_adding` is held and `complete` has not taken the chain.
        unsafe { (*self.continuations.get()).push(continuation) };
        drop(guard);
    }

    /// Marks the handle as completed and fires its continuations.
    ///
    /// Continuations always execute on the driver thread; when called from
    /// another thread they are posted to the scheduler and run at the start
    /// of its next tick. The handle returns to its pool before this
    /// function returns.
    pub(crate) fn complete(self: &Arc<Self>) {
        debug_assert!(
            !self.pooled.load(Ordering::Acquire),
            "completing a handle that sits in the pool"
        );

        self.is_completed.store(true, Ordering::SeqCst);
        wait_released(&self.is_adding);

        // Safety: `is_completed` is set and no registration is in flight,
        // so no other thread can reach the chain for this generation.
        let chain = unsafe { mem::take(&mut *self.continuations.get()) };
        self.generation.fetch_add(1, Ordering::AcqRel);

        let shared = self.shared.upgrade();

        if let Some(shared) = &shared {
            shared.handles.release(self.clone());
        }

        if chain.is_empty() {
            return;
        }

        match shared {
            Some(shared) if !shared.is_driver_thread() => {
                shared.post_call(Box::new(move || run_chain(chain)));
            }
            _ => run_chain(chain),
        }
    }

    /// Re-arms a handle taken from the pool.
    pub(crate) fn rearm(&self) {
        let was_pooled = self.pooled.swap(false, Ordering::AcqRel);
        debug_assert!(was_pooled, "handle taken from the pool twice");

        self.is_completed.store(false, Ordering::Release);
    }

    /// Flags the handle as pooled; returns `false` if it already was.
    pub(crate) fn mark_pooled(&self) -> bool {
        !self.pooled.swap(true, Ordering::AcqRel)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("generation", &self.generation())
            .field("is_completed", &self.is_completed.load(Ordering::Relaxed))
            .finish()
    }
}

fn run_chain(chain: Vec<Continuation>) {
    for continuation in chain {
        continuation();
    }
}

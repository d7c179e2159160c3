//! Completion handles.
//!
//! Every coroutine started with a handle gets a pooled [`Handle`] that is
//! completed exactly once, when the coroutine finalizes. Awaiters observe
//! it through a [`CoroutineHandle`], which pairs the shared handle with the
//! generation it was issued at.

mod core;
mod pool;

pub use self::core::{Continuation, Handle};
pub(crate) use pool::HandlePool;

use parking_lot::Mutex;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

/// Awaitable view of one coroutine's completion.
///
/// Cloning is cheap; all clones observe the same completion. A
/// `CoroutineHandle` stays valid after the underlying [`Handle`] is
/// recycled: it then simply reports completion.
#[derive(Clone)]
pub struct CoroutineHandle {
    handle: Arc<Handle>,
    generation: u64,
}

impl CoroutineHandle {
    pub(crate) fn new(handle: Arc<Handle>) -> Self {
        let generation = handle.generation();
        Self { handle, generation }
    }

    /// The generation this view was issued at.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The shared, pooled handle.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Returns `true` once the coroutine has finalized.
    pub fn is_completed(&self) -> bool {
        self.handle.is_completed(self.generation)
    }

    /// Runs `continuation` once the coroutine finalizes.
    ///
    /// Runs it immediately if that already happened.
    pub fn on_completed<F>(&self, continuation: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle
            .on_completed(Box::new(continuation), self.generation);
    }
}

impl fmt::Debug for CoroutineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoroutineHandle")
            .field("generation", &self.generation)
            .field("completed", &self.is_completed())
            .finish()
    }
}

impl IntoFuture for CoroutineHandle {
    type Output = ();
    type IntoFuture = Completion;

    fn into_future(self) -> Completion {
        Completion {
            handle: self,
            waker: None,
        }
    }
}

/// Future resolving when a coroutine finalizes.
///
/// Usable from any executor; the registered waker is woken on the driver
/// thread.
pub struct Completion {
    handle: CoroutineHandle,
    waker: Option<Arc<Mutex<Waker>>>,
}

impl Future for Completion {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();

        if this.handle.is_completed() {
            return Poll::Ready(());
        }

        match &this.waker {
            Some(slot) => slot.lock().clone_from(cx.waker()),
            None => {
                let slot = Arc::new(Mutex::new(cx.waker().clone()));
                let wake = slot.clone();
                this.handle.on_completed(move || wake.lock().wake_by_ref());
                this.waker = Some(slot);
            }
        }

        if this.handle.is_completed() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

use crate::coroutine::StepFrame;
use crate::worker::{JobQueue, LocalQueue};

use std::cell::{Cell, RefCell};
use std::sync::Arc;

/// Identity of a worker thread within its pool.
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub(crate) id: usize,
    pub(crate) queue: Arc<JobQueue>,
    pub(crate) locals: Arc<Vec<Arc<LocalQueue>>>,
}

thread_local! {
    /// Frame of the async coroutine being polled on this thread.
    ///
    /// Lets the futures of `crate::wait` reach the step that polls them
    /// without a waker round-trip.
    static CURRENT_FRAME: RefCell<Option<StepFrame>> = const { RefCell::new(None) };

    /// Set on background worker threads.
    static CURRENT_WORKER: RefCell<Option<WorkerContext>> = const { RefCell::new(None) };

    /// Set on threads started for a dedicated switch.
    static IN_DEDICATED: Cell<bool> = const { Cell::new(false) };
}

/// Installs `frame` for the duration of `f`, then hands it back.
///
/// The previous frame is restored afterwards, so polls may nest. If `f`
/// unwinds the frame is dropped and the previous one restored all the same.
pub(crate) fn enter_frame<R>(frame: StepFrame, f: impl FnOnce() -> R) -> (R, StepFrame) {
    let mut restore = RestoreFrame(CURRENT_FRAME.with(|c| c.replace(Some(frame))));

    let out = f();

    let frame = CURRENT_FRAME.with(|c| c.replace(restore.0.take()));
    (out, frame.expect("step frame removed while polling"))
}

struct RestoreFrame(Option<StepFrame>);

impl Drop for RestoreFrame {
    fn drop(&mut self) {
        if std::thread::panicking() {
            CURRENT_FRAME.with(|c| *c.borrow_mut() = self.0.take());
        }
    }
}

/// Runs `f` against the current frame, if any.
pub(crate) fn with_frame<R>(f: impl FnOnce(&mut StepFrame) -> R) -> Option<R> {
    CURRENT_FRAME.with(|c| c.borrow_mut().as_mut().map(f))
}

/// Marks the current thread as a worker of the pool owning `cx.queue`.
pub(crate) fn enter_worker(cx: WorkerContext) {
    CURRENT_WORKER.with(|w| *w.borrow_mut() = Some(cx));
}

pub(crate) fn current_worker() -> Option<WorkerContext> {
    CURRENT_WORKER.with(|w| w.borrow().clone())
}

pub(crate) fn is_worker_thread() -> bool {
    CURRENT_WORKER.with(|w| w.borrow().is_some())
}

pub(crate) fn enter_dedicated() {
    IN_DEDICATED.with(|d| d.set(true));
}

pub(crate) fn is_dedicated_thread() -> bool {
    IN_DEDICATED.with(|d| d.get())
}

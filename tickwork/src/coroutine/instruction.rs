use super::Coroutine;
use crate::handle::CoroutineHandle;
use crate::switch::ThreadSwitch;
use crate::task::{ExternalTask, JobHandle};
use crate::waiter::Wait;

use std::fmt;

/// A predicate polled once per tick by the predicate waiters.
pub type Predicate = Box<dyn FnMut() -> bool + Send + 'static>;

/// The value returned by one coroutine step.
///
/// It tells the scheduler why the coroutine stopped and what has to happen
/// before it is stepped again.
pub enum YieldInstruction {
    /// Step again on the next tick.
    Continue,

    /// Park until the coroutine's [`state`](Coroutine::state) changes.
    Suspended,

    /// The coroutine is done.
    Finalized,

    /// Wait for a number of scaled seconds.
    WaitSeconds(f64),

    /// Wait for a number of unscaled, wall-clock seconds.
    WaitRealtime(f64),

    /// Wait until the predicate returns `true`.
    WaitUntil(Predicate),

    /// Wait while the predicate returns `true`.
    WaitWhile(Predicate),

    /// Wait for a background job; its failure surfaces in the coroutine.
    Job(Box<dyn JobHandle>),

    /// Wait for an external task; its failure surfaces in the coroutine.
    Task(Box<dyn ExternalTask>),

    /// Wait for an external task that carries a value, which the coroutine
    /// reads from its own copy of the task afterwards.
    ValueTask(Box<dyn ExternalTask>),

    /// Wait for another coroutine to finalize.
    Coroutine(CoroutineHandle),

    /// Run an inner coroutine inline until it finalizes, then resume.
    Delegate(Box<dyn Coroutine>),

    /// Move to another execution context.
    Switch(ThreadSwitch),

    /// Wait on a caller-provided condition. Not pooled.
    Custom(Box<dyn Wait>),
}

impl YieldInstruction {
    /// Shorthand for [`WaitUntil`](Self::WaitUntil).
    pub fn wait_until<F>(predicate: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        YieldInstruction::WaitUntil(Box::new(predicate))
    }

    /// Shorthand for [`WaitWhile`](Self::WaitWhile).
    pub fn wait_while<F>(predicate: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        YieldInstruction::WaitWhile(Box::new(predicate))
    }

    /// Shorthand for [`Job`](Self::Job).
    pub fn job<H: JobHandle>(job: H) -> Self {
        YieldInstruction::Job(Box::new(job))
    }

    /// Shorthand for [`Task`](Self::Task).
    pub fn task<T: ExternalTask>(task: T) -> Self {
        YieldInstruction::Task(Box::new(task))
    }

    /// Shorthand for [`ValueTask`](Self::ValueTask).
    pub fn value_task<T: ExternalTask>(task: T) -> Self {
        YieldInstruction::ValueTask(Box::new(task))
    }

    /// Shorthand for [`Delegate`](Self::Delegate).
    pub fn delegate<C: Coroutine>(inner: C) -> Self {
        YieldInstruction::Delegate(Box::new(inner))
    }

    /// Shorthand for [`Custom`](Self::Custom).
    pub fn custom<W: Wait>(waiter: W) -> Self {
        YieldInstruction::Custom(Box::new(waiter))
    }

    /// Short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            YieldInstruction::Continue => "continue",
            YieldInstruction::Suspended => "suspended",
            YieldInstruction::Finalized => "finalized",
            YieldInstruction::WaitSeconds(_) => "wait-seconds",
            YieldInstruction::WaitRealtime(_) => "wait-realtime",
            YieldInstruction::WaitUntil(_) => "wait-until",
            YieldInstruction::WaitWhile(_) => "wait-while",
            YieldInstruction::Job(_) => "job",
            YieldInstruction::Task(_) => "task",
            YieldInstruction::ValueTask(_) => "value-task",
            YieldInstruction::Coroutine(_) => "coroutine",
            YieldInstruction::Delegate(_) => "delegate",
            YieldInstruction::Switch(_) => "switch",
            YieldInstruction::Custom(_) => "custom",
        }
    }

    /// Splits the instruction into what the scheduler must do with it.
    pub(crate) fn into_route(self) -> Route {
        match self {
            YieldInstruction::Continue => Route::Continue,
            YieldInstruction::Suspended => Route::Suspend,
            YieldInstruction::Finalized => Route::Finalize,
            YieldInstruction::Delegate(inner) => Route::Delegate(inner),
            YieldInstruction::Switch(target) => Route::Switch(target),
            YieldInstruction::WaitSeconds(secs) => Route::Wait(WaitRequest::Seconds(secs)),
            YieldInstruction::WaitRealtime(secs) => Route::Wait(WaitRequest::Realtime(secs)),
            YieldInstruction::WaitUntil(p) => Route::Wait(WaitRequest::Until(p)),
            YieldInstruction::WaitWhile(p) => Route::Wait(WaitRequest::While(p)),
            YieldInstruction::Job(job) => Route::Wait(WaitRequest::Job(job)),
            YieldInstruction::Task(task) => Route::Wait(WaitRequest::Task(task)),
            YieldInstruction::ValueTask(task) => Route::Wait(WaitRequest::ValueTask(task)),
            YieldInstruction::Coroutine(handle) => Route::Wait(WaitRequest::Coroutine(handle)),
            YieldInstruction::Custom(waiter) => Route::Wait(WaitRequest::Custom(waiter)),
        }
    }
}

impl fmt::Debug for YieldInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YieldInstruction::WaitSeconds(secs) | YieldInstruction::WaitRealtime(secs) => {
                write!(f, "{}({secs})", self.kind())
            }
            YieldInstruction::Switch(target) => write!(f, "switch({target:?})"),
            YieldInstruction::Coroutine(handle) => write!(f, "coroutine({handle:?})"),
            _ => f.write_str(self.kind()),
        }
    }
}

/// Scheduler-side disposition of a [`YieldInstruction`].
pub(crate) enum Route {
    Continue,
    Suspend,
    Finalize,
    Delegate(Box<dyn Coroutine>),
    Switch(ThreadSwitch),
    Wait(WaitRequest),
}

/// The arguments a waiter is bound to.
pub(crate) enum WaitRequest {
    Seconds(f64),
    Realtime(f64),
    Until(Predicate),
    While(Predicate),
    Job(Box<dyn JobHandle>),
    Task(Box<dyn ExternalTask>),
    ValueTask(Box<dyn ExternalTask>),
    Coroutine(CoroutineHandle),
    Custom(Box<dyn Wait>),
}

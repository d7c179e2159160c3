//! Value coroutines.
//!
//! A coroutine is anything implementing [`Coroutine`]: a resumable unit of
//! work advanced one step per tick, whose every step returns a
//! [`YieldInstruction`] telling the scheduler when to step it again.
//!
//! Three ways to write one:
//!
//! - implement [`Coroutine`] on a state machine,
//! - wrap a closure with [`from_fn`] or an instruction sequence with
//!   [`from_iter`],
//! - write an `async` block and wrap it with [`from_future`], awaiting the
//!   functions of [`crate::wait`].
//!
//! Liveness wrappers ([`Guarded`], [`Cancellable`]) merge an external
//! condition into the coroutine's own [`CoroutineState`].

mod context;
mod future;
mod guard;
mod instruction;
mod state;

pub use context::StepContext;
pub use future::{AsyncCoroutine, from_future};
pub use guard::{Cancellable, CancellationToken, Guarded, Liveness, Owner};
pub use instruction::{Predicate, YieldInstruction};
pub use state::CoroutineState;

pub(crate) use future::StepFrame;
pub(crate) use instruction::{Route, WaitRequest};

use crate::error::Fault;

/// Where a step runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionMode {
    /// On the thread that calls [`Scheduler::tick`](crate::Scheduler::tick).
    Driver,
    /// On a background worker.
    Background,
    /// On a thread of its own.
    Dedicated,
}

/// A resumable unit of work driven by the scheduler.
///
/// The scheduler only ever calls [`state`](Self::state) and
/// [`next`](Self::next) on the driver thread. Once a coroutine switches to
/// a background context it is driven through
/// [`concurrent_state`](Self::concurrent_state) and
/// [`concurrent_next`](Self::concurrent_next) instead, which by default
/// forward to their driver counterparts.
pub trait Coroutine: Send + 'static {
    /// Advances the coroutine by one logical step.
    ///
    /// Returning an error is a step fault: it propagates out of
    /// [`Scheduler::tick`](crate::Scheduler::tick).
    fn next(&mut self, cx: &mut StepContext<'_>) -> Result<YieldInstruction, Fault>;

    /// Scheduling state, queried on the driver thread.
    fn state(&self) -> CoroutineState {
        CoroutineState::Continue
    }

    /// Scheduling state, safe to query from any thread.
    fn concurrent_state(&self) -> CoroutineState {
        self.state()
    }

    /// Step variant used off the driver thread.
    fn concurrent_next(
        &mut self,
        mode: ExecutionMode,
        cx: &mut StepContext<'_>,
    ) -> Result<YieldInstruction, Fault> {
        let _ = mode;
        self.next(cx)
    }
}

impl<C: Coroutine + ?Sized> Coroutine for Box<C> {
    fn next(&mut self, cx: &mut StepContext<'_>) -> Result<YieldInstruction, Fault> {
        (**self).next(cx)
    }

    fn state(&self) -> CoroutineState {
        (**self).state()
    }

    fn concurrent_state(&self) -> CoroutineState {
        (**self).concurrent_state()
    }

    fn concurrent_next(
        &mut self,
        mode: ExecutionMode,
        cx: &mut StepContext<'_>,
    ) -> Result<YieldInstruction, Fault> {
        (**self).concurrent_next(mode, cx)
    }
}

/// Coroutine stepping a closure. See [`from_fn`].
pub struct FnCoroutine<F> {
    f: F,
}

/// Turns a closure into a coroutine that calls it once per step.
///
/// # Examples
///
/// ```rust,ignore
/// let mut left = 3;
/// scheduler.start(tickwork::from_fn(move |_| {
///     left -= 1;
///     Ok(if left == 0 {
///         YieldInstruction::Finalized
///     } else {
///         YieldInstruction::WaitSeconds(1.0)
///     })
/// }));
/// ```
pub fn from_fn<F>(f: F) -> FnCoroutine<F>
where
    F: FnMut(&mut StepContext<'_>) -> Result<YieldInstruction, Fault> + Send + 'static,
{
    FnCoroutine { f }
}

impl<F> Coroutine for FnCoroutine<F>
where
    F: FnMut(&mut StepContext<'_>) -> Result<YieldInstruction, Fault> + Send + 'static,
{
    fn next(&mut self, cx: &mut StepContext<'_>) -> Result<YieldInstruction, Fault> {
        (self.f)(cx)
    }
}

/// Coroutine yielding a fixed sequence of instructions. See [`from_iter`].
pub struct IterCoroutine<I> {
    iter: I,
}

/// Turns a sequence of instructions into a coroutine that yields one per
/// step and finalizes when the sequence runs out.
///
/// A fault delivered by a waiter fails the following step.
pub fn from_iter<I>(instructions: I) -> IterCoroutine<I::IntoIter>
where
    I: IntoIterator<Item = YieldInstruction>,
    I::IntoIter: Send + 'static,
{
    IterCoroutine {
        iter: instructions.into_iter(),
    }
}

impl<I> Coroutine for IterCoroutine<I>
where
    I: Iterator<Item = YieldInstruction> + Send + 'static,
{
    fn next(&mut self, cx: &mut StepContext<'_>) -> Result<YieldInstruction, Fault> {
        cx.check()?;
        Ok(self.iter.next().unwrap_or(YieldInstruction::Finalized))
    }
}

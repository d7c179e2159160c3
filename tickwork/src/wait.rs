//! Awaitable forms of every [`YieldInstruction`].
//!
//! These functions only work inside a coroutine built with
//! [`from_future`](crate::from_future): awaiting one suspends the current
//! step with the matching instruction and resumes once the scheduler has
//! seen the condition through.
//!
//! ```rust,ignore
//! scheduler.start(tickwork::from_future(async {
//!     wait::seconds(0.5).await;
//!     wait::until(move || flag.load(Ordering::Acquire)).await;
//!     let level = wait::value_task(loader).await?;
//!     Ok(())
//! }));
//! ```
//!
//! When a single poll reaches several of these awaits (from a hand-rolled
//! join, for instance) only the first one suspends the step; the others
//! stay armed and suspend later steps in turn.
//!
//! # Panics
//!
//! Polling any of these futures outside a coroutine step panics.

use crate::coroutine::{Coroutine, ExecutionMode, YieldInstruction};
use crate::error::Fault;
use crate::handle::CoroutineHandle;
use crate::runtime::Now;
use crate::runtime::context::with_frame;
use crate::switch::ThreadSwitch;
use crate::task::{ExternalTask, JobHandle, ValueTask};
use crate::waiter::Wait;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

const OUTSIDE_STEP: &str = "tickwork::wait futures must be awaited inside a coroutine step";

/// Suspends the step once with `instruction`.
///
/// Resolves on the following poll with the fault delivered for it, if
/// `takes_fault` is set; otherwise the fault stays in the frame and fails
/// the step.
struct YieldOnce {
    instruction: Option<YieldInstruction>,
    takes_fault: bool,
}

impl Future for YieldOnce {
    type Output = Option<Fault>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Fault>> {
        let this = self.get_mut();

        with_frame(|frame| match this.instruction.take() {
            Some(instruction) if frame.yielded.is_some() => {
                this.instruction = Some(instruction);
                Poll::Pending
            }
            Some(instruction) => {
                frame.yielded = Some(instruction);
                Poll::Pending
            }
            None if this.takes_fault => Poll::Ready(frame.fault.take()),
            None => Poll::Ready(None),
        })
        .expect(OUTSIDE_STEP)
    }
}

fn yield_once(instruction: YieldInstruction) -> YieldOnce {
    YieldOnce {
        instruction: Some(instruction),
        takes_fault: false,
    }
}

async fn yield_fallible(instruction: YieldInstruction) -> Result<(), Fault> {
    let fault = YieldOnce {
        instruction: Some(instruction),
        takes_fault: true,
    }
    .await;

    match fault {
        Some(fault) => Err(fault),
        None => Ok(()),
    }
}

/// Clock snapshot of the current step.
pub fn now() -> Now {
    with_frame(|frame| frame.now).expect(OUTSIDE_STEP)
}

/// Where the current step runs.
pub fn mode() -> ExecutionMode {
    with_frame(|frame| frame.mode).expect(OUTSIDE_STEP)
}

/// Resumes on the next tick.
pub async fn next_tick() {
    yield_once(YieldInstruction::Continue).await;
}

/// Resumes after `secs` scaled seconds.
pub async fn seconds(secs: f64) {
    yield_once(YieldInstruction::WaitSeconds(secs)).await;
}

/// Resumes after `secs` unscaled seconds.
pub async fn realtime(secs: f64) {
    yield_once(YieldInstruction::WaitRealtime(secs)).await;
}

/// Resumes once `predicate` returns `true`.
pub async fn until<F>(predicate: F)
where
    F: FnMut() -> bool + Send + 'static,
{
    yield_once(YieldInstruction::wait_until(predicate)).await;
}

/// Resumes once `predicate` returns `false`.
pub async fn while_<F>(predicate: F)
where
    F: FnMut() -> bool + Send + 'static,
{
    yield_once(YieldInstruction::wait_while(predicate)).await;
}

/// Waits for a background job and returns its outcome.
pub async fn job<H: JobHandle>(job: H) -> Result<(), Fault> {
    yield_fallible(YieldInstruction::job(job)).await
}

/// Waits for an external task and returns its outcome.
pub async fn task<T: ExternalTask>(task: T) -> Result<(), Fault> {
    yield_fallible(YieldInstruction::task(task)).await
}

/// Waits for a value task and takes its value.
pub async fn value_task<T: Send + 'static>(task: ValueTask<T>) -> Result<T, Fault> {
    yield_fallible(YieldInstruction::value_task(task.clone())).await?;

    task.try_take().unwrap_or(Err(Fault::Detached))
}

/// Waits for another coroutine to finalize.
pub async fn coroutine(handle: CoroutineHandle) {
    if handle.is_completed() {
        return;
    }

    yield_once(YieldInstruction::Coroutine(handle)).await;
}

/// Runs `inner` to completion in place of the current coroutine.
pub async fn delegate<C: Coroutine>(inner: C) {
    yield_once(YieldInstruction::delegate(inner)).await;
}

/// Waits on a custom condition.
pub async fn custom<W: Wait>(waiter: W) -> Result<(), Fault> {
    yield_fallible(YieldInstruction::custom(waiter)).await
}

/// Moves the rest of the body to `target`.
///
/// Returns at once if the step already runs there. Without threading
/// support the body keeps running on the driver.
pub async fn switch_to(target: ThreadSwitch) {
    if mode() == target.mode() {
        return;
    }

    yield_once(YieldInstruction::Switch(target)).await;
}

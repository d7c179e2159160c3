use super::{Coroutine, CoroutineState, ExecutionMode, StepContext, YieldInstruction};
use crate::error::Fault;
use crate::runtime::Now;
use crate::runtime::context::enter_frame;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

type BoxFuture = Pin<Box<dyn Future<Output = Result<(), Fault>> + Send + 'static>>;

/// Per-step state visible to the futures of [`crate::wait`].
pub(crate) struct StepFrame {
    pub(crate) now: Now,
    pub(crate) mode: ExecutionMode,

    /// Instruction produced by the await that suspended this poll.
    pub(crate) yielded: Option<YieldInstruction>,

    /// Fault delivered for the instruction yielded on the previous step.
    pub(crate) fault: Option<Fault>,
}

/// A coroutine whose body is a future.
///
/// Every step polls the future once. An await on one of the
/// [`crate::wait`] functions suspends the poll and becomes the step's
/// instruction; a poll that suspends on anything else yields
/// [`Continue`](YieldInstruction::Continue), so foreign futures are simply
/// re-polled every tick. The coroutine finalizes when the future returns,
/// and fails the step if it returns an error.
pub struct AsyncCoroutine {
    future: Option<BoxFuture>,
}

/// Wraps an `async` body into a coroutine.
///
/// # Examples
///
/// ```rust,ignore
/// scheduler.start(tickwork::from_future(async {
///     tickwork::wait::seconds(2.0).await;
///     tickwork::wait::job(load_level()).await?;
///     Ok(())
/// }));
/// ```
pub fn from_future<F>(future: F) -> AsyncCoroutine
where
    F: Future<Output = Result<(), Fault>> + Send + 'static,
{
    AsyncCoroutine {
        future: Some(Box::pin(future)),
    }
}

impl AsyncCoroutine {
    fn poll_step(&mut self, cx: &mut StepContext<'_>) -> Result<YieldInstruction, Fault> {
        let Some(future) = self.future.as_mut() else {
            return Ok(YieldInstruction::Finalized);
        };

        let frame = StepFrame {
            now: cx.now(),
            mode: cx.mode(),
            yielded: None,
            fault: cx.take_fault(),
        };

        let (poll, frame) = enter_frame(frame, || {
            future.as_mut().poll(&mut Context::from_waker(Waker::noop()))
        });

        if let Some(fault) = frame.fault {
            cx.restore_fault(fault);
        }

        match poll {
            Poll::Ready(result) => {
                self.future = None;
                result.map(|()| YieldInstruction::Finalized)
            }
            Poll::Pending => Ok(frame.yielded.unwrap_or(YieldInstruction::Continue)),
        }
    }
}

impl Coroutine for AsyncCoroutine {
    fn next(&mut self, cx: &mut StepContext<'_>) -> Result<YieldInstruction, Fault> {
        self.poll_step(cx)
    }

    fn state(&self) -> CoroutineState {
        if self.future.is_some() {
            CoroutineState::Continue
        } else {
            CoroutineState::Finalized
        }
    }

    fn concurrent_next(
        &mut self,
        _mode: ExecutionMode,
        cx: &mut StepContext<'_>,
    ) -> Result<YieldInstruction, Fault> {
        self.poll_step(cx)
    }
}

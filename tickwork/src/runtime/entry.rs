use crate::coroutine::{Coroutine, CoroutineState, ExecutionMode, StepContext, YieldInstruction};
use crate::error::Fault;
use crate::handle::Handle;

use log::{debug, warn};
use std::fmt;
use std::sync::Arc;

/// Coroutine number, unique within one scheduler; used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoroutineId(u64);

impl CoroutineId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw number.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CoroutineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "coroutine#{}", self.0)
    }
}

/// A started coroutine as the scheduler stores it.
///
/// `frames[0]` is the coroutine that was started; every
/// [`Delegate`](YieldInstruction::Delegate) pushes an inner frame that is
/// stepped in its place until it finalizes.
///
/// Dropping an entry completes its handle: a coroutine that can never be
/// stepped again is finalized as far as its awaiters are concerned.
pub(crate) struct Entry {
    pub(crate) id: CoroutineId,
    frames: Vec<Box<dyn Coroutine>>,
    handle: Option<Arc<Handle>>,

    /// Fault captured by a waiter, delivered on the next step.
    pub(crate) fault: Option<Fault>,
}

impl Entry {
    pub(crate) fn new(
        id: CoroutineId,
        coroutine: Box<dyn Coroutine>,
        handle: Option<Arc<Handle>>,
    ) -> Self {
        Self {
            id,
            frames: vec![coroutine],
            handle,
            fault: None,
        }
    }

    /// Scheduling state as seen from `mode`.
    ///
    /// The started coroutine decides finalization. A finalized inner frame
    /// reads as `Continue` so the next step pops it and resumes its parent.
    pub(crate) fn state(&self, mode: ExecutionMode) -> CoroutineState {
        let root = state_in(&*self.frames[0], mode);

        match self.frames.last() {
            Some(top) if self.frames.len() > 1 => match state_in(&**top, mode) {
                CoroutineState::Finalized => root,
                inner => root.merge(inner),
            },
            _ => root,
        }
    }

    /// Advances the coroutine by one logical step.
    ///
    /// Delegation is resolved here: a delegated coroutine starts running
    /// in the same step, and when it finalizes its parent resumes in the
    /// same step too. Nothing returned from here is ever a
    /// [`Delegate`](YieldInstruction::Delegate).
    pub(crate) fn step(&mut self, cx: &mut StepContext<'_>) -> Result<YieldInstruction, Fault> {
        let mode = cx.mode();

        loop {
            let depth = self.frames.len();
            let top = &mut self.frames[depth - 1];

            if depth > 1 && state_in(&**top, mode) == CoroutineState::Finalized {
                self.frames.pop();
                continue;
            }

            let instruction = match mode {
                ExecutionMode::Driver => top.next(cx)?,
                other => top.concurrent_next(other, cx)?,
            };

            match instruction {
                YieldInstruction::Delegate(inner) => self.frames.push(inner),
                YieldInstruction::Finalized if depth > 1 => {
                    self.frames.pop();
                }
                other => return Ok(other),
            }
        }
    }

    /// Removes the coroutine for good and completes its handle.
    pub(crate) fn finish(self) {
        debug!("{} finalized", self.id);
        drop(self);
    }
}

impl Drop for Entry {
    fn drop(&mut self) {
        if let Some(fault) = self.fault.take() {
            warn!("{} dropped with an undelivered fault: {fault}", self.id);
        }

        if let Some(handle) = self.handle.take() {
            handle.complete();
        }
    }
}

fn state_in(coroutine: &dyn Coroutine, mode: ExecutionMode) -> CoroutineState {
    match mode {
        ExecutionMode::Driver => coroutine.state(),
        _ => coroutine.concurrent_state(),
    }
}

/// Folds a fault the step left untaken into the step result.
pub(crate) fn settle(
    id: CoroutineId,
    result: Result<YieldInstruction, Fault>,
    untaken: Option<Fault>,
) -> Result<YieldInstruction, Fault> {
    match (result, untaken) {
        (Ok(_), Some(fault)) => Err(fault),
        (Err(err), Some(fault)) => {
            warn!("{id} failed before taking a delivered fault: {fault}");
            Err(err)
        }
        (result, None) => result,
    }
}

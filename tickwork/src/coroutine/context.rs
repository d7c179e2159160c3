use super::{Coroutine, ExecutionMode};
use crate::error::Fault;
use crate::handle::CoroutineHandle;
use crate::runtime::{Entry, Now, Shared, Spawner};
use crate::switch::Switcher;

use std::sync::Arc;

/// What a coroutine can see and do while it is being stepped.
///
/// A fresh context is handed to every [`next`](Coroutine::next) call. It
/// carries the tick's clock snapshot, the fault (if any) captured by the
/// waiter the coroutine was resumed from, and lets the coroutine start
/// other coroutines.
pub struct StepContext<'a> {
    shared: &'a Arc<Shared>,
    spawned: &'a mut Vec<Entry>,
    mode: ExecutionMode,
    now: Now,
    fault: Option<Fault>,
}

impl<'a> StepContext<'a> {
    pub(crate) fn new(
        shared: &'a Arc<Shared>,
        spawned: &'a mut Vec<Entry>,
        mode: ExecutionMode,
        now: Now,
        fault: Option<Fault>,
    ) -> Self {
        Self {
            shared,
            spawned,
            mode,
            now,
            fault,
        }
    }

    /// Where this step runs.
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Clock snapshot taken at the start of the tick.
    ///
    /// Steps running off the driver read the clock when they start instead.
    pub fn now(&self) -> Now {
        self.now
    }

    /// Scaled seconds, see [`now`](Self::now).
    pub fn time(&self) -> f64 {
        self.now.time
    }

    /// Unscaled seconds, see [`now`](Self::now).
    pub fn realtime(&self) -> f64 {
        self.now.realtime
    }

    /// Number of the current tick.
    pub fn tick(&self) -> u64 {
        self.shared.tick()
    }

    /// Takes the fault raised by whatever the coroutine was waiting on.
    ///
    /// A fault that is still here when the step returns fails the step.
    pub fn take_fault(&mut self) -> Option<Fault> {
        self.fault.take()
    }

    /// Returns the pending fault as an error, for use with `?`.
    pub fn check(&mut self) -> Result<(), Fault> {
        match self.fault.take() {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    /// Starts a coroutine that is first stepped on the next tick.
    pub fn start<C: Coroutine>(&mut self, coroutine: C) {
        let entry = self.shared.new_entry(Box::new(coroutine));
        self.spawned.push(entry);
    }

    /// Like [`start`](Self::start), returning a completion handle.
    pub fn start_with_handle<C: Coroutine>(&mut self, coroutine: C) -> CoroutineHandle {
        let (entry, handle) = self.shared.new_entry_with_handle(Box::new(coroutine));
        self.spawned.push(entry);

        handle
    }

    /// A thread-safe way to start coroutines on the same scheduler.
    pub fn spawner(&self) -> Spawner {
        Spawner::new(self.shared.clone())
    }

    /// Thread-switch helper bound to the same scheduler.
    pub fn switcher(&self) -> Switcher {
        Switcher::new(self.shared.clone())
    }

    /// Puts back a fault the step body did not consume.
    pub(crate) fn restore_fault(&mut self, fault: Fault) {
        self.fault = Some(fault);
    }

    /// Leftover fault, folded into the step result by the scheduler.
    pub(crate) fn into_fault(self) -> Option<Fault> {
        self.fault
    }
}

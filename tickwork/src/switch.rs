//! Moving work between the driver and background threads.
//!
//! A [`Switcher`] answers two questions for each [`ThreadSwitch`] target:
//! am I already there ([`is_completed`](Switcher::is_completed)), and if
//! not, run this over there ([`on_completed`](Switcher::on_completed)).
//! Coroutines normally switch by yielding
//! [`YieldInstruction::Switch`](crate::YieldInstruction::Switch), or by
//! awaiting [`wait::switch_to`](crate::wait::switch_to).
//!
//! Where threads are unavailable (on `wasm`, or when disabled through the
//! builder) background switches degrade to running inline on the driver.

use crate::coroutine::ExecutionMode;
use crate::runtime::Shared;
use crate::runtime::context::{enter_dedicated, is_dedicated_thread, is_worker_thread};

use log::warn;
use std::sync::Arc;
use std::thread;

/// An execution context a coroutine can move to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadSwitch {
    /// The thread that runs the scheduler's ticks.
    Driver,
    /// Any worker of the scheduler's background pool.
    Background,
    /// A new thread of its own.
    Dedicated,
}

impl ThreadSwitch {
    /// The mode a coroutine is stepped in once it got there.
    pub fn mode(self) -> ExecutionMode {
        match self {
            ThreadSwitch::Driver => ExecutionMode::Driver,
            ThreadSwitch::Background => ExecutionMode::Background,
            ThreadSwitch::Dedicated => ExecutionMode::Dedicated,
        }
    }
}

/// How [`Switcher::on_completed`] handled its continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Already on the target; the continuation ran inline.
    AlreadyThere,
    /// The continuation was queued on the target.
    Posted,
    /// The target is unavailable; the continuation ran inline.
    Degraded,
}

/// Thread-switch helper bound to one scheduler.
#[derive(Clone)]
pub struct Switcher {
    shared: Arc<Shared>,
}

impl Switcher {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Returns `true` if background threads are available.
    pub fn threading(&self) -> bool {
        self.shared.threading()
    }

    /// Returns `true` if the calling thread already is `target`.
    ///
    /// A dedicated thread never counts as a new one.
    pub fn is_completed(&self, target: ThreadSwitch) -> bool {
        match target {
            ThreadSwitch::Driver => self.shared.is_driver_thread(),
            ThreadSwitch::Background => is_worker_thread(),
            ThreadSwitch::Dedicated => is_dedicated_thread(),
        }
    }

    /// Runs `continuation` on `target`.
    pub fn on_completed<F>(&self, target: ThreadSwitch, continuation: F) -> SwitchOutcome
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_completed(target) {
            continuation();
            return SwitchOutcome::AlreadyThere;
        }

        match target {
            ThreadSwitch::Driver => {
                self.shared.post_call(Box::new(continuation));
                SwitchOutcome::Posted
            }
            ThreadSwitch::Background => match self.shared.workers() {
                Some(workers) => match workers.execute(Box::new(continuation)) {
                    Ok(()) => SwitchOutcome::Posted,
                    Err(continuation) => {
                        continuation();
                        SwitchOutcome::Degraded
                    }
                },
                None => {
                    continuation();
                    SwitchOutcome::Degraded
                }
            },
            ThreadSwitch::Dedicated => {
                if !self.shared.threading() {
                    continuation();
                    return SwitchOutcome::Degraded;
                }

                spawn_dedicated(continuation)
            }
        }
    }

    /// Awaiter for the driver thread.
    pub fn to_driver(&self) -> SwitchTo {
        self.to(ThreadSwitch::Driver)
    }

    /// Awaiter for the background pool.
    pub fn to_background(&self) -> SwitchTo {
        self.to(ThreadSwitch::Background)
    }

    /// Awaiter for a dedicated thread.
    pub fn to_dedicated(&self) -> SwitchTo {
        self.to(ThreadSwitch::Dedicated)
    }

    fn to(&self, target: ThreadSwitch) -> SwitchTo {
        SwitchTo {
            switcher: self.clone(),
            target,
        }
    }
}

/// One switch target, bound to a [`Switcher`].
pub struct SwitchTo {
    switcher: Switcher,
    target: ThreadSwitch,
}

impl SwitchTo {
    pub fn target(&self) -> ThreadSwitch {
        self.target
    }

    /// See [`Switcher::is_completed`].
    pub fn is_completed(&self) -> bool {
        self.switcher.is_completed(self.target)
    }

    /// See [`Switcher::on_completed`].
    pub fn on_completed<F>(&self, continuation: F) -> SwitchOutcome
    where
        F: FnOnce() + Send + 'static,
    {
        self.switcher.on_completed(self.target, continuation)
    }
}

/// Starts `continuation` on a fresh thread, inline if that fails.
fn spawn_dedicated<F>(continuation: F) -> SwitchOutcome
where
    F: FnOnce() + Send + 'static,
{
    let slot = Arc::new(parking_lot::Mutex::new(Some(continuation)));
    let theirs = slot.clone();

    let spawned = thread::Builder::new()
        .name("tickwork-dedicated".to_owned())
        .spawn(move || {
            enter_dedicated();
            if let Some(continuation) = theirs.lock().take() {
                continuation();
            }
        });

    match spawned {
        Ok(_) => SwitchOutcome::Posted,
        Err(err) => {
            warn!("failed to spawn a dedicated thread: {err}");
            if let Some(continuation) = slot.lock().take() {
                continuation();
            }
            SwitchOutcome::Degraded
        }
    }
}

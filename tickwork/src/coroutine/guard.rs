use super::{Coroutine, CoroutineState, ExecutionMode, StepContext, YieldInstruction};
use crate::error::Fault;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// An external condition deciding whether a coroutine may run.
///
/// Queried from both the driver and background threads, so it must be
/// cheap and thread-safe.
pub trait Liveness: Send + Sync + 'static {
    /// `Finalized` ends the coroutine, `Suspended` parks it, `Continue`
    /// lets its own state decide.
    fn liveness(&self) -> CoroutineState;
}

/// Flag-based liveness owner for hosts without an object model.
///
/// Clones share the same flags. An owner starts active; once destroyed it
/// stays destroyed.
#[derive(Debug, Clone)]
pub struct Owner {
    state: Arc<AtomicU8>,
}

impl Owner {
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(CoroutineState::Continue.to_bits())),
        }
    }

    /// Parks (`false`) or releases (`true`) every coroutine bound to this
    /// owner. Has no effect once destroyed.
    pub fn set_active(&self, active: bool) {
        let target = if active {
            CoroutineState::Continue
        } else {
            CoroutineState::Suspended
        };

        let _ = self.state.fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
            (CoroutineState::from_bits(bits) != CoroutineState::Finalized)
                .then(|| target.to_bits())
        });
    }

    /// Finalizes every coroutine bound to this owner.
    pub fn destroy(&self) {
        self.state
            .store(CoroutineState::Finalized.to_bits(), Ordering::Release);
    }

    pub fn is_destroyed(&self) -> bool {
        self.liveness() == CoroutineState::Finalized
    }
}

impl Default for Owner {
    fn default() -> Self {
        Self::new()
    }
}

impl Liveness for Owner {
    fn liveness(&self) -> CoroutineState {
        CoroutineState::from_bits(self.state.load(Ordering::Acquire))
    }
}

/// Cooperative cancellation flag.
///
/// Cancelling never interrupts a step in progress: the coroutine is
/// finalized the next time the scheduler polls its state.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Liveness for CancellationToken {
    fn liveness(&self) -> CoroutineState {
        if self.is_cancelled() {
            CoroutineState::Finalized
        } else {
            CoroutineState::Continue
        }
    }
}

/// A coroutine whose state is merged with an external [`Liveness`].
pub struct Guarded<C, L> {
    inner: C,
    liveness: L,
}

/// A coroutine that stops once its token is cancelled.
pub type Cancellable<C> = Guarded<C, CancellationToken>;

impl<C, L> Guarded<C, L> {
    pub fn new(inner: C, liveness: L) -> Self {
        Self { inner, liveness }
    }

    pub fn liveness(&self) -> &L {
        &self.liveness
    }

    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C, L> Coroutine for Guarded<C, L>
where
    C: Coroutine,
    L: Liveness,
{
    fn next(&mut self, cx: &mut StepContext<'_>) -> Result<YieldInstruction, Fault> {
        self.inner.next(cx)
    }

    fn state(&self) -> CoroutineState {
        self.inner.state().merge(self.liveness.liveness())
    }

    fn concurrent_state(&self) -> CoroutineState {
        self.inner.concurrent_state().merge(self.liveness.liveness())
    }

    fn concurrent_next(
        &mut self,
        mode: ExecutionMode,
        cx: &mut StepContext<'_>,
    ) -> Result<YieldInstruction, Fault> {
        self.inner.concurrent_next(mode, cx)
    }
}

use super::injector::Inbound;
use super::shared::Shared;
use crate::coroutine::{CancellationToken, Coroutine, Guarded, Liveness, Owner};
use crate::handle::CoroutineHandle;

use log::debug;
use std::sync::Arc;

/// Starts coroutines on a scheduler from any thread.
///
/// Coroutines started through a spawner reach the driver at its next tick
/// and take their first step in that same tick.
///
/// # Examples
///
/// ```rust,ignore
/// let spawner = scheduler.spawner();
///
/// std::thread::spawn(move || {
///     spawner.start(tickwork::from_fn(|_| Ok(YieldInstruction::Finalized)));
/// });
/// ```
#[derive(Clone)]
pub struct Spawner {
    shared: Arc<Shared>,
}

impl Spawner {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Starts `coroutine`.
    ///
    /// Once the scheduler is dropped the coroutine is dropped instead.
    pub fn start<C: Coroutine>(&self, coroutine: C) {
        let entry = self.shared.new_entry(Box::new(coroutine));
        debug!("{} posted to the driver", entry.id);
        self.shared.post(Inbound::Start(entry));
    }

    /// Like [`start`](Self::start), returning a completion handle.
    ///
    /// The handle completes right away if the scheduler is gone.
    pub fn start_with_handle<C: Coroutine>(&self, coroutine: C) -> CoroutineHandle {
        let (entry, handle) = self.shared.new_entry_with_handle(Box::new(coroutine));
        debug!("{} posted to the driver", entry.id);
        self.shared.post(Inbound::Start(entry));
        handle
    }

    /// Starts `coroutine` merged with an external liveness condition.
    pub fn start_guarded<C: Coroutine, L: Liveness>(&self, coroutine: C, liveness: L) {
        self.start(Guarded::new(coroutine, liveness));
    }

    /// Like [`start_guarded`](Self::start_guarded), returning a handle.
    pub fn start_guarded_with_handle<C: Coroutine, L: Liveness>(
        &self,
        coroutine: C,
        liveness: L,
    ) -> CoroutineHandle {
        self.start_with_handle(Guarded::new(coroutine, liveness))
    }

    /// Starts `coroutine` so that cancelling `token` finalizes it.
    pub fn start_cancellable<C: Coroutine>(&self, coroutine: C, token: CancellationToken) {
        self.start_guarded(coroutine, token);
    }

    pub fn start_cancellable_with_handle<C: Coroutine>(
        &self,
        coroutine: C,
        token: CancellationToken,
    ) -> CoroutineHandle {
        self.start_guarded_with_handle(coroutine, token)
    }

    /// Starts `coroutine` bound to `owner`.
    pub fn start_owned<C: Coroutine>(&self, coroutine: C, owner: &Owner) {
        self.start_guarded(coroutine, owner.clone());
    }

    pub fn start_owned_with_handle<C: Coroutine>(
        &self,
        coroutine: C,
        owner: &Owner,
    ) -> CoroutineHandle {
        self.start_guarded_with_handle(coroutine, owner.clone())
    }

    /// Returns `true` once the scheduler has been dropped.
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

use super::entry::{Entry, settle};
use super::injector::Inbound;
use super::shared::DetachGuard;
use crate::coroutine::{CoroutineState, StepContext, YieldInstruction};
use crate::error::Fault;
use crate::switch::{Switcher, ThreadSwitch};

use log::{debug, trace};
use std::panic::{self, AssertUnwindSafe};
use std::thread;

/// Steps a coroutine off the driver thread.
///
/// The coroutine runs in `target`'s mode for as long as it yields
/// `Continue`, then goes back to the driver with whatever it yielded, or
/// with its fault. Coroutines it starts are posted to the driver.
pub(crate) fn run_detached(mut entry: Entry, target: ThreadSwitch, guard: DetachGuard) {
    let shared = guard.shared().clone();
    let mode = target.mode();
    let mut spawned = Vec::new();

    trace!("{} running detached ({target:?})", entry.id);

    loop {
        if shared.is_closed() {
            debug!("{} abandoned: scheduler closed", entry.id);
            return;
        }

        match entry.state(mode) {
            CoroutineState::Finalized => {
                entry.finish();
                return;
            }
            CoroutineState::Suspended => {
                shared.post(Inbound::Resume(entry, YieldInstruction::Suspended));
                return;
            }
            CoroutineState::Continue => {}
        }

        let fault = entry.fault.take();
        let mut cx = StepContext::new(&shared, &mut spawned, mode, shared.now(), fault);

        let result = panic::catch_unwind(AssertUnwindSafe(|| entry.step(&mut cx)))
            .unwrap_or_else(|payload| Err(Fault::from_panic(payload)));
        let result = settle(entry.id, result, cx.into_fault());

        for started in spawned.drain(..) {
            shared.post(Inbound::Start(started));
        }

        match result {
            Err(fault) => {
                shared.post(Inbound::Fault(entry, fault));
                return;
            }
            Ok(YieldInstruction::Continue) => thread::yield_now(),
            Ok(YieldInstruction::Finalized) => {
                entry.finish();
                return;
            }
            Ok(YieldInstruction::Switch(next)) if next == target => {}
            Ok(YieldInstruction::Switch(next)) if next != ThreadSwitch::Driver => {
                let switcher = Switcher::new(shared.clone());
                switcher.on_completed(next, move || run_detached(entry, next, guard));
                return;
            }
            Ok(other) => {
                shared.post(Inbound::Resume(entry, other));
                return;
            }
        }
    }
}

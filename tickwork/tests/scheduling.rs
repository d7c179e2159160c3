use tickwork::{
    CancellationToken, Coroutine, CoroutineState, ManualClock, Owner, Scheduler, StepContext,
    YieldInstruction, from_fn, from_iter,
};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

fn manual() -> Scheduler {
    Scheduler::builder()
        .clock(ManualClock::with_step(1.0 / 60.0))
        .build()
}

#[test]
fn test_start_steps_on_next_tick() {
    let mut scheduler = manual();
    let steps = Arc::new(AtomicUsize::new(0));

    let counter = steps.clone();
    scheduler.start(from_fn(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(YieldInstruction::Continue)
    }));

    assert_eq!(steps.load(Ordering::SeqCst), 0);

    scheduler.tick().unwrap();
    assert_eq!(steps.load(Ordering::SeqCst), 1);

    scheduler.tick().unwrap();
    assert_eq!(steps.load(Ordering::SeqCst), 2);
}

#[test]
fn test_started_during_tick_waits_for_next_tick() {
    let mut scheduler = manual();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let log = seen.clone();
    scheduler.start(from_fn(move |cx| {
        let log = log.clone();
        cx.start(from_fn(move |cx| {
            log.lock().unwrap().push(cx.tick());
            Ok(YieldInstruction::Finalized)
        }));
        Ok(YieldInstruction::Finalized)
    }));

    scheduler.tick().unwrap();
    assert!(seen.lock().unwrap().is_empty());

    scheduler.tick().unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![2]);
}

#[test]
fn test_steps_in_start_order() {
    let mut scheduler = manual();
    let order = Arc::new(Mutex::new(Vec::new()));

    for id in 0..3 {
        let order = order.clone();
        scheduler.start(from_fn(move |_| {
            order.lock().unwrap().push(id);
            Ok(YieldInstruction::Continue)
        }));
    }

    scheduler.tick().unwrap();
    scheduler.tick().unwrap();

    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 0, 1, 2]);
}

struct Gated {
    open: Arc<AtomicBool>,
    steps: Arc<AtomicUsize>,
}

impl Coroutine for Gated {
    fn next(&mut self, _cx: &mut StepContext<'_>) -> Result<YieldInstruction, tickwork::Fault> {
        let steps = self.steps.fetch_add(1, Ordering::SeqCst) + 1;

        Ok(if steps == 2 {
            YieldInstruction::Finalized
        } else {
            YieldInstruction::Suspended
        })
    }

    fn state(&self) -> CoroutineState {
        if self.open.load(Ordering::SeqCst) {
            CoroutineState::Continue
        } else {
            CoroutineState::Suspended
        }
    }
}

#[test]
fn test_suspended_resumes_when_state_changes() {
    let mut scheduler = manual();
    let open = Arc::new(AtomicBool::new(true));
    let steps = Arc::new(AtomicUsize::new(0));

    let handle = scheduler.start_with_handle(Gated {
        open: open.clone(),
        steps: steps.clone(),
    });

    scheduler.tick().unwrap();
    assert_eq!(steps.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.stats().suspended, 1);

    open.store(false, Ordering::SeqCst);
    scheduler.tick().unwrap();
    assert_eq!(steps.load(Ordering::SeqCst), 1);

    open.store(true, Ordering::SeqCst);
    scheduler.tick().unwrap();
    assert_eq!(steps.load(Ordering::SeqCst), 2);
    assert!(handle.is_completed());
}

#[test]
fn test_spawner_from_another_thread() {
    let mut scheduler = manual();
    let spawner = scheduler.spawner();

    let handle = thread::spawn(move || {
        spawner.start_with_handle(from_fn(|_| Ok(YieldInstruction::Finalized)))
    })
    .join()
    .unwrap();

    assert!(!handle.is_completed());
    assert_eq!(scheduler.stats().inbound, 1);

    scheduler.tick().unwrap();
    assert!(handle.is_completed());
}

#[test]
fn test_spawner_after_drop_completes_handle() {
    let scheduler = manual();
    let spawner = scheduler.spawner();
    drop(scheduler);

    assert!(spawner.is_closed());

    let handle = spawner.start_with_handle(from_fn(|_| Ok(YieldInstruction::Continue)));
    assert!(handle.is_completed());
}

#[test]
fn test_spawner_cancellable_and_owned() {
    let mut scheduler = manual();
    let spawner = scheduler.spawner();
    let token = CancellationToken::new();
    let owner = Owner::new();

    let (cancelled, owned) = {
        let token = token.clone();
        let owner = owner.clone();

        thread::spawn(move || {
            let cancelled = spawner
                .start_cancellable_with_handle(from_fn(|_| Ok(YieldInstruction::Continue)), token);
            let owned =
                spawner.start_owned_with_handle(from_fn(|_| Ok(YieldInstruction::Continue)), &owner);
            (cancelled, owned)
        })
        .join()
        .unwrap()
    };

    scheduler.tick().unwrap();
    assert!(!cancelled.is_completed());
    assert!(!owned.is_completed());

    token.cancel();
    owner.destroy();
    scheduler.tick().unwrap();

    assert!(cancelled.is_completed());
    assert!(owned.is_completed());
    assert!(scheduler.is_idle());
}

#[test]
fn test_run_until_idle() {
    let mut scheduler = manual();

    scheduler.start(from_iter([
        YieldInstruction::Continue,
        YieldInstruction::Continue,
    ]));

    assert!(!scheduler.is_idle());
    assert_eq!(scheduler.run_until_idle(100).unwrap(), 3);
    assert!(scheduler.is_idle());
}

#[test]
fn test_stats_track_queues() {
    let mut scheduler = manual();

    scheduler.start(from_iter([YieldInstruction::Continue]));
    scheduler.start(from_iter([YieldInstruction::WaitSeconds(10.0)]));

    let stats = scheduler.stats();
    assert_eq!(stats.pending, 2);
    assert_eq!(stats.runnable, 0);

    scheduler.tick().unwrap();

    let stats = scheduler.stats();
    assert_eq!(stats.ticks, 1);
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.runnable, 1);
    assert_eq!(stats.waiting, 1);
}

#[test]
fn test_dropping_scheduler_completes_handles() {
    let mut scheduler = manual();

    let waiting = scheduler.start_with_handle(from_iter([YieldInstruction::WaitSeconds(10.0)]));
    let running = scheduler.start_with_handle(from_fn(|_| Ok(YieldInstruction::Continue)));

    scheduler.tick().unwrap();
    assert!(!waiting.is_completed());
    assert!(!running.is_completed());

    drop(scheduler);
    assert!(waiting.is_completed());
    assert!(running.is_completed());
}

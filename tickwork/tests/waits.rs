use tickwork::task::value_task;
use tickwork::{Fault, ManualClock, Scheduler, YieldInstruction, from_fn, from_iter, wait};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

#[test]
fn test_wait_seconds_resumes_in_deadline_tick() {
    let mut scheduler = Scheduler::builder()
        .clock(ManualClock::with_step(0.5))
        .build();

    let ticks = Arc::new(Mutex::new(Vec::new()));
    let log = ticks.clone();
    let mut waited = false;

    scheduler.start(from_fn(move |cx| {
        log.lock().unwrap().push(cx.tick());

        if waited {
            return Ok(YieldInstruction::Finalized);
        }

        waited = true;
        Ok(YieldInstruction::WaitSeconds(1.0))
    }));

    for _ in 0..4 {
        scheduler.tick().unwrap();
    }

    assert_eq!(*ticks.lock().unwrap(), vec![1, 3]);
}

#[test]
fn test_two_second_wait_completes_exactly_once() {
    let mut scheduler = Scheduler::builder()
        .clock(ManualClock::with_step(0.5))
        .build();

    let handle = scheduler.start_with_handle(from_iter([YieldInstruction::WaitSeconds(2.0)]));

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    handle.on_completed(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    // Yielded at 0.5s; still waiting at 2.0s.
    for _ in 0..4 {
        scheduler.tick().unwrap();
        assert!(!handle.is_completed());
    }

    scheduler.tick().unwrap();
    assert!(handle.is_completed());

    for _ in 0..4 {
        scheduler.tick().unwrap();
    }
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn test_wait_realtime_ignores_scaled_time() {
    let clock = ManualClock::new();
    let mut scheduler = Scheduler::builder().clock(clock.clone()).build();

    let handle = scheduler.start_with_handle(from_iter([YieldInstruction::WaitRealtime(1.0)]));

    scheduler.tick().unwrap();

    clock.advance_scaled(5.0);
    scheduler.tick().unwrap();
    assert!(!handle.is_completed());

    clock.advance_realtime(1.0);
    scheduler.tick().unwrap();
    assert!(handle.is_completed());
}

#[test]
fn test_wait_until_and_while() {
    let mut scheduler = Scheduler::new();
    let flag = Arc::new(AtomicBool::new(false));

    let until_flag = flag.clone();
    let until = scheduler.start_with_handle(from_iter([YieldInstruction::wait_until(move || {
        until_flag.load(Ordering::SeqCst)
    })]));

    let while_flag = flag.clone();
    let while_ = scheduler.start_with_handle(from_iter([YieldInstruction::wait_while(move || {
        !while_flag.load(Ordering::SeqCst)
    })]));

    scheduler.tick().unwrap();
    scheduler.tick().unwrap();
    assert!(!until.is_completed());
    assert!(!while_.is_completed());

    flag.store(true, Ordering::SeqCst);
    scheduler.tick().unwrap();
    assert!(until.is_completed());
    assert!(while_.is_completed());
}

#[test]
fn test_job_fault_fails_the_next_step() {
    let mut scheduler = Scheduler::builder().threading(false).build();

    let job = scheduler.schedule_job(|| Err(Fault::job("disk on fire")));
    scheduler.start(from_iter([YieldInstruction::job(job)]));

    scheduler.tick().unwrap();

    let result = scheduler.tick();
    assert!(matches!(result, Err(Fault::Job(_))));
    assert!(scheduler.is_idle());
}

#[test]
fn test_taken_fault_does_not_fail_the_step() {
    let mut scheduler = Scheduler::builder().threading(false).build();
    let seen = Arc::new(Mutex::new(None));

    let job = scheduler.schedule_job(|| Err(Fault::job("expected")));
    let mut job = Some(job);
    let slot = seen.clone();

    let handle = scheduler.start_with_handle(from_fn(move |cx| {
        if let Some(job) = job.take() {
            return Ok(YieldInstruction::job(job));
        }

        *slot.lock().unwrap() = cx.take_fault();
        Ok(YieldInstruction::Finalized)
    }));

    scheduler.run_until_idle(10).unwrap();

    assert!(handle.is_completed());
    assert!(matches!(*seen.lock().unwrap(), Some(Fault::Job(_))));
}

#[tickwork::test(tick = 0.25)]
async fn test_async_wait_seconds() {
    let start = wait::now().time;

    wait::seconds(1.0).await;

    assert!(wait::now().time - start >= 1.0);
}

#[tickwork::test]
async fn test_async_value_task_from_thread() {
    let (completer, task) = value_task::<u32>();

    thread::spawn(move || completer.complete(7));

    let value = wait::value_task(task).await?;
    assert_eq!(value, 7);
}

#[tickwork::test]
async fn test_async_value_task_cancelled() {
    let (completer, task) = value_task::<u32>();
    completer.cancel();

    let result = wait::value_task(task).await;
    assert!(matches!(result, Err(Fault::Cancelled)));
}

#[tickwork::test]
async fn test_async_dropped_completer_detaches() {
    let (completer, task) = value_task::<String>();
    drop(completer);

    let result = wait::value_task(task).await;
    assert!(matches!(result, Err(Fault::Detached)));
}

#[tickwork::test]
async fn test_async_until() {
    let flag = Arc::new(AtomicBool::new(false));

    let setter = flag.clone();
    thread::spawn(move || setter.store(true, Ordering::SeqCst));

    let probe = flag.clone();
    wait::until(move || probe.load(Ordering::SeqCst)).await;

    assert!(flag.load(Ordering::SeqCst));
}

use tickwork::worker::spawn_thread;
use tickwork::{ExecutionMode, Fault, Scheduler, SwitchOutcome, ThreadSwitch, wait};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

#[tickwork::test(worker_threads = 2)]
async fn test_switch_to_background_and_back() {
    assert_eq!(wait::mode(), ExecutionMode::Driver);

    wait::switch_to(ThreadSwitch::Background).await;
    assert_eq!(wait::mode(), ExecutionMode::Background);

    let name = thread::current().name().map(str::to_owned);
    assert!(name.is_some_and(|name| name.starts_with("tickwork-worker")));

    wait::switch_to(ThreadSwitch::Driver).await;
    assert_eq!(wait::mode(), ExecutionMode::Driver);
}

#[tickwork::test]
async fn test_switch_to_dedicated_thread() {
    wait::switch_to(ThreadSwitch::Dedicated).await;
    assert_eq!(wait::mode(), ExecutionMode::Dedicated);

    wait::switch_to(ThreadSwitch::Driver).await;
    assert_eq!(wait::mode(), ExecutionMode::Driver);
}

#[tickwork::test(threading = false)]
async fn test_switch_without_threads_stays_on_driver() {
    wait::switch_to(ThreadSwitch::Background).await;
    assert_eq!(wait::mode(), ExecutionMode::Driver);
}

#[test]
fn test_switcher_degrades_without_threads() {
    let scheduler = Scheduler::builder().threading(false).build();
    let switcher = scheduler.switcher();

    assert!(!switcher.threading());
    assert!(switcher.is_completed(ThreadSwitch::Driver));
    assert_eq!(scheduler.worker_threads(), 0);

    let ran = Arc::new(AtomicUsize::new(0));
    let counter = ran.clone();
    let outcome = switcher
        .to_background()
        .on_completed(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

    assert_eq!(outcome, SwitchOutcome::Degraded);
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn test_switcher_posts_to_driver_from_other_thread() {
    let mut scheduler = Scheduler::new();
    let switcher = scheduler.switcher();

    let ran = Arc::new(AtomicUsize::new(0));
    let counter = ran.clone();

    let outcome = thread::spawn(move || {
        switcher.to_driver().on_completed(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    })
    .join()
    .unwrap();

    assert_eq!(outcome, SwitchOutcome::Posted);
    assert_eq!(ran.load(Ordering::SeqCst), 0);

    scheduler.tick().unwrap();
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn test_schedule_job_and_wait() {
    let mut scheduler = Scheduler::new();
    let ran = Arc::new(AtomicUsize::new(0));

    let counter = ran.clone();
    let job = scheduler.schedule_job(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    scheduler.block_on(async move { wait::job(job).await }).unwrap();

    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn test_thread_job_panic_is_reported() {
    let mut scheduler = Scheduler::new();

    let result = scheduler.block_on(async {
        let job = spawn_thread(|| -> Result<(), Fault> { panic!("kaboom") });
        Ok(wait::job(job).await)
    });

    match result {
        Ok(Err(Fault::Panicked(message))) => assert_eq!(message, "kaboom"),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

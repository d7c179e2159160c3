use tickwork::{
    CancellationToken, Guarded, Owner, Scheduler, YieldInstruction, from_fn, from_future,
    from_iter, wait,
};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn logger(log: &Arc<Mutex<Vec<&'static str>>>) -> impl Fn(&'static str) + Clone + Send + 'static {
    let log = log.clone();
    move |entry: &'static str| log.lock().unwrap().push(entry)
}

#[test]
fn test_delegate_runs_inner_in_the_same_step() {
    let mut scheduler = Scheduler::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    let outer_log = logger(&log);
    let inner_log = logger(&log);
    let mut outer_steps = 0;

    let handle = scheduler.start_with_handle(from_fn(move |_| {
        outer_steps += 1;

        if outer_steps == 1 {
            outer_log("outer-1");

            let inner_log = inner_log.clone();
            let mut inner_steps = 0;
            return Ok(YieldInstruction::delegate(from_fn(move |_| {
                inner_steps += 1;
                if inner_steps == 1 {
                    inner_log("inner-1");
                    Ok(YieldInstruction::Continue)
                } else {
                    inner_log("inner-2");
                    Ok(YieldInstruction::Finalized)
                }
            })));
        }

        outer_log("outer-2");
        Ok(YieldInstruction::Finalized)
    }));

    scheduler.tick().unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["outer-1", "inner-1"]);
    assert!(!handle.is_completed());

    scheduler.tick().unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec!["outer-1", "inner-1", "inner-2", "outer-2"]
    );
    assert!(handle.is_completed());
}

#[test]
fn test_async_delegate() {
    let mut scheduler = Scheduler::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    let body_log = logger(&log);
    let handle = scheduler.start_with_handle(from_future(async move {
        body_log("before");
        wait::delegate(from_iter([YieldInstruction::Continue])).await;
        body_log("after");
        Ok(())
    }));

    scheduler.tick().unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["before"]);

    scheduler.tick().unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["before", "after"]);
    assert!(handle.is_completed());
}

#[test]
fn test_cancelled_delegate_resumes_parent() {
    let mut scheduler = Scheduler::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let token = CancellationToken::new();

    let parent_log = logger(&log);
    let inner_token = token.clone();
    let mut delegated = false;

    let handle = scheduler.start_with_handle(from_fn(move |_| {
        if !delegated {
            delegated = true;
            let inner = from_fn(|_| Ok(YieldInstruction::Continue));
            return Ok(YieldInstruction::delegate(Guarded::new(inner, inner_token.clone())));
        }

        parent_log("parent-resumed");
        Ok(YieldInstruction::Finalized)
    }));

    scheduler.tick().unwrap();
    scheduler.tick().unwrap();
    assert!(!handle.is_completed());

    token.cancel();
    scheduler.tick().unwrap();

    assert!(handle.is_completed());
    assert_eq!(*log.lock().unwrap(), vec!["parent-resumed"]);
    assert!(scheduler.is_idle());
}

#[test]
fn test_parked_delegate_holds_parent_until_destroyed() {
    let mut scheduler = Scheduler::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let owner = Owner::new();

    let parent_log = logger(&log);
    let inner_owner = owner.clone();
    let mut delegated = false;

    let handle = scheduler.start_with_handle(from_fn(move |_| {
        if !delegated {
            delegated = true;
            let inner = from_fn(|_| Ok(YieldInstruction::Continue));
            return Ok(YieldInstruction::delegate(Guarded::new(inner, inner_owner.clone())));
        }

        parent_log("parent-resumed");
        Ok(YieldInstruction::Finalized)
    }));

    scheduler.tick().unwrap();

    owner.set_active(false);
    scheduler.tick().unwrap();
    scheduler.tick().unwrap();
    assert_eq!(scheduler.stats().suspended, 1);
    assert!(log.lock().unwrap().is_empty());

    owner.destroy();
    scheduler.tick().unwrap();

    assert!(handle.is_completed());
    assert_eq!(*log.lock().unwrap(), vec!["parent-resumed"]);
}

#[test]
fn test_cancelling_parent_mid_delegate() {
    let mut scheduler = Scheduler::new();
    let token = CancellationToken::new();
    let inner_steps = Arc::new(AtomicUsize::new(0));

    let counter = inner_steps.clone();
    let mut delegated = false;

    let handle = scheduler.start_cancellable_with_handle(
        from_fn(move |_| {
            if delegated {
                return Ok(YieldInstruction::Finalized);
            }

            delegated = true;
            let counter = counter.clone();
            Ok(YieldInstruction::delegate(from_fn(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(YieldInstruction::Continue)
            })))
        }),
        token.clone(),
    );

    scheduler.tick().unwrap();
    assert_eq!(inner_steps.load(Ordering::SeqCst), 1);

    token.cancel();
    scheduler.tick().unwrap();

    assert_eq!(inner_steps.load(Ordering::SeqCst), 1);
    assert!(handle.is_completed());
    assert!(scheduler.is_idle());
}

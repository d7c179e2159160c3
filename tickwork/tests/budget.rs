use tickwork::{Fault, ManualClock, Now, Scheduler, ServiceReport, Wait, YieldInstruction, from_iter};

use std::sync::{Arc, Mutex};

/// Never finishes; records every check.
struct Probe {
    id: usize,
    log: Arc<Mutex<Vec<usize>>>,
}

impl Wait for Probe {
    fn keep_waiting(&mut self, _now: &Now) -> Result<bool, Fault> {
        self.log.lock().unwrap().push(self.id);
        Ok(true)
    }
}

/// Finishes on its first check; records it.
struct Once {
    id: usize,
    log: Arc<Mutex<Vec<usize>>>,
}

impl Wait for Once {
    fn keep_waiting(&mut self, _now: &Now) -> Result<bool, Fault> {
        self.log.lock().unwrap().push(self.id);
        Ok(false)
    }
}

fn frozen(budget_ms: f64, min_fraction: f64) -> Scheduler {
    Scheduler::builder()
        .clock(ManualClock::new())
        .budget_ms(budget_ms)
        .min_fraction(min_fraction)
        .build()
}

fn start_probes(scheduler: &mut Scheduler, count: usize) -> Arc<Mutex<Vec<usize>>> {
    let log = Arc::new(Mutex::new(Vec::new()));

    for id in 0..count {
        let probe = Probe {
            id,
            log: log.clone(),
        };
        scheduler.start(from_iter([YieldInstruction::custom(probe)]));
    }

    log
}

#[test]
fn test_full_fraction_services_everything() {
    let mut scheduler = frozen(0.0, 1.0);
    let log = start_probes(&mut scheduler, 10);

    scheduler.tick().unwrap();
    scheduler.tick().unwrap();

    assert_eq!(
        scheduler.last_service(),
        ServiceReport {
            serviced: 10,
            deferred: 0,
            resumed: 0,
            finalized: 0,
        }
    );
    assert_eq!(log.lock().unwrap().len(), 10);
}

#[test]
fn test_compaction_keeps_fifo_order() {
    let mut scheduler = frozen(0.0, 1.0);
    let log = Arc::new(Mutex::new(Vec::new()));

    scheduler.start(from_iter([YieldInstruction::custom(Probe {
        id: 0,
        log: log.clone(),
    })]));
    scheduler.start(from_iter([YieldInstruction::custom(Once {
        id: 1,
        log: log.clone(),
    })]));
    scheduler.start(from_iter([YieldInstruction::custom(Probe {
        id: 2,
        log: log.clone(),
    })]));

    scheduler.tick().unwrap();
    scheduler.tick().unwrap();
    assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
    assert_eq!(scheduler.last_service().resumed, 1);
    assert_eq!(scheduler.stats().waiting, 2);

    scheduler.tick().unwrap();
    assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 0, 2]);
}

#[test]
fn test_half_fraction_rotates_through_the_bucket() {
    let mut scheduler = frozen(0.0, 0.5);
    let log = start_probes(&mut scheduler, 10);

    scheduler.tick().unwrap();

    scheduler.tick().unwrap();
    assert_eq!(scheduler.last_service().serviced, 5);
    assert_eq!(scheduler.last_service().deferred, 5);
    assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);

    scheduler.tick().unwrap();
    assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);

    log.lock().unwrap().clear();
    scheduler.tick().unwrap();
    assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_zero_fraction_still_services_one() {
    let mut scheduler = frozen(0.0, 0.0);
    let log = start_probes(&mut scheduler, 3);

    scheduler.tick().unwrap();
    scheduler.tick().unwrap();

    assert_eq!(scheduler.last_service().serviced, 1);
    assert_eq!(scheduler.last_service().deferred, 2);
    assert_eq!(*log.lock().unwrap(), vec![0]);
}

#[test]
fn test_exempt_predicates_ignore_the_budget() {
    let mut scheduler = frozen(0.0, 0.0);
    scheduler.set_predicates_in_budget(false);

    for _ in 0..4 {
        scheduler.start(from_iter([YieldInstruction::wait_until(|| false)]));
    }
    let log = start_probes(&mut scheduler, 2);

    scheduler.tick().unwrap();
    scheduler.tick().unwrap();

    assert_eq!(scheduler.last_service().serviced, 5);
    assert_eq!(scheduler.last_service().deferred, 1);
    assert_eq!(*log.lock().unwrap(), vec![0]);
}

#[test]
fn test_tunables_are_clamped() {
    let mut scheduler = Scheduler::new();

    scheduler.set_min_fraction(3.0);
    assert_eq!(scheduler.min_fraction(), 1.0);

    scheduler.set_min_fraction(-1.0);
    assert_eq!(scheduler.min_fraction(), 0.0);

    scheduler.set_budget_ms(-5.0);
    assert_eq!(scheduler.budget_ms(), 0.0);

    assert!(scheduler.predicates_in_budget());
}

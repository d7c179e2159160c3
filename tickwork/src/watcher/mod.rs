//! Polling of external completion sources.
//!
//! A watcher holds job handles together with what to do once they finish.
//! Each [`tick`](CompletionWatcher::tick) joins the handles that report
//! completion, runs their continuations with the outcome, and keeps the
//! rest in their original order.
//!
//! [`CompletionWatcher`] stores boxed handles and continuations.
//! [`KeyedWatcher`] keeps one unboxed list per handle and action type.
//!
//! Both are owned and ticked by the [`Scheduler`](crate::Scheduler), but
//! work standalone as well.

mod keyed;

pub use keyed::{Action, KeyedWatcher};

use crate::error::Fault;
use crate::task::JobHandle;

use log::warn;
use std::mem;
use std::panic::{self, AssertUnwindSafe};

/// Continuation run with the outcome of a watched job.
pub type JobContinuation = Box<dyn FnOnce(Result<(), Fault>) + Send + 'static>;

/// Watches boxed job handles.
#[derive(Default)]
pub struct CompletionWatcher {
    entries: Vec<(Box<dyn JobHandle>, JobContinuation)>,
    scratch: Vec<(Box<dyn JobHandle>, JobContinuation)>,
}

impl CompletionWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `continuation` with the outcome of `job` once it completes.
    pub fn watch<H, F>(&mut self, job: H, continuation: F)
    where
        H: JobHandle,
        F: FnOnce(Result<(), Fault>) + Send + 'static,
    {
        self.entries.push((Box::new(job), Box::new(continuation)));
    }

    /// Number of jobs still watched.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finalizes completed jobs; returns how many.
    pub fn tick(&mut self) -> usize {
        drain_finished(&mut self.entries, &mut self.scratch, |_, continuation, outcome| {
            continuation(outcome)
        })
    }
}

/// Completes every finished handle in `entries` and hands it to `fire`.
///
/// Unfinished entries are compacted through `scratch`, keeping their
/// relative order. A panicking `fire` does not lose the other entries: the
/// whole list is processed first, then the first panic is resumed.
fn drain_finished<H, A>(
    entries: &mut Vec<(H, A)>,
    scratch: &mut Vec<(H, A)>,
    mut fire: impl FnMut(H, A, Result<(), Fault>),
) -> usize
where
    H: JobHandle,
{
    let mut finished = 0;
    let mut panicked = None;

    for (mut handle, action) in entries.drain(..) {
        if handle.is_completed() {
            let outcome = handle.complete();
            let fired = panic::catch_unwind(AssertUnwindSafe(|| fire(handle, action, outcome)));

            if let Err(payload) = fired {
                warn!("job continuation panicked");
                panicked.get_or_insert(payload);
            }

            finished += 1;
        } else {
            scratch.push((handle, action));
        }
    }

    mem::swap(entries, scratch);

    if let Some(payload) = panicked {
        panic::resume_unwind(payload);
    }

    finished
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    struct Flag(Arc<AtomicBool>);

    impl JobHandle for Flag {
        fn is_completed(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }

        fn complete(&mut self) -> Result<(), Fault> {
            Ok(())
        }
    }

    #[test]
    fn incomplete_jobs_keep_their_order() {
        let flags: Vec<_> = (0..4).map(|_| Arc::new(AtomicBool::new(false))).collect();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut watcher = CompletionWatcher::new();

        for (i, flag) in flags.iter().enumerate() {
            let log = log.clone();
            watcher.watch(Flag(flag.clone()), move |_| log.lock().unwrap().push(i));
        }

        flags[1].store(true, Ordering::SeqCst);
        assert_eq!(watcher.tick(), 1);
        assert_eq!(watcher.len(), 3);

        flags[3].store(true, Ordering::SeqCst);
        flags[0].store(true, Ordering::SeqCst);
        assert_eq!(watcher.tick(), 2);

        flags[2].store(true, Ordering::SeqCst);
        watcher.tick();

        assert_eq!(*log.lock().unwrap(), vec![1, 0, 3, 2]);
        assert!(watcher.is_empty());
    }

    #[test]
    fn panicking_continuation_keeps_the_rest() {
        let done = Arc::new(AtomicBool::new(true));
        let pending = Arc::new(AtomicBool::new(false));
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut watcher = CompletionWatcher::new();

        watcher.watch(Flag(done.clone()), |_| panic!("bad continuation"));
        let first = log.clone();
        watcher.watch(Flag(pending.clone()), move |_| first.lock().unwrap().push("pending"));
        let second = log.clone();
        watcher.watch(Flag(done.clone()), move |_| second.lock().unwrap().push("done"));

        let result = panic::catch_unwind(AssertUnwindSafe(|| watcher.tick()));

        assert!(result.is_err());
        assert_eq!(*log.lock().unwrap(), vec!["done"]);
        assert_eq!(watcher.len(), 1);

        pending.store(true, Ordering::SeqCst);
        assert_eq!(watcher.tick(), 1);
        assert_eq!(*log.lock().unwrap(), vec!["done", "pending"]);
    }
}

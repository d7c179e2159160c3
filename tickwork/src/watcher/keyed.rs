use super::drain_finished;
use crate::error::Fault;
use crate::task::JobHandle;

use std::any::{Any, TypeId};
use std::collections::HashMap;

/// What to run once a handle of type `H` completes.
///
/// The action gets the joined handle back, so it can read whatever the job
/// produced.
pub trait Action<H>: Send + 'static {
    fn run(self, handle: H, outcome: Result<(), Fault>);
}

impl<H, F> Action<H> for F
where
    F: FnOnce(H, Result<(), Fault>) + Send + 'static,
{
    fn run(self, handle: H, outcome: Result<(), Fault>) {
        self(handle, outcome)
    }
}

/// Type-erased face of a [`TypedWatcher`].
trait SubWatcher: Send {
    fn tick(&mut self) -> usize;
    fn len(&self) -> usize;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Unboxed `(handle, action)` pairs of a single type combination.
struct TypedWatcher<H, A> {
    entries: Vec<(H, A)>,
    scratch: Vec<(H, A)>,
}

impl<H, A> SubWatcher for TypedWatcher<H, A>
where
    H: JobHandle,
    A: Action<H>,
{
    fn tick(&mut self) -> usize {
        drain_finished(&mut self.entries, &mut self.scratch, |handle, action, outcome| {
            action.run(handle, outcome)
        })
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Watcher keyed by handle and action type.
///
/// Sub-watchers are created on first use and ticked in creation order.
#[derive(Default)]
pub struct KeyedWatcher {
    index: HashMap<TypeId, usize>,
    watchers: Vec<Box<dyn SubWatcher>>,
}

impl KeyedWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `action` with `handle` and its outcome once it completes.
    pub fn register<H, A>(&mut self, handle: H, action: A)
    where
        H: JobHandle,
        A: Action<H>,
    {
        let slot = *self.index.entry(TypeId::of::<(H, A)>()).or_insert_with(|| {
            self.watchers.push(Box::new(TypedWatcher::<H, A> {
                entries: Vec::new(),
                scratch: Vec::new(),
            }));
            self.watchers.len() - 1
        });

        self.watchers[slot]
            .as_any_mut()
            .downcast_mut::<TypedWatcher<H, A>>()
            .expect("sub-watcher stored under a foreign type id")
            .entries
            .push((handle, action));
    }

    /// Number of handles still watched.
    pub fn len(&self) -> usize {
        self.watchers.iter().map(|w| w.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct handle/action types seen so far.
    pub fn kinds(&self) -> usize {
        self.watchers.len()
    }

    /// Ticks every sub-watcher; returns how many handles completed.
    pub fn tick(&mut self) -> usize {
        self.watchers.iter_mut().map(|w| w.tick()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    struct Loaded {
        bytes: usize,
    }

    impl JobHandle for Loaded {
        fn is_completed(&self) -> bool {
            true
        }

        fn complete(&mut self) -> Result<(), Fault> {
            Ok(())
        }
    }

    #[test]
    fn action_receives_its_handle() {
        let total = Arc::new(Mutex::new(0));
        let mut watcher = KeyedWatcher::new();

        for bytes in [3, 4] {
            let total = total.clone();
            watcher.register(Loaded { bytes }, move |h: Loaded, outcome: Result<(), Fault>| {
                assert!(outcome.is_ok());
                *total.lock().unwrap() += h.bytes;
            });
        }

        assert_eq!(watcher.kinds(), 1);
        assert_eq!(watcher.tick(), 2);
        assert_eq!(*total.lock().unwrap(), 7);
        assert!(watcher.is_empty());
    }
}

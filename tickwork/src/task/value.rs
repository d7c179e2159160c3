use super::{ExternalTask, TaskStatus};
use crate::error::Fault;

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

enum Slot<T> {
    Pending,
    Ready(T),
    Taken,
    Faulted(Fault),
    Cancelled,
}

/// Creates a connected completer / task pair.
///
/// The completer is handed to whatever produces the value (usually another
/// thread); the task is yielded from a coroutine, or polled directly.
///
/// # Examples
///
/// ```rust,ignore
/// let (completer, task) = value_task::<u32>();
/// thread::spawn(move || completer.complete(42));
/// ```
pub fn value_task<T>() -> (TaskCompleter<T>, ValueTask<T>) {
    let slot = Arc::new(Mutex::new(Slot::Pending));

    (
        TaskCompleter {
            slot: slot.clone(),
            finished: false,
        },
        ValueTask { slot },
    )
}

/// Producer half of a [`ValueTask`].
///
/// Dropping a completer without finishing it faults the task with
/// [`Fault::Detached`].
pub struct TaskCompleter<T> {
    slot: Arc<Mutex<Slot<T>>>,
    finished: bool,
}

impl<T> TaskCompleter<T> {
    /// Completes the task with `value`.
    pub fn complete(mut self, value: T) {
        self.finish(Slot::Ready(value));
    }

    /// Completes the task with a fault.
    pub fn fail(mut self, fault: Fault) {
        self.finish(Slot::Faulted(fault));
    }

    /// Cancels the task.
    pub fn cancel(mut self) {
        self.finish(Slot::Cancelled);
    }

    fn finish(&mut self, outcome: Slot<T>) {
        self.finished = true;
        *self.slot.lock() = outcome;
    }
}

impl<T> Drop for TaskCompleter<T> {
    fn drop(&mut self) {
        if !self.finished {
            *self.slot.lock() = Slot::Faulted(Fault::Detached);
        }
    }
}

/// Consumer half of [`value_task`].
///
/// Clones observe the same task; the value itself can be taken once.
pub struct ValueTask<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> ValueTask<T> {
    /// Returns the current status.
    pub fn status(&self) -> TaskStatus {
        match &*self.slot.lock() {
            Slot::Pending => TaskStatus::Pending,
            Slot::Ready(_) | Slot::Taken => TaskStatus::Completed,
            Slot::Faulted(fault) => TaskStatus::Faulted(fault.clone()),
            Slot::Cancelled => TaskStatus::Cancelled,
        }
    }

    /// Returns `true` once the task finished, in any way.
    pub fn is_completed(&self) -> bool {
        self.status().is_finished()
    }

    /// Takes the outcome.
    ///
    /// Returns `None` while the task is pending and after the value was
    /// already taken. Faults and cancellation are reported every time.
    pub fn try_take(&self) -> Option<Result<T, Fault>> {
        let mut slot = self.slot.lock();

        match &*slot {
            Slot::Pending | Slot::Taken => None,
            Slot::Faulted(fault) => Some(Err(fault.clone())),
            Slot::Cancelled => Some(Err(Fault::Cancelled)),
            Slot::Ready(_) => match std::mem::replace(&mut *slot, Slot::Taken) {
                Slot::Ready(value) => Some(Ok(value)),
                _ => None,
            },
        }
    }
}

impl<T> Clone for ValueTask<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T> fmt::Debug for ValueTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueTask")
            .field("status", &self.status())
            .finish()
    }
}

impl<T: Send + 'static> ExternalTask for ValueTask<T> {
    fn status(&mut self) -> TaskStatus {
        ValueTask::status(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_is_taken_once() {
        let (completer, task) = value_task();
        assert!(!task.is_completed());

        completer.complete(5);

        assert!(task.is_completed());
        assert_eq!(task.try_take().unwrap().unwrap(), 5);
        assert!(task.try_take().is_none());
    }

    #[test]
    fn dropped_completer_detaches() {
        let (completer, task) = value_task::<()>();
        drop(completer);

        assert!(matches!(task.status(), TaskStatus::Faulted(Fault::Detached)));
    }

    #[test]
    fn cancellation_is_reported() {
        let (completer, task) = value_task::<u8>();
        completer.cancel();

        assert!(matches!(task.try_take(), Some(Err(Fault::Cancelled))));
    }
}

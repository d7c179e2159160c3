//! Fault taxonomy.
//!
//! Everything that can go wrong while driving coroutines is a [`Fault`].
//! Step faults propagate out of [`Scheduler::tick`](crate::Scheduler::tick);
//! faults captured from external jobs and tasks are handed to the coroutine
//! that awaited them.

use std::any::Any;
use std::error::Error as StdError;
use std::sync::Arc;

/// Shared, type-erased error carried inside a [`Fault`].
pub type BoxError = Arc<dyn StdError + Send + Sync + 'static>;

/// An error raised while stepping a coroutine or observed on an external
/// completion source.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Fault {
    /// A coroutine step returned an error.
    #[error("coroutine step failed: {0}")]
    Step(BoxError),

    /// A background job reported failure.
    #[error("external job failed: {0}")]
    Job(BoxError),

    /// An external task finished in a faulted state.
    #[error("external task failed: {0}")]
    Task(BoxError),

    /// An external task was cancelled before producing a result.
    #[error("external task was cancelled")]
    Cancelled,

    /// A job or dedicated thread panicked.
    #[error("panicked: {0}")]
    Panicked(String),

    /// The producer side went away before completing.
    #[error("completion source dropped before completing")]
    Detached,
}

impl Fault {
    /// Wraps `err` as a step fault.
    pub fn step<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        Fault::Step(Arc::from(err.into()))
    }

    /// Wraps `err` as a job fault.
    pub fn job<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        Fault::Job(Arc::from(err.into()))
    }

    /// Wraps `err` as a task fault.
    pub fn task<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        Fault::Task(Arc::from(err.into()))
    }

    /// Converts a panic payload caught by `catch_unwind`.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_owned()
        };

        Fault::Panicked(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::panic;

    #[test]
    fn display_includes_source() {
        let fault = Fault::job("disk full");
        assert_eq!(fault.to_string(), "external job failed: disk full");
    }

    #[test]
    fn panic_payload_is_kept() {
        let payload = panic::catch_unwind(|| panic!("boom {}", 7)).unwrap_err();
        match Fault::from_panic(payload) {
            Fault::Panicked(msg) => assert_eq!(msg, "boom 7"),
            other => panic!("unexpected fault {other:?}"),
        }
    }
}

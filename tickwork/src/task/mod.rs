//! External completion sources.
//!
//! The scheduler does not run background work itself; it only observes it.
//! Anything that finishes asynchronously is exposed through one of two
//! traits:
//!
//! - [`JobHandle`]: a unit of background work that must be explicitly
//!   completed (joined) once it reports being done,
//! - [`ExternalTask`]: a task whose status can be polled, optionally
//!   carrying a value ([`ValueTask`]).

mod value;

pub use value::{TaskCompleter, ValueTask, value_task};

use crate::error::Fault;

/// Observed status of an [`ExternalTask`].
#[derive(Debug, Clone)]
pub enum TaskStatus {
    /// Still running.
    Pending,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Faulted(Fault),
    /// Cancelled before finishing.
    Cancelled,
}

impl TaskStatus {
    /// Returns `true` for every status except [`Pending`](Self::Pending).
    pub fn is_finished(&self) -> bool {
        !matches!(self, TaskStatus::Pending)
    }
}

/// A handle to background work running on an opaque substrate.
///
/// The scheduler polls [`is_completed`](Self::is_completed) once per tick
/// and calls [`complete`](Self::complete) exactly once after it returns
/// `true`, which is where the resource is joined and any failure reported.
pub trait JobHandle: Send + 'static {
    /// Returns `true` once the job has finished running.
    fn is_completed(&self) -> bool;

    /// Joins the job and reports its outcome.
    ///
    /// May block if called before [`is_completed`](Self::is_completed)
    /// returned `true`.
    fn complete(&mut self) -> Result<(), Fault>;
}

impl<H: JobHandle + ?Sized> JobHandle for Box<H> {
    fn is_completed(&self) -> bool {
        (**self).is_completed()
    }

    fn complete(&mut self) -> Result<(), Fault> {
        (**self).complete()
    }
}

/// A pollable asynchronous task.
pub trait ExternalTask: Send + 'static {
    /// Returns the current status without blocking.
    fn status(&mut self) -> TaskStatus;
}

impl<T: ExternalTask + ?Sized> ExternalTask for Box<T> {
    fn status(&mut self) -> TaskStatus {
        (**self).status()
    }
}

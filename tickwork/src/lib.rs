//! # Tickwork
//!
//! **Tickwork** is a tick-driven coroutine scheduler for Rust, designed for
//! frame loops: game engines, simulations, and anything else that advances
//! in discrete steps.
//!
//! A coroutine is a value that yields one [`YieldInstruction`] per step.
//! Every call to [`Scheduler::tick`] advances each runnable coroutine by one
//! step and routes what it yielded: run again next tick, park until its
//! state changes, wait on a timer, a predicate, a job, a task or another
//! coroutine, delegate to an inner coroutine, or move to a background
//! thread and back.
//!
//! Tickwork is built around a few ideas:
//!
//! - A **double-buffered run queue**: coroutines started during a tick take
//!   their first step on the next one.
//! - A **frame-budgeted poll bucket**: waiting coroutines are checked under
//!   a per-tick time budget, with a guaranteed minimum share.
//! - **Pooled, generation-tagged completion handles** and **pooled waiters**
//!   so steady-state ticking does not allocate.
//! - An **async bridge**: any `Future` can run as a coroutine and await
//!   the same waits through [`wait`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tickwork::{Scheduler, wait};
//!
//! let mut scheduler = Scheduler::new();
//!
//! let handle = scheduler.start_with_handle(tickwork::from_future(async {
//!     wait::seconds(0.5).await;
//!     println!("half a second later");
//!     Ok(())
//! }));
//!
//! while !handle.is_completed() {
//!     scheduler.tick()?;
//! }
//! ```
//!
//! ## Modules
//!
//! - [`wait`]: Awaitable waits for coroutines written as futures
//! - [`task`]: Job and task handles a coroutine can wait on
//! - [`worker`]: Background jobs
//! - [`watcher`]: Continuations fired when jobs complete

mod coroutine;
mod error;
mod handle;
mod runtime;
mod switch;
mod utils;
mod waiter;

pub mod task;
pub mod wait;
pub mod watcher;
pub mod worker;

pub use coroutine::{
    AsyncCoroutine, Cancellable, CancellationToken, Coroutine, CoroutineState, ExecutionMode,
    FnCoroutine, Guarded, IterCoroutine, Liveness, Owner, Predicate, StepContext,
    YieldInstruction, from_fn, from_future, from_iter,
};
pub use error::{BoxError, Fault};
pub use handle::{Completion, Continuation, CoroutineHandle, Handle};
pub use runtime::{
    Clock, CoroutineId, ManualClock, Now, Scheduler, SchedulerBuilder, SchedulerStats,
    ServiceReport, Spawner, SystemClock,
};
pub use switch::{SwitchOutcome, SwitchTo, Switcher, ThreadSwitch};
pub use waiter::Wait;

pub use tickwork_macros::test;

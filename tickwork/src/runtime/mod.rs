//! The tick-driven scheduler.
//!
//! This module contains the scheduler itself and the machinery around it:
//! the clock it reads, the run queue and poll bucket it services every
//! tick, the inbox other threads post to, and the loop that steps
//! coroutines running off the driver thread.
//!
//! Most users only touch [`Scheduler`], [`SchedulerBuilder`] and
//! [`Spawner`]; everything else is re-exported at the crate root where it
//! is part of the public surface.

mod builder;
mod clock;
mod core;
mod detached;
mod entry;
mod injector;
mod queue;
mod shared;
mod spawner;

pub(crate) mod context;

pub use builder::SchedulerBuilder;
pub use clock::{Clock, ManualClock, Now, SystemClock};
pub use core::{Scheduler, SchedulerStats};
pub use entry::CoroutineId;
pub use queue::ServiceReport;
pub use spawner::Spawner;

pub(crate) use entry::Entry;
pub(crate) use shared::Shared;

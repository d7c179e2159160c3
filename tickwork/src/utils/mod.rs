//! Low-level building blocks used internally by the scheduler.
//!
//! - `Slab`: generation-checked indexed storage.
//! - [`SlotTable`]: a lock-protected slab for handing owned values across
//!   threads by key, drained exactly once.
//! - [`SpinGuard`]: scoped spin-flag ownership for the handle hot path.

mod slab;
mod slots;
mod spin;

pub(crate) use slab::SlabKey;
pub(crate) use slots::SlotTable;
pub(crate) use spin::{SpinGuard, wait_released};

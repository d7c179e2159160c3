use super::slab::{Slab, SlabKey};

use parking_lot::Mutex;

/// A process-wide table of owned values addressed by integer keys.
///
/// Values are stored once and drained once: [`take`](Self::take) removes
/// the value, after which the key is dead. This lets an opaque queue carry
/// a small `Copy` key instead of the value itself.
pub(crate) struct SlotTable<T> {
    slab: Mutex<Slab<T>>,
}

impl<T> SlotTable<T> {
    /// Creates an empty table; usable in a `static`.
    pub(crate) const fn new() -> Self {
        Self {
            slab: parking_lot::const_mutex(Slab::new()),
        }
    }

    /// Stores `value` and returns the key that drains it.
    pub(crate) fn store(&self, value: T) -> SlabKey {
        self.slab.lock().insert(value)
    }

    /// Drains the value stored under `key`, if it is still there.
    pub(crate) fn take(&self, key: SlabKey) -> Option<T> {
        self.slab.lock().take(key)
    }

    /// Number of values stored and not yet drained.
    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn len(&self) -> usize {
        self.slab.lock().len()
    }
}

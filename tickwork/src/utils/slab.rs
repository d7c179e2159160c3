/// Key returned by [`Slab::insert`].
///
/// The generation half makes a key single-use: once the value behind it is
/// taken, the slot may be reused, but the old key will never match it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SlabKey {
    index: u32,
    generation: u32,
}

/// A single storage cell.
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// A generation-checked slab allocator.
///
/// A `Slab` stores values of type `T` in a contiguous array and hands out
/// [`SlabKey`]s that index into it. Freed slots are recycled through a
/// free list; every reuse bumps the slot generation so that stale keys
/// resolve to nothing instead of to someone else's value.
pub(crate) struct Slab<T> {
    /// Storage for items.
    slots: Vec<Slot<T>>,
    /// Stack of free indices that can be reused.
    free: Vec<u32>,
    /// Number of occupied slots.
    len: usize,
}

impl<T> Slab<T> {
    /// Creates an empty slab. No memory is allocated until the first insert.
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Inserts a value and returns the key that can take it back out.
    ///
    /// Free slots are reused first; otherwise the slab grows by one slot.
    pub(crate) fn insert(&mut self, value: T) -> SlabKey {
        self.len += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.value.is_none(), "free list points at a live slot");

            slot.value = Some(value);
            return SlabKey {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });

        SlabKey {
            index,
            generation: 0,
        }
    }

    /// Removes and returns the value stored under `key`.
    ///
    /// Returns `None` if the key was already drained or never issued by
    /// this slab.
    pub(crate) fn take(&mut self, key: SlabKey) -> Option<T> {
        let slot = self.slots.get_mut(key.index as usize)?;

        if slot.generation != key.generation {
            return None;
        }

        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        self.len -= 1;

        Some(value)
    }

    /// Returns `true` if `key` still refers to a stored value.
    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn contains(&self, key: SlabKey) -> bool {
        self.slots
            .get(key.index as usize)
            .is_some_and(|slot| slot.generation == key.generation && slot.value.is_some())
    }

    /// Number of stored values.
    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

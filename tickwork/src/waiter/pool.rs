/// A waiter that can be stored in a [`Pool`].
pub(crate) trait Poolable: Default {
    /// Drops whatever the waiter is bound to.
    fn clear(&mut self);
}

/// Bounded stack of reusable waiters.
///
/// Waiters are taken on suspension and given back once their result has
/// been delivered. Ownership moves with the box, so a waiter can never sit
/// in two places at once. Instances returned while the pool is full are
/// dropped.
pub(crate) struct Pool<W> {
    free: Vec<Box<W>>,
    capacity: usize,
}

impl<W: Poolable> Pool<W> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            free: Vec::new(),
            capacity,
        }
    }

    /// Pops a free waiter or allocates a new one.
    pub(crate) fn take(&mut self) -> Box<W> {
        self.free.pop().unwrap_or_default()
    }

    /// Clears `waiter` and keeps it for reuse if there is room.
    pub(crate) fn give_back(&mut self, mut waiter: Box<W>) {
        waiter.clear();

        if self.free.len() < self.capacity {
            self.free.push(waiter);
        }
    }

    pub(crate) fn available(&self) -> usize {
        self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Probe {
        bound: Option<u32>,
    }

    impl Poolable for Probe {
        fn clear(&mut self) {
            self.bound = None;
        }
    }

    #[test]
    fn reuses_and_clears() {
        let mut pool = Pool::<Probe>::new(1);

        let mut waiter = pool.take();
        waiter.bound = Some(3);
        let addr = &*waiter as *const Probe;
        pool.give_back(waiter);

        let again = pool.take();
        assert_eq!(&*again as *const Probe, addr);
        assert!(again.bound.is_none());
    }

    #[test]
    fn excess_is_dropped() {
        let mut pool = Pool::<Probe>::new(1);

        let a = pool.take();
        let b = pool.take();
        pool.give_back(a);
        pool.give_back(b);

        assert_eq!(pool.available(), 1);
    }
}

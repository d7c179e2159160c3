use std::hint;
use std::sync::atomic::{AtomicBool, Ordering};

/// Scoped owner of a spin flag.
///
/// The flag is released when the guard drops, so it cannot stay held if the
/// critical section unwinds.
pub(crate) struct SpinGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> SpinGuard<'a> {
    /// Spins until `flag` flips from `false` to `true` on this thread's behalf.
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Self {
        while flag
            .compare_exchange_weak(false, true, Ordering::SeqCst, Ordering::Relaxed)
            .is_err()
        {
            while flag.load(Ordering::Relaxed) {
                hint::spin_loop();
            }
        }

        Self { flag }
    }
}

impl Drop for SpinGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Spins until nobody holds `flag`.
pub(crate) fn wait_released(flag: &AtomicBool) {
    while flag.load(Ordering::SeqCst) {
        hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::panic;

    #[test]
    fn guard_releases_on_unwind() {
        let flag = AtomicBool::new(false);

        let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            let _guard = SpinGuard::acquire(&flag);
            panic!("accumulation failed");
        }));

        assert!(result.is_err());
        assert!(!flag.load(Ordering::SeqCst));
    }
}

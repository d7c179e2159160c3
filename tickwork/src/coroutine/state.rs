/// Scheduling state of a coroutine, as seen by the scheduler.
///
/// States are ordered by precedence: when two sources disagree about a
/// coroutine (its own body and an external liveness check, for example),
/// [`merge`](Self::merge) keeps the stronger one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum CoroutineState {
    /// The coroutine wants to be stepped.
    ///
    /// It stays in the active set and is stepped once per tick.
    #[default]
    Continue = 0,

    /// The coroutine is parked.
    ///
    /// It is kept in the suspended set and re-polled every tick until its
    /// state changes.
    Suspended = 1,

    /// The coroutine is done.
    ///
    /// It will never be stepped again and its handle is completed.
    Finalized = 2,
}

impl CoroutineState {
    /// Combines two states; `Finalized` dominates `Suspended`, which
    /// dominates `Continue`.
    ///
    /// The merge is total and commutative.
    pub const fn merge(self, other: CoroutineState) -> CoroutineState {
        if (self as u8) >= (other as u8) {
            self
        } else {
            other
        }
    }

    /// Encodes the state for atomic storage.
    pub(crate) const fn to_bits(self) -> u8 {
        self as u8
    }

    /// Decodes a value produced by [`to_bits`](Self::to_bits).
    ///
    /// Out-of-range values decode as `Finalized`.
    pub(crate) const fn from_bits(bits: u8) -> CoroutineState {
        match bits {
            0 => CoroutineState::Continue,
            1 => CoroutineState::Suspended,
            _ => CoroutineState::Finalized,
        }
    }
}

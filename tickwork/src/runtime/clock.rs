//! Time sources.
//!
//! The scheduler reads two clocks once per tick: scaled time, which drives
//! [`WaitSeconds`](crate::YieldInstruction::WaitSeconds), and unscaled real
//! time, which drives
//! [`WaitRealtime`](crate::YieldInstruction::WaitRealtime). Both are
//! expressed in seconds since the clock was created.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A source of scaled and unscaled time.
pub trait Clock: Send + Sync + 'static {
    /// Scaled seconds since the clock started.
    fn time(&self) -> f64;

    /// Unscaled wall-clock seconds since the clock started.
    fn realtime(&self) -> f64;

    /// Called by the scheduler at the start of every tick, before either
    /// clock is read.
    fn on_tick(&self) {}
}

/// Snapshot of both clocks taken at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Now {
    /// Scaled seconds.
    pub time: f64,
    /// Unscaled seconds.
    pub realtime: f64,
}

impl Now {
    pub(crate) fn read(clock: &dyn Clock) -> Self {
        Self {
            time: clock.time(),
            realtime: clock.realtime(),
        }
    }
}

/// Wall clock with an adjustable time scale.
///
/// Changing the scale never makes scaled time jump: the new scale only
/// applies to time elapsed after the change.
pub struct SystemClock {
    origin: Instant,
    scale: Mutex<Scale>,
}

#[derive(Clone, Copy)]
struct Scale {
    factor: f64,
    since_real: f64,
    since_time: f64,
}

impl SystemClock {
    /// Creates a clock running at scale `1.0`.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            scale: Mutex::new(Scale {
                factor: 1.0,
                since_real: 0.0,
                since_time: 0.0,
            }),
        }
    }

    /// Current time scale.
    pub fn time_scale(&self) -> f64 {
        self.scale.lock().factor
    }

    /// Sets the factor applied to scaled time from now on.
    ///
    /// Negative factors are clamped to `0.0`, which pauses scaled time.
    pub fn set_time_scale(&self, factor: f64) {
        let real = self.realtime();
        let mut scale = self.scale.lock();

        let time = scale.since_time + (real - scale.since_real) * scale.factor;

        *scale = Scale {
            factor: factor.max(0.0),
            since_real: real,
            since_time: time,
        };
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn time(&self) -> f64 {
        let real = self.realtime();
        let scale = *self.scale.lock();

        scale.since_time + (real - scale.since_real) * scale.factor
    }

    fn realtime(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

impl fmt::Debug for SystemClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemClock")
            .field("time_scale", &self.time_scale())
            .finish()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one copy while the
/// scheduler owns another. With [`with_step`](Self::with_step) the clock
/// also advances by a fixed amount at the start of every tick.
#[derive(Clone, Default)]
pub struct ManualClock {
    inner: Arc<ManualInner>,
}

#[derive(Default)]
struct ManualInner {
    time: AtomicU64,
    realtime: AtomicU64,
    step: AtomicU64,
}

impl ManualClock {
    /// Creates a clock frozen at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clock that advances both times by `step` seconds per tick.
    pub fn with_step(step: f64) -> Self {
        let clock = Self::new();
        clock.inner.step.store(step.to_bits(), Ordering::Release);
        clock
    }

    /// Advances scaled and unscaled time by `secs`.
    pub fn advance(&self, secs: f64) {
        add(&self.inner.time, secs);
        add(&self.inner.realtime, secs);
    }

    /// Advances scaled time only, as a paused or fast-forwarded game would.
    pub fn advance_scaled(&self, secs: f64) {
        add(&self.inner.time, secs);
    }

    /// Advances unscaled time only.
    pub fn advance_realtime(&self, secs: f64) {
        add(&self.inner.realtime, secs);
    }
}

impl Clock for ManualClock {
    fn time(&self) -> f64 {
        f64::from_bits(self.inner.time.load(Ordering::Acquire))
    }

    fn realtime(&self) -> f64 {
        f64::from_bits(self.inner.realtime.load(Ordering::Acquire))
    }

    fn on_tick(&self) {
        let step = f64::from_bits(self.inner.step.load(Ordering::Acquire));

        if step != 0.0 {
            self.advance(step);
        }
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock")
            .field("time", &self.time())
            .field("realtime", &self.realtime())
            .finish()
    }
}

fn add(cell: &AtomicU64, secs: f64) {
    let _ = cell.fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
        Some((f64::from_bits(bits) + secs).to_bits())
    });
}

use super::{Poolable, Wait};
use crate::error::Fault;
use crate::runtime::Now;

/// Resumes once scaled time reaches a deadline.
#[derive(Debug, Default)]
pub(crate) struct DelayWaiter {
    deadline: f64,
}

impl DelayWaiter {
    pub(crate) fn bind(&mut self, now: &Now, secs: f64) {
        self.deadline = now.time + secs;
    }
}

impl Wait for DelayWaiter {
    fn keep_waiting(&mut self, now: &Now) -> Result<bool, Fault> {
        Ok(now.time < self.deadline)
    }
}

impl Poolable for DelayWaiter {
    fn clear(&mut self) {
        self.deadline = 0.0;
    }
}

/// Resumes once unscaled time reaches a deadline.
#[derive(Debug, Default)]
pub(crate) struct RealtimeWaiter {
    deadline: f64,
}

impl RealtimeWaiter {
    pub(crate) fn bind(&mut self, now: &Now, secs: f64) {
        self.deadline = now.realtime + secs;
    }
}

impl Wait for RealtimeWaiter {
    fn keep_waiting(&mut self, now: &Now) -> Result<bool, Fault> {
        Ok(now.realtime < self.deadline)
    }
}

impl Poolable for RealtimeWaiter {
    fn clear(&mut self) {
        self.deadline = 0.0;
    }
}

use super::{Poolable, Wait};
use crate::coroutine::Predicate;
use crate::error::Fault;
use crate::runtime::Now;

/// Polls a predicate once per service.
///
/// With `UNTIL` set it keeps waiting while the predicate is `false`;
/// otherwise while it is `true`.
#[derive(Default)]
pub(crate) struct PredicateWaiter<const UNTIL: bool> {
    predicate: Option<Predicate>,
}

/// Resumes once the predicate returns `true`.
pub(crate) type UntilWaiter = PredicateWaiter<true>;

/// Resumes once the predicate returns `false`.
pub(crate) type WhileWaiter = PredicateWaiter<false>;

impl<const UNTIL: bool> PredicateWaiter<UNTIL> {
    pub(crate) fn bind(&mut self, predicate: Predicate) {
        self.predicate = Some(predicate);
    }
}

impl<const UNTIL: bool> Wait for PredicateWaiter<UNTIL> {
    fn keep_waiting(&mut self, _now: &Now) -> Result<bool, Fault> {
        let Some(predicate) = self.predicate.as_mut() else {
            return Ok(false);
        };

        Ok(predicate() != UNTIL)
    }

    fn is_predicate(&self) -> bool {
        true
    }
}

impl<const UNTIL: bool> Poolable for PredicateWaiter<UNTIL> {
    fn clear(&mut self) {
        self.predicate = None;
    }
}

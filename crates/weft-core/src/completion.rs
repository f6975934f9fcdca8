// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Completion handles returned by the scheduler for every scheduled chore.
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tokio::sync::Notify;

use crate::chore::Value;
use crate::error::ChoreError;
use crate::kind::ChoreKind;

/// Result a chore settles with.
pub type ChoreOutcome = Result<Value, ChoreError>;

struct Slot {
    kind: ChoreKind,
    outcome: RefCell<Option<ChoreOutcome>>,
    notify: Notify,
}

/// Cloneable, single-threaded completion handle for a chore.
///
/// Settles exactly once; later settlement attempts are ignored.
#[derive(Clone)]
pub struct ChoreHandle {
    slot: Rc<Slot>,
}

impl ChoreHandle {
    pub(crate) fn new(kind: ChoreKind) -> Self {
        Self {
            slot: Rc::new(Slot {
                kind,
                outcome: RefCell::new(None),
                notify: Notify::new(),
            }),
        }
    }

    /// Handle that is already settled with `outcome`.
    pub(crate) fn settled(kind: ChoreKind, outcome: ChoreOutcome) -> Self {
        let handle = Self::new(kind);
        handle.settle(outcome);
        handle
    }

    /// Kind of the chore this handle tracks.
    pub fn kind(&self) -> ChoreKind {
        self.slot.kind
    }

    /// True once the chore reached a terminal state.
    pub fn is_settled(&self) -> bool {
        self.slot.outcome.borrow().is_some()
    }

    /// The outcome, if settled.
    pub fn outcome(&self) -> Option<ChoreOutcome> {
        self.slot.outcome.borrow().clone()
    }

    /// Waits until the chore settles and returns its outcome.
    pub async fn wait(&self) -> ChoreOutcome {
        loop {
            // Register before checking so a settle in between is not missed.
            let notified = self.slot.notify.notified();
            if let Some(outcome) = self.outcome() {
                return outcome;
            }
            notified.await;
        }
    }

    /// True when both handles track the same chore instance.
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }

    /// Stores the outcome and wakes waiters. Returns `false` if the handle
    /// had already settled.
    pub(crate) fn settle(&self, outcome: ChoreOutcome) -> bool {
        {
            let mut slot = self.slot.outcome.borrow_mut();
            if slot.is_some() {
                return false;
            }
            *slot = Some(outcome);
        }
        self.slot.notify.notify_waiters();
        true
    }
}

impl fmt::Debug for ChoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChoreHandle")
            .field("kind", &self.slot.kind)
            .field("outcome", &self.slot.outcome.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_settlement_wins() {
        let handle = ChoreHandle::new(ChoreKind::Task);
        assert!(!handle.is_settled());
        assert!(handle.settle(Ok(Value::from(1))));
        assert!(!handle.settle(Err(ChoreError::failed("late"))));
        assert_eq!(handle.outcome(), Some(Ok(Value::from(1))));
    }

    #[test]
    fn clones_share_identity() {
        let a = ChoreHandle::new(ChoreKind::DrainBarrier);
        let b = a.clone();
        assert!(a.same_as(&b));
        assert!(!a.same_as(&ChoreHandle::new(ChoreKind::DrainBarrier)));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn wait_observes_a_later_settlement() {
        let handle = ChoreHandle::new(ChoreKind::Reconcile);
        let settler = handle.clone();
        let local = tokio::task::LocalSet::new();
        let outcome = local
            .run_until(async move {
                tokio::task::spawn_local(async move {
                    tokio::task::yield_now().await;
                    settler.settle(Ok(Value::Null));
                });
                handle.wait().await
            })
            .await;
        assert_eq!(outcome, Ok(Value::Null));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn wait_returns_immediately_when_settled() {
        let handle = ChoreHandle::settled(ChoreKind::ResolveCode, Ok(Value::Bool(true)));
        assert_eq!(handle.wait().await, Ok(Value::Bool(true)));
    }
}

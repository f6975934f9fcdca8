// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Manually opened gates for deferred and not-ready handler results.
use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct GateState {
    open: Cell<bool>,
    notify: Notify,
}

/// One-shot latch. Futures from [`Gate::wait`] resolve once [`Gate::open`]
/// was called; clones share the latch.
#[derive(Clone, Debug, Default)]
pub struct Gate {
    state: Rc<GateState>,
}

impl Gate {
    /// Closed gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the gate and wakes every waiter.
    pub fn open(&self) {
        self.state.open.set(true);
        self.state.notify.notify_waiters();
    }

    /// True once opened.
    pub fn is_open(&self) -> bool {
        self.state.open.get()
    }

    /// Resolves once the gate is open.
    pub async fn wait(&self) {
        loop {
            let notified = self.state.notify.notified();
            if self.is_open() {
                return;
            }
            notified.await;
        }
    }

    /// Owned `'static` future over [`Gate::wait`].
    pub fn waiter(&self) -> impl Future<Output = ()> + 'static {
        let gate = self.clone();
        async move { gate.wait().await }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "current_thread")]
    async fn waiters_resume_after_open() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let gate = Gate::new();
                let waiter = tokio::task::spawn_local(gate.waiter());
                tokio::task::yield_now().await;
                assert!(!waiter.is_finished());
                gate.open();
                assert!(waiter.await.is_ok());
                // Already open: resolves immediately.
                gate.wait().await;
            })
            .await;
    }
}

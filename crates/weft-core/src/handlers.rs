// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Ports to the collaborators that actually perform chore work.
//!
//! The scheduler owns ordering and bookkeeping only. Reconciliation, component
//! evaluation, task running, attribute serialization, code loading and effect
//! recomputation are delegated through [`ChoreHandlers`].
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use crate::chore::{ChoreWork, EffectBatch, ReactiveSource, TaskRef, Value};
use crate::completion::ChoreOutcome;
use crate::config::RuntimeMode;
use crate::error::ChoreError;
use crate::ident::{CodeRef, HostId};
use crate::kind::ChoreKind;
use crate::scheduler::Scheduler;

/// Deferred chore result.
pub type ChoreFuture = Pin<Box<dyn Future<Output = ChoreOutcome>>>;

/// Resolves when a not-ready dependency (usually code) becomes available.
pub type ReadySignal = Pin<Box<dyn Future<Output = ()>>>;

/// What a collaborator produced for one attempt.
pub enum Execution {
    /// Finished synchronously.
    Ready(ChoreOutcome),
    /// Will finish later; the chore stays running until the future settles.
    Deferred(ChoreFuture),
    /// Cannot run yet; retry once the signal fires.
    NotReady(ReadySignal),
}

impl Execution {
    /// Successful synchronous result.
    pub fn done(value: Value) -> Self {
        Self::Ready(Ok(value))
    }

    /// Failed synchronous result.
    pub fn fail(msg: impl Into<String>) -> Self {
        Self::Ready(Err(ChoreError::failed(msg)))
    }

    /// Deferred result backed by `fut`.
    pub fn deferred(fut: impl Future<Output = ChoreOutcome> + 'static) -> Self {
        Self::Deferred(Box::pin(fut))
    }
}

impl std::fmt::Debug for Execution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(outcome) => f.debug_tuple("Ready").field(outcome).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
            Self::NotReady(_) => f.write_str("NotReady(..)"),
        }
    }
}

/// What a handler knows about the chore it runs.
///
/// Handlers may schedule follow-up work through [`ChoreContext::scheduler`];
/// it is queued and picked up by the running drain.
pub struct ChoreContext<'a> {
    scheduler: &'a Scheduler,
    kind: ChoreKind,
    owner: Option<HostId>,
    mode: RuntimeMode,
}

impl<'a> ChoreContext<'a> {
    pub(crate) fn new(scheduler: &'a Scheduler, work: &ChoreWork) -> Self {
        Self {
            scheduler,
            kind: work.kind(),
            owner: work.owner(),
            mode: scheduler.config().mode,
        }
    }

    /// The scheduler running this chore.
    pub fn scheduler(&self) -> &'a Scheduler {
        self.scheduler
    }

    /// Kind of the running chore.
    pub fn kind(&self) -> ChoreKind {
        self.kind
    }

    /// Owner of the running chore.
    pub fn owner(&self) -> Option<HostId> {
        self.owner
    }

    /// Client or server.
    pub fn mode(&self) -> RuntimeMode {
        self.mode
    }
}

/// External collaborators invoked by chore execution.
pub trait ChoreHandlers {
    /// Loads a deferred code reference.
    fn resolve_code(&self, cx: &ChoreContext<'_>, code: &CodeRef) -> Execution;

    /// Calls a code reference with `args`.
    fn invoke_code(&self, cx: &ChoreContext<'_>, code: &CodeRef, args: &[Value]) -> Execution;

    /// Runs a plain task.
    fn run_task(&self, cx: &ChoreContext<'_>, task: &TaskRef) -> Execution;

    /// Runs a resource. Defaults to [`ChoreHandlers::run_task`].
    fn run_resource(&self, cx: &ChoreContext<'_>, task: &TaskRef) -> Execution {
        self.run_task(cx, task)
    }

    /// Evaluates a component into a render output.
    fn evaluate_component(
        &self,
        cx: &ChoreContext<'_>,
        host: HostId,
        code: &CodeRef,
        props: &Rc<Value>,
    ) -> Execution;

    /// Reconciles `render` against the live tree below `host`.
    fn reconcile(&self, cx: &ChoreContext<'_>, host: HostId, render: &Rc<Value>) -> Execution;

    /// Applies an attribute to a live element (client).
    fn apply_attribute(
        &self,
        cx: &ChoreContext<'_>,
        host: HostId,
        name: &str,
        value: &Value,
    ) -> Execution;

    /// Records a backpatch entry for an already streamed element (server).
    fn backpatch_attribute(
        &self,
        cx: &ChoreContext<'_>,
        host: HostId,
        name: &str,
        value: &Value,
    ) -> Execution;

    /// Recomputes the effects subscribed to `source`.
    fn recompute_effects(
        &self,
        cx: &ChoreContext<'_>,
        source: &ReactiveSource,
        batch: &Rc<EffectBatch>,
    ) -> Execution;

    /// Runs a visible task.
    fn run_visible(&self, cx: &ChoreContext<'_>, task: &TaskRef) -> Execution;

    /// Tears down a visible task.
    fn cleanup_visible(&self, cx: &ChoreContext<'_>, task: &TaskRef) -> Execution;

    /// Applies batched output mutations.
    fn flush(&self);

    /// Container-level error handler, called once per failed chore.
    fn on_error(&self, error: &ChoreError, kind: ChoreKind, owner: Option<HostId>);
}

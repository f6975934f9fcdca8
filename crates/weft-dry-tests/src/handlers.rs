// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Recording collaborator handlers with scripted behaviours.
//!
//! Every handler call is logged as a [`Call`] tagged with a label: the task or
//! code name, the attribute name, `"reconcile"` or `"effects"`. Behaviours
//! are queued per label and consumed one per call; an empty queue succeeds.
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use weft_core::{
    ChoreContext, ChoreError, ChoreHandlers, ChoreKind, CodeRef, EffectBatch, Execution, HostId,
    ReactiveSource, TaskRef, Value,
};

use crate::gate::Gate;

/// Hook run in place of a handler body.
pub type HookFn = Rc<dyn Fn(&ChoreContext<'_>) -> Execution>;

/// Scripted outcome for one handler call.
pub enum Behaviour {
    /// Succeed synchronously.
    Succeed,
    /// Fail synchronously with the message.
    Fail(String),
    /// Succeed once the gate opens.
    Defer(Gate),
    /// Fail with the message once the gate opens.
    DeferFail(Gate, String),
    /// Report not-ready until the gate opens.
    NotReady(Gate),
    /// Run the hook and return whatever it produces.
    Hook(HookFn),
}

impl std::fmt::Debug for Behaviour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeed => f.write_str("Succeed"),
            Self::Fail(msg) => f.debug_tuple("Fail").field(msg).finish(),
            Self::Defer(_) => f.write_str("Defer(..)"),
            Self::DeferFail(_, msg) => f.debug_tuple("DeferFail").field(msg).finish(),
            Self::NotReady(_) => f.write_str("NotReady(..)"),
            Self::Hook(_) => f.write_str("Hook(..)"),
        }
    }
}

/// One observed collaborator call.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    /// A chore handler ran.
    Run {
        /// Kind of the chore being executed.
        kind: ChoreKind,
        /// Owner of that chore.
        owner: Option<HostId>,
        /// Handler label.
        label: String,
    },
    /// Output was flushed.
    Flush,
    /// The container error handler was invoked.
    Error {
        /// Kind of the failed chore.
        kind: ChoreKind,
        /// Owner of the failed chore.
        owner: Option<HostId>,
        /// The failure.
        error: ChoreError,
    },
}

/// [`ChoreHandlers`] double that records calls and follows a script.
#[derive(Debug, Default)]
pub struct RecordingHandlers {
    calls: RefCell<Vec<Call>>,
    script: RefCell<HashMap<String, VecDeque<Behaviour>>>,
}

impl RecordingHandlers {
    /// Handlers where every call succeeds.
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Queues `behaviour` for the next call labelled `label`.
    pub fn script(&self, label: &str, behaviour: Behaviour) -> &Self {
        self.script
            .borrow_mut()
            .entry(label.to_owned())
            .or_default()
            .push_back(behaviour);
        self
    }

    /// Queues a hook for the next call labelled `label`.
    pub fn hook(&self, label: &str, hook: impl Fn(&ChoreContext<'_>) -> Execution + 'static) -> &Self {
        self.script(label, Behaviour::Hook(Rc::new(hook)))
    }

    /// Everything observed so far.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Labels of handler runs, in order.
    pub fn runs(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Run { label, .. } => Some(label.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of output flushes.
    pub fn flushes(&self) -> usize {
        self.calls.borrow().iter().filter(|c| **c == Call::Flush).count()
    }

    /// Errors passed to the container handler.
    pub fn errors(&self) -> Vec<ChoreError> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Error { error, .. } => Some(error.clone()),
                _ => None,
            })
            .collect()
    }

    /// Position of the first run labelled `label`, counting flushes too.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.calls
            .borrow()
            .iter()
            .position(|c| matches!(c, Call::Run { label: l, .. } if l == label))
    }

    /// Forgets recorded calls; the script is kept.
    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    fn run(&self, cx: &ChoreContext<'_>, label: &str, value: Value) -> Execution {
        self.calls.borrow_mut().push(Call::Run {
            kind: cx.kind(),
            owner: cx.owner(),
            label: label.to_owned(),
        });
        let next = self
            .script
            .borrow_mut()
            .get_mut(label)
            .and_then(VecDeque::pop_front);
        match next.unwrap_or(Behaviour::Succeed) {
            Behaviour::Succeed => Execution::done(value),
            Behaviour::Fail(msg) => Execution::fail(msg),
            Behaviour::Defer(gate) => Execution::deferred(async move {
                gate.wait().await;
                Ok(value)
            }),
            Behaviour::DeferFail(gate, msg) => Execution::deferred(async move {
                gate.wait().await;
                Err(ChoreError::Failed(msg))
            }),
            Behaviour::NotReady(gate) => Execution::NotReady(Box::pin(gate.waiter())),
            Behaviour::Hook(hook) => hook(cx),
        }
    }
}

impl ChoreHandlers for RecordingHandlers {
    fn resolve_code(&self, cx: &ChoreContext<'_>, code: &CodeRef) -> Execution {
        self.run(cx, &code.name, Value::Null)
    }

    fn invoke_code(&self, cx: &ChoreContext<'_>, code: &CodeRef, args: &[Value]) -> Execution {
        self.run(cx, &code.name, Value::Array(args.to_vec()))
    }

    fn run_task(&self, cx: &ChoreContext<'_>, task: &TaskRef) -> Execution {
        self.run(cx, &task.code.name, Value::Null)
    }

    fn evaluate_component(
        &self,
        cx: &ChoreContext<'_>,
        _host: HostId,
        code: &CodeRef,
        props: &Rc<Value>,
    ) -> Execution {
        self.run(cx, &code.name, (**props).clone())
    }

    fn reconcile(&self, cx: &ChoreContext<'_>, _host: HostId, render: &Rc<Value>) -> Execution {
        self.run(cx, "reconcile", (**render).clone())
    }

    fn apply_attribute(
        &self,
        cx: &ChoreContext<'_>,
        _host: HostId,
        name: &str,
        value: &Value,
    ) -> Execution {
        self.run(cx, name, value.clone())
    }

    fn backpatch_attribute(
        &self,
        cx: &ChoreContext<'_>,
        _host: HostId,
        name: &str,
        value: &Value,
    ) -> Execution {
        self.run(cx, &format!("backpatch:{name}"), value.clone())
    }

    fn recompute_effects(
        &self,
        cx: &ChoreContext<'_>,
        _source: &ReactiveSource,
        batch: &Rc<EffectBatch>,
    ) -> Execution {
        self.run(cx, "effects", batch.value.clone())
    }

    fn run_visible(&self, cx: &ChoreContext<'_>, task: &TaskRef) -> Execution {
        self.run(cx, &task.code.name, Value::Null)
    }

    fn cleanup_visible(&self, cx: &ChoreContext<'_>, task: &TaskRef) -> Execution {
        self.run(cx, &format!("cleanup:{}", task.code.name), Value::Null)
    }

    fn flush(&self) {
        self.calls.borrow_mut().push(Call::Flush);
    }

    fn on_error(&self, error: &ChoreError, kind: ChoreKind, owner: Option<HostId>) {
        self.calls.borrow_mut().push(Call::Error {
            kind,
            owner,
            error: error.clone(),
        });
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Chore model: the per-kind work variants and the scheduler's bookkeeping record.
use std::rc::Rc;

use tokio::time::Instant;

use crate::completion::ChoreHandle;
use crate::ident::{ChoreId, CodeRef, HostId, SeqIndex, SignalId, StoreId, SymbolId, TaskId};
use crate::kind::ChoreKind;

/// Opaque value exchanged with collaborators (render outputs, props, results).
pub type Value = serde_json::Value;

/// Flavor of a declared task.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TaskFlavor {
    /// Plain reactive task.
    Task,
    /// Resource: a task whose result is exposed as an async value.
    Resource,
    /// Task that only runs once its host is visible.
    Visible,
}

/// Descriptor of a declared task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskRef {
    /// Task identity.
    pub id: TaskId,
    /// Host the task is declared on.
    pub host: HostId,
    /// Position in the host's declared sequence.
    pub index: u32,
    /// Task body.
    pub code: CodeRef,
    /// Task flavor.
    pub flavor: TaskFlavor,
}

/// Reactive value whose subscribers are being recomputed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReactiveSource {
    /// A single signal.
    Signal(SignalId),
    /// A property of a store.
    Store {
        /// Store identity.
        store: StoreId,
        /// Property that changed.
        property: Rc<str>,
    },
}

/// Batch of effects gathered by effect propagation for one notification.
#[derive(Debug, Default, PartialEq)]
pub struct EffectBatch {
    /// Hosts whose subscriptions are part of this batch.
    pub subscribers: Vec<HostId>,
    /// New value of the source, when known.
    pub value: Value,
}

/// Identity of a chore's target, used as the final comparator tie-break.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TargetKey {
    /// No target (drain barrier).
    None,
    /// A host node.
    Host(HostId),
    /// One attribute of a host.
    Attribute(HostId, Rc<str>),
    /// A code unit.
    Code(SymbolId),
    /// A declared task.
    Task(TaskId),
    /// A signal.
    Signal(SignalId),
    /// A store.
    Store(StoreId),
}

/// A unit of work to schedule: one variant per [`ChoreKind`], carrying that
/// kind's target and payload.
#[derive(Clone, Debug)]
pub enum ChoreWork {
    /// Resolve a deferred code reference.
    ResolveCode {
        /// Host that needs the code, if any.
        owner: Option<HostId>,
        /// Code to resolve.
        code: CodeRef,
    },
    /// Invoke a code reference.
    InvokeCode {
        /// Host the invocation belongs to, if any.
        owner: Option<HostId>,
        /// Code to invoke.
        code: CodeRef,
        /// Call arguments.
        args: Rc<[Value]>,
    },
    /// Run a reactive task or resource.
    Task(TaskRef),
    /// Reconcile a render output below `host`.
    Reconcile {
        /// Host being reconciled.
        host: HostId,
        /// Render output to reconcile against.
        render: Rc<Value>,
    },
    /// Write (client) or backpatch (server) an attribute.
    WriteAttribute {
        /// Element carrying the attribute.
        host: HostId,
        /// Attribute name.
        name: Rc<str>,
        /// New attribute value.
        value: Rc<Value>,
    },
    /// Re-evaluate a component.
    EvaluateComponent {
        /// Component host.
        host: HostId,
        /// Component body.
        code: CodeRef,
        /// Props to render with.
        props: Rc<Value>,
    },
    /// Recompute the effects subscribed to a reactive source.
    RecomputeEffects {
        /// Host the effects belong to, if any.
        owner: Option<HostId>,
        /// Source that notified.
        source: ReactiveSource,
        /// Effects to recompute.
        batch: Rc<EffectBatch>,
    },
    /// Run a visible task.
    Visible(TaskRef),
    /// Tear down a visible task.
    CleanupVisible(TaskRef),
    /// The drain barrier sentinel.
    DrainBarrier,
}

impl ChoreWork {
    /// Kind of this work.
    #[must_use]
    pub fn kind(&self) -> ChoreKind {
        match self {
            Self::ResolveCode { .. } => ChoreKind::ResolveCode,
            Self::InvokeCode { .. } => ChoreKind::InvokeCode,
            Self::Task(_) => ChoreKind::Task,
            Self::Reconcile { .. } => ChoreKind::Reconcile,
            Self::WriteAttribute { .. } => ChoreKind::WriteAttribute,
            Self::EvaluateComponent { .. } => ChoreKind::EvaluateComponent,
            Self::RecomputeEffects { .. } => ChoreKind::RecomputeEffects,
            Self::Visible(_) => ChoreKind::Visible,
            Self::CleanupVisible(_) => ChoreKind::CleanupVisible,
            Self::DrainBarrier => ChoreKind::DrainBarrier,
        }
    }

    /// Host this work is attached to; `None` for global work.
    #[must_use]
    pub fn owner(&self) -> Option<HostId> {
        match self {
            Self::ResolveCode { owner, .. }
            | Self::InvokeCode { owner, .. }
            | Self::RecomputeEffects { owner, .. } => *owner,
            Self::Task(task) | Self::Visible(task) | Self::CleanupVisible(task) => Some(task.host),
            Self::Reconcile { host, .. }
            | Self::WriteAttribute { host, .. }
            | Self::EvaluateComponent { host, .. } => Some(*host),
            Self::DrainBarrier => None,
        }
    }

    /// Declaration index used for ordering within an owner.
    #[must_use]
    pub fn seq_index(&self) -> SeqIndex {
        match self {
            Self::ResolveCode { code, .. } | Self::InvokeCode { code, .. } => {
                SeqIndex::Name(Rc::clone(&code.name))
            }
            Self::Task(task) | Self::Visible(task) | Self::CleanupVisible(task) => {
                SeqIndex::Position(task.index)
            }
            Self::WriteAttribute { name, .. } => SeqIndex::Name(Rc::clone(name)),
            Self::RecomputeEffects {
                source: ReactiveSource::Store { property, .. },
                ..
            } => SeqIndex::Name(Rc::clone(property)),
            Self::Reconcile { .. }
            | Self::EvaluateComponent { .. }
            | Self::RecomputeEffects { .. }
            | Self::DrainBarrier => SeqIndex::Position(0),
        }
    }

    /// Identity of the target.
    #[must_use]
    pub fn target(&self) -> TargetKey {
        match self {
            Self::ResolveCode { code, .. }
            | Self::InvokeCode { code, .. }
            | Self::EvaluateComponent { code, .. } => TargetKey::Code(code.symbol),
            Self::Task(task) | Self::Visible(task) | Self::CleanupVisible(task) => {
                TargetKey::Task(task.id)
            }
            Self::Reconcile { host, .. } => TargetKey::Host(*host),
            Self::WriteAttribute { host, name, .. } => TargetKey::Attribute(*host, Rc::clone(name)),
            Self::RecomputeEffects { source, .. } => match source {
                ReactiveSource::Signal(signal) => TargetKey::Signal(*signal),
                ReactiveSource::Store { store, .. } => TargetKey::Store(*store),
            },
            Self::DrainBarrier => TargetKey::None,
        }
    }

    /// Code unit referenced by this work, if any.
    #[must_use]
    pub fn code(&self) -> Option<&CodeRef> {
        match self {
            Self::ResolveCode { code, .. }
            | Self::InvokeCode { code, .. }
            | Self::EvaluateComponent { code, .. } => Some(code),
            Self::Task(task) | Self::Visible(task) | Self::CleanupVisible(task) => Some(&task.code),
            Self::Reconcile { .. }
            | Self::WriteAttribute { .. }
            | Self::RecomputeEffects { .. }
            | Self::DrainBarrier => None,
        }
    }

    /// Task descriptor for task-shaped work.
    #[must_use]
    pub fn task(&self) -> Option<&TaskRef> {
        match self {
            Self::Task(task) | Self::Visible(task) | Self::CleanupVisible(task) => Some(task),
            _ => None,
        }
    }

    /// True when both carry the same payload reference.
    ///
    /// Shared payloads compare by `Rc` identity; inline descriptors by value.
    #[must_use]
    pub fn same_payload(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvokeCode { args: a, .. }, Self::InvokeCode { args: b, .. }) => Rc::ptr_eq(a, b),
            (Self::Reconcile { render: a, .. }, Self::Reconcile { render: b, .. }) => {
                Rc::ptr_eq(a, b)
            }
            (Self::WriteAttribute { value: a, .. }, Self::WriteAttribute { value: b, .. }) => {
                Rc::ptr_eq(a, b)
            }
            (
                Self::EvaluateComponent { props: a, .. },
                Self::EvaluateComponent { props: b, .. },
            ) => Rc::ptr_eq(a, b),
            (Self::RecomputeEffects { batch: a, .. }, Self::RecomputeEffects { batch: b, .. }) => {
                Rc::ptr_eq(a, b)
            }
            (Self::Task(a), Self::Task(b))
            | (Self::Visible(a), Self::Visible(b))
            | (Self::CleanupVisible(a), Self::CleanupVisible(b)) => a == b,
            (Self::ResolveCode { code: a, .. }, Self::ResolveCode { code: b, .. }) => a == b,
            (Self::DrainBarrier, Self::DrainBarrier) => true,
            _ => false,
        }
    }
}

/// Lifecycle state of a chore. Terminal states are `Done` and `Failed`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ChoreState {
    /// Created but not started.
    Pending,
    /// Started; a deferred result is outstanding.
    Running,
    /// Finished successfully (or skipped).
    Done,
    /// Finished with an error.
    Failed,
}

impl ChoreState {
    /// True for `Done` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Scheduler-side record of a chore.
#[derive(Debug)]
pub(crate) struct Chore {
    pub(crate) work: ChoreWork,
    pub(crate) state: ChoreState,
    /// Parked chores waiting on this one.
    pub(crate) blocked_dependents: Vec<ChoreId>,
    pub(crate) started_at: Option<Instant>,
    pub(crate) ended_at: Option<Instant>,
    pub(crate) handle: ChoreHandle,
    /// Handles of identical chores coalesced into this one.
    pub(crate) merged: Vec<ChoreHandle>,
}

impl Chore {
    pub(crate) fn new(work: ChoreWork, handle: ChoreHandle) -> Self {
        Self {
            work,
            state: ChoreState::Pending,
            blocked_dependents: Vec::new(),
            started_at: None,
            ended_at: None,
            handle,
            merged: Vec::new(),
        }
    }

    pub(crate) fn kind(&self) -> ChoreKind {
        self.work.kind()
    }

    pub(crate) fn owner(&self) -> Option<HostId> {
        self.work.owner()
    }

    /// Folds `other` into `self`: adopts its payload when the reference
    /// differs, keeps its handles so they settle together and takes over the
    /// chores parked behind it.
    pub(crate) fn absorb(&mut self, other: Self) {
        if !self.work.same_payload(&other.work) {
            self.work = other.work;
        }
        self.merged.push(other.handle);
        self.merged.extend(other.merged);
        self.blocked_dependents.extend(other.blocked_dependents);
    }

    pub(crate) fn summary(&self, id: ChoreId) -> ChoreSummary {
        ChoreSummary {
            id,
            kind: self.kind(),
            owner: self.owner(),
            index: self.work.seq_index(),
            state: self.state,
        }
    }
}

/// Read-only snapshot of a chore, for introspection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChoreSummary {
    /// Arena id.
    pub id: ChoreId,
    /// Chore kind.
    pub kind: ChoreKind,
    /// Owning host.
    pub owner: Option<HostId>,
    /// Declaration index.
    pub index: SeqIndex,
    /// Lifecycle state.
    pub state: ChoreState,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: u32, host: u32, index: u32) -> TaskRef {
        TaskRef {
            id: TaskId(id),
            host: HostId(host),
            index,
            code: CodeRef::new("task_body"),
            flavor: TaskFlavor::Task,
        }
    }

    #[test]
    fn derived_fields_follow_the_variant() {
        let work = ChoreWork::Task(task(4, 2, 3));
        assert_eq!(work.kind(), ChoreKind::Task);
        assert_eq!(work.owner(), Some(HostId(2)));
        assert_eq!(work.seq_index(), SeqIndex::Position(3));
        assert_eq!(work.target(), TargetKey::Task(TaskId(4)));

        let attr = ChoreWork::WriteAttribute {
            host: HostId(1),
            name: Rc::from("class"),
            value: Rc::new(Value::from("on")),
        };
        assert_eq!(attr.seq_index().ordinal(), -1);
        assert_eq!(attr.target(), TargetKey::Attribute(HostId(1), Rc::from("class")));
        assert_eq!(ChoreWork::DrainBarrier.owner(), None);
    }

    #[test]
    fn payload_identity_is_reference_identity() {
        let render = Rc::new(Value::from(1));
        let a = ChoreWork::Reconcile { host: HostId(1), render: Rc::clone(&render) };
        let b = ChoreWork::Reconcile { host: HostId(1), render };
        let c = ChoreWork::Reconcile { host: HostId(1), render: Rc::new(Value::from(1)) };
        assert!(a.same_payload(&b));
        assert!(!a.same_payload(&c));
    }

    #[test]
    fn absorb_keeps_handles_and_replaces_payload() {
        let first = ChoreWork::Reconcile { host: HostId(1), render: Rc::new(Value::from("a")) };
        let second_render = Rc::new(Value::from("b"));
        let second = ChoreWork::Reconcile { host: HostId(1), render: Rc::clone(&second_render) };
        let mut chore = Chore::new(first, ChoreHandle::new(ChoreKind::Reconcile));
        chore.absorb(Chore::new(second, ChoreHandle::new(ChoreKind::Reconcile)));
        assert_eq!(chore.merged.len(), 1);
        match &chore.work {
            ChoreWork::Reconcile { render, .. } => assert!(Rc::ptr_eq(render, &second_render)),
            other => unreachable!("unexpected work {other:?}"),
        }
    }

    #[test]
    fn absorb_takes_over_parked_dependents() {
        let waiter = |index| ChoreId { index, generation: 0 };
        let mut kept = Chore::new(ChoreWork::Task(task(1, 2, 0)), ChoreHandle::new(ChoreKind::Task));
        kept.blocked_dependents.push(waiter(7));
        let mut folded = Chore::new(ChoreWork::Task(task(1, 2, 0)), ChoreHandle::new(ChoreKind::Task));
        folded.blocked_dependents.push(waiter(9));
        kept.absorb(folded);
        assert_eq!(kept.blocked_dependents, [waiter(7), waiter(9)]);
    }
}

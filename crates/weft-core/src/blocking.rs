// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Blocking rules: which chores must wait for which.
//!
//! A candidate is checked once when it is scheduled (and again when a blocker
//! releases it). The first match wins; there is no ranking between several
//! possible blockers. Visible chores get a second, narrower check during the
//! drain against chores that are still running.
use rustc_hash::FxHashMap;

use crate::arena::ChoreArena;
use crate::chore::{Chore, ChoreWork};
use crate::host::{HostTree, SeqEntry};
use crate::ident::{ChoreId, HostId};
use crate::kind::ChoreKind;
use crate::queue::WorkQueue;

type MatchFn = fn(&ChoreWork, &ChoreWork, &dyn HostTree) -> bool;

/// `blocking` must finish before a chore of any `blocked` kind may run,
/// whenever `matches(blocked, blocking)` holds.
pub(crate) struct BlockingRule {
    pub(crate) blocked: &'static [ChoreKind],
    pub(crate) blocking: ChoreKind,
    pub(crate) matches: MatchFn,
}

pub(crate) const RULES: &[BlockingRule] = &[
    BlockingRule {
        blocked: &[ChoreKind::InvokeCode, ChoreKind::Task, ChoreKind::Visible],
        blocking: ChoreKind::ResolveCode,
        matches: same_owner_same_code,
    },
    BlockingRule {
        blocked: &[ChoreKind::Reconcile, ChoreKind::WriteAttribute],
        blocking: ChoreKind::EvaluateComponent,
        matches: same_owner,
    },
    BlockingRule {
        blocked: &[ChoreKind::Visible],
        blocking: ChoreKind::EvaluateComponent,
        matches: related_owners,
    },
    BlockingRule {
        blocked: &[ChoreKind::Visible],
        blocking: ChoreKind::Reconcile,
        matches: related_owners,
    },
    BlockingRule {
        blocked: &[ChoreKind::Task],
        blocking: ChoreKind::Task,
        matches: previous_task,
    },
];

fn same_owner(blocked: &ChoreWork, blocking: &ChoreWork, _tree: &dyn HostTree) -> bool {
    blocked.owner().is_some() && blocked.owner() == blocking.owner()
}

fn same_owner_same_code(blocked: &ChoreWork, blocking: &ChoreWork, tree: &dyn HostTree) -> bool {
    same_owner(blocked, blocking, tree)
        && matches!((blocked.code(), blocking.code()), (Some(a), Some(b)) if a.same_unit(b))
}

/// Ancestor or descendant, the host itself included; never siblings.
fn related_owners(blocked: &ChoreWork, blocking: &ChoreWork, tree: &dyn HostTree) -> bool {
    match (blocked.owner(), blocking.owner()) {
        (Some(a), Some(b)) => tree.contains(a, b) || tree.contains(b, a),
        _ => false,
    }
}

/// The blocking task is the nearest task declared before the blocked one.
fn previous_task(blocked: &ChoreWork, blocking: &ChoreWork, tree: &dyn HostTree) -> bool {
    let (Some(later), Some(earlier)) = (blocked.task(), blocking.task()) else {
        return false;
    };
    if later.host != earlier.host || later.index == 0 || earlier.index >= later.index {
        return false;
    }
    (0..later.index)
        .rev()
        .find_map(|i| match tree.sequence_entry(later.host, i) {
            Some(SeqEntry::Task(id)) => Some(id),
            _ => None,
        })
        .is_some_and(|id| id == earlier.id)
}

/// Borrowed view over every collection a blocker can live in.
pub(crate) struct Pools<'a> {
    pub(crate) arena: &'a ChoreArena,
    pub(crate) queue: &'a WorkQueue,
    pub(crate) parked: &'a [ChoreId],
    pub(crate) running: &'a [ChoreId],
    pub(crate) owner_queued: &'a FxHashMap<HostId, Vec<ChoreId>>,
    pub(crate) owner_parked: &'a FxHashMap<HostId, Vec<ChoreId>>,
    /// Chores that never count as blockers: those already waiting, directly
    /// or not, on the candidate.
    pub(crate) exclude: &'a [ChoreId],
}

impl Pools<'_> {
    fn live(&self, id: ChoreId) -> Option<&Chore> {
        if self.exclude.contains(&id) {
            return None;
        }
        self.arena.get(id).filter(|c| !c.state.is_terminal())
    }

    fn pre_flush_on(&self, host: HostId) -> Option<ChoreId> {
        [self.owner_queued, self.owner_parked]
            .into_iter()
            .filter_map(|mirror| mirror.get(&host))
            .flatten()
            .copied()
            .find(|id| self.live(*id).is_some_and(|c| c.kind().is_pre_flush()))
    }

    /// Pre-flush work queued, parked or running on a strict ancestor or a
    /// strict descendant of the candidate's owner holds the candidate back,
    /// whatever its kind.
    fn structural_relative(&self, work: &ChoreWork, tree: &dyn HostTree) -> Option<ChoreId> {
        let owner = work.owner()?;
        let mut cursor = tree.parent(owner);
        while let Some(ancestor) = cursor {
            if let Some(found) = self.pre_flush_on(ancestor) {
                return Some(found);
            }
            cursor = tree.parent(ancestor);
        }
        let mut below: Vec<HostId> = self
            .owner_queued
            .keys()
            .chain(self.owner_parked.keys())
            .copied()
            .filter(|host| *host != owner && tree.contains(owner, *host))
            .collect();
        below.sort_unstable_by(|a, b| tree.document_position(*a, *b));
        below.dedup();
        below.into_iter().find_map(|host| self.pre_flush_on(host))
    }

    fn first_rule_match<'r>(
        &self,
        work: &ChoreWork,
        mut candidates: impl Iterator<Item = ChoreId>,
        rules: impl Iterator<Item = &'r BlockingRule> + Clone,
        tree: &dyn HostTree,
    ) -> Option<ChoreId> {
        let kind = work.kind();
        candidates.find(|id| {
            self.live(*id).is_some_and(|other| {
                rules.clone().any(|rule| {
                    rule.blocking == other.kind()
                        && rule.blocked.contains(&kind)
                        && (rule.matches)(work, &other.work, tree)
                })
            })
        })
    }
}

/// Finds a chore `work` has to wait for, if any.
pub(crate) fn find_blocking_chore(
    work: &ChoreWork,
    pools: &Pools<'_>,
    tree: &dyn HostTree,
) -> Option<ChoreId> {
    if let Some(found) = pools.structural_relative(work, tree) {
        return Some(found);
    }
    let candidates = pools
        .queue
        .iter()
        .chain(pools.parked.iter().copied())
        .chain(pools.running.iter().copied());
    pools.first_rule_match(work, candidates, RULES.iter(), tree)
}

/// Running-only check for a visible chore about to execute.
pub(crate) fn find_blocking_chore_for_visible(
    work: &ChoreWork,
    pools: &Pools<'_>,
    tree: &dyn HostTree,
) -> Option<ChoreId> {
    let rules = RULES.iter().filter(|r| {
        r.blocked.contains(&ChoreKind::Visible)
            && matches!(r.blocking, ChoreKind::EvaluateComponent | ChoreKind::Reconcile)
    });
    pools.first_rule_match(work, pools.running.iter().copied(), rules, tree)
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::chore::{ChoreState, TaskFlavor, TaskRef, Value};
    use crate::completion::ChoreHandle;
    use crate::host::VNodeTree;
    use crate::ident::{CodeRef, TaskId};

    #[derive(Default)]
    struct Fixture {
        arena: ChoreArena,
        queue: WorkQueue,
        parked: Vec<ChoreId>,
        running: Vec<ChoreId>,
        owner_queued: FxHashMap<HostId, Vec<ChoreId>>,
        owner_parked: FxHashMap<HostId, Vec<ChoreId>>,
        exclude: Vec<ChoreId>,
    }

    impl Fixture {
        fn queue(&mut self, work: ChoreWork, tree: &dyn HostTree) -> ChoreId {
            let owner = work.owner();
            let kind = work.kind();
            let (id, _) = self.queue.add(Chore::new(work, ChoreHandle::new(kind)), &mut self.arena, tree);
            if let Some(owner) = owner {
                self.owner_queued.entry(owner).or_default().push(id);
            }
            id
        }

        fn run(&mut self, work: ChoreWork) -> ChoreId {
            let owner = work.owner();
            let kind = work.kind();
            let mut chore = Chore::new(work, ChoreHandle::new(kind));
            chore.state = ChoreState::Running;
            let id = self.arena.insert(chore);
            self.running.push(id);
            if let Some(owner) = owner {
                self.owner_queued.entry(owner).or_default().push(id);
            }
            id
        }

        fn pools(&self) -> Pools<'_> {
            Pools {
                arena: &self.arena,
                queue: &self.queue,
                parked: &self.parked,
                running: &self.running,
                owner_queued: &self.owner_queued,
                owner_parked: &self.owner_parked,
                exclude: &self.exclude,
            }
        }
    }

    fn task_ref(id: u32, host: HostId, index: u32, flavor: TaskFlavor) -> TaskRef {
        TaskRef { id: TaskId(id), host, index, code: CodeRef::new("body"), flavor }
    }

    fn reconcile(host: HostId) -> ChoreWork {
        ChoreWork::Reconcile { host, render: Rc::new(Value::Null) }
    }

    #[test]
    fn visible_waits_for_reconcile_on_ancestor_but_not_sibling() {
        let tree = VNodeTree::new();
        let parent = tree.append_child(tree.root());
        let child = tree.append_child(parent);
        let sibling = tree.append_child(tree.root());
        let mut fx = Fixture::default();
        let blocker = fx.queue(reconcile(parent), &tree);

        let on_child = ChoreWork::Visible(task_ref(1, child, 0, TaskFlavor::Visible));
        let on_sibling = ChoreWork::Visible(task_ref(2, sibling, 0, TaskFlavor::Visible));
        assert_eq!(find_blocking_chore(&on_child, &fx.pools(), &tree), Some(blocker));
        assert_eq!(find_blocking_chore(&on_sibling, &fx.pools(), &tree), None);
    }

    #[test]
    fn visible_on_ancestor_waits_for_descendant_component() {
        let tree = VNodeTree::new();
        let parent = tree.append_child(tree.root());
        let child = tree.append_child(parent);
        let mut fx = Fixture::default();
        let blocker = fx.run(ChoreWork::EvaluateComponent {
            host: child,
            code: CodeRef::new("Child"),
            props: Rc::new(Value::Null),
        });
        let on_parent = ChoreWork::Visible(task_ref(1, parent, 0, TaskFlavor::Visible));
        assert_eq!(find_blocking_chore(&on_parent, &fx.pools(), &tree), Some(blocker));
        assert_eq!(find_blocking_chore_for_visible(&on_parent, &fx.pools(), &tree), Some(blocker));
    }

    #[test]
    fn narrow_visible_check_ignores_queued_chores() {
        let tree = VNodeTree::new();
        let host = tree.append_child(tree.root());
        let mut fx = Fixture::default();
        fx.queue(reconcile(host), &tree);
        let visible = ChoreWork::Visible(task_ref(1, host, 0, TaskFlavor::Visible));
        assert_eq!(find_blocking_chore_for_visible(&visible, &fx.pools(), &tree), None);
    }

    #[test]
    fn component_blocks_reconcile_and_attributes_on_same_owner_only() {
        let tree = VNodeTree::new();
        let a = tree.append_child(tree.root());
        let b = tree.append_child(tree.root());
        let mut fx = Fixture::default();
        let component = fx.queue(
            ChoreWork::EvaluateComponent { host: a, code: CodeRef::new("A"), props: Rc::new(Value::Null) },
            &tree,
        );
        let attr = ChoreWork::WriteAttribute { host: a, name: Rc::from("title"), value: Rc::new(Value::Null) };
        assert_eq!(find_blocking_chore(&reconcile(a), &fx.pools(), &tree), Some(component));
        assert_eq!(find_blocking_chore(&attr, &fx.pools(), &tree), Some(component));
        assert_eq!(find_blocking_chore(&reconcile(b), &fx.pools(), &tree), None);
    }

    #[test]
    fn resolve_code_blocks_invocation_of_the_same_unit() {
        let tree = VNodeTree::new();
        let a = tree.append_child(tree.root());
        let mut fx = Fixture::default();
        let resolve = fx.queue(ChoreWork::ResolveCode { owner: Some(a), code: CodeRef::new("onClick") }, &tree);
        let invoke = |name: &str| ChoreWork::InvokeCode {
            owner: Some(a),
            code: CodeRef::new(name),
            args: Rc::from(Vec::new()),
        };
        assert_eq!(find_blocking_chore(&invoke("onClick"), &fx.pools(), &tree), Some(resolve));
        assert_eq!(find_blocking_chore(&invoke("onHover"), &fx.pools(), &tree), None);
    }

    #[test]
    fn task_waits_for_the_previously_declared_task() {
        let tree = VNodeTree::new();
        let host = tree.append_child(tree.root());
        tree.declare(host, SeqEntry::Task(TaskId(10)));
        tree.declare(host, SeqEntry::Other);
        tree.declare(host, SeqEntry::Task(TaskId(12)));
        tree.declare(host, SeqEntry::Task(TaskId(13)));
        let mut fx = Fixture::default();
        let first = fx.queue(ChoreWork::Task(task_ref(10, host, 0, TaskFlavor::Task)), &tree);

        let third = ChoreWork::Task(task_ref(12, host, 2, TaskFlavor::Task));
        assert_eq!(find_blocking_chore(&third, &fx.pools(), &tree), Some(first));
        // Index 3 follows task 12, not task 10.
        let fourth = ChoreWork::Task(task_ref(13, host, 3, TaskFlavor::Task));
        assert_eq!(find_blocking_chore(&fourth, &fx.pools(), &tree), None);
        // Index 0 is never blocked by a sibling task.
        let again = ChoreWork::Task(task_ref(10, host, 0, TaskFlavor::Task));
        assert_eq!(find_blocking_chore(&again, &fx.pools(), &tree), None);
    }

    #[test]
    fn structural_work_on_an_ancestor_blocks_pre_flush_descendants() {
        let tree = VNodeTree::new();
        let parent = tree.append_child(tree.root());
        let child = tree.append_child(parent);
        let mut fx = Fixture::default();
        let blocker = fx.run(reconcile(parent));
        let task = ChoreWork::Task(task_ref(1, child, 0, TaskFlavor::Task));
        assert_eq!(find_blocking_chore(&task, &fx.pools(), &tree), Some(blocker));
        // The ancestor's own work is not held back by it.
        let own = ChoreWork::Task(task_ref(2, parent, 0, TaskFlavor::Task));
        assert_eq!(find_blocking_chore(&own, &fx.pools(), &tree), None);
    }

    #[test]
    fn running_task_on_an_ancestor_blocks_every_kind_below_it() {
        let tree = VNodeTree::new();
        let parent = tree.append_child(tree.root());
        let child = tree.append_child(parent);
        let sibling = tree.append_child(tree.root());
        let mut fx = Fixture::default();
        let blocker = fx.run(ChoreWork::Task(task_ref(1, parent, 0, TaskFlavor::Task)));

        let task = ChoreWork::Task(task_ref(2, child, 0, TaskFlavor::Task));
        let cleanup = ChoreWork::CleanupVisible(task_ref(3, child, 1, TaskFlavor::Visible));
        let elsewhere = ChoreWork::Task(task_ref(4, sibling, 0, TaskFlavor::Task));
        assert_eq!(find_blocking_chore(&task, &fx.pools(), &tree), Some(blocker));
        assert_eq!(find_blocking_chore(&cleanup, &fx.pools(), &tree), Some(blocker));
        assert_eq!(find_blocking_chore(&elsewhere, &fx.pools(), &tree), None);
    }

    #[test]
    fn pre_flush_work_on_a_descendant_blocks_the_ancestor() {
        let tree = VNodeTree::new();
        let parent = tree.append_child(tree.root());
        let child = tree.append_child(parent);
        let grandchild = tree.append_child(child);
        let mut fx = Fixture::default();
        fx.queue(ChoreWork::Visible(task_ref(1, child, 0, TaskFlavor::Visible)), &tree);
        let below = fx.queue(
            ChoreWork::ResolveCode { owner: Some(grandchild), code: CodeRef::new("chunk") },
            &tree,
        );

        // Visible work does not count; the resolution two levels down does.
        let on_parent = ChoreWork::Task(task_ref(2, parent, 0, TaskFlavor::Task));
        assert_eq!(find_blocking_chore(&on_parent, &fx.pools(), &tree), Some(below));
        let on_root = reconcile(tree.root());
        assert_eq!(find_blocking_chore(&on_root, &fx.pools(), &tree), Some(below));
    }

    #[test]
    fn excluded_chores_never_block() {
        let tree = VNodeTree::new();
        let parent = tree.append_child(tree.root());
        let child = tree.append_child(parent);
        let mut fx = Fixture::default();
        let waiting = fx.queue(reconcile(parent), &tree);
        let task = ChoreWork::Task(task_ref(1, child, 0, TaskFlavor::Task));
        assert_eq!(find_blocking_chore(&task, &fx.pools(), &tree), Some(waiting));

        fx.exclude.push(waiting);
        assert_eq!(find_blocking_chore(&task, &fx.pools(), &tree), None);
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Always-sorted work queue with coalescing insert.
use std::cmp::Ordering;
use std::collections::VecDeque;

use crate::arena::ChoreArena;
use crate::chore::{Chore, ChoreWork};
use crate::host::HostTree;
use crate::ident::ChoreId;
use crate::ordering::{compare_chores, compare_position};

/// Pending chores in comparator order; the front is the next chore to run.
#[derive(Debug, Default)]
pub(crate) struct WorkQueue {
    items: VecDeque<ChoreId>,
}

impl WorkQueue {
    /// Binary search for `work`.
    ///
    /// `Ok(i)` is an exact match (coalesce point); `Err(i)` is the insertion
    /// point. A miss also scans back over the run sharing `work`'s sort
    /// position, where FIFO-ordered distinct targets can hide a match.
    pub(crate) fn locate(
        &self,
        work: &ChoreWork,
        arena: &ChoreArena,
        tree: &dyn HostTree,
    ) -> Result<usize, usize> {
        let at = |i: usize| arena.get(self.items[i]).map(|c| &c.work);
        let (mut lo, mut hi) = (0, self.items.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let Some(existing) = at(mid) else {
                lo = mid + 1;
                continue;
            };
            match compare_chores(work, existing, tree) {
                Ordering::Less => hi = mid,
                Ordering::Greater => lo = mid + 1,
                Ordering::Equal => return Ok(mid),
            }
        }
        for i in (0..lo).rev() {
            let Some(existing) = at(i) else { break };
            if compare_position(work, existing, tree) != Ordering::Equal {
                break;
            }
            if compare_chores(work, existing, tree) == Ordering::Equal {
                return Ok(i);
            }
        }
        Err(lo)
    }

    /// Inserts `chore`, or folds it into an equal queued chore.
    ///
    /// Returns the id now representing the work and `Ok(match index)` when it
    /// coalesced, `Err(insertion index)` when it was spliced in.
    pub(crate) fn add(
        &mut self,
        chore: Chore,
        arena: &mut ChoreArena,
        tree: &dyn HostTree,
    ) -> (ChoreId, Result<usize, usize>) {
        match self.locate(&chore.work, arena, tree) {
            Ok(i) => {
                let id = self.items[i];
                if let Some(existing) = arena.get_mut(id) {
                    existing.absorb(chore);
                }
                (id, Ok(i))
            }
            Err(i) => {
                let id = arena.insert(chore);
                self.items.insert(i, id);
                (id, Err(i))
            }
        }
    }

    pub(crate) fn pop_front(&mut self) -> Option<ChoreId> {
        self.items.pop_front()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = ChoreId> + '_ {
        self.items.iter().copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Identity-based removal from an unsorted id list (owner mirrors, parked set).
pub(crate) fn remove_id(list: &mut Vec<ChoreId>, id: ChoreId) -> bool {
    match list.iter().position(|c| *c == id) {
        Some(i) => {
            list.remove(i);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::chore::{ChoreWork, TaskFlavor, TaskRef, Value};
    use crate::completion::ChoreHandle;
    use crate::host::VNodeTree;
    use crate::ident::{CodeRef, HostId, TaskId};

    fn chore(work: ChoreWork) -> Chore {
        let kind = work.kind();
        Chore::new(work, ChoreHandle::new(kind))
    }

    fn task(id: u32, host: HostId, index: u32) -> ChoreWork {
        ChoreWork::Task(TaskRef {
            id: TaskId(id),
            host,
            index,
            code: CodeRef::new("body"),
            flavor: TaskFlavor::Task,
        })
    }

    fn order(queue: &WorkQueue, arena: &ChoreArena) -> Vec<(HostId, u32)> {
        queue
            .iter()
            .filter_map(|id| arena.get(id))
            .filter_map(|c| c.work.task().map(|t| (t.host, t.index)))
            .collect()
    }

    #[test]
    fn inserts_keep_comparator_order() {
        let tree = VNodeTree::new();
        let a = tree.append_child(tree.root());
        let b = tree.append_child(tree.root());
        let mut arena = ChoreArena::default();
        let mut queue = WorkQueue::default();
        for work in [task(1, b, 2), task(2, a, 0), task(3, b, 0)] {
            let (_, at) = queue.add(chore(work), &mut arena, &tree);
            assert!(at.is_err());
        }
        assert_eq!(order(&queue, &arena), vec![(a, 0), (b, 0), (b, 2)]);
    }

    #[test]
    fn equal_chores_coalesce_with_the_newest_payload() {
        let tree = VNodeTree::new();
        let a = tree.append_child(tree.root());
        let mut arena = ChoreArena::default();
        let mut queue = WorkQueue::default();
        let first = ChoreWork::Reconcile { host: a, render: Rc::new(Value::from("v1")) };
        let latest = Rc::new(Value::from("v2"));
        let second = ChoreWork::Reconcile { host: a, render: Rc::clone(&latest) };
        let (id1, at1) = queue.add(chore(first), &mut arena, &tree);
        let (id2, at2) = queue.add(chore(second), &mut arena, &tree);
        assert_eq!(at1, Err(0));
        assert_eq!(at2, Ok(0));
        assert_eq!(id1, id2);
        assert_eq!(queue.len(), 1);
        assert_eq!(arena.len(), 1);
        let stored = arena.get(id1).map(|c| c.work.clone());
        assert!(matches!(stored, Some(ChoreWork::Reconcile { render, .. }) if Rc::ptr_eq(&render, &latest)));
    }

    #[test]
    fn match_hidden_behind_fifo_run_is_found() {
        let tree = VNodeTree::new();
        let a = tree.append_child(tree.root());
        let mut arena = ChoreArena::default();
        let mut queue = WorkQueue::default();
        // Same owner and index, distinct targets: kept in FIFO order.
        let _ = queue.add(chore(task(1, a, 0)), &mut arena, &tree);
        let _ = queue.add(chore(task(2, a, 0)), &mut arena, &tree);
        let _ = queue.add(chore(task(3, a, 0)), &mut arena, &tree);
        let (_, at) = queue.add(chore(task(1, a, 0)), &mut arena, &tree);
        assert_eq!(at, Ok(0));
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn remove_id_is_identity_based() {
        let mut arena = ChoreArena::default();
        let x = arena.insert(chore(ChoreWork::DrainBarrier));
        let y = arena.insert(chore(ChoreWork::DrainBarrier));
        let mut list = vec![x, y];
        assert!(remove_id(&mut list, x));
        assert!(!remove_id(&mut list, x));
        assert_eq!(list, vec![y]);
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Host trees: the structure chores are anchored to.
//!
//! The scheduler only needs tree *position* (depth-first pre-order), ancestry,
//! liveness and each host's declared sequence. Two interchangeable
//! representations provide them:
//! - [`VNodeTree`]: the live client tree; positions are derived from
//!   child-index paths on demand.
//! - [`ShadowTree`]: pre-render server nodes; positions are fixed at creation
//!   and hosts become non-updatable once streamed.
use std::cell::RefCell;
use std::cmp::Ordering;

use crate::ident::{HostId, TaskId};

/// One slot in a host's declared sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeqEntry {
    /// A plain task or resource.
    Task(TaskId),
    /// A visible task.
    Visible(TaskId),
    /// Anything else declared on the host (signals, computed values, ...).
    Other,
}

/// Read-only view of a host tree used for ordering and blocking decisions.
pub trait HostTree {
    /// Parent of `host`, or `None` for a root or unknown host.
    fn parent(&self, host: HostId) -> Option<HostId>;

    /// Depth-first pre-order comparison of two hosts.
    fn document_position(&self, a: HostId, b: HostId) -> Ordering;

    /// Inclusive ancestor test: true when `host` is `ancestor` or below it.
    fn contains(&self, ancestor: HostId, host: HostId) -> bool {
        let mut cursor = Some(host);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// True once the host was removed from the tree.
    fn is_deleted(&self, host: HostId) -> bool;

    /// False once the host can no longer be mutated (already streamed).
    fn is_updatable(&self, _host: HostId) -> bool {
        true
    }

    /// Entry at `index` of the host's declared sequence.
    fn sequence_entry(&self, host: HostId, index: u32) -> Option<SeqEntry>;
}

#[derive(Debug, Default)]
struct VNode {
    parent: Option<HostId>,
    children: Vec<HostId>,
    deleted: bool,
    sequence: Vec<SeqEntry>,
}

/// Live client tree.
#[derive(Debug)]
pub struct VNodeTree {
    nodes: RefCell<Vec<VNode>>,
}

impl Default for VNodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl VNodeTree {
    /// Creates a tree containing only the root host.
    pub fn new() -> Self {
        Self {
            nodes: RefCell::new(vec![VNode::default()]),
        }
    }

    /// The root host.
    pub fn root(&self) -> HostId {
        HostId(0)
    }

    /// Appends a new last child under `parent`.
    pub fn append_child(&self, parent: HostId) -> HostId {
        let mut nodes = self.nodes.borrow_mut();
        let id = next_id(nodes.len());
        nodes.push(VNode {
            parent: Some(parent),
            ..VNode::default()
        });
        if let Some(p) = nodes.get_mut(parent.0 as usize) {
            p.children.push(id);
        }
        id
    }

    /// Removes `host` and its whole subtree.
    pub fn remove(&self, host: HostId) {
        let mut nodes = self.nodes.borrow_mut();
        let mut stack = vec![host];
        while let Some(current) = stack.pop() {
            if let Some(node) = nodes.get_mut(current.0 as usize) {
                node.deleted = true;
                stack.extend(node.children.iter().copied());
            }
        }
    }

    /// Appends `entry` to the host's declared sequence and returns its index.
    pub fn declare(&self, host: HostId, entry: SeqEntry) -> u32 {
        let mut nodes = self.nodes.borrow_mut();
        nodes
            .get_mut(host.0 as usize)
            .map_or(0, |node| push_entry(&mut node.sequence, entry))
    }

    fn path(&self, host: HostId) -> Vec<usize> {
        let nodes = self.nodes.borrow();
        let mut path = Vec::new();
        let mut cursor = host;
        while let Some(parent) = nodes.get(cursor.0 as usize).and_then(|n| n.parent) {
            let slot = nodes
                .get(parent.0 as usize)
                .and_then(|p| p.children.iter().position(|c| *c == cursor))
                .unwrap_or(usize::MAX);
            path.push(slot);
            cursor = parent;
        }
        path.reverse();
        path
    }
}

impl HostTree for VNodeTree {
    fn parent(&self, host: HostId) -> Option<HostId> {
        self.nodes.borrow().get(host.0 as usize).and_then(|n| n.parent)
    }

    fn document_position(&self, a: HostId, b: HostId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        self.path(a).cmp(&self.path(b))
    }

    fn is_deleted(&self, host: HostId) -> bool {
        self.nodes
            .borrow()
            .get(host.0 as usize)
            .is_some_and(|n| n.deleted)
    }

    fn sequence_entry(&self, host: HostId, index: u32) -> Option<SeqEntry> {
        self.nodes
            .borrow()
            .get(host.0 as usize)
            .and_then(|n| n.sequence.get(index as usize).copied())
    }
}

#[derive(Debug, Default)]
struct ShadowNode {
    parent: Option<HostId>,
    children: Vec<HostId>,
    /// Positional path, fixed at creation.
    position: Vec<u32>,
    deleted: bool,
    streamed: bool,
    sequence: Vec<SeqEntry>,
}

/// Pre-render server tree.
#[derive(Debug)]
pub struct ShadowTree {
    nodes: RefCell<Vec<ShadowNode>>,
}

impl Default for ShadowTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ShadowTree {
    /// Creates a tree containing only the root host.
    pub fn new() -> Self {
        Self {
            nodes: RefCell::new(vec![ShadowNode::default()]),
        }
    }

    /// The root host.
    pub fn root(&self) -> HostId {
        HostId(0)
    }

    /// Creates a child of `parent`, positioned after its existing children.
    pub fn create_child(&self, parent: HostId) -> HostId {
        let mut nodes = self.nodes.borrow_mut();
        let id = next_id(nodes.len());
        let position = match nodes.get_mut(parent.0 as usize) {
            Some(p) => {
                let slot = u32::try_from(p.children.len()).unwrap_or(u32::MAX);
                p.children.push(id);
                let mut position = p.position.clone();
                position.push(slot);
                position
            }
            None => Vec::new(),
        };
        nodes.push(ShadowNode {
            parent: Some(parent),
            position,
            ..ShadowNode::default()
        });
        id
    }

    /// Marks `host` and its subtree as flushed to the client.
    pub fn mark_streamed(&self, host: HostId) {
        self.visit_subtree(host, |n| n.streamed = true);
    }

    /// Removes `host` and its subtree.
    pub fn remove(&self, host: HostId) {
        self.visit_subtree(host, |n| n.deleted = true);
    }

    /// Appends `entry` to the host's declared sequence and returns its index.
    pub fn declare(&self, host: HostId, entry: SeqEntry) -> u32 {
        let mut nodes = self.nodes.borrow_mut();
        nodes
            .get_mut(host.0 as usize)
            .map_or(0, |node| push_entry(&mut node.sequence, entry))
    }

    fn visit_subtree(&self, host: HostId, mut f: impl FnMut(&mut ShadowNode)) {
        let mut nodes = self.nodes.borrow_mut();
        let mut stack = vec![host];
        while let Some(current) = stack.pop() {
            if let Some(node) = nodes.get_mut(current.0 as usize) {
                f(node);
                stack.extend(node.children.iter().copied());
            }
        }
    }
}

impl HostTree for ShadowTree {
    fn parent(&self, host: HostId) -> Option<HostId> {
        self.nodes.borrow().get(host.0 as usize).and_then(|n| n.parent)
    }

    fn document_position(&self, a: HostId, b: HostId) -> Ordering {
        let nodes = self.nodes.borrow();
        let pos = |h: HostId| nodes.get(h.0 as usize).map(|n| n.position.as_slice());
        pos(a).cmp(&pos(b))
    }

    fn is_deleted(&self, host: HostId) -> bool {
        self.nodes
            .borrow()
            .get(host.0 as usize)
            .is_some_and(|n| n.deleted)
    }

    fn is_updatable(&self, host: HostId) -> bool {
        self.nodes
            .borrow()
            .get(host.0 as usize)
            .is_none_or(|n| !n.streamed)
    }

    fn sequence_entry(&self, host: HostId, index: u32) -> Option<SeqEntry> {
        self.nodes
            .borrow()
            .get(host.0 as usize)
            .and_then(|n| n.sequence.get(index as usize).copied())
    }
}

fn next_id(len: usize) -> HostId {
    HostId(u32::try_from(len).unwrap_or(u32::MAX))
}

fn push_entry(sequence: &mut Vec<SeqEntry>, entry: SeqEntry) -> u32 {
    sequence.push(entry);
    u32::try_from(sequence.len() - 1).unwrap_or(u32::MAX)
}

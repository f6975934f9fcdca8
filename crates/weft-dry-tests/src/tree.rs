// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Host tree fixtures.
use std::rc::Rc;

use weft_core::{HostId, HostTree, SeqEntry, ShadowTree, VNodeTree};

/// Common surface of the two tree implementations used by fixtures.
pub trait FixtureTree: HostTree + 'static {
    /// The root host.
    fn root_host(&self) -> HostId;
    /// Appends a child under `parent`.
    fn add_child(&self, parent: HostId) -> HostId;
    /// Appends to the host's declared sequence.
    fn declare_entry(&self, host: HostId, entry: SeqEntry) -> u32;
}

impl FixtureTree for VNodeTree {
    fn root_host(&self) -> HostId {
        self.root()
    }

    fn add_child(&self, parent: HostId) -> HostId {
        self.append_child(parent)
    }

    fn declare_entry(&self, host: HostId, entry: SeqEntry) -> u32 {
        self.declare(host, entry)
    }
}

impl FixtureTree for ShadowTree {
    fn root_host(&self) -> HostId {
        self.root()
    }

    fn add_child(&self, parent: HostId) -> HostId {
        self.create_child(parent)
    }

    fn declare_entry(&self, host: HostId, entry: SeqEntry) -> u32 {
        self.declare(host, entry)
    }
}

/// Root with two children, `a` and `b`, and one grandchild under `a`.
#[derive(Debug)]
pub struct SmallTree<T> {
    /// The tree itself.
    pub tree: Rc<T>,
    /// Root host.
    pub root: HostId,
    /// First child of the root.
    pub a: HostId,
    /// Only child of `a`.
    pub a1: HostId,
    /// Second child of the root.
    pub b: HostId,
}

impl<T: FixtureTree + Default> SmallTree<T> {
    /// Builds the fixture.
    pub fn new() -> Self {
        let tree = Rc::new(T::default());
        let root = tree.root_host();
        let a = tree.add_child(root);
        let a1 = tree.add_child(a);
        let b = tree.add_child(root);
        Self { tree, root, a, a1, b }
    }

    /// The tree as a trait object for [`weft_core::Scheduler::builder`].
    pub fn host_tree(&self) -> Rc<dyn HostTree> {
        self.tree.clone()
    }
}

impl<T: FixtureTree + Default> Default for SmallTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Client fixture.
pub fn client_tree() -> SmallTree<VNodeTree> {
    SmallTree::new()
}

/// Server fixture.
pub fn shadow_tree() -> SmallTree<ShadowTree> {
    SmallTree::new()
}

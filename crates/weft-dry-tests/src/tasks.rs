// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Task declaration helpers.
use std::cell::Cell;

use weft_core::{CodeRef, HostId, SeqEntry, TaskFlavor, TaskId, TaskRef};

use crate::tree::FixtureTree;

/// Declares tasks on fixture hosts, allocating task ids and sequence
/// positions the way a component body would.
#[derive(Debug, Default)]
pub struct TaskDeclarer {
    next: Cell<u32>,
}

impl TaskDeclarer {
    /// Declarer starting at task id 0.
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> TaskId {
        let id = self.next.get();
        self.next.set(id + 1);
        TaskId(id)
    }

    /// Declares a plain task on `host`.
    pub fn task(&self, tree: &impl FixtureTree, host: HostId, name: &str) -> TaskRef {
        self.declare(tree, host, name, TaskFlavor::Task)
    }

    /// Declares a resource on `host`.
    pub fn resource(&self, tree: &impl FixtureTree, host: HostId, name: &str) -> TaskRef {
        self.declare(tree, host, name, TaskFlavor::Resource)
    }

    /// Declares a visible task on `host`.
    pub fn visible(&self, tree: &impl FixtureTree, host: HostId, name: &str) -> TaskRef {
        self.declare(tree, host, name, TaskFlavor::Visible)
    }

    /// Declares a non-task slot (signal, computed value) on `host`.
    pub fn other(&self, tree: &impl FixtureTree, host: HostId) -> u32 {
        tree.declare_entry(host, SeqEntry::Other)
    }

    /// Declares a task of `flavor` on `host`.
    pub fn declare(
        &self,
        tree: &impl FixtureTree,
        host: HostId,
        name: &str,
        flavor: TaskFlavor,
    ) -> TaskRef {
        let id = self.next_id();
        let entry = match flavor {
            TaskFlavor::Visible => SeqEntry::Visible(id),
            TaskFlavor::Task | TaskFlavor::Resource => SeqEntry::Task(id),
        };
        let index = tree.declare_entry(host, entry);
        TaskRef {
            id,
            host,
            index,
            code: CodeRef::new(name),
            flavor,
        }
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]

use std::cmp::Ordering;
use std::rc::Rc;

use proptest::prelude::*;
use weft_core::{
    compare_chores, ChoreWork, CodeRef, EffectBatch, HostId, ReactiveSource, SignalId, TaskFlavor,
    TaskId, TaskRef, VNodeTree, Value,
};

fn tree() -> (VNodeTree, Vec<HostId>) {
    let tree = VNodeTree::new();
    let root = tree.root();
    let a = tree.append_child(root);
    let a1 = tree.append_child(a);
    let b = tree.append_child(root);
    (tree, vec![root, a, a1, b])
}

fn task(host: HostId, index: u32, flavor: TaskFlavor) -> TaskRef {
    TaskRef {
        id: TaskId(index),
        host,
        index,
        code: CodeRef::new("task"),
        flavor,
    }
}

fn work(selector: u8, host: HostId, index: u32) -> ChoreWork {
    match selector % 10 {
        0 => ChoreWork::ResolveCode {
            owner: Some(host),
            code: CodeRef::new("code"),
        },
        1 => ChoreWork::InvokeCode {
            owner: Some(host),
            code: CodeRef::new("code"),
            args: Rc::from(Vec::new()),
        },
        2 => ChoreWork::Task(task(host, index, TaskFlavor::Task)),
        3 => ChoreWork::Reconcile {
            host,
            render: Rc::new(Value::Null),
        },
        4 => ChoreWork::WriteAttribute {
            host,
            name: Rc::from("attr"),
            value: Rc::new(Value::Null),
        },
        5 => ChoreWork::EvaluateComponent {
            host,
            code: CodeRef::new("Comp"),
            props: Rc::new(Value::Null),
        },
        6 => ChoreWork::RecomputeEffects {
            owner: Some(host),
            source: ReactiveSource::Signal(SignalId(index)),
            batch: Rc::new(EffectBatch::default()),
        },
        7 => ChoreWork::Visible(task(host, index, TaskFlavor::Visible)),
        8 => ChoreWork::CleanupVisible(task(host, index, TaskFlavor::Visible)),
        _ => ChoreWork::DrainBarrier,
    }
}

proptest! {
    #[test]
    fn band_order_dominates_position_and_target(
        sa in 0u8..10, ha in 0usize..4, ia in 0u32..4,
        sb in 0u8..10, hb in 0usize..4, ib in 0u32..4,
    ) {
        let (tree, hosts) = tree();
        let a = work(sa, hosts[ha], ia);
        let b = work(sb, hosts[hb], ib);
        let (band_a, band_b) = (a.kind().band(), b.kind().band());
        prop_assume!(band_a != band_b);
        prop_assert_eq!(compare_chores(&a, &b, &tree), band_a.cmp(&band_b));
        prop_assert_eq!(compare_chores(&b, &a, &tree), band_b.cmp(&band_a));
    }

    #[test]
    fn distinct_owners_in_one_band_follow_document_order(
        sa in 0u8..7, sb in 0u8..7, ha in 0usize..4, hb in 0usize..4,
    ) {
        let (tree, hosts) = tree();
        prop_assume!(ha != hb);
        let a = work(sa, hosts[ha], 0);
        let b = work(sb, hosts[hb], 0);
        let expected = if ha < hb { Ordering::Less } else { Ordering::Greater };
        prop_assert_eq!(compare_chores(&a, &b, &tree), expected);
    }
}

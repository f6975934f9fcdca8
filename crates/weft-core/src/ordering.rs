// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Chore comparator: the total order the work queue is kept in.
//!
//! Keys, most significant first:
//! 1. macro band of the kind
//! 2. document position of the owners, when both are set and differ
//! 3. micro level of the kind
//! 4. declaration index (named indices count as -1)
//! 5. target identity: equal targets return `Equal` (coalesce), anything else
//!    sorts after the existing chore so distinct work at one position stays FIFO
use std::cmp::Ordering;
use std::rc::Rc;

use crate::chore::{ChoreWork, ReactiveSource};
use crate::host::HostTree;

/// Compares a candidate chore `a` against an already-ordered chore `b`.
///
/// `Equal` means "same unit of work". The relation is not symmetric on the
/// final key: distinct targets at one sort position always yield `Greater`.
pub fn compare_chores(a: &ChoreWork, b: &ChoreWork, tree: &dyn HostTree) -> Ordering {
    let position = compare_position(a, b, tree);
    if position != Ordering::Equal {
        return position;
    }

    if distinct_store_batches(a, b) {
        return Ordering::Greater;
    }

    if a.target() == b.target() {
        Ordering::Equal
    } else {
        Ordering::Greater
    }
}

/// Keys 1 to 4 only: the sort position, ignoring target identity.
pub(crate) fn compare_position(a: &ChoreWork, b: &ChoreWork, tree: &dyn HostTree) -> Ordering {
    let (ka, kb) = (a.kind(), b.kind());
    let band = ka.macro_bits().cmp(&kb.macro_bits());
    if band != Ordering::Equal {
        return band;
    }

    if let (Some(oa), Some(ob)) = (a.owner(), b.owner()) {
        if oa != ob {
            let pos = tree.document_position(oa, ob);
            if pos != Ordering::Equal {
                return pos;
            }
        }
    }

    ka.micro_bits()
        .cmp(&kb.micro_bits())
        .then_with(|| a.seq_index().ordinal().cmp(&b.seq_index().ordinal()))
}

/// Effect recomputations on one store but for different properties and
/// different batches must not merge.
fn distinct_store_batches(a: &ChoreWork, b: &ChoreWork) -> bool {
    match (a, b) {
        (
            ChoreWork::RecomputeEffects {
                source: ReactiveSource::Store { property: pa, .. },
                batch: ba,
                ..
            },
            ChoreWork::RecomputeEffects {
                source: ReactiveSource::Store { property: pb, .. },
                batch: bb,
                ..
            },
        ) => pa != pb && !Rc::ptr_eq(ba, bb),
        _ => false,
    }
}

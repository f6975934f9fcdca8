// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use std::rc::Rc;

use serde_json::json;
use weft_core::{ShadowTree, VNodeTree, Value};
use weft_dry_tests::{client_tree, shadow_tree, Call, SmallTree};

/// Lets spawned drains and settlements run a few times.
pub async fn ticks() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Shared render payload.
pub fn render(tag: &str) -> Rc<Value> {
    Rc::new(json!({ "tag": tag }))
}

/// Client fixture with log capture installed.
pub fn client() -> SmallTree<VNodeTree> {
    weft_dry_tests::init_tracing();
    client_tree()
}

/// Server fixture with log capture installed.
pub fn server() -> SmallTree<ShadowTree> {
    weft_dry_tests::init_tracing();
    shadow_tree()
}

/// Index of the first flush at or after `from`.
pub fn flush_after(calls: &[Call], from: usize) -> Option<usize> {
    calls
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, c)| **c == Call::Flush)
        .map(|(i, _)| i)
}

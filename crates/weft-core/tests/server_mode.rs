// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use std::rc::Rc;

use common::{render, server};
use serde_json::json;
use weft_core::{
    ChoreError, ChoreKind, CodeRef, EffectBatch, ReactiveSource, SchedulerConfig, SignalId,
    TelemetryEvent, Value,
};
use weft_dry_tests::{local, recording_scheduler, TaskDeclarer};

#[tokio::test]
async fn client_only_chores_resolve_without_running() {
    local(async {
        let fx = server();
        let (scheduler, handlers, sink) = recording_scheduler(&fx, SchedulerConfig::server());

        let reconcile = scheduler.schedule_reconcile(fx.a, render("a"));
        let resolve = scheduler.schedule_resolve_code(Some(fx.a), CodeRef::new("chunk"));
        assert_eq!(reconcile.outcome(), Some(Ok(Value::Null)));
        assert_eq!(resolve.outcome(), Some(Ok(Value::Null)));
        assert_eq!(scheduler.queued_len(), 0);

        scheduler.settled().wait().await.unwrap();
        assert!(handlers.runs().is_empty());
        assert_eq!(
            sink.count(|e| matches!(e, TelemetryEvent::ShortCircuited { .. })),
            2
        );
    })
    .await;
}

#[tokio::test]
async fn streamed_hosts_reject_new_work_but_accept_backpatches() {
    local(async {
        let fx = server();
        let tasks = TaskDeclarer::new();
        let late = tasks.task(&*fx.tree, fx.a1, "late");
        let (scheduler, handlers, sink) = recording_scheduler(&fx, SchedulerConfig::server());
        fx.tree.mark_streamed(fx.a);

        let rejected = scheduler.schedule_task(late);
        assert_eq!(
            rejected.outcome(),
            Some(Err(ChoreError::Streamed {
                kind: ChoreKind::Task,
                host: fx.a1,
            }))
        );
        let component = scheduler.schedule_component(fx.a, CodeRef::new("Late"), render("x"));
        assert!(matches!(
            component.outcome(),
            Some(Err(ChoreError::Streamed { .. }))
        ));

        let attr = scheduler.schedule_attribute(fx.a, "class", Rc::new(Value::from("on")));
        let effects = scheduler.schedule_effects(
            Some(fx.a),
            ReactiveSource::Signal(SignalId(1)),
            Rc::new(EffectBatch {
                subscribers: vec![fx.a],
                value: Value::from(3),
            }),
        );
        scheduler.settled().wait().await.unwrap();

        assert_eq!(attr.outcome(), Some(Ok(Value::from("on"))));
        assert_eq!(effects.outcome(), Some(Ok(Value::from(3))));
        assert_eq!(handlers.runs(), ["backpatch:class", "effects"]);
        assert_eq!(
            sink.count(|e| matches!(e, TelemetryEvent::Rejected { .. })),
            2
        );
    })
    .await;
}

#[tokio::test]
async fn components_render_synchronously_on_the_server() {
    local(async {
        let fx = server();
        let (scheduler, handlers, _) = recording_scheduler(&fx, SchedulerConfig::server());

        let row = scheduler.schedule_component(fx.b, CodeRef::new("Row"), render("row"));
        // Urgent on the server: already drained, and the render output is the result.
        assert_eq!(row.outcome(), Some(Ok(json!({ "tag": "row" }))));
        assert_eq!(handlers.runs(), ["Row"]);
    })
    .await;
}

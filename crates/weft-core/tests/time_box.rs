// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use std::time::Duration;

use common::client;
use weft_core::{Execution, SchedulerConfig, Value};
use weft_dry_tests::{local, recording_scheduler, TaskDeclarer};

fn slow(_: &weft_core::ChoreContext<'_>) -> Execution {
    std::thread::sleep(Duration::from_millis(1));
    Execution::done(Value::Null)
}

#[tokio::test]
async fn spent_budget_yields_to_the_next_tick() {
    local(async {
        let fx = client();
        let tasks = TaskDeclarer::new();
        let (scheduler, handlers, _) = recording_scheduler(
            &fx,
            SchedulerConfig {
                flush_budget_micros: 0,
                ..SchedulerConfig::default()
            },
        );
        for (host, name) in [(fx.a, "one"), (fx.a1, "two"), (fx.b, "three")] {
            handlers.hook(name, slow);
            scheduler.schedule_task(tasks.task(&*fx.tree, host, name));
        }

        scheduler.drain();
        assert_eq!(handlers.runs(), ["one"]);
        assert_eq!(scheduler.queued_len(), 2);
        assert_eq!(handlers.flushes(), 1);

        scheduler.settled().wait().await.unwrap();
        assert_eq!(handlers.runs(), ["one", "two", "three"]);
        assert!(handlers.flushes() >= 3);
    })
    .await;
}

#[tokio::test]
async fn generous_budget_drains_in_one_pass() {
    local(async {
        let fx = client();
        let tasks = TaskDeclarer::new();
        let (scheduler, handlers, _) = recording_scheduler(
            &fx,
            SchedulerConfig {
                flush_budget_micros: 10_000_000,
                ..SchedulerConfig::default()
            },
        );
        for (host, name) in [(fx.b, "one"), (fx.a, "two"), (fx.a1, "three")] {
            scheduler.schedule_task(tasks.task(&*fx.tree, host, name));
        }
        assert_eq!(scheduler.parked_len(), 1);

        scheduler.drain();
        // "three" is released into the same pass, ahead of its parent's sibling.
        assert_eq!(handlers.runs(), ["two", "three", "one"]);
        assert_eq!(scheduler.queued_len(), 0);
        // Only the idle flush at the end of the pass.
        assert_eq!(handlers.flushes(), 1);
    })
    .await;
}

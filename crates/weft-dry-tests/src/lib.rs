// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for Weft crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`gate`] - Manually opened latches for deferred and not-ready results
//! - [`handlers`] - Recording collaborator handlers with scripted behaviours
//! - [`tasks`] - Task declaration helpers
//! - [`telemetry`] - Recording telemetry sink
//! - [`tree`] - Host tree fixtures

pub mod config;
pub mod gate;
pub mod handlers;
pub mod tasks;
pub mod telemetry;
pub mod tree;

use std::future::Future;
use std::rc::Rc;

use weft_core::{ChoreHandlers, Scheduler, SchedulerConfig};

pub use config::InMemoryConfigStore;
pub use gate::Gate;
pub use handlers::{Behaviour, Call, HookFn, RecordingHandlers};
pub use tasks::TaskDeclarer;
pub use telemetry::RecordingTelemetrySink;
pub use tree::{client_tree, shadow_tree, FixtureTree, SmallTree};

/// Runs `fut` to completion inside a fresh [`tokio::task::LocalSet`].
pub async fn local<F: Future>(fut: F) -> F::Output {
    tokio::task::LocalSet::new().run_until(fut).await
}

/// Installs a test-writer `tracing` subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::TRACE)
        .try_init();
}

/// Scheduler over `fixture` that records handler calls and telemetry.
pub fn recording_scheduler<T: FixtureTree + Default>(
    fixture: &SmallTree<T>,
    config: SchedulerConfig,
) -> (Scheduler, Rc<RecordingHandlers>, Rc<RecordingTelemetrySink>) {
    let handlers = RecordingHandlers::new();
    let sink = Rc::new(RecordingTelemetrySink::new());
    let dyn_handlers: Rc<dyn ChoreHandlers> = handlers.clone();
    let scheduler = Scheduler::builder(fixture.host_tree(), dyn_handlers)
        .config(config)
        .telemetry(sink.clone())
        .build();
    (scheduler, handlers, sink)
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! weft-core: cooperative, structure-aware chore scheduler for a reactive
//! rendering runtime.
//!
//! Reactive work ("chores") is ordered by kind band, tree position, kind level
//! and declaration index, held back by blocking rules while the chores it
//! depends on are pending, and drained in time-boxed runs between output
//! flushes. Actual work is delegated to [`ChoreHandlers`].
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self,
    clippy::future_not_send
)]

mod arena;
mod blocking;
mod chore;
mod completion;
mod config;
mod error;
mod handlers;
mod host;
mod ident;
mod kind;
mod ordering;
mod queue;
/// Retry-on-not-ready combinator used for every collaborator call.
pub mod retry;
mod scheduler;
mod telemetry;

// Re-exports for stable public API
/// Chore model: work variants, task descriptors, states and snapshots.
pub use chore::{
    ChoreState, ChoreSummary, ChoreWork, EffectBatch, ReactiveSource, TargetKey, TaskFlavor,
    TaskRef, Value,
};
/// Completion handles returned for every scheduled chore.
pub use completion::{ChoreHandle, ChoreOutcome};
/// Scheduler configuration.
pub use config::{RuntimeMode, SchedulerConfig, DEFAULT_FLUSH_BUDGET_MICROS, DEFAULT_MAX_RETRIES};
/// Chore failure outcomes.
pub use error::ChoreError;
/// Collaborator ports.
pub use handlers::{ChoreContext, ChoreFuture, ChoreHandlers, Execution, ReadySignal};
/// Host tree abstraction and its client/server implementations.
pub use host::{HostTree, SeqEntry, ShadowTree, VNodeTree};
/// Identifiers and code references.
pub use ident::{
    make_symbol_id, ChoreId, CodeRef, Hash, HostId, SeqIndex, SignalId, StoreId, SymbolId, TaskId,
};
/// Chore kinds and their band/level encoding.
pub use kind::{Band, ChoreKind, MACRO_MASK, MICRO_MASK};
/// The comparator the work queue is sorted by.
pub use ordering::compare_chores;
/// The scheduler and its builder.
pub use scheduler::{Scheduler, SchedulerBuilder};
/// Diagnostic sinks.
pub use telemetry::{NullTelemetrySink, TelemetryEvent, TelemetrySink, TracingTelemetrySink};

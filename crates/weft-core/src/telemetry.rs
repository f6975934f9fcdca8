// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

// Diagnostic sink for scheduler events. Best-effort and not part of the
// scheduling contract: sinks observe, they never influence ordering.

use crate::chore::ChoreState;
use crate::ident::{ChoreId, HostId};
use crate::kind::ChoreKind;

/// Scheduler event delivered to a [`TelemetrySink`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TelemetryEvent {
    /// A chore entered the queue.
    Scheduled {
        /// Chore id.
        id: ChoreId,
        /// Chore kind.
        kind: ChoreKind,
        /// Owning host.
        owner: Option<HostId>,
    },
    /// A chore was folded into an equal queued or parked chore.
    Coalesced {
        /// Surviving chore.
        into: ChoreId,
        /// Chore kind.
        kind: ChoreKind,
    },
    /// A chore was parked behind a blocker.
    Blocked {
        /// Parked chore.
        id: ChoreId,
        /// Chore kind.
        kind: ChoreKind,
        /// Chore it waits for.
        blocker: ChoreId,
    },
    /// A parked chore was re-examined after its blocker settled.
    Released {
        /// Released chore (its id before re-placement).
        id: ChoreId,
        /// Chore kind.
        kind: ChoreKind,
    },
    /// A chore started executing.
    Started {
        /// Chore id.
        id: ChoreId,
        /// Chore kind.
        kind: ChoreKind,
    },
    /// A chore returned a deferred result.
    Deferred {
        /// Chore id.
        id: ChoreId,
        /// Chore kind.
        kind: ChoreKind,
    },
    /// A chore reached a terminal state.
    Finished {
        /// Chore id.
        id: ChoreId,
        /// Chore kind.
        kind: ChoreKind,
        /// `Done` or `Failed`.
        state: ChoreState,
    },
    /// A chore was discarded because its owner was deleted.
    Skipped {
        /// Chore id.
        id: ChoreId,
        /// Chore kind.
        kind: ChoreKind,
        /// Deleted owner.
        owner: HostId,
    },
    /// Scheduling was refused for a streamed host.
    Rejected {
        /// Refused kind.
        kind: ChoreKind,
        /// Streamed host.
        host: HostId,
    },
    /// Client-only work was completed without running on the server.
    ShortCircuited {
        /// Chore kind.
        kind: ChoreKind,
    },
    /// Output was flushed.
    Flushed,
    /// The drain barrier resolved.
    Settled,
}

/// Receives scheduler events. Implementations must not call back into the
/// scheduler.
pub trait TelemetrySink {
    /// Records one event.
    fn record(&self, event: &TelemetryEvent);
}

/// Sink that discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullTelemetrySink;

impl TelemetrySink for NullTelemetrySink {
    fn record(&self, _event: &TelemetryEvent) {}
}

/// Sink that forwards every event to `tracing` at `TRACE` level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingTelemetrySink;

impl TelemetrySink for TracingTelemetrySink {
    fn record(&self, event: &TelemetryEvent) {
        match event {
            TelemetryEvent::Rejected { kind, host } => {
                tracing::trace!(target: "weft::chore", %kind, %host, "rejected");
            }
            TelemetryEvent::Finished { id, kind, state } => {
                tracing::trace!(target: "weft::chore", %id, %kind, ?state, "finished");
            }
            other => tracing::trace!(target: "weft::chore", event = ?other),
        }
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use thiserror::Error;

use crate::ident::HostId;
use crate::kind::ChoreKind;

/// Failure outcome of a chore, observed through its [`crate::ChoreHandle`].
///
/// Cloneable so every waiter on a (possibly merged) handle sees the same value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChoreError {
    /// A collaborator reported an execution error.
    #[error("chore failed: {0}")]
    Failed(String),
    /// The owner was already streamed to the client; only backpatching kinds
    /// may still target it.
    #[error("cannot schedule {kind} on {host}: host already streamed")]
    Streamed {
        /// Kind that was rejected.
        kind: ChoreKind,
        /// Streamed owner.
        host: HostId,
    },
    /// The collaborator kept reporting "not ready" past the configured limit.
    #[error("gave up after {attempts} not-ready signals")]
    RetryExhausted {
        /// Number of not-ready signals observed.
        attempts: u32,
    },
    /// The scheduler was dropped while the chore was still in flight.
    #[error("scheduler dropped before the chore settled")]
    SchedulerDropped,
}

impl ChoreError {
    /// Convenience constructor for [`ChoreError::Failed`].
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Retry-on-not-ready combinator.
//!
//! A collaborator that cannot run yet returns [`Execution::NotReady`] with a
//! signal. The combinator awaits the signal and attempts again, so callers
//! only ever observe a ready or a deferred result.
use crate::completion::ChoreOutcome;
use crate::error::ChoreError;
use crate::handlers::{ChoreFuture, Execution};

/// Result of the first attempt, with not-ready signals folded into the
/// deferred arm.
pub enum Settlement {
    /// Finished synchronously.
    Ready(ChoreOutcome),
    /// Finishes when the future resolves.
    Deferred(ChoreFuture),
}

impl std::fmt::Debug for Settlement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(outcome) => f.debug_tuple("Ready").field(outcome).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Runs the first attempt synchronously and defers any retries.
///
/// At most `max_retries` not-ready signals are awaited; the next one fails the
/// chore with [`ChoreError::RetryExhausted`].
pub fn settle<F>(max_retries: u32, mut attempt: F) -> Settlement
where
    F: FnMut() -> Execution + 'static,
{
    match attempt() {
        Execution::Ready(outcome) => Settlement::Ready(outcome),
        Execution::Deferred(fut) => Settlement::Deferred(fut),
        Execution::NotReady(_) if max_retries == 0 => {
            Settlement::Ready(Err(ChoreError::RetryExhausted { attempts: 1 }))
        }
        Execution::NotReady(signal) => Settlement::Deferred(Box::pin(async move {
            signal.await;
            resume(max_retries, 1, attempt).await
        })),
    }
}

/// Attempts until the collaborator produces a result.
pub async fn retry_on_not_ready<F>(max_retries: u32, attempt: F) -> ChoreOutcome
where
    F: FnMut() -> Execution,
{
    resume(max_retries, 0, attempt).await
}

async fn resume<F>(max_retries: u32, mut observed: u32, mut attempt: F) -> ChoreOutcome
where
    F: FnMut() -> Execution,
{
    loop {
        match attempt() {
            Execution::Ready(outcome) => return outcome,
            Execution::Deferred(fut) => return fut.await,
            Execution::NotReady(signal) => {
                observed += 1;
                if observed > max_retries {
                    return Err(ChoreError::RetryExhausted { attempts: observed });
                }
                tracing::trace!(observed, "not ready, waiting");
                signal.await;
            }
        }
    }
}

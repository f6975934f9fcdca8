// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scheduler configuration.
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default flush budget: one frame at 60 Hz.
pub const DEFAULT_FLUSH_BUDGET_MICROS: u64 = 16_667;
/// Default limit on not-ready signals per chore.
pub const DEFAULT_MAX_RETRIES: u32 = 32;

/// Where the runtime executes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeMode {
    /// Live tree in a browser-like host.
    #[default]
    Client,
    /// Server rendering into a stream.
    Server,
}

impl RuntimeMode {
    /// True for [`RuntimeMode::Server`].
    pub const fn is_server(self) -> bool {
        matches!(self, Self::Server)
    }
}

/// Tunables for a [`crate::Scheduler`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Client or server behaviour.
    pub mode: RuntimeMode,
    /// Longest stretch of drain work between two output flushes.
    pub flush_budget_micros: u64,
    /// Not-ready signals tolerated per chore before it fails.
    pub max_retries: u32,
    /// Forward telemetry to `tracing` when no explicit sink is installed.
    pub trace_chores: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            mode: RuntimeMode::Client,
            flush_budget_micros: DEFAULT_FLUSH_BUDGET_MICROS,
            max_retries: DEFAULT_MAX_RETRIES,
            trace_chores: false,
        }
    }
}

impl SchedulerConfig {
    /// Server-mode config with default tunables.
    pub fn server() -> Self {
        Self {
            mode: RuntimeMode::Server,
            ..Self::default()
        }
    }

    /// Flush budget as a [`Duration`].
    pub fn flush_budget(&self) -> Duration {
        Duration::from_micros(self.flush_budget_micros)
    }
}

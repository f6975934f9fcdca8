// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Telemetry sink that keeps every event for later assertions.
use std::cell::RefCell;

use weft_core::{TelemetryEvent, TelemetrySink};

/// Records events in arrival order.
#[derive(Debug, Default)]
pub struct RecordingTelemetrySink {
    events: RefCell<Vec<TelemetryEvent>>,
}

impl RecordingTelemetrySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.borrow().clone()
    }

    /// Number of recorded events matching `pred`.
    pub fn count(&self, pred: impl Fn(&TelemetryEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| pred(e)).count()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl TelemetrySink for RecordingTelemetrySink {
    fn record(&self, event: &TelemetryEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

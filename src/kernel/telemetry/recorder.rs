use std::collections::VecDeque;

use super::event::TelemetryEvent;
use super::metrics::{compute_snapshot, TelemetrySnapshot};

const MAX_EVENTS: usize = 10_000;

#[derive(Debug, Default)]
pub struct TelemetryRecorder {
    buffer: VecDeque<TelemetryEvent>,
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        Self { buffer: VecDeque::new() }
    }

    /// Oldest events are dropped once the buffer is full.
    pub fn record(&mut self, event: TelemetryEvent) {
        if self.buffer.len() >= MAX_EVENTS {
            self.buffer.pop_front();
        }
        self.buffer.push_back(event);
    }

    pub fn events(&self) -> &VecDeque<TelemetryEvent> {
        &self.buffer
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        compute_snapshot(&self.buffer)
    }

    /// Session aggregation, called when a session ends.
    pub fn aggregate_session(&self) -> TelemetryEvent {
        let snap = self.snapshot();
        TelemetryEvent::SessionSummary {
            cycles: snap.cycles,
            rules_fired: snap.rules_fired(),
            unintegrated_moves: snap.warnings.unintegrated_moves,
            exhausted_selections: snap.warnings.exhausted_selections,
            rollbacks: snap.rollbacks.total(),
        }
    }
}

//! One dialogue session: exclusive owner of its information state.
//!
//! Sessions share nothing but the immutable engine, so any number of them can
//! run on separate tasks. A turn either completes and replaces the state, or
//! fails and leaves the pre-turn state in place.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{IbdmError, Result};
use crate::kernel::audit::CycleRecord;
use crate::kernel::engine::{DialogueMoveEngine, Exchange};
use crate::kernel::state::InformationState;
use crate::kernel::telemetry::{TelemetryEvent, TelemetryRecorder, TelemetrySnapshot};
use crate::store::SessionRecord;

pub struct Session {
    id: Uuid,
    engine: Arc<DialogueMoveEngine>,
    state: InformationState,
    trail: Vec<CycleRecord>,
    telemetry: TelemetryRecorder,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(engine: Arc<DialogueMoveEngine>) -> Self {
        let state = engine.initial_state();
        Self::with_state(Uuid::new_v4(), engine, state, Vec::new())
    }

    /// Continue a persisted session, audit trail included.
    pub fn resume(engine: Arc<DialogueMoveEngine>, record: SessionRecord) -> Self {
        Self::with_state(record.id, engine, record.state, record.trail)
    }

    fn with_state(
        id: Uuid,
        engine: Arc<DialogueMoveEngine>,
        state: InformationState,
        trail: Vec<CycleRecord>,
    ) -> Self {
        info!(session = %id, cycles = trail.len(), "session created");
        Self {
            id,
            engine,
            state,
            trail,
            telemetry: TelemetryRecorder::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &InformationState {
        &self.state
    }

    /// Audit records of every completed cycle, oldest first.
    pub fn trail(&self) -> &[CycleRecord] {
        &self.trail
    }

    pub fn is_finished(&self) -> bool {
        self.state.control().is_terminated()
    }

    /// Token that aborts the in-flight turn. Once cancelled, every later turn
    /// fails with `Cancelled` too.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn open(&mut self) -> Result<Exchange> {
        let result = {
            let work = self.engine.open(&self.state);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(IbdmError::Cancelled),
                result = work => result,
            }
        };
        self.settle(result)
    }

    pub async fn respond(&mut self, utterance: &str) -> Result<Exchange> {
        let result = {
            let work = self.engine.respond(&self.state, utterance);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(IbdmError::Cancelled),
                result = work => result,
            }
        };
        self.settle(result)
    }

    /// Adopt the new state on success; keep the old one on failure.
    fn settle(&mut self, result: Result<Exchange>) -> Result<Exchange> {
        match result {
            Ok(exchange) => {
                self.state = exchange.state.clone();
                for record in &exchange.records {
                    for event in TelemetryEvent::from_cycle(record) {
                        self.telemetry.record(event);
                    }
                }
                self.trail.extend(exchange.records.iter().cloned());
                Ok(exchange)
            }
            Err(e) if e.is_rollback() => {
                warn!(session = %self.id, error = %e, "turn rolled back");
                self.telemetry.record(TelemetryEvent::TurnRolledBack { stage: e.stage() });
                Err(e)
            }
            Err(e) => {
                warn!(session = %self.id, error = %e, "turn rejected");
                Err(e)
            }
        }
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot()
    }

    /// Recorded events, oldest first.
    pub fn telemetry_events(&self) -> impl Iterator<Item = &TelemetryEvent> {
        self.telemetry.events().iter()
    }

    /// Content-free summary event for the session so far.
    pub fn summary(&self) -> TelemetryEvent {
        self.telemetry.aggregate_session()
    }

    pub fn snapshot(&self) -> SessionRecord {
        SessionRecord { id: self.id, state: self.state.clone(), trail: self.trail.clone() }
    }
}

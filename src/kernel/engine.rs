//! Dialogue Move Engine: the four-phase control loop.
//!
//! interpret -> integrate -> select -> generate, every cycle, in that order.
//! The engine holds no per-dialogue state: every entry point borrows the
//! pre-turn state and returns a new one, so a failed collaborator call simply
//! drops the work in progress.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::audit::{CycleRecord, Diagnostic, Phase};
use super::context::RuleContext;
use super::domain::DomainModel;
use super::select::{self, Selection};
use super::semantics::{DialogueMove, Speaker};
use super::state::InformationState;
use super::update::{self, Integration};
use crate::config::EngineConfig;
use crate::error::{IbdmError, Result, Stage};
use crate::services::{Generator, Interpreter};

/// Result of the interpret phase.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpretation {
    pub mv: Option<DialogueMove>,
    pub diagnostic: Option<Diagnostic>,
}

/// One cycle: the new state, its audit record and what the system said.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub state: InformationState,
    pub record: CycleRecord,
    pub mv: Option<DialogueMove>,
    pub utterance: Option<String>,
}

/// A user turn plus the system-initiative cycles that followed it.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub state: InformationState,
    pub records: Vec<CycleRecord>,
    pub moves: Vec<DialogueMove>,
    pub utterances: Vec<String>,
}

impl Exchange {
    fn start(state: InformationState) -> Self {
        Self { state, records: Vec::new(), moves: Vec::new(), utterances: Vec::new() }
    }

    fn push(&mut self, outcome: TurnOutcome) {
        self.state = outcome.state;
        self.records.push(outcome.record);
        self.moves.extend(outcome.mv);
        self.utterances.extend(outcome.utterance);
    }

    /// Everything the system said, space separated.
    pub fn text(&self) -> String {
        self.utterances.join(" ")
    }
}

pub struct DialogueMoveEngine {
    domain: Arc<dyn DomainModel>,
    interpreter: Arc<dyn Interpreter>,
    generator: Arc<dyn Generator>,
    config: EngineConfig,
}

impl DialogueMoveEngine {
    pub fn new(
        domain: Arc<dyn DomainModel>,
        interpreter: Arc<dyn Interpreter>,
        generator: Arc<dyn Generator>,
        config: EngineConfig,
    ) -> Self {
        Self { domain, interpreter, generator, config }
    }

    pub fn domain(&self) -> &dyn DomainModel {
        self.domain.as_ref()
    }

    pub fn context(&self) -> RuleContext<'_> {
        RuleContext::new(self.domain.as_ref(), &self.config)
    }

    /// Fresh state seeded with the domain's beliefs.
    pub fn initial_state(&self) -> InformationState {
        InformationState::with_beliefs(self.domain.initial_beliefs())
    }

    async fn bounded<T>(&self, stage: Stage, call: impl Future<Output = Result<T>>) -> Result<T> {
        let timeout = self.config.collaborator_timeout();
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(IbdmError::Timeout { stage, timeout_ms: self.config.collaborator_timeout_ms }),
        }
    }

    /// Phase 1. Never touches the state.
    pub async fn interpret(&self, utterance: &str, state: &InformationState) -> Result<Interpretation> {
        let heard = self
            .bounded(Stage::Interpret, self.interpreter.interpret(utterance, state))
            .await;
        match heard {
            Ok(mut mv) => {
                mv.speaker = Speaker::User;
                Ok(Interpretation { mv: Some(mv), diagnostic: None })
            }
            Err(IbdmError::Interpretation { reason }) => {
                warn!(%reason, "utterance not understood");
                Ok(Interpretation {
                    mv: None,
                    diagnostic: Some(Diagnostic::InterpretationFailed { reason }),
                })
            }
            Err(e) if e.is_rollback() => Err(e),
            Err(e) => Err(IbdmError::Collaborator { stage: Stage::Interpret, reason: e.to_string() }),
        }
    }

    /// Phase 2.
    pub fn integrate(&self, state: InformationState, mv: Option<DialogueMove>) -> Integration {
        update::integrate(state, mv, &self.context())
    }

    /// Phase 3.
    pub fn select(&self, state: InformationState) -> Selection {
        select::select(state, &self.context())
    }

    /// Phase 4.
    pub async fn generate(&self, mv: &DialogueMove, state: &InformationState) -> Result<String> {
        let text = self
            .bounded(Stage::Generate, self.generator.generate(mv, state))
            .await;
        match text {
            Ok(text) => Ok(text),
            Err(e) if e.is_rollback() => Err(e),
            Err(e) => Err(IbdmError::Collaborator { stage: Stage::Generate, reason: e.to_string() }),
        }
    }

    /// One user cycle. A terminated dialogue takes no more input.
    pub async fn turn(&self, state: &InformationState, utterance: &str) -> Result<TurnOutcome> {
        if state.control().is_terminated() {
            return Err(IbdmError::DialogueEnded);
        }
        let mut next = state.clone();
        next.begin_cycle(Speaker::User);
        let mut record = CycleRecord::new(next.control().cycle(), Speaker::User);

        // 1. Interpret
        record.phases.push(Phase::Interpret);
        let heard = self.interpret(utterance, &next).await?;
        record.input = heard.mv.as_ref().map(DialogueMove::tag);
        if let Some(diagnostic) = heard.diagnostic {
            next.set_last_confidence(0.0);
            record.diagnostics.push(diagnostic);
        }

        self.finish_cycle(next, heard.mv, record).await
    }

    /// One system-initiative cycle. The interpret phase runs with no input.
    pub async fn tick(&self, state: &InformationState) -> Result<TurnOutcome> {
        let mut next = state.clone();
        next.begin_cycle(Speaker::System);
        let mut record = CycleRecord::new(next.control().cycle(), Speaker::System);

        // 1. Interpret (no input)
        record.phases.push(Phase::Interpret);

        self.finish_cycle(next, None, record).await
    }

    async fn finish_cycle(
        &self,
        state: InformationState,
        mv: Option<DialogueMove>,
        mut record: CycleRecord,
    ) -> Result<TurnOutcome> {
        // 2. Integrate
        record.phases.push(Phase::Integrate);
        let integration = self.integrate(state, mv);
        record.update_rule = integration.rule;
        record.update_bodies = integration.bodies_invoked;
        record.diagnostics.extend(integration.diagnostics);

        // 3. Select
        record.phases.push(Phase::Select);
        let selection = self.select(integration.state);
        record.selection_rule = selection.rule;
        record.selection_bodies = selection.bodies_invoked;
        record.diagnostics.extend(selection.diagnostics);
        let mut state = selection.state;
        if selection.mv.is_none() && record.update_rule.is_some() {
            // Housekeeping happened; the system may have more to do.
            state.set_next_speaker(Speaker::System);
        }

        // 4. Generate
        record.phases.push(Phase::Generate);
        let utterance = match &selection.mv {
            Some(mv) => Some(self.generate(mv, &state).await?),
            None => None,
        };
        record.output = selection.mv.as_ref().map(DialogueMove::tag);

        debug!(
            cycle = record.cycle,
            speaker = ?record.speaker,
            update = ?record.update_rule,
            selection = ?record.selection_rule,
            "cycle complete"
        );
        Ok(TurnOutcome { state, record, mv: selection.mv, utterance })
    }

    /// Tick while the system holds the floor, up to `max_system_cycles`.
    async fn run_system(&self, exchange: &mut Exchange) -> Result<()> {
        for _ in 0..self.config.max_system_cycles {
            let control = exchange.state.control();
            if control.is_terminated() || control.next_speaker() != Speaker::System {
                break;
            }
            let outcome = self.tick(&exchange.state).await?;
            let quiescent = outcome.record.is_quiescent();
            exchange.push(outcome);
            if quiescent {
                break;
            }
        }
        Ok(())
    }

    /// One user turn and the system's follow-up.
    pub async fn respond(&self, state: &InformationState, utterance: &str) -> Result<Exchange> {
        let first = self.turn(state, utterance).await?;
        let mut exchange = Exchange::start(first.state.clone());
        exchange.push(first);
        self.run_system(&mut exchange).await?;
        Ok(exchange)
    }

    /// Session start: optional greeting, then system initiative.
    pub async fn open(&self, state: &InformationState) -> Result<Exchange> {
        let mut start = state.clone();
        if self.config.greet_on_start && start.moves().next().is_none() {
            start.enqueue_move(DialogueMove::greet(Speaker::System));
        }
        start.set_next_speaker(Speaker::System);
        info!(domain = self.domain.name(), "opening dialogue");
        let mut exchange = Exchange::start(start);
        self.run_system(&mut exchange).await?;
        Ok(exchange)
    }
}

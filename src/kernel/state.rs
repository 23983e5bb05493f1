use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::plan::{Plan, StepId, StepStatus};
use super::qud::QudStack;
use super::semantics::{DialogueMove, Proposition, Question, Speaker, Value};
use crate::error::Result;

/// Strict state delta. Every mutation that changes the state is recorded as one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "delta", rename_all = "snake_case")]
pub enum StateDelta {
    CycleStarted { speaker: Speaker },
    /// A move heard or uttered. `integrated == false` means no update rule took it.
    MoveRecorded { mv: DialogueMove, integrated: bool },
    QudPushed { question: Question },
    QudPopped { question: Question },
    CommitmentAdded { proposition: Proposition },
    MoveEnqueued { mv: DialogueMove },
    MoveDequeued { mv: DialogueMove },
    PlanLoaded { task: String },
    StepStarted { step: StepId },
    StepCompleted { step: StepId },
    BeliefSet { proposition: Proposition },
    PendingSet { mv: Option<DialogueMove> },
    PendingTaken { mv: DialogueMove },
    ConfidenceSet { confidence: f32 },
    GroundingSet { awaiting: bool },
    FloorSet { speaker: Speaker },
    Terminated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub cycle: u64,
    pub version: u64,
    pub delta: StateDelta,
}

/// Agent-local part of the state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Private {
    beliefs: BTreeMap<String, Value>,
    agenda: VecDeque<DialogueMove>,
    plan: Option<Plan>,
}

impl Private {
    pub fn beliefs(&self) -> &BTreeMap<String, Value> {
        &self.beliefs
    }

    pub fn agenda(&self) -> &VecDeque<DialogueMove> {
        &self.agenda
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    /// The plan, if it still has work left.
    pub fn active_plan(&self) -> Option<&Plan> {
        self.plan.as_ref().filter(|p| p.is_active())
    }
}

/// Mutually known part of the state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shared {
    qud: QudStack,
    commitments: BTreeSet<Proposition>,
    history: Vec<HistoryEntry>,
}

impl Shared {
    pub fn qud(&self) -> &QudStack {
        &self.qud
    }

    pub fn commitments(&self) -> &BTreeSet<Proposition> {
        &self.commitments
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Control {
    turn: Speaker,
    next_speaker: Speaker,
    cycle: u64,
    /// Single-move-per-cycle marker: the move awaiting integration.
    pending: Option<DialogueMove>,
    last_confidence: f32,
    awaiting_grounding: bool,
    terminated: bool,
}

impl Default for Control {
    fn default() -> Self {
        Self {
            turn: Speaker::System,
            next_speaker: Speaker::System,
            cycle: 0,
            pending: None,
            last_confidence: 1.0,
            awaiting_grounding: false,
            terminated: false,
        }
    }
}

impl Control {
    pub fn turn(&self) -> Speaker {
        self.turn
    }

    pub fn next_speaker(&self) -> Speaker {
        self.next_speaker
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn pending(&self) -> Option<&DialogueMove> {
        self.pending.as_ref()
    }

    pub fn last_confidence(&self) -> f32 {
        self.last_confidence
    }

    pub fn awaiting_grounding(&self) -> bool {
        self.awaiting_grounding
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
}

/// Root aggregate of one dialogue session.
///
/// Fields are private: reads go through the getters, writes through the
/// mutators below. A `&InformationState` is the read-only view handed to
/// collaborators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InformationState {
    private: Private,
    shared: Shared,
    control: Control,
    /// Monotonic, bumped on every recorded delta.
    version: u64,
}

impl InformationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_beliefs(beliefs: BTreeMap<String, Value>) -> Self {
        let mut state = Self::new();
        for (predicate, value) in beliefs {
            state.set_belief(Proposition { predicate, value });
        }
        state
    }

    pub fn private(&self) -> &Private {
        &self.private
    }

    pub fn shared(&self) -> &Shared {
        &self.shared
    }

    pub fn control(&self) -> &Control {
        &self.control
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Who most recently asked `question` aloud, according to the history.
    pub fn last_asker(&self, question: &Question) -> Option<Speaker> {
        self.shared.history.iter().rev().find_map(|entry| match &entry.delta {
            StateDelta::MoveRecorded { mv, .. } if mv.question() == Some(question) => {
                Some(mv.speaker)
            }
            _ => None,
        })
    }

    pub fn was_asked(&self, question: &Question) -> bool {
        self.last_asker(question).is_some()
    }

    /// Moves in dialogue order, with their integration flag.
    pub fn moves(&self) -> impl Iterator<Item = (&DialogueMove, bool)> {
        self.shared.history.iter().filter_map(|entry| match &entry.delta {
            StateDelta::MoveRecorded { mv, integrated } => Some((mv, *integrated)),
            _ => None,
        })
    }

    fn record(&mut self, delta: StateDelta) {
        self.version += 1;
        self.shared.history.push(HistoryEntry {
            cycle: self.control.cycle,
            version: self.version,
            delta,
        });
    }

    // --- Shared ---

    pub fn push_qud(&mut self, question: Question) {
        self.shared.qud.push(question.clone());
        self.record(StateDelta::QudPushed { question });
    }

    pub fn pop_qud(&mut self) -> Option<Question> {
        let question = self.shared.qud.pop()?;
        self.record(StateDelta::QudPopped { question: question.clone() });
        Some(question)
    }

    /// Commitments only grow. Re-adding a known fact is a no-op.
    pub fn add_commitment(&mut self, proposition: Proposition) -> bool {
        if !self.shared.commitments.insert(proposition.clone()) {
            return false;
        }
        self.record(StateDelta::CommitmentAdded { proposition });
        true
    }

    pub fn record_move(&mut self, mv: DialogueMove, integrated: bool) {
        self.record(StateDelta::MoveRecorded { mv, integrated });
    }

    // --- Private ---

    pub fn enqueue_move(&mut self, mv: DialogueMove) {
        self.private.agenda.push_back(mv.clone());
        self.record(StateDelta::MoveEnqueued { mv });
    }

    pub fn dequeue_move(&mut self) -> Option<DialogueMove> {
        let mv = self.private.agenda.pop_front()?;
        self.record(StateDelta::MoveDequeued { mv: mv.clone() });
        Some(mv)
    }

    pub fn set_plan(&mut self, plan: Plan) {
        let task = plan.task.clone();
        self.private.plan = Some(plan);
        self.record(StateDelta::PlanLoaded { task });
    }

    pub fn mark_subplan_in_progress(&mut self, id: &StepId) {
        let changed = self
            .private
            .plan
            .as_mut()
            .is_some_and(|p| p.set_status(id, StepStatus::InProgress));
        if changed {
            self.record(StateDelta::StepStarted { step: id.clone() });
        }
    }

    pub fn mark_subplan_complete(&mut self, id: &StepId) {
        let changed = self
            .private
            .plan
            .as_mut()
            .is_some_and(|p| p.set_status(id, StepStatus::Completed));
        if changed {
            self.record(StateDelta::StepCompleted { step: id.clone() });
        }
    }

    /// Completes the plan step, if any, that was waiting on `question`.
    pub fn complete_step_for(&mut self, question: &Question) {
        let step = self
            .private
            .plan
            .as_ref()
            .and_then(|p| p.step_for_question(question))
            .map(|s| s.id.clone());
        if let Some(id) = step {
            self.mark_subplan_complete(&id);
        }
    }

    pub fn set_belief(&mut self, proposition: Proposition) {
        self.private
            .beliefs
            .insert(proposition.predicate.clone(), proposition.value.clone());
        self.record(StateDelta::BeliefSet { proposition });
    }

    // --- Control ---

    /// Also clears `awaiting_grounding` when the user takes the turn; the
    /// `CycleStarted` entry carries that.
    pub fn begin_cycle(&mut self, speaker: Speaker) {
        self.control.cycle += 1;
        self.control.turn = speaker;
        if speaker == Speaker::User {
            self.control.awaiting_grounding = false;
        }
        self.record(StateDelta::CycleStarted { speaker });
    }

    pub fn set_pending(&mut self, mv: Option<DialogueMove>) {
        if self.control.pending == mv {
            return;
        }
        self.control.pending = mv.clone();
        self.record(StateDelta::PendingSet { mv });
    }

    pub fn take_pending(&mut self) -> Option<DialogueMove> {
        let mv = self.control.pending.take()?;
        self.record(StateDelta::PendingTaken { mv: mv.clone() });
        Some(mv)
    }

    pub fn set_last_confidence(&mut self, confidence: f32) {
        let confidence = confidence.clamp(0.0, 1.0);
        if self.control.last_confidence == confidence {
            return;
        }
        self.control.last_confidence = confidence;
        self.record(StateDelta::ConfidenceSet { confidence });
    }

    pub fn set_awaiting_grounding(&mut self, awaiting: bool) {
        if self.control.awaiting_grounding == awaiting {
            return;
        }
        self.control.awaiting_grounding = awaiting;
        self.record(StateDelta::GroundingSet { awaiting });
    }

    pub fn set_next_speaker(&mut self, speaker: Speaker) {
        if self.control.next_speaker == speaker {
            return;
        }
        self.control.next_speaker = speaker;
        self.record(StateDelta::FloorSet { speaker });
    }

    pub fn terminate(&mut self) {
        if !self.control.terminated {
            self.control.terminated = true;
            self.record(StateDelta::Terminated);
        }
    }
}

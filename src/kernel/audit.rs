//! Per-cycle audit records. For any cycle the trail says which rules fired.

use serde::{Deserialize, Serialize};

use super::select::SelectionRuleId;
use super::semantics::{MoveTag, Speaker};
use super::update::UpdateRuleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Interpret,
    Integrate,
    Select,
    Generate,
}

impl Phase {
    pub const ORDER: [Phase; 4] = [Phase::Interpret, Phase::Integrate, Phase::Select, Phase::Generate];
}

/// Non-fatal conditions attached to a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A move no update rule could take. Recorded in history, state otherwise unchanged.
    UnintegratedMove { tag: MoveTag },
    /// No selection rule fired: end of turn, no system move.
    SelectionExhausted,
    /// The NLU could not map the utterance to a move.
    InterpretationFailed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleRecord {
    pub cycle: u64,
    pub speaker: Speaker,
    pub phases: Vec<Phase>,
    pub update_rule: Option<UpdateRuleId>,
    pub selection_rule: Option<SelectionRuleId>,
    pub update_bodies: usize,
    pub selection_bodies: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub input: Option<MoveTag>,
    pub output: Option<MoveTag>,
}

impl CycleRecord {
    pub fn new(cycle: u64, speaker: Speaker) -> Self {
        Self {
            cycle,
            speaker,
            phases: Vec::with_capacity(4),
            update_rule: None,
            selection_rule: None,
            update_bodies: 0,
            selection_bodies: 0,
            diagnostics: Vec::new(),
            input: None,
            output: None,
        }
    }

    /// Nothing fired in either rule phase.
    pub fn is_quiescent(&self) -> bool {
        self.update_rule.is_none() && self.selection_rule.is_none()
    }
}

use serde::{Deserialize, Serialize};

use crate::error::Stage;
use crate::kernel::audit::{CycleRecord, Diagnostic};
use crate::kernel::select::SelectionRuleId;
use crate::kernel::semantics::MoveTag;
use crate::kernel::update::UpdateRuleId;

// Allowed: rule ids, move tags, cycle numbers, counts
// Forbidden: utterances, answer values, propositions, question text

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuleName {
    Update(UpdateRuleId),
    Selection(SelectionRuleId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    RuleFired {
        rule: RuleName,
        cycle: u64,
    },

    MoveUnintegrated {
        tag: MoveTag,
        cycle: u64,
    },

    SelectionExhausted {
        cycle: u64,
    },

    /// The reason string stays in the audit trail; only the fact is counted here.
    InterpretationFailed {
        cycle: u64,
    },

    TurnRolledBack {
        /// `None` for cancellation.
        stage: Option<Stage>,
    },

    SessionSummary {
        cycles: u64,
        rules_fired: u64,
        unintegrated_moves: u64,
        exhausted_selections: u64,
        rollbacks: u64,
    },
}

impl TelemetryEvent {
    /// Content-free events for one audited cycle.
    pub fn from_cycle(record: &CycleRecord) -> Vec<TelemetryEvent> {
        let cycle = record.cycle;
        let mut events = Vec::new();
        if let Some(rule) = record.update_rule {
            events.push(TelemetryEvent::RuleFired { rule: RuleName::Update(rule), cycle });
        }
        if let Some(rule) = record.selection_rule {
            events.push(TelemetryEvent::RuleFired { rule: RuleName::Selection(rule), cycle });
        }
        for diagnostic in &record.diagnostics {
            events.push(match diagnostic {
                Diagnostic::UnintegratedMove { tag } => {
                    TelemetryEvent::MoveUnintegrated { tag: *tag, cycle }
                }
                Diagnostic::SelectionExhausted => TelemetryEvent::SelectionExhausted { cycle },
                Diagnostic::InterpretationFailed { .. } => {
                    TelemetryEvent::InterpretationFailed { cycle } // reason STRIPPED
                }
            });
        }
        events
    }
}

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::event::{RuleName, TelemetryEvent};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub rule_counts: BTreeMap<RuleName, u64>,
    pub cycles: u64,
    pub warnings: WarningStats,
    pub rollbacks: RollbackStats,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WarningStats {
    pub unintegrated_moves: u64,
    pub exhausted_selections: u64,
    pub interpretation_failures: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollbackStats {
    pub interpret: u64,
    pub generate: u64,
    pub cancelled: u64,
}

impl RollbackStats {
    pub fn total(&self) -> u64 {
        self.interpret + self.generate + self.cancelled
    }
}

impl TelemetrySnapshot {
    pub fn rules_fired(&self) -> u64 {
        self.rule_counts.values().sum()
    }

    pub fn count(&self, rule: RuleName) -> u64 {
        self.rule_counts.get(&rule).copied().unwrap_or(0)
    }
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();
    let mut cycles = BTreeSet::new();

    for event in events {
        match event {
            TelemetryEvent::RuleFired { rule, cycle } => {
                *snap.rule_counts.entry(*rule).or_insert(0) += 1;
                cycles.insert(*cycle);
            }
            TelemetryEvent::MoveUnintegrated { cycle, .. } => {
                snap.warnings.unintegrated_moves += 1;
                cycles.insert(*cycle);
            }
            TelemetryEvent::SelectionExhausted { cycle } => {
                snap.warnings.exhausted_selections += 1;
                cycles.insert(*cycle);
            }
            TelemetryEvent::InterpretationFailed { cycle } => {
                snap.warnings.interpretation_failures += 1;
                cycles.insert(*cycle);
            }
            TelemetryEvent::TurnRolledBack { stage } => match stage {
                Some(crate::error::Stage::Interpret) => snap.rollbacks.interpret += 1,
                Some(crate::error::Stage::Generate) => snap.rollbacks.generate += 1,
                None => snap.rollbacks.cancelled += 1,
            },
            TelemetryEvent::SessionSummary { .. } => {}
        }
    }

    snap.cycles = cycles.len() as u64;
    snap
}

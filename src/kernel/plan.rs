use serde::{Deserialize, Serialize};
use std::fmt;

use super::qud::QudStack;
use super::semantics::{Proposition, Question};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(String);

impl StepId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    /// Ask and wait until the question is resolved.
    Findout(Question),
    /// Ask without waiting for an answer.
    Raise(Question),
    /// Tell the user something.
    Inform(Proposition),
}

impl PlanAction {
    pub fn question(&self) -> Option<&Question> {
        match self {
            PlanAction::Findout(q) | PlanAction::Raise(q) => Some(q),
            PlanAction::Inform(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: StepId,
    pub action: PlanAction,
    pub status: StepStatus,
}

/// Ordered sub-goals for one task. Active while any step is not completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub task: String,
    steps: Vec<PlanStep>,
}

impl Plan {
    /// Step ids are `task/index`.
    pub fn new(task: impl Into<String>, actions: impl IntoIterator<Item = PlanAction>) -> Self {
        let task = task.into();
        let steps = actions
            .into_iter()
            .enumerate()
            .map(|(i, action)| PlanStep {
                id: StepId::new(format!("{task}/{i}")),
                action,
                status: StepStatus::Pending,
            })
            .collect();
        Self { task, steps }
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn is_active(&self) -> bool {
        self.steps.iter().any(|s| s.status != StepStatus::Completed)
    }

    /// The not-yet-completed step whose question is `question`.
    pub fn step_for_question(&self, question: &Question) -> Option<&PlanStep> {
        self.steps.iter().find(|s| {
            s.status != StepStatus::Completed && s.action.question() == Some(question)
        })
    }

    /// A findout that was asked and is still being discussed.
    pub fn has_open_step(&self, qud: &QudStack) -> bool {
        self.steps.iter().any(|s| {
            s.status == StepStatus::InProgress
                && s.action.question().is_some_and(|q| qud.contains(q))
        })
    }

    /// Next step to execute: pending, or in progress but dropped from the QUD.
    pub fn next_step(&self, qud: &QudStack) -> Option<&PlanStep> {
        self.steps.iter().find(|s| match s.status {
            StepStatus::Pending => true,
            StepStatus::InProgress => s.action.question().is_some_and(|q| !qud.contains(q)),
            StepStatus::Completed => false,
        })
    }

    /// Questions of findout steps not yet completed, in plan order.
    pub fn open_findouts(&self) -> impl Iterator<Item = (&StepId, &Question)> {
        self.steps.iter().filter_map(|s| match (&s.action, s.status) {
            (_, StepStatus::Completed) => None,
            (PlanAction::Findout(q), _) => Some((&s.id, q)),
            _ => None,
        })
    }

    pub(crate) fn set_status(&mut self, id: &StepId, status: StepStatus) -> bool {
        match self.steps.iter_mut().find(|s| &s.id == id) {
            Some(step) if step.status != status => {
                step.status = status;
                true
            }
            _ => false,
        }
    }
}

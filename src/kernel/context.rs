use std::collections::{BTreeSet, VecDeque};

use super::domain::DomainModel;
use super::semantics::{Answer, Proposition, Question};
use super::state::InformationState;
use crate::config::EngineConfig;

/// Read-only collaborators every rule sees. Borrowed for one call only.
#[derive(Clone, Copy)]
pub struct RuleContext<'a> {
    pub domain: &'a dyn DomainModel,
    pub config: &'a EngineConfig,
}

impl<'a> RuleContext<'a> {
    pub fn new(domain: &'a dyn DomainModel, config: &'a EngineConfig) -> Self {
        Self { domain, config }
    }

    pub fn binding(&self, question: &Question, answer: &Answer) -> Option<Proposition> {
        if !self.domain.resolves(answer, question) {
            return None;
        }
        self.domain.resolution(question, answer)
    }

    /// The answer either resolves the question or narrows it to a residual.
    pub fn integrable(&self, answer: &Answer, question: &Question) -> bool {
        self.binding(question, answer).is_some()
            || (self.domain.relevant(answer, question)
                && self.domain.combines(question, answer).is_some())
    }

    pub fn resolved_by(&self, question: &Question, state: &InformationState) -> bool {
        state
            .shared()
            .commitments()
            .iter()
            .any(|p| self.domain.resolves(&Answer::from(p), question))
    }

    /// Direct dependencies of `question`, in catalogue order.
    pub fn dependencies(&self, question: &Question) -> Vec<Question> {
        self.domain
            .questions()
            .into_iter()
            .filter(|q| *q != question && self.domain.depends(question, q))
            .cloned()
            .collect()
    }

    /// Every question reachable from `question` through `depends`, breadth first.
    /// Terminates on cyclic dependency graphs.
    pub fn reachable(&self, question: &Question) -> Vec<Question> {
        let mut seen: BTreeSet<Question> = BTreeSet::from([question.clone()]);
        let mut queue: VecDeque<Question> = VecDeque::from([question.clone()]);
        let mut out = Vec::new();
        while let Some(current) = queue.pop_front() {
            for dep in self.dependencies(&current) {
                if seen.insert(dep.clone()) {
                    out.push(dep.clone());
                    queue.push_back(dep);
                }
            }
        }
        out
    }

    pub fn unresolved_dependencies(
        &self,
        question: &Question,
        state: &InformationState,
    ) -> Vec<Question> {
        self.reachable(question)
            .into_iter()
            .filter(|q| !self.resolved_by(q, state))
            .collect()
    }
}

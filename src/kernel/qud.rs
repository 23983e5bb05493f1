use serde::{Deserialize, Serialize};

use super::semantics::Question;

/// Questions Under Discussion. Strict LIFO: push, pop, peek.
///
/// Serialises as a bottom-to-top list so stack order survives persistence.
/// Iteration is read-only and runs top first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QudStack {
    items: Vec<Question>,
}

impl QudStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, question: Question) {
        self.items.push(question);
    }

    /// `None` on an empty stack: nothing is under discussion.
    pub fn pop(&mut self) -> Option<Question> {
        self.items.pop()
    }

    pub fn peek(&self) -> Option<&Question> {
        self.items.last()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, question: &Question) -> bool {
        self.items.iter().any(|q| q == question)
    }

    /// Top first.
    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.items.iter().rev()
    }
}

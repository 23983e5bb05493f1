use serde::{Deserialize, Serialize};
use std::fmt;

use super::question::QuestionRef;

/// Semantic value carried by answers, beliefs and commitments.
/// Totally ordered so commitment sets iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(true) => f.write_str("yes"),
            Value::Bool(false) => f.write_str("no"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// `predicate(value)`: the unit of beliefs and commitments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Proposition {
    pub predicate: String,
    pub value: Value,
}

impl Proposition {
    pub fn new(predicate: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { predicate: predicate.into(), value: value.into() }
    }
}

impl fmt::Display for Proposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.predicate, self.value)
    }
}

/// Content offered in reply to a question.
///
/// A short answer ("Acme") has no predicate; a full answer ("the party is
/// Acme") names it. `question` is a lookup reference, not ownership.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Answer {
    pub value: Value,
    pub predicate: Option<String>,
    pub question: Option<QuestionRef>,
}

impl Answer {
    pub fn short(value: impl Into<Value>) -> Self {
        Self { value: value.into(), predicate: None, question: None }
    }

    pub fn full(predicate: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { value: value.into(), predicate: Some(predicate.into()), question: None }
    }

    pub fn addressing(mut self, question: QuestionRef) -> Self {
        self.question = Some(question);
        self
    }
}

impl From<Proposition> for Answer {
    fn from(p: Proposition) -> Self {
        Answer::full(p.predicate, p.value)
    }
}

impl From<&Proposition> for Answer {
    fn from(p: &Proposition) -> Self {
        Answer::full(p.predicate.clone(), p.value.clone())
    }
}

//! Question/answer semantics.
//!
//! All functions here are total: a non-match is `false` / `None`, never an error.

use std::collections::BTreeSet;

use super::answer::{Answer, Proposition, Value};
use super::question::{split_options, Question, CONSTRAINT_ONE_OF, CONSTRAINT_TYPE};

const TRUE_TOKENS: [&str; 9] = ["yes", "y", "yeah", "yep", "true", "sure", "correct", "right", "affirmative"];
const FALSE_TOKENS: [&str; 7] = ["no", "n", "nope", "false", "wrong", "incorrect", "negative"];

/// Lowercase, trim, collapse inner whitespace.
pub fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn bool_token(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Text(s) => {
            let token = normalize(s);
            let token = token.trim_end_matches(['.', '!']);
            if TRUE_TOKENS.contains(&token) {
                Some(true)
            } else if FALSE_TOKENS.contains(&token) {
                Some(false)
            } else {
                None
            }
        }
        Value::Int(_) => None,
    }
}

/// The answer does not explicitly point elsewhere (reference or predicate).
fn addresses(answer: &Answer, question: &Question) -> bool {
    if let Some(reference) = &answer.question {
        if *reference != question.key() {
            return false;
        }
    }
    match &answer.predicate {
        Some(p) => p == question.topic(),
        None => true,
    }
}

fn typed(value: &Value, value_type: &str) -> Option<Value> {
    match value_type {
        "text" => match value {
            Value::Text(s) if !s.trim().is_empty() => Some(Value::Text(s.trim().to_string())),
            Value::Int(i) => Some(Value::Text(i.to_string())),
            _ => None,
        },
        "int" => match value {
            Value::Int(i) => Some(Value::Int(*i)),
            Value::Text(s) => s.trim().parse::<i64>().ok().map(Value::Int),
            Value::Bool(_) => None,
        },
        "bool" => bool_token(value).map(Value::Bool),
        _ => None,
    }
}

fn exact_option<'a>(options: &[&'a str], value: &Value) -> Option<&'a str> {
    let wanted = normalize(&value.to_string());
    options.iter().copied().find(|o| normalize(o) == wanted)
}

/// Options whose normalised form contains the normalised value.
fn partial_matches<'a>(options: &[&'a str], value: &Value) -> Vec<&'a str> {
    let wanted = normalize(&value.to_string());
    if wanted.is_empty() {
        return Vec::new();
    }
    options
        .iter()
        .copied()
        .filter(|o| normalize(o).contains(&wanted))
        .collect()
}

/// The proposition committed when `answer` resolves `question`, if it does.
pub fn resolution(question: &Question, answer: &Answer) -> Option<Proposition> {
    if !addresses(answer, question) || answer.value.is_empty() {
        return None;
    }

    match question {
        Question::Wh { predicate, constraints, .. } => {
            let mut bound = match &answer.value {
                Value::Text(s) => Value::Text(s.trim().to_string()),
                other => other.clone(),
            };
            match constraints.get(CONSTRAINT_TYPE) {
                Some(value_type) => bound = typed(&bound, value_type)?,
                // A bare yes/no is never the value of a wh-question.
                None if matches!(bound, Value::Bool(_)) => return None,
                None => {}
            }
            if let Some(raw) = constraints.get(CONSTRAINT_ONE_OF) {
                let options = split_options(raw);
                bound = Value::Text(exact_option(&options, &bound)?.to_string());
            }
            Some(Proposition::new(predicate.clone(), bound))
        }
        Question::YesNo { predicate } => {
            bool_token(&answer.value).map(|b| Proposition::new(predicate.clone(), b))
        }
        Question::Alt { predicate, alternatives } => {
            let options: Vec<&str> = alternatives.iter().map(String::as_str).collect();
            exact_option(&options, &answer.value)
                .map(|alt| Proposition::new(predicate.clone(), alt.to_string()))
        }
    }
}

/// True iff the answer is a well-typed binding for the question.
pub fn resolves(answer: &Answer, question: &Question) -> bool {
    resolution(question, answer).is_some()
}

/// True if the answer is about the question's topic, even without resolving it.
pub fn relevant(answer: &Answer, question: &Question) -> bool {
    if !addresses(answer, question) {
        return false;
    }
    if resolves(answer, question) {
        return true;
    }
    if answer.predicate.as_deref() == Some(question.topic()) {
        return true;
    }
    match question.options() {
        Some(options) => !partial_matches(&options, &answer.value).is_empty(),
        None => false,
    }
}

/// Residual sub-question left by a partial answer.
///
/// When the value narrows a closed question to two or more (but not all) of its
/// options, the residual is an alternative question over those options.
pub fn combines(question: &Question, answer: &Answer) -> Option<Question> {
    if !addresses(answer, question) || resolves(answer, question) {
        return None;
    }
    let options = question.options()?;
    let matches = partial_matches(&options, &answer.value);
    if matches.len() < 2 || matches.len() == options.len() {
        return None;
    }
    Question::alt_about(question.topic(), matches).ok()
}

/// Some commitment, read as a full answer, already resolves the question.
pub fn resolved_by(question: &Question, commitments: &BTreeSet<Proposition>) -> bool {
    commitments
        .iter()
        .any(|p| resolves(&Answer::from(p), question))
}

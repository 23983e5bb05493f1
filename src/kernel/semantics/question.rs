use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::resolution::normalize;
use crate::error::{IbdmError, Result};

/// Constraint keys a Wh-question may carry.
pub const CONSTRAINT_TYPE: &str = "type";
pub const CONSTRAINT_ONE_OF: &str = "one_of";

/// Accepted values of the `type` constraint.
pub const VALUE_TYPES: [&str; 3] = ["text", "int", "bool"];

/// Topic used by alternative questions built without an explicit predicate.
pub const DEFAULT_ALT_TOPIC: &str = "choice";

/// Weak reference to a question: its canonical rendering.
/// Used for lookup only, never to own the question.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionRef(String);

impl QuestionRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A semantic question. Immutable once built; equality is structural.
///
/// Build through [`Question::wh`], [`Question::yes_no`], [`Question::alt`] or
/// [`Question::alt_about`] so the fields are validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Question {
    /// `?x.predicate(x)` under optional constraints.
    Wh {
        variable: String,
        predicate: String,
        constraints: BTreeMap<String, String>,
    },
    /// `?predicate`
    YesNo { predicate: String },
    /// `?predicate{a|b|c}`
    Alt {
        predicate: String,
        alternatives: Vec<String>,
    },
}

impl Question {
    pub fn wh<I, K, V>(variable: &str, predicate: &str, constraints: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let variable = required("variable", variable)?;
        let predicate = required("predicate", predicate)?;
        let constraints: BTreeMap<String, String> = constraints
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        for (key, value) in &constraints {
            match key.as_str() {
                CONSTRAINT_TYPE => {
                    if !VALUE_TYPES.contains(&value.as_str()) {
                        return Err(IbdmError::configuration(format!(
                            "question `{predicate}`: unknown value type `{value}`"
                        )));
                    }
                }
                CONSTRAINT_ONE_OF => {
                    let options = split_options(value);
                    if options.is_empty() {
                        return Err(IbdmError::configuration(format!(
                            "question `{predicate}`: empty one_of constraint"
                        )));
                    }
                }
                other => {
                    return Err(IbdmError::configuration(format!(
                        "question `{predicate}`: unknown constraint `{other}`"
                    )));
                }
            }
        }

        Ok(Question::Wh { variable, predicate, constraints })
    }

    pub fn wh_unconstrained(variable: &str, predicate: &str) -> Result<Self> {
        Self::wh(variable, predicate, BTreeMap::<String, String>::new())
    }

    pub fn yes_no(predicate: &str) -> Result<Self> {
        Ok(Question::YesNo { predicate: required("predicate", predicate)? })
    }

    pub fn alt<I, S>(alternatives: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::alt_about(DEFAULT_ALT_TOPIC, alternatives)
    }

    pub fn alt_about<I, S>(predicate: &str, alternatives: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let predicate = required("predicate", predicate)?;
        let alternatives: Vec<String> = alternatives
            .into_iter()
            .map(|a| a.into().trim().to_string())
            .collect();

        if alternatives.len() < 2 {
            return Err(IbdmError::configuration(format!(
                "alternative question `{predicate}` needs at least two alternatives"
            )));
        }
        let mut seen = std::collections::BTreeSet::new();
        for alt in &alternatives {
            if alt.is_empty() {
                return Err(IbdmError::configuration(format!(
                    "alternative question `{predicate}` has an empty alternative"
                )));
            }
            if !seen.insert(normalize(alt)) {
                return Err(IbdmError::configuration(format!(
                    "alternative question `{predicate}` repeats `{alt}`"
                )));
            }
        }

        Ok(Question::Alt { predicate, alternatives })
    }

    /// The predicate this question is about.
    pub fn topic(&self) -> &str {
        match self {
            Question::Wh { predicate, .. }
            | Question::YesNo { predicate }
            | Question::Alt { predicate, .. } => predicate,
        }
    }

    pub fn key(&self) -> QuestionRef {
        QuestionRef(self.to_string())
    }

    /// Enumerated options, if the question closes over a finite set.
    pub fn options(&self) -> Option<Vec<&str>> {
        match self {
            Question::Wh { constraints, .. } => constraints
                .get(CONSTRAINT_ONE_OF)
                .map(|raw| split_options(raw)),
            Question::Alt { alternatives, .. } => {
                Some(alternatives.iter().map(String::as_str).collect())
            }
            Question::YesNo { .. } => None,
        }
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Question::Wh { variable, predicate, constraints } => {
                write!(f, "?{variable}.{predicate}({variable})")?;
                if !constraints.is_empty() {
                    let rendered: Vec<String> =
                        constraints.iter().map(|(k, v)| format!("{k}={v}")).collect();
                    write!(f, "[{}]", rendered.join(","))?;
                }
                Ok(())
            }
            Question::YesNo { predicate } => write!(f, "?{predicate}"),
            Question::Alt { predicate, alternatives } => {
                write!(f, "?{predicate}{{{}}}", alternatives.join("|"))
            }
        }
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(IbdmError::configuration(format!("question {field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn split_options(raw: &str) -> Vec<&str> {
    raw.split('|').map(str::trim).filter(|s| !s.is_empty()).collect()
}

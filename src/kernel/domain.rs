//! Domain model: plans, question catalogue, task triggers and predicate semantics.
//!
//! The engine never hard-codes domain content. A domain is either a custom
//! [`DomainModel`] implementation or a [`StaticDomain`] loaded from TOML.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use super::plan::{Plan, PlanAction};
use super::semantics::{self, Answer, Proposition, Question, Value};
use crate::error::{IbdmError, Result};

pub trait DomainModel: Send + Sync {
    fn name(&self) -> &str;

    /// Fresh plan for a registered task.
    fn plan_template(&self, task: &str) -> Option<Plan>;

    /// Registered task ids, sorted.
    fn tasks(&self) -> Vec<&str>;

    /// Whether a request for `task` may be accommodated without negotiation.
    fn is_accommodable(&self, task: &str) -> bool;

    /// The question catalogue.
    fn questions(&self) -> Vec<&Question>;

    fn question_for(&self, topic: &str) -> Option<&Question>;

    /// Explicit plan to run when the user raises `question`.
    fn plan_for_question(&self, question: &Question) -> Option<Plan>;

    fn initial_beliefs(&self) -> BTreeMap<String, Value>;

    /// Surface phrasing for asking `question`.
    fn phrase_for(&self, question: &Question) -> Option<&str>;

    /// Answer `question` from private beliefs, given what is already shared.
    ///
    /// Beliefs are looked up by topic, qualified by the committed values of the
    /// question's dependencies (`weather.oslo`) before the bare topic.
    fn answer_from_beliefs(
        &self,
        question: &Question,
        beliefs: &BTreeMap<String, Value>,
        commitments: &BTreeSet<Proposition>,
    ) -> Option<Proposition> {
        let mut qualified = question.topic().to_string();
        for dependency in self.questions().into_iter().filter(|d| self.depends(question, d)) {
            if let Some(p) = commitments.iter().find(|p| self.resolves(&Answer::from(*p), dependency)) {
                qualified.push('.');
                qualified.push_str(&semantics::normalize(&p.value.to_string()));
            }
        }
        let value = beliefs
            .get(&qualified)
            .or_else(|| beliefs.get(question.topic()))?;
        self.resolution(question, &Answer::full(question.topic(), value.clone()))
    }

    fn resolves(&self, answer: &Answer, question: &Question) -> bool {
        semantics::resolves(answer, question)
    }

    fn resolution(&self, question: &Question, answer: &Answer) -> Option<Proposition> {
        semantics::resolution(question, answer)
    }

    fn relevant(&self, answer: &Answer, question: &Question) -> bool {
        semantics::relevant(answer, question)
    }

    fn combines(&self, question: &Question, answer: &Answer) -> Option<Question> {
        semantics::combines(question, answer)
    }

    /// `question` cannot be answered before `on` is resolved.
    fn depends(&self, _question: &Question, _on: &Question) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// TOML layout
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum QuestionKind {
    Wh,
    YesNo,
    Alt,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct QuestionEntry {
    topic: String,
    kind: QuestionKind,
    #[serde(default)]
    variable: Option<String>,
    #[serde(default)]
    constraints: BTreeMap<String, String>,
    #[serde(default)]
    alternatives: Vec<String>,
    #[serde(default)]
    phrase: Option<String>,
    /// Task to run when the user asks this question.
    #[serde(default)]
    plan: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum StepEntry {
    Findout(String),
    Raise(String),
    Inform { predicate: String, value: Value },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TaskEntry {
    id: String,
    #[serde(default)]
    triggers: Vec<String>,
    #[serde(default = "accommodable_by_default")]
    accommodable: bool,
    steps: Vec<StepEntry>,
}

fn accommodable_by_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DependencyEntry {
    question: String,
    depends_on: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DomainFile {
    name: String,
    #[serde(default)]
    questions: Vec<QuestionEntry>,
    #[serde(default)]
    tasks: Vec<TaskEntry>,
    #[serde(default)]
    dependencies: Vec<DependencyEntry>,
    #[serde(default)]
    beliefs: BTreeMap<String, Value>,
}

// ---------------------------------------------------------------------------
// StaticDomain
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Task {
    triggers: Vec<String>,
    accommodable: bool,
    actions: Vec<PlanAction>,
}

/// Data-driven domain. Immutable after loading; share it behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct StaticDomain {
    name: String,
    questions: Vec<Question>,
    phrases: BTreeMap<String, String>,
    question_plans: BTreeMap<String, String>,
    tasks: BTreeMap<String, Task>,
    dependencies: BTreeMap<String, BTreeSet<String>>,
    beliefs: BTreeMap<String, Value>,
}

impl StaticDomain {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Parse and validate a domain file. Any inconsistency is a configuration error.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: DomainFile = toml::from_str(raw)?;
        let mut domain = StaticDomain::new(file.name.trim());
        if domain.name.is_empty() {
            return Err(IbdmError::configuration("domain name must not be empty"));
        }

        for entry in file.questions {
            let question = match entry.kind {
                QuestionKind::Wh => {
                    let variable = entry.variable.as_deref().unwrap_or("x");
                    Question::wh(variable, &entry.topic, entry.constraints)?
                }
                QuestionKind::YesNo => Question::yes_no(&entry.topic)?,
                QuestionKind::Alt => Question::alt_about(&entry.topic, entry.alternatives)?,
            };
            if domain.question_for(question.topic()).is_some() {
                return Err(IbdmError::configuration(format!(
                    "question `{}` is defined twice",
                    question.topic()
                )));
            }
            let topic = question.topic().to_string();
            if let Some(phrase) = entry.phrase {
                domain.phrases.insert(topic.clone(), phrase);
            }
            if let Some(task) = entry.plan {
                domain.question_plans.insert(topic, task);
            }
            domain.questions.push(question);
        }

        for entry in file.tasks {
            let id = entry.id.trim().to_string();
            if id.is_empty() {
                return Err(IbdmError::configuration("task id must not be empty"));
            }
            if domain.tasks.contains_key(&id) {
                return Err(IbdmError::configuration(format!("task `{id}` is defined twice")));
            }
            if entry.steps.is_empty() {
                return Err(IbdmError::configuration(format!("task `{id}` has no steps")));
            }
            let actions = entry
                .steps
                .into_iter()
                .map(|step| domain.action(&id, step))
                .collect::<Result<Vec<_>>>()?;
            domain.tasks.insert(
                id,
                Task { triggers: entry.triggers, accommodable: entry.accommodable, actions },
            );
        }

        for entry in file.dependencies {
            for on in &entry.depends_on {
                domain.require_topic("dependency", &entry.question)?;
                domain.require_topic("dependency", on)?;
                if *on == entry.question {
                    return Err(IbdmError::configuration(format!(
                        "question `{on}` cannot depend on itself"
                    )));
                }
                domain
                    .dependencies
                    .entry(entry.question.clone())
                    .or_default()
                    .insert(on.clone());
            }
        }

        for (topic, task) in &domain.question_plans {
            if !domain.tasks.contains_key(task) {
                return Err(IbdmError::configuration(format!(
                    "question `{topic}` refers to unknown task `{task}`"
                )));
            }
        }

        domain.beliefs = file.beliefs;
        Ok(domain)
    }

    fn require_topic(&self, context: &str, topic: &str) -> Result<()> {
        if self.question_for(topic).is_none() {
            return Err(IbdmError::configuration(format!(
                "{context} refers to unknown question `{topic}`"
            )));
        }
        Ok(())
    }

    fn action(&self, task: &str, step: StepEntry) -> Result<PlanAction> {
        let lookup = |topic: &str| {
            self.question_for(topic).cloned().ok_or_else(|| {
                IbdmError::configuration(format!(
                    "task `{task}` refers to unknown question `{topic}`"
                ))
            })
        };
        Ok(match step {
            StepEntry::Findout(topic) => PlanAction::Findout(lookup(&topic)?),
            StepEntry::Raise(topic) => PlanAction::Raise(lookup(&topic)?),
            StepEntry::Inform { predicate, value } => {
                PlanAction::Inform(Proposition::new(predicate, value))
            }
        })
    }

    pub fn with_question(mut self, question: Question, phrase: Option<&str>) -> Self {
        if let Some(phrase) = phrase {
            self.phrases.insert(question.topic().to_string(), phrase.to_string());
        }
        self.questions.retain(|q| q.topic() != question.topic());
        self.questions.push(question);
        self
    }

    pub fn with_task<T, S>(mut self, id: &str, triggers: T, actions: Vec<PlanAction>) -> Self
    where
        T: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let triggers = triggers.into_iter().map(Into::into).collect();
        self.tasks
            .insert(id.to_string(), Task { triggers, accommodable: true, actions });
        self
    }

    pub fn with_question_plan(mut self, topic: &str, task: &str) -> Self {
        self.question_plans.insert(topic.to_string(), task.to_string());
        self
    }

    pub fn with_dependency(mut self, topic: &str, on: &str) -> Self {
        self.dependencies
            .entry(topic.to_string())
            .or_default()
            .insert(on.to_string());
        self
    }

    pub fn with_belief(mut self, predicate: &str, value: impl Into<Value>) -> Self {
        self.beliefs.insert(predicate.to_string(), value.into());
        self
    }

    /// `(task, trigger phrase)` pairs, for interpreters.
    pub fn triggers(&self) -> Vec<(&str, &str)> {
        self.tasks
            .iter()
            .flat_map(|(id, task)| task.triggers.iter().map(move |t| (id.as_str(), t.as_str())))
            .collect()
    }
}

impl DomainModel for StaticDomain {
    fn name(&self) -> &str {
        &self.name
    }

    fn plan_template(&self, task: &str) -> Option<Plan> {
        self.tasks
            .get(task)
            .map(|t| Plan::new(task, t.actions.iter().cloned()))
    }

    fn tasks(&self) -> Vec<&str> {
        self.tasks.keys().map(String::as_str).collect()
    }

    fn is_accommodable(&self, task: &str) -> bool {
        self.tasks.get(task).is_some_and(|t| t.accommodable)
    }

    fn questions(&self) -> Vec<&Question> {
        self.questions.iter().collect()
    }

    fn question_for(&self, topic: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.topic() == topic)
    }

    fn plan_for_question(&self, question: &Question) -> Option<Plan> {
        let task = self.question_plans.get(question.topic())?;
        self.plan_template(task)
    }

    fn initial_beliefs(&self) -> BTreeMap<String, Value> {
        self.beliefs.clone()
    }

    fn phrase_for(&self, question: &Question) -> Option<&str> {
        self.phrases.get(question.topic()).map(String::as_str)
    }

    fn depends(&self, question: &Question, on: &Question) -> bool {
        self.dependencies
            .get(question.topic())
            .is_some_and(|deps| deps.contains(on.topic()))
    }
}

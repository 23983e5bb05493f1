use async_trait::async_trait;

use super::Interpreter;
use crate::error::{IbdmError, Result};
use crate::kernel::domain::{DomainModel, StaticDomain};
use crate::kernel::semantics::{
    bool_token, normalize, Answer, DialogueMove, Icm, Proposition, Question, Speaker, Value,
};
use crate::kernel::state::InformationState;

const PUNCTUATION: [char; 4] = ['.', '!', '?', ','];

const GREETINGS: [&str; 5] = ["hello", "hi", "hey", "good morning", "good afternoon"];
const FAREWELLS: [&str; 5] = ["bye", "goodbye", "quit", "exit", "stop"];
const NOT_UNDERSTOOD: [&str; 5] = ["pardon", "what", "sorry", "huh", "come again"];
const ACKNOWLEDGEMENTS: [&str; 6] = ["ok", "okay", "thanks", "thank you", "got it", "fine"];

/// Confidence given to bare short answers: the interpreter is guessing which
/// question they address.
const SHORT_ANSWER_CONFIDENCE: f32 = 0.8;

/// Rule-of-thumb interpreter over a domain's vocabulary.
///
/// Recognises greetings, farewells, grounding feedback, task triggers,
/// questions by topic phrase, yes/no, "X is Y" and short answers.
#[derive(Debug, Clone, Default)]
pub struct KeywordInterpreter {
    triggers: Vec<(String, String)>,
    topics: Vec<(String, Question)>,
}

impl KeywordInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_domain(domain: &StaticDomain) -> Self {
        let mut nlu = Self::new();
        for (task, phrase) in domain.triggers() {
            nlu = nlu.with_trigger(task, phrase);
        }
        for question in domain.questions() {
            let topic = question.topic();
            nlu = nlu.with_topic(topic, question.clone());
            if topic.contains('_') {
                nlu = nlu.with_topic(&topic.replace('_', " "), question.clone());
            }
        }
        nlu
    }

    pub fn with_trigger(mut self, task: &str, phrase: &str) -> Self {
        self.triggers.push((task.to_string(), normalize(phrase)));
        self.triggers.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
        self
    }

    /// Longer phrases are tried first.
    pub fn with_topic(mut self, phrase: &str, question: Question) -> Self {
        self.topics.push((normalize(phrase), question));
        self.topics.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        self
    }

    fn topic_in(&self, text: &str) -> Option<&Question> {
        self.topics
            .iter()
            .find(|(phrase, _)| contains_words(text, phrase))
            .map(|(_, q)| q)
    }

    fn topic_named(&self, text: &str) -> Option<&Question> {
        self.topics.iter().find(|(phrase, _)| phrase == text).map(|(_, q)| q)
    }

    /// Pure function: text -> move, no state involved.
    pub fn parse(&self, utterance: &str) -> Result<DialogueMove> {
        let text = normalize(utterance);
        let is_question = text.ends_with('?');
        let bare = text.trim_end_matches(PUNCTUATION).trim();
        // Values keep the user's casing.
        let raw = utterance.split_whitespace().collect::<Vec<_>>().join(" ");
        let raw = raw.trim_end_matches(PUNCTUATION).trim();
        if bare.is_empty() {
            return Err(IbdmError::interpretation("empty utterance"));
        }
        let user = Speaker::User;

        // 1. Conventional moves
        if GREETINGS.contains(&bare) {
            return Ok(DialogueMove::greet(user));
        }
        if FAREWELLS.contains(&bare) {
            return Ok(DialogueMove::quit(user));
        }
        if NOT_UNDERSTOOD.contains(&bare) {
            return Ok(DialogueMove::icm(user, Icm::NotUnderstood));
        }
        if ACKNOWLEDGEMENTS.contains(&bare) {
            return Ok(DialogueMove::icm(user, Icm::Acknowledge));
        }

        // 2. Task triggers
        if let Some((task, _)) = self.triggers.iter().find(|(_, t)| contains_words(bare, t)) {
            return Ok(DialogueMove::request(user, task.clone()));
        }

        // 3. Questions
        if is_question {
            return match self.topic_in(bare) {
                Some(q) => Ok(DialogueMove::ask(user, q.clone())),
                None => Err(IbdmError::interpretation("question about an unknown topic")),
            };
        }

        // 4. Polar answers
        if let Some(b) = bool_token(&Value::text(bare)) {
            return Ok(DialogueMove::answer(user, Answer::short(b)));
        }

        // 5. "X is Y"
        let words: Vec<&str> = raw.split(' ').collect();
        if let Some(i) = words.iter().position(|w| w.eq_ignore_ascii_case("is")) {
            let subject = normalize(&words[..i].join(" "));
            let subject = strip_determiner(&subject);
            let object = words[i + 1..].join(" ");
            if !subject.is_empty() && !object.is_empty() {
                let value = parse_value(&object);
                return Ok(match self.topic_named(subject) {
                    Some(q) => DialogueMove::answer(user, Answer::full(q.topic(), value)),
                    None => DialogueMove::assert(
                        user,
                        Proposition::new(subject.replace(' ', "_"), value),
                    ),
                });
            }
        }

        // 6. Anything else is a short answer
        Ok(DialogueMove::answer(user, Answer::short(parse_value(raw)))
            .with_confidence(SHORT_ANSWER_CONFIDENCE))
    }
}

#[async_trait]
impl Interpreter for KeywordInterpreter {
    async fn interpret(&self, utterance: &str, _state: &InformationState) -> Result<DialogueMove> {
        self.parse(utterance)
    }
}

fn contains_words(text: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    let padded = format!(" {} ", text.replace(PUNCTUATION, " "));
    padded.contains(&format!(" {phrase} "))
}

fn strip_determiner(s: &str) -> &str {
    let s = s.trim();
    ["the ", "my ", "our ", "your "]
        .iter()
        .find_map(|d| s.strip_prefix(d))
        .unwrap_or(s)
        .trim()
}

fn parse_value(s: &str) -> Value {
    match s.parse::<i64>() {
        Ok(i) => Value::Int(i),
        Err(_) => Value::text(s),
    }
}

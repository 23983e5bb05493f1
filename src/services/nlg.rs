use async_trait::async_trait;
use std::collections::BTreeMap;

use super::Generator;
use crate::error::Result;
use crate::kernel::domain::DomainModel;
use crate::kernel::semantics::{DialogueMove, Icm, MoveKind, Question};
use crate::kernel::state::InformationState;

/// Renders moves with the domain's question phrasing and fixed templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateGenerator {
    phrases: BTreeMap<String, String>,
}

impl TemplateGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_domain(domain: &dyn DomainModel) -> Self {
        let phrases = domain
            .questions()
            .into_iter()
            .filter_map(|q| {
                domain
                    .phrase_for(q)
                    .map(|p| (q.topic().to_string(), p.to_string()))
            })
            .collect();
        Self { phrases }
    }

    pub fn with_phrase(mut self, topic: &str, phrase: &str) -> Self {
        self.phrases.insert(topic.to_string(), phrase.to_string());
        self
    }

    pub fn render(&self, mv: &DialogueMove) -> String {
        match &mv.kind {
            MoveKind::Ask(q) => self.render_question(q),
            MoveKind::Answer(a) => match &a.predicate {
                Some(p) => format!("The {} is {}.", spaced(p), a.value),
                None => format!("{}.", a.value),
            },
            MoveKind::Assert(p) => format!("The {} is {}.", spaced(&p.predicate), p.value),
            MoveKind::Request { task } => format!("Let's {}.", spaced(task)),
            MoveKind::Icm(Icm::Acknowledge) => "Okay.".to_string(),
            MoveKind::Icm(Icm::NotUnderstood) => "Sorry, I didn't understand that.".to_string(),
            MoveKind::Greet => "Hello.".to_string(),
            MoveKind::Quit => "Goodbye.".to_string(),
        }
    }

    fn render_question(&self, question: &Question) -> String {
        let phrase = self.phrases.get(question.topic());
        match question {
            Question::Alt { alternatives, .. } => {
                let options = or_list(alternatives);
                match phrase {
                    Some(p) if names_all(p, alternatives) => p.clone(),
                    Some(p) => format!("{}: {options}?", p.trim_end_matches('?')),
                    None => format!("{}?", capitalise(&options)),
                }
            }
            Question::Wh { predicate, .. } => phrase
                .cloned()
                .unwrap_or_else(|| format!("What is the {}?", spaced(predicate))),
            Question::YesNo { predicate } => phrase
                .cloned()
                .unwrap_or_else(|| format!("Is it true that {}?", spaced(predicate))),
        }
    }
}

#[async_trait]
impl Generator for TemplateGenerator {
    async fn generate(&self, mv: &DialogueMove, _state: &InformationState) -> Result<String> {
        Ok(self.render(mv))
    }
}

fn spaced(s: &str) -> String {
    s.replace('_', " ")
}

fn capitalise(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// The phrase already spells out every option.
fn names_all(phrase: &str, alternatives: &[String]) -> bool {
    let phrase = phrase.to_lowercase();
    alternatives.iter().all(|a| phrase.contains(&a.to_lowercase()))
}

/// "a or b", "a, b or c".
fn or_list(items: &[String]) -> String {
    match items.split_last() {
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} or {last}", rest.join(", ")),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::semantics::{Answer, Speaker};

    #[test]
    fn renders_residual_alternatives_with_the_topic_phrase() {
        let nlg = TemplateGenerator::new().with_phrase("colour", "Which colour?");
        let residual = Question::alt_about("colour", ["light blue", "dark blue"]).unwrap();
        let text = nlg.render(&DialogueMove::ask(Speaker::System, residual));
        assert_eq!(text, "Which colour: light blue or dark blue?");

        let bare = Question::alt(["tea", "coffee", "water"]).unwrap();
        assert_eq!(
            TemplateGenerator::new().render(&DialogueMove::ask(Speaker::System, bare)),
            "Tea, coffee or water?"
        );
    }

    #[test]
    fn renders_answers_and_grounding() {
        let nlg = TemplateGenerator::new();
        let answer = DialogueMove::answer(Speaker::System, Answer::full("weather", "sunny"));
        assert_eq!(nlg.render(&answer), "The weather is sunny.");
        assert_eq!(nlg.render(&DialogueMove::icm(Speaker::System, Icm::Acknowledge)), "Okay.");
    }
}

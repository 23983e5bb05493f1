use serde::{Deserialize, Serialize};

use super::answer::{Answer, Proposition};
use super::question::{Question, QuestionRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    System,
}

/// Interactive communication management: grounding moves about the dialogue
/// itself rather than the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Icm {
    /// "Okay."
    Acknowledge,
    /// "Sorry?" / "I didn't understand."
    NotUnderstood,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum MoveKind {
    Ask(Question),
    Answer(Answer),
    Assert(Proposition),
    Request { task: String },
    Icm(Icm),
    Greet,
    Quit,
}

/// Content-free tag of a move, safe to log and count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveTag {
    Ask,
    Answer,
    Assert,
    Request,
    Icm,
    Greet,
    Quit,
}

/// A dialogue move. Produced by interpretation or selection, immutable once
/// it sits on the agenda or in the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueMove {
    pub speaker: Speaker,
    pub kind: MoveKind,
    pub addresses: Option<QuestionRef>,
    /// NLU confidence, 0.0 - 1.0. Own moves are always 1.0.
    pub confidence: f32,
}

impl DialogueMove {
    pub fn new(speaker: Speaker, kind: MoveKind) -> Self {
        Self { speaker, kind, addresses: None, confidence: 1.0 }
    }

    pub fn ask(speaker: Speaker, question: Question) -> Self {
        Self::new(speaker, MoveKind::Ask(question))
    }

    pub fn answer(speaker: Speaker, answer: Answer) -> Self {
        let addresses = answer.question.clone();
        Self { addresses, ..Self::new(speaker, MoveKind::Answer(answer)) }
    }

    pub fn assert(speaker: Speaker, proposition: Proposition) -> Self {
        Self::new(speaker, MoveKind::Assert(proposition))
    }

    pub fn request(speaker: Speaker, task: impl Into<String>) -> Self {
        Self::new(speaker, MoveKind::Request { task: task.into() })
    }

    pub fn icm(speaker: Speaker, icm: Icm) -> Self {
        Self::new(speaker, MoveKind::Icm(icm))
    }

    pub fn greet(speaker: Speaker) -> Self {
        Self::new(speaker, MoveKind::Greet)
    }

    pub fn quit(speaker: Speaker) -> Self {
        Self::new(speaker, MoveKind::Quit)
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn addressing(mut self, question: QuestionRef) -> Self {
        self.addresses = Some(question);
        self
    }

    pub fn tag(&self) -> MoveTag {
        match self.kind {
            MoveKind::Ask(_) => MoveTag::Ask,
            MoveKind::Answer(_) => MoveTag::Answer,
            MoveKind::Assert(_) => MoveTag::Assert,
            MoveKind::Request { .. } => MoveTag::Request,
            MoveKind::Icm(_) => MoveTag::Icm,
            MoveKind::Greet => MoveTag::Greet,
            MoveKind::Quit => MoveTag::Quit,
        }
    }

    pub fn question(&self) -> Option<&Question> {
        match &self.kind {
            MoveKind::Ask(q) => Some(q),
            _ => None,
        }
    }

    /// The answer content with the move-level reference folded in.
    pub fn answer_content(&self) -> Option<Answer> {
        match &self.kind {
            MoveKind::Answer(a) => {
                let mut a = a.clone();
                if a.question.is_none() {
                    a.question = self.addresses.clone();
                }
                Some(a)
            }
            _ => None,
        }
    }

    /// Whether uttering this move hands the floor to the other party.
    pub fn yields_floor(&self) -> bool {
        matches!(
            self.kind,
            MoveKind::Ask(_) | MoveKind::Quit | MoveKind::Icm(Icm::NotUnderstood)
        )
    }
}

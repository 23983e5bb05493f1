//! Semantic value types: questions, answers, propositions and dialogue moves.

pub mod answer;
pub mod moves;
pub mod question;
pub mod resolution;

pub use answer::{Answer, Proposition, Value};
pub use moves::{DialogueMove, Icm, MoveKind, MoveTag, Speaker};
pub use question::{Question, QuestionRef};
pub use resolution::{bool_token, combines, normalize, relevant, resolution, resolved_by, resolves};

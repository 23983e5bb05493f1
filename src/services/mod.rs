//! External collaborators: natural language in and out.
//!
//! Both traits receive a read-only view of the state. Implementations may be
//! remote; the engine bounds every call with a timeout.

pub mod llm;
pub mod nlg;
pub mod nlu;

use async_trait::async_trait;

use crate::error::Result;
use crate::kernel::semantics::DialogueMove;
use crate::kernel::state::InformationState;

pub use llm::LlmGenerator;
pub use nlg::TemplateGenerator;
pub use nlu::KeywordInterpreter;

/// Utterance -> move.
///
/// `IbdmError::Interpretation` means the input could not be understood and is
/// handled as "no move". Any other error aborts the turn.
#[async_trait]
pub trait Interpreter: Send + Sync {
    async fn interpret(&self, utterance: &str, state: &InformationState) -> Result<DialogueMove>;
}

/// Move -> surface text.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, mv: &DialogueMove, state: &InformationState) -> Result<String>;
}

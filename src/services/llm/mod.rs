//! LLM-backed surface realisation.
//!
//! The dialogue decision is already made when generation runs: the model only
//! rephrases the template rendering of the selected move.

pub mod client;

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::nlg::TemplateGenerator;
use super::Generator;
use crate::error::{IbdmError, Result, Stage};
use crate::kernel::semantics::{DialogueMove, MoveTag};
use crate::kernel::state::InformationState;

pub use client::{CompletionClient, DEFAULT_BASE_URL};

const SYSTEM_PROMPT: &str = "You are a concise dialogue assistant. Rephrase the given line naturally. Keep its meaning, its question if it has one, and every option it lists. Reply with one sentence.";

#[derive(Debug, Clone)]
pub struct LlmGenerator {
    client: CompletionClient,
    templates: TemplateGenerator,
}

impl LlmGenerator {
    pub fn new(client: CompletionClient, templates: TemplateGenerator) -> Self {
        Self { client, templates }
    }

    pub fn local(templates: TemplateGenerator, timeout: Duration) -> Self {
        Self::new(CompletionClient::new(DEFAULT_BASE_URL, timeout), templates)
    }

    /// Pure function: move -> prompt.
    pub fn build_prompt(&self, mv: &DialogueMove) -> String {
        let line = self.templates.render(mv);
        let act = match mv.tag() {
            MoveTag::Ask => "a question",
            MoveTag::Answer => "an answer",
            MoveTag::Assert => "a statement",
            MoveTag::Request => "a suggestion",
            MoveTag::Icm => "a short feedback",
            MoveTag::Greet => "a greeting",
            MoveTag::Quit => "a farewell",
        };
        format!("System: {SYSTEM_PROMPT}\nUser: Rephrase {act}: \"{line}\"\nAssistant:")
    }
}

#[async_trait]
impl Generator for LlmGenerator {
    async fn generate(&self, mv: &DialogueMove, _state: &InformationState) -> Result<String> {
        let prompt = self.build_prompt(mv);
        let text = self
            .client
            .complete(&prompt)
            .await
            .map_err(|e| IbdmError::Collaborator { stage: Stage::Generate, reason: e.to_string() })?;
        if text.is_empty() {
            debug!(tag = ?mv.tag(), "empty completion, using template");
            return Ok(self.templates.render(mv));
        }
        Ok(text)
    }
}

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use ibdm::kernel::plan::PlanAction;
use ibdm::kernel::semantics::{DialogueMove, Proposition, Question, Speaker};
use ibdm::services::{Generator, Interpreter, KeywordInterpreter, TemplateGenerator};
use ibdm::{DialogueMoveEngine, EngineConfig, IbdmError, InformationState, Result, Stage, StaticDomain};

pub fn weather() -> Question {
    Question::wh_unconstrained("x", "weather").unwrap()
}

pub fn city() -> Question {
    Question::wh("x", "city", [("type", "text")]).unwrap()
}

pub fn colour() -> Question {
    Question::wh("x", "colour", [("one_of", "light blue|dark blue|red")]).unwrap()
}

pub fn party() -> Question {
    Question::wh("x", "party", [("type", "text")]).unwrap()
}

pub fn nda_type() -> Question {
    Question::alt_about("nda_type", ["mutual", "one-way"]).unwrap()
}

pub fn domain() -> StaticDomain {
    StaticDomain::new("fixture")
        .with_question(weather(), None)
        .with_question(city(), Some("Which city?"))
        .with_question(colour(), Some("Which colour?"))
        .with_question(party(), Some("Who is the other party?"))
        .with_question(nda_type(), None)
        .with_task(
            "draft_nda",
            ["nda"],
            vec![
                PlanAction::Findout(party()),
                PlanAction::Findout(nda_type()),
                PlanAction::Inform(Proposition::new("nda_status", "drafted")),
            ],
        )
        .with_dependency("weather", "city")
        .with_belief("weather.oslo", "rainy")
}

pub fn engine_with(
    interpreter: Arc<dyn Interpreter>,
    generator: Arc<dyn Generator>,
    config: EngineConfig,
) -> Arc<DialogueMoveEngine> {
    Arc::new(DialogueMoveEngine::new(Arc::new(domain()), interpreter, generator, config))
}

pub fn engine() -> Arc<DialogueMoveEngine> {
    let domain = domain();
    let interpreter = KeywordInterpreter::from_domain(&domain);
    let generator = TemplateGenerator::from_domain(&domain);
    engine_with(Arc::new(interpreter), Arc::new(generator), EngineConfig::default())
}

/// Fresh state with the fixture's beliefs.
pub fn initial_state() -> InformationState {
    engine().initial_state()
}

pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(&self, _mv: &DialogueMove, _state: &InformationState) -> Result<String> {
        Err(IbdmError::Collaborator { stage: Stage::Generate, reason: "generator offline".into() })
    }
}

pub struct FailingInterpreter;

#[async_trait]
impl Interpreter for FailingInterpreter {
    async fn interpret(&self, _utterance: &str, _state: &InformationState) -> Result<DialogueMove> {
        Err(IbdmError::Collaborator { stage: Stage::Interpret, reason: "nlu offline".into() })
    }
}

/// Sleeps before understanding everything as a greeting.
pub struct SlowInterpreter(pub Duration);

#[async_trait]
impl Interpreter for SlowInterpreter {
    async fn interpret(&self, _utterance: &str, _state: &InformationState) -> Result<DialogueMove> {
        tokio::time::sleep(self.0).await;
        Ok(DialogueMove::greet(Speaker::User))
    }
}

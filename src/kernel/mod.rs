//! The dialogue kernel: information state, rules and the move engine.
//!
//! Everything here except the engine's collaborator calls is synchronous and
//! deterministic.

pub mod audit;
pub mod context;
pub mod domain;
pub mod engine;
pub mod plan;
pub mod qud;
pub mod select;
pub mod semantics;
pub mod state;
pub mod telemetry;
pub mod update;

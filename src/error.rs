//! Engine error types.
//!
//! Only configuration and loading errors are fatal. Interpretation failures are
//! downgraded to "no move" by the engine, and collaborator failures roll the
//! turn back to the pre-turn state.

use serde::{Deserialize, Serialize};

/// Which external call a collaborator error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Interpret,
    Generate,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Interpret => write!(f, "interpret"),
            Stage::Generate => write!(f, "generate"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IbdmError {
    /// Malformed question, plan or domain definition. Fatal at load time.
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    /// The NLU could not map the utterance to a move (ambiguous or uninterpretable).
    #[error("could not interpret utterance: {reason}")]
    Interpretation { reason: String },

    /// NLU/NLG call failed for reasons other than interpretation.
    #[error("{stage} collaborator failed: {reason}")]
    Collaborator { stage: Stage, reason: String },

    #[error("{stage} collaborator timed out after {timeout_ms}ms")]
    Timeout { stage: Stage, timeout_ms: u64 },

    #[error("turn cancelled")]
    Cancelled,

    /// A user turn arrived after the dialogue was terminated.
    #[error("dialogue has already ended")]
    DialogueEnded,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl IbdmError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration { reason: reason.into() }
    }

    pub fn interpretation(reason: impl Into<String>) -> Self {
        Self::Interpretation { reason: reason.into() }
    }

    /// Errors that must abort the turn and leave the state untouched.
    pub fn is_rollback(&self) -> bool {
        matches!(self, Self::Collaborator { .. } | Self::Timeout { .. } | Self::Cancelled)
    }

    /// The collaborator call this error came from, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Collaborator { stage, .. } | Self::Timeout { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, IbdmError>;

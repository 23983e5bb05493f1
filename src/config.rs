use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{IbdmError, Result};

/// Engine-wide knobs. Every field has a default so a partial TOML file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Moves interpreted below this confidence are not integrated as answers,
    /// and trigger a clarification on the following selection.
    pub clarification_threshold: f32,
    /// Upper bound on system-initiative cycles run after a user turn.
    pub max_system_cycles: usize,
    /// Hard timeout on each NLU/NLG call.
    pub collaborator_timeout_ms: u64,
    /// Put a greeting on the agenda when a session opens.
    pub greet_on_start: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            clarification_threshold: 0.5,
            max_system_cycles: 6,
            collaborator_timeout_ms: 2000,
            greet_on_start: true,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.clarification_threshold) {
            return Err(IbdmError::configuration(format!(
                "clarification_threshold must be within 0.0..=1.0, got {}",
                self.clarification_threshold
            )));
        }
        if self.collaborator_timeout_ms == 0 {
            return Err(IbdmError::configuration(
                "collaborator_timeout_ms must be positive",
            ));
        }
        Ok(())
    }
}

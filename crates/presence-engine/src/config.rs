//! Engine defaults, loadable from JSON.
//!
//! Every field has a default, so `{}` is a valid config.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// One year. Longer periods are almost certainly unit mistakes.
const MAX_MINUTES: i64 = 366 * 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Slot width used when a caller does not supply one.
    pub default_resolution_minutes: i64,
    /// How long a "done early" `FREE_NOW` lasts when no end is given.
    pub done_early_minutes: i64,
    /// Buffer size of the presence broadcast channel.
    pub channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_resolution_minutes: 15,
            done_early_minutes: 60,
            channel_capacity: 1024,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_resolution_minutes <= 0 {
            return Err(EngineError::InvalidConfig(format!(
                "default_resolution_minutes must be positive, got {}",
                self.default_resolution_minutes
            )));
        }
        if self.default_resolution_minutes > MAX_MINUTES {
            return Err(EngineError::InvalidConfig(format!(
                "default_resolution_minutes {} exceeds {}",
                self.default_resolution_minutes, MAX_MINUTES
            )));
        }
        if self.done_early_minutes <= 0 || self.done_early_minutes > MAX_MINUTES {
            return Err(EngineError::InvalidConfig(format!(
                "done_early_minutes must be in 1..={}, got {}",
                MAX_MINUTES, self.done_early_minutes
            )));
        }
        if self.channel_capacity == 0 {
            return Err(EngineError::InvalidConfig(
                "channel_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

//! Configuration for eager loading passes

use serde::{Deserialize, Serialize};

use crate::error::{IncludeError, IncludeResult};

/// Configuration for the eager loader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EagerLoadConfig {
    /// Run independent batches of the same level concurrently
    pub parallel_execution: bool,
    /// Maximum depth of nested inclusions
    pub max_depth: usize,
}

impl Default for EagerLoadConfig {
    fn default() -> Self {
        Self {
            parallel_execution: true,
            max_depth: 10,
        }
    }
}

impl EagerLoadConfig {
    /// Parse configuration from JSON, filling missing fields with defaults
    pub fn from_json_str(json: &str) -> IncludeResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> IncludeResult<()> {
        if self.max_depth == 0 {
            return Err(IncludeError::Configuration(
                "max_depth must allow at least one level".to_string(),
            ));
        }
        Ok(())
    }

    /// Disable concurrent batches
    pub fn sequential(mut self) -> Self {
        self.parallel_execution = false;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

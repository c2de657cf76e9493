//! Configuration for the compiler

use adoq_domain::STORE_HARD_LIMIT;
use serde::{Deserialize, Serialize};

/// Result-cap policy for compiled queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Cap used when a filter does not request one
    pub default_result_cap: usize,

    /// Largest cap a filter may request; larger requests are clamped
    pub max_result_cap: usize,
}

impl CompilerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.default_result_cap == 0 {
            return Err("default_result_cap must be greater than 0".to_string());
        }
        if self.max_result_cap < self.default_result_cap {
            return Err("max_result_cap cannot be below default_result_cap".to_string());
        }
        if self.max_result_cap > STORE_HARD_LIMIT {
            return Err(format!(
                "max_result_cap cannot exceed the store limit of {}",
                STORE_HARD_LIMIT
            ));
        }
        Ok(())
    }

    /// Cap for a filter requesting `requested` rows
    pub fn effective_cap(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_result_cap)
            .min(self.max_result_cap)
            .min(STORE_HARD_LIMIT)
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            default_result_cap: 150,
            max_result_cap: 1000,
        }
    }
}

impl CompilerConfig {
    /// Small result sets, for interactive use over slow connections
    pub fn aggressive() -> Self {
        Self {
            default_result_cap: 50,
            max_result_cap: 250,
        }
    }

    /// Large result sets, up to the store limit
    pub fn lenient() -> Self {
        Self {
            default_result_cap: 500,
            max_result_cap: STORE_HARD_LIMIT,
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

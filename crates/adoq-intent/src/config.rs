//! Configuration for the Intent Classifier

use crate::cues::CueSet;
use serde::{Deserialize, Serialize};

/// How utterances are classified
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Ask the language model, parse its JSON strictly
    #[default]
    Oracle,
    /// Cue detection and regex extraction only; works offline
    Heuristic,
}

/// Configuration for the Intent Classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Classification strategy
    pub strategy: Strategy,

    /// Decisions below this confidence are refused
    pub confidence_threshold: f64,

    /// Re-run the expired entry's filter instead of failing with no data
    pub downgrade_without_cache: bool,

    /// Fall back to the heuristic when the oracle call itself fails
    pub heuristic_fallback: bool,

    /// Token budget for the oracle classification call
    pub classification_max_tokens: u32,

    /// Token budget when the oracle also extracts a filter
    pub extraction_max_tokens: u32,

    /// Recent conversation turns included in the oracle prompt
    pub history_turns: usize,

    /// Cue vocabulary
    pub cues: CueSet,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Oracle,
            confidence_threshold: 0.6,
            downgrade_without_cache: false,
            heuristic_fallback: false,
            classification_max_tokens: 500,
            extraction_max_tokens: 2000,
            history_turns: 5,
            cues: CueSet::default(),
        }
    }
}

impl ClassifierConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err("confidence_threshold must be between 0.0 and 1.0".to_string());
        }
        if self.classification_max_tokens == 0 {
            return Err("classification_max_tokens must be greater than 0".to_string());
        }
        if self.extraction_max_tokens < self.classification_max_tokens {
            return Err(
                "extraction_max_tokens cannot be less than classification_max_tokens".to_string(),
            );
        }
        self.cues.validate()
    }

    /// Aggressive preset: acts on weaker signals, re-fetches when the cache is gone
    pub fn aggressive() -> Self {
        Self {
            confidence_threshold: 0.4,
            downgrade_without_cache: true,
            heuristic_fallback: true,
            ..Self::default()
        }
    }

    /// Lenient preset: refuses anything uncertain, more context for the oracle
    pub fn lenient() -> Self {
        Self {
            confidence_threshold: 0.8,
            history_turns: 10,
            extraction_max_tokens: 4000,
            ..Self::default()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(ClassifierConfig::default().validate().is_ok());
        assert!(ClassifierConfig::aggressive().validate().is_ok());
        assert!(ClassifierConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_invalid_threshold() {
        let config = ClassifierConfig {
            confidence_threshold: 1.5,
            ..ClassifierConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_token_budgets() {
        let config = ClassifierConfig {
            classification_max_tokens: 3000,
            ..ClassifierConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ClassifierConfig::from_toml("strategy = \"heuristic\"\n").unwrap();
        assert_eq!(config.strategy, Strategy::Heuristic);
        assert_eq!(config.confidence_threshold, 0.6);
        assert_eq!(config.cues, CueSet::default());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = ClassifierConfig::aggressive();
        let parsed = ClassifierConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(config, parsed);
    }
}

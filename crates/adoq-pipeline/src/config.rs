//! Configuration for the Pipeline and Analyzer

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the Analyzer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Records included in one analysis prompt
    pub max_items_analyzed: usize,

    /// Title length kept per record (characters)
    pub title_max_chars: usize,

    /// Tags kept per record
    pub max_tags: usize,

    /// Most recent comments kept per record
    pub max_comments: usize,

    /// Comment length kept (characters)
    pub comment_max_chars: usize,

    /// Token budget for the analysis call
    pub analysis_max_tokens: u32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_items_analyzed: 250,
            title_max_chars: 160,
            max_tags: 3,
            max_comments: 5,
            comment_max_chars: 300,
            analysis_max_tokens: 10_000,
        }
    }
}

impl AnalyzerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_items_analyzed == 0 {
            return Err("max_items_analyzed must be greater than 0".to_string());
        }
        if self.title_max_chars == 0 {
            return Err("title_max_chars must be greater than 0".to_string());
        }
        if self.analysis_max_tokens == 0 {
            return Err("analysis_max_tokens must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Configuration for the Pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum time for classification, oracle call included (seconds)
    pub classification_timeout_secs: u64,

    /// Maximum time for one fetch (seconds)
    pub fetch_timeout_secs: u64,

    /// Maximum time for one analysis call (seconds)
    pub analysis_timeout_secs: u64,

    /// Analyzer settings
    pub analyzer: AnalyzerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            classification_timeout_secs: 60,
            fetch_timeout_secs: 120,
            analysis_timeout_secs: 180,
            analyzer: AnalyzerConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Classification deadline
    pub fn classification_timeout(&self) -> Duration {
        Duration::from_secs(self.classification_timeout_secs)
    }

    /// Fetch deadline
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Analysis deadline
    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.classification_timeout_secs == 0 {
            return Err("classification_timeout_secs must be greater than 0".to_string());
        }
        if self.fetch_timeout_secs == 0 {
            return Err("fetch_timeout_secs must be greater than 0".to_string());
        }
        if self.analysis_timeout_secs == 0 {
            return Err("analysis_timeout_secs must be greater than 0".to_string());
        }
        self.analyzer.validate()
    }

    /// Aggressive preset: short deadlines, small analysis prompts
    pub fn aggressive() -> Self {
        Self {
            classification_timeout_secs: 20,
            fetch_timeout_secs: 45,
            analysis_timeout_secs: 60,
            analyzer: AnalyzerConfig {
                max_items_analyzed: 50,
                max_comments: 3,
                analysis_max_tokens: 4000,
                ..AnalyzerConfig::default()
            },
        }
    }

    /// Lenient preset: long deadlines, more context per record
    pub fn lenient() -> Self {
        Self {
            classification_timeout_secs: 120,
            fetch_timeout_secs: 300,
            analysis_timeout_secs: 600,
            analyzer: AnalyzerConfig {
                max_items_analyzed: 500,
                max_tags: 10,
                max_comments: 10,
                ..AnalyzerConfig::default()
            },
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

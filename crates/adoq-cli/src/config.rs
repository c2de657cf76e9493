//! Configuration file for the CLI.
//!
//! One TOML file aggregates the configuration of every layer:
//!
//! ```toml
//! project = "Contoso"
//! format = "table"
//!
//! [compiler]
//! default_result_cap = 150
//!
//! [cache]
//! ttl_secs = 600
//!
//! [classifier]
//! confidence_threshold = 0.6
//!
//! [llm]
//! endpoint = "https://name.openai.azure.com"
//! deployment = "gpt-4o-mini"
//! ```

use crate::error::{CliError, Result};
use adoq_cache::CacheConfig;
use adoq_intent::ClassifierConfig;
use adoq_llm::AzureOpenAiConfig;
use adoq_pipeline::PipelineConfig;
use adoq_wiql::CompilerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Team project queries are scoped to; unset uses `@Project`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Default output format
    pub format: OutputFormat,

    /// Query compilation
    pub compiler: CompilerConfig,

    /// Result cache freshness
    pub cache: CacheConfig,

    /// Intent classification
    pub classifier: ClassifierConfig,

    /// Stage deadlines and analysis limits
    pub pipeline: PipelineConfig,

    /// Azure OpenAI connection; an empty endpoint disables the oracle
    pub llm: AzureOpenAiConfig,
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    #[default]
    Table,
    /// JSON format
    Json,
}

impl AppConfig {
    /// Default configuration file path (`~/.adoq/config.toml`).
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".adoq").join("config.toml"))
    }

    /// Load configuration from a file, or the defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save configuration to a file, creating its directory.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Whether an oracle endpoint is configured.
    pub fn has_llm(&self) -> bool {
        !self.llm.endpoint.trim().is_empty()
    }

    /// Validate every section, naming the one that failed.
    pub fn validate(&self) -> Result<()> {
        let section = |name: &str, result: std::result::Result<(), String>| {
            result.map_err(|e| CliError::Config(format!("[{}] {}", name, e)))
        };

        section("compiler", self.compiler.validate())?;
        section("cache", self.cache.validate())?;
        section("classifier", self.classifier.validate())?;
        section("pipeline", self.pipeline.validate())?;
        if self.has_llm() {
            section("llm", self.llm.validate())?;
        }
        Ok(())
    }
}

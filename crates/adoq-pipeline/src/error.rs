//! Error types for the Pipeline

use adoq_intent::IntentError;
use adoq_wiql::CompileError;
use thiserror::Error;

/// Errors that can occur while handling a turn
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Classification failed or was refused
    #[error(transparent)]
    Intent(#[from] IntentError),

    /// The filter did not compile
    #[error("Query compilation failed: {0}")]
    Compile(#[from] CompileError),

    /// Work-item store error; the cache was left untouched
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Analysis oracle error
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// A blocking stage ran past its deadline
    #[error("{0} timed out")]
    Timeout(&'static str),

    /// A blocking task panicked or was cancelled
    #[error("Task join error: {0}")]
    Join(String),

    /// Analysis requested but the session has no fresh results
    #[error("No cached results for this session; run a query first")]
    NoCachedData,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Whether asking the user to rephrase could help
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::Intent(
                IntentError::IntentExtraction(_)
                    | IntentError::LowConfidence { .. }
                    | IntentError::NoCachedData
            ) | PipelineError::Compile(_)
                | PipelineError::NoCachedData
        )
    }
}

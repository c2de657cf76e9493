//! Error types for the intent classifier

use thiserror::Error;

/// Errors that can occur during classification
///
/// All but `Generation` are recoverable by asking the user again.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntentError {
    /// Criteria could not be turned into a valid filter
    #[error("Could not extract query criteria: {0}")]
    IntentExtraction(String),

    /// Classification too uncertain to act on
    #[error("Not confident enough to act ({confidence:.2} < {threshold:.2}); please rephrase or add detail")]
    LowConfidence {
        /// Confidence of the best reading
        confidence: f64,
        /// Configured threshold
        threshold: f64,
    },

    /// Analysis requested but the session has no fresh results
    #[error("No cached results for this session; run a query first")]
    NoCachedData,

    /// The text-generation oracle failed
    #[error("Text generation failed: {0}")]
    Generation(String),
}

impl From<serde_json::Error> for IntentError {
    fn from(e: serde_json::Error) -> Self {
        IntentError::IntentExtraction(format!("JSON parse error: {}", e))
    }
}

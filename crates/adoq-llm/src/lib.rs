//! adoq LLM Provider Layer
//!
//! Implementations of the `LlmProvider` trait from `adoq-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `AzureOpenAiProvider`: Azure OpenAI chat completions
//!
//! # Examples
//!
//! ```
//! use adoq_llm::MockProvider;
//! use adoq_domain::traits::LlmProvider;
//!
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = provider.generate("test prompt", 100).unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! ```

#![warn(missing_docs)]

pub mod azure;

use adoq_domain::traits::LlmProvider as LlmProviderTrait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

pub use azure::{AuthScheme, AzureOpenAiConfig, AzureOpenAiProvider};

/// Errors that can occur during LLM operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Deployment or model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Provider misconfigured (missing credential, bad endpoint)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

#[derive(Debug, Default)]
struct MockState {
    responses: HashMap<String, String>,
    errors: HashSet<String>,
    queue: VecDeque<String>,
    prompts: Vec<String>,
    last_max_tokens: Option<u32>,
}

/// Mock LLM provider for deterministic testing
///
/// Resolution order for each call: an error registered for the exact
/// prompt, a response registered for the exact prompt, the next queued
/// response, then the default response.
///
/// # Examples
///
/// ```
/// use adoq_llm::MockProvider;
/// use adoq_domain::traits::LlmProvider;
///
/// let provider = MockProvider::new("fallback");
/// provider.add_response("ping", "pong");
/// provider.push_response("first");
///
/// assert_eq!(provider.generate("ping", 10).unwrap(), "pong");
/// assert_eq!(provider.generate("anything", 10).unwrap(), "first");
/// assert_eq!(provider.generate("anything", 10).unwrap(), "fallback");
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a specific response for a given prompt
    pub fn add_response(&self, prompt: impl Into<String>, response: impl Into<String>) {
        self.state().responses.insert(prompt.into(), response.into());
    }

    /// Queue a response for the next call that has no exact-prompt match
    pub fn push_response(&self, response: impl Into<String>) {
        self.state().queue.push_back(response.into());
    }

    /// Configure to return an error for a specific prompt
    pub fn add_error(&self, prompt: impl Into<String>) {
        self.state().errors.insert(prompt.into());
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        self.state().prompts.len()
    }

    /// Prompts received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.state().prompts.clone()
    }

    /// Token budget of the most recent call
    pub fn last_max_tokens(&self) -> Option<u32> {
        self.state().last_max_tokens
    }

    /// Forget recorded calls
    pub fn reset_call_count(&self) {
        let mut state = self.state();
        state.prompts.clear();
        state.last_max_tokens = None;
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl LlmProviderTrait for MockProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, Self::Error> {
        let mut state = self.state();
        state.prompts.push(prompt.to_string());
        state.last_max_tokens = Some(max_tokens);

        if state.errors.contains(prompt) {
            return Err(LlmError::Other("Mock error".to_string()));
        }
        if let Some(response) = state.responses.get(prompt) {
            return Ok(response.clone());
        }
        if let Some(response) = state.queue.pop_front() {
            return Ok(response);
        }
        Ok(self.default_response.clone())
    }

    fn generate_structured(
        &self,
        prompt: &str,
        _schema: &str,
        max_tokens: u32,
    ) -> Result<String, Self::Error> {
        self.generate(prompt, max_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_provider_default() {
        let provider = MockProvider::new("Test response");
        assert_eq!(provider.generate("any prompt", 50).unwrap(), "Test response");
    }

    #[test]
    fn test_mock_provider_specific_responses() {
        let provider = MockProvider::default();
        provider.add_response("hello", "world");
        provider.add_response("foo", "bar");

        assert_eq!(provider.generate("hello", 1).unwrap(), "world");
        assert_eq!(provider.generate("foo", 1).unwrap(), "bar");
        assert_eq!(provider.generate("unknown", 1).unwrap(), "Default mock response");
    }

    #[test]
    fn test_mock_provider_queue_is_fifo() {
        let provider = MockProvider::new("done");
        provider.push_response("one");
        provider.push_response("two");

        assert_eq!(provider.generate("a", 1).unwrap(), "one");
        assert_eq!(provider.generate("b", 1).unwrap(), "two");
        assert_eq!(provider.generate("c", 1).unwrap(), "done");
    }

    #[test]
    fn test_mock_provider_records_calls() {
        let provider = MockProvider::new("test");
        assert_eq!(provider.call_count(), 0);

        provider.generate("prompt1", 500).unwrap();
        provider.generate_structured("prompt2", "{}", 2000).unwrap();

        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.prompts(), vec!["prompt1", "prompt2"]);
        assert_eq!(provider.last_max_tokens(), Some(2000));

        provider.reset_call_count();
        assert_eq!(provider.call_count(), 0);
        assert_eq!(provider.last_max_tokens(), None);
    }

    #[test]
    fn test_mock_provider_error() {
        let provider = MockProvider::default();
        provider.add_error("bad prompt");

        let result = provider.generate("bad prompt", 10);
        assert!(matches!(result, Err(LlmError::Other(_))));
    }

    #[test]
    fn test_mock_provider_clone_shares_state() {
        let provider1 = MockProvider::new("test");
        let provider2 = provider1.clone();

        provider1.generate("test", 1).unwrap();

        assert_eq!(provider1.call_count(), 1);
        assert_eq!(provider2.call_count(), 1);
    }
}

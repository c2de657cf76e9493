//! Trait definitions for external collaborators
//!
//! The core never talks to the network itself. These traits are the seams
//! where the work-item store and the text-generation service plug in.

use crate::{CompiledQuery, WorkItem};

/// Text-generation oracle
///
/// Implemented by the infrastructure layer (adoq-llm). Output is untrusted:
/// callers must validate anything they parse out of it.
pub trait LlmProvider {
    /// Error type for generation
    type Error;

    /// Generate a completion of at most `max_tokens` tokens
    fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, Self::Error>;

    /// Generate output that should conform to a JSON schema
    fn generate_structured(
        &self,
        prompt: &str,
        schema: &str,
        max_tokens: u32,
    ) -> Result<String, Self::Error>;
}

/// Executes compiled queries against the work-item store
///
/// Returns the complete, ordered result set, or an error. Implementations
/// must never hand back a partially populated set: auxiliary data that
/// fails to load fails the whole fetch.
pub trait FetchExecutor {
    /// Error type for fetches
    type Error;

    /// Run the query and load the auxiliary data it asks for
    fn execute(&self, query: &CompiledQuery) -> Result<Vec<WorkItem>, Self::Error>;
}

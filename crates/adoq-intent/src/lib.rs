//! adoq Intent Classifier
//!
//! Decides, for each user utterance, whether the turn needs a fresh fetch,
//! an analysis of the session's cached results, or both.
//!
//! # Key Concepts
//!
//! - **Oracle strategy**: the language model sees the cache state, recent
//!   turns and the field vocabulary, and answers with one JSON decision that
//!   is parsed strictly. Unknown keys, fields, operators or analysis types
//!   and filters that would not compile are all rejected.
//! - **Heuristic strategy**: configurable cue lists plus regex extraction of
//!   IDs, types, states, priorities, dates, tags and quoted phrases. Runs
//!   without a model.
//! - **Decision rules**: applied to both strategies. A cached analysis is
//!   only returned while the session's entry is fresh, and anything below
//!   the confidence threshold is refused.
//!
//! # Architecture
//!
//! ```text
//! utterance ─┬→ PromptBuilder → LlmProvider → parse_decision ─┐
//!            └→ CueSet + CriteriaExtractor ───────────────────┴→ rules → IntentDecision
//! ```
//!
//! # Example Usage
//!
//! ```
//! use adoq_cache::ResultCache;
//! use adoq_domain::{IntentKind, SessionId};
//! use adoq_intent::{ClassifierConfig, ClassifyContext, IntentClassifier, Strategy};
//! use adoq_llm::MockProvider;
//! use adoq_wiql::Compiler;
//! use std::sync::Arc;
//!
//! let config = ClassifierConfig {
//!     strategy: Strategy::Heuristic,
//!     ..ClassifierConfig::default()
//! };
//! let classifier: IntentClassifier<MockProvider> =
//!     IntentClassifier::heuristic_only(Arc::new(Compiler::standard()), config);
//!
//! let cache = ResultCache::default();
//! let ctx = ClassifyContext::new(SessionId::new(), &cache);
//! let decision = classifier.classify("active bugs assigned to me", &ctx).unwrap();
//! assert_eq!(decision.kind(), IntentKind::NewQuery);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classifier;
pub mod config;
pub mod cues;
pub mod error;
pub mod extract;
pub mod parser;
pub mod prompt;

pub use classifier::{ClassifyContext, IntentClassifier};
pub use config::{ClassifierConfig, Strategy};
pub use cues::{CueMatch, CueSet};
pub use error::IntentError;
pub use extract::{Criteria, CriteriaExtractor};
pub use parser::parse_decision;

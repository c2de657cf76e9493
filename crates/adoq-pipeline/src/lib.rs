//! adoq Pipeline
//!
//! Carries one conversation turn from utterance to answer.
//!
//! # Architecture
//!
//! ```text
//! utterance → IntentClassifier ─┬─ NEW_QUERY ──────→ Compiler → FetchExecutor → ResultCache
//!                               ├─ CACHED_ANALYSIS → ResultCache → Analyzer
//!                               └─ COMBINED ───────→ fetch + cache, then Analyzer on the new entry
//! ```
//!
//! The classifier, the fetch executor and the analysis oracle are all
//! blocking. Each runs on tokio's blocking pool under its own deadline, and
//! a fetch that fails or times out leaves the session's cached set as it was.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod pipeline;

pub use analysis::{AnalysisReport, Analyzer, CompactComment, CompactRecord};
pub use config::{AnalyzerConfig, PipelineConfig};
pub use error::PipelineError;
pub use pipeline::{describe_filter, Pipeline, TurnOutcome};

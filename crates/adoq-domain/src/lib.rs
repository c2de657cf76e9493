//! adoq Domain Layer
//!
//! Core vocabulary shared by every other adoq crate: the field registry,
//! the structured filter a query intent is expressed in, compiled queries,
//! normalized work items and the classifier's decisions.
//!
//! ## Key Concepts
//!
//! - **Field Registry**: friendly names and aliases resolved to canonical
//!   references with a declared value type
//! - **FilterSpec**: what to retrieve, independent of query syntax
//! - **CompiledQuery**: escaped query text plus its result cap
//! - **IntentDecision**: fetch, analyze the cache, or both
//!
//! ## Architecture
//!
//! No I/O lives here. The store and the text-generation service are reached
//! through the traits in [`traits`], implemented by infrastructure crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod field;
pub mod filter;
pub mod intent;
pub mod query;
pub mod registry;
pub mod session;
pub mod traits;
pub mod work_item;

// Re-exports for convenience
pub use field::{Operator, ValueType};
pub use filter::{
    AuxiliaryData, DateRange, DateWindow, FilterSpec, FilterSpecBuilder, Literal, Predicate,
    PredicateValue, RelativePeriod, SortDirection, SortSpec,
};
pub use intent::{AnalysisRequest, AnalysisType, IntentDecision, IntentKind};
pub use query::{CompiledQuery, STORE_HARD_LIMIT};
pub use registry::{refs, FieldDef, FieldRegistry, TypeResolution, UnknownField};
pub use session::SessionId;
pub use traits::{FetchExecutor, LlmProvider};
pub use work_item::{Comment, StateTransition, WorkItem};

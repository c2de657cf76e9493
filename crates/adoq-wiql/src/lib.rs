//! adoq WIQL Compiler
//!
//! Turns a [`FilterSpec`](adoq_domain::FilterSpec) or a WHERE-only fragment
//! into a complete, escaped WIQL statement with a result cap.
//!
//! Compilation is pure: the same filter, registry and context always give
//! the same text. Any incompatibility aborts compilation; there is no
//! best-effort output.
//!
//! ## Statement shape
//!
//! ```text
//! SELECT <core columns> FROM WorkItems
//! WHERE <scope> AND <predicates> AND <date window> AND <free text>
//! ORDER BY [<sort>,] [System.ChangedDate] DESC
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compiler;
pub mod config;
pub mod error;
pub mod escape;
mod fragment;
pub mod macros;

pub use compiler::{CompileContext, Compiler, QueryInput, CORE_COLUMNS};
pub use config::CompilerConfig;
pub use error::CompileError;
pub use escape::{escape, quote_field, quote_literal, unescape};

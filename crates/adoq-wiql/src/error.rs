//! Error types for the compiler

use adoq_domain::{Operator, UnknownField, ValueType};
use thiserror::Error;

/// Errors that abort compilation
///
/// Every variant names what was wrong; no variant ever comes with a
/// partially assembled query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Field name not in the registry
    #[error("Unknown field: '{0}'")]
    UnknownField(String),

    /// Operator not allowed for the field's value type
    #[error("Operator '{operator}' cannot be applied to {field} ({value_type})")]
    OperatorTypeMismatch {
        /// Canonical field reference
        field: String,
        /// Offending operator
        operator: Operator,
        /// The field's declared value type
        value_type: ValueType,
    },

    /// No IDs, predicates or free-text terms
    #[error("Filter selects everything: add IDs, predicates or search terms")]
    EmptyFilter,

    /// Value has the wrong shape or kind for its field
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Field the value belongs to
        field: String,
        /// What is wrong with it
        reason: String,
    },

    /// WHERE fragment could not be accepted
    #[error("Malformed WHERE fragment: {0}")]
    MalformedFragment(String),
}

impl CompileError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CompileError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<UnknownField> for CompileError {
    fn from(e: UnknownField) -> Self {
        CompileError::UnknownField(e.name)
    }
}

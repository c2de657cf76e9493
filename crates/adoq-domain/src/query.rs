//! CompiledQuery - a finished, escaped WIQL statement

use crate::filter::AuxiliaryData;
use std::fmt;

/// Hard limit on result rows the store will return for one query
pub const STORE_HARD_LIMIT: usize = 20_000;

/// An immutable, grammar-valid query plus its result cap
///
/// Only the compiler constructs these. WIQL has no in-statement row limit,
/// so the cap travels next to the text and is sent as the `$top` request
/// parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    text: String,
    result_cap: usize,
    include: AuxiliaryData,
}

impl CompiledQuery {
    /// Assemble a compiled query
    ///
    /// The cap is forced into `1..=STORE_HARD_LIMIT`.
    pub fn new(text: String, result_cap: usize, include: AuxiliaryData) -> Self {
        Self {
            text,
            result_cap: result_cap.clamp(1, STORE_HARD_LIMIT),
            include,
        }
    }

    /// Query text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Maximum number of records to retrieve
    pub fn result_cap(&self) -> usize {
        self.result_cap
    }

    /// Auxiliary per-record data the executor must load
    pub fn include(&self) -> AuxiliaryData {
        self.include
    }

    /// The cap rendered as a request parameter
    ///
    /// # Examples
    ///
    /// ```
    /// use adoq_domain::{AuxiliaryData, CompiledQuery};
    ///
    /// let q = CompiledQuery::new("SELECT [System.Id] FROM WorkItems".into(), 50, AuxiliaryData::default());
    /// assert_eq!(q.top_parameter(), "$top=50");
    /// ```
    pub fn top_parameter(&self) -> String {
        format!("$top={}", self.result_cap)
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cap_is_never_zero_or_above_hard_limit() {
        let q = CompiledQuery::new(String::new(), 0, AuxiliaryData::default());
        assert_eq!(q.result_cap(), 1);

        let q = CompiledQuery::new(String::new(), 1_000_000, AuxiliaryData::default());
        assert_eq!(q.result_cap(), STORE_HARD_LIMIT);
    }
}

//! Field value types and WIQL comparison operators
//!
//! The compatibility between the two is a closed table: every
//! `(ValueType, Operator)` pair is decided by an exhaustive match, so adding a
//! variant to either enum forces the table to be revisited.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value type of a queryable field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Short string (state, tags, work item type)
    String,

    /// Person reference (assigned to, created by)
    Identity,

    /// Whole number (priority, severity rank, rev)
    Integer,

    /// Date or date-time
    DateTime,

    /// Hierarchical path (area, iteration)
    TreePath,

    /// Long, full-text indexed text (description, history)
    PlainText,
}

impl ValueType {
    /// All value types, in declaration order
    pub const ALL: [ValueType; 6] = [
        ValueType::String,
        ValueType::Identity,
        ValueType::Integer,
        ValueType::DateTime,
        ValueType::TreePath,
        ValueType::PlainText,
    ];

    /// Name as it appears in the store's field metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "String",
            ValueType::Identity => "Identity",
            ValueType::Integer => "Integer",
            ValueType::DateTime => "DateTime",
            ValueType::TreePath => "TreePath",
            ValueType::PlainText => "PlainText",
        }
    }

    /// Whether `op` may be applied to a field of this type
    ///
    /// # Examples
    ///
    /// ```
    /// use adoq_domain::{Operator, ValueType};
    ///
    /// assert!(ValueType::TreePath.accepts(Operator::Under));
    /// assert!(!ValueType::TreePath.accepts(Operator::Eq));
    /// assert!(ValueType::PlainText.accepts(Operator::ContainsWords));
    /// assert!(!ValueType::String.accepts(Operator::ContainsWords));
    /// ```
    pub fn accepts(&self, op: Operator) -> bool {
        use Operator::*;

        match self {
            ValueType::String => matches!(op, Eq | Ne | In | NotIn | Contains | NotContains),
            ValueType::Identity => matches!(op, Eq | Ne | In | NotIn),
            ValueType::Integer => matches!(op, Eq | Ne | Gt | Lt | Ge | Le | In | NotIn),
            ValueType::DateTime => matches!(op, Eq | Ne | Gt | Lt | Ge | Le),
            ValueType::TreePath => matches!(op, Under | NotUnder),
            ValueType::PlainText => matches!(op, ContainsWords | NotContainsWords),
        }
    }

    /// Operators accepted by this type, in declaration order
    pub fn operators(&self) -> Vec<Operator> {
        Operator::ALL.iter().copied().filter(|op| self.accepts(*op)).collect()
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// WIQL comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Operator {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `<=`
    Le,
    /// `IN (...)`
    In,
    /// `NOT IN (...)`
    NotIn,
    /// `CONTAINS` (substring)
    Contains,
    /// `NOT CONTAINS`
    NotContains,
    /// `CONTAINS WORDS` (full-text)
    ContainsWords,
    /// `NOT CONTAINS WORDS`
    NotContainsWords,
    /// `UNDER` (tree-path descendant)
    Under,
    /// `NOT UNDER`
    NotUnder,
}

impl Operator {
    /// All operators, in declaration order
    pub const ALL: [Operator; 14] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Lt,
        Operator::Ge,
        Operator::Le,
        Operator::In,
        Operator::NotIn,
        Operator::Contains,
        Operator::NotContains,
        Operator::ContainsWords,
        Operator::NotContainsWords,
        Operator::Under,
        Operator::NotUnder,
    ];

    /// The operator's token in query text
    pub fn token(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ge => ">=",
            Operator::Le => "<=",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Contains => "CONTAINS",
            Operator::NotContains => "NOT CONTAINS",
            Operator::ContainsWords => "CONTAINS WORDS",
            Operator::NotContainsWords => "NOT CONTAINS WORDS",
            Operator::Under => "UNDER",
            Operator::NotUnder => "NOT UNDER",
        }
    }

    /// Whether the operator takes a parenthesized list of values
    pub fn takes_list(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    /// Parse an operator token, case-insensitive, with inner whitespace collapsed
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        let op = match normalized.as_str() {
            "=" | "==" => Operator::Eq,
            "<>" | "!=" => Operator::Ne,
            ">" => Operator::Gt,
            "<" => Operator::Lt,
            ">=" => Operator::Ge,
            "<=" => Operator::Le,
            "IN" => Operator::In,
            "NOT IN" => Operator::NotIn,
            "CONTAINS" => Operator::Contains,
            "NOT CONTAINS" => Operator::NotContains,
            "CONTAINS WORDS" => Operator::ContainsWords,
            "NOT CONTAINS WORDS" => Operator::NotContainsWords,
            "UNDER" => Operator::Under,
            "NOT UNDER" => Operator::NotUnder,
            _ => return None,
        };
        Some(op)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl std::str::FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Unknown operator: {}", s))
    }
}

impl TryFrom<String> for Operator {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.token().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_tokens_round_trip() {
        for op in Operator::ALL {
            assert_eq!(Operator::parse(op.token()), Some(op));
        }
    }

    #[test]
    fn test_operator_parse_is_lenient_on_case_and_spacing() {
        assert_eq!(Operator::parse("not   in"), Some(Operator::NotIn));
        assert_eq!(Operator::parse("contains words"), Some(Operator::ContainsWords));
        assert_eq!(Operator::parse("!="), Some(Operator::Ne));
        assert_eq!(Operator::parse("WAS EVER"), None);
    }

    #[test]
    fn test_tree_path_only_accepts_hierarchy_operators() {
        assert_eq!(
            ValueType::TreePath.operators(),
            vec![Operator::Under, Operator::NotUnder]
        );
    }

    #[test]
    fn test_full_text_operators_only_on_plain_text() {
        for ty in ValueType::ALL {
            let expected = ty == ValueType::PlainText;
            assert_eq!(ty.accepts(Operator::ContainsWords), expected, "{}", ty);
            assert_eq!(ty.accepts(Operator::NotContainsWords), expected, "{}", ty);
        }
    }

    #[test]
    fn test_every_type_accepts_something() {
        for ty in ValueType::ALL {
            assert!(!ty.operators().is_empty());
        }
    }

    #[test]
    fn test_operator_serde_uses_tokens() {
        let json = serde_json::to_string(&Operator::NotUnder).unwrap();
        assert_eq!(json, "\"NOT UNDER\"");
        let op: Operator = serde_json::from_str("\">=\"").unwrap();
        assert_eq!(op, Operator::Ge);
        assert!(serde_json::from_str::<Operator>("\"LIKE\"").is_err());
    }
}

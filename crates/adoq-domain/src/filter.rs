//! FilterSpec - structured representation of a query intent
//!
//! A FilterSpec says *what* to retrieve without committing to the query
//! grammar's syntax. Field names are kept as the caller wrote them; they are
//! resolved and type-checked when the filter is compiled.

use crate::field::Operator;
use crate::registry::refs;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A literal value in a predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    /// Whole number
    Integer(i64),

    /// Text (also carries dates, paths and macros such as `@Me`)
    Text(String),
}

impl Literal {
    /// Text literal
    pub fn text(value: impl Into<String>) -> Self {
        Literal::Text(value.into())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Integer(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Text(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Text(value)
    }
}

/// Right-hand side of a predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredicateValue {
    /// Value list for `IN` / `NOT IN`
    List(Vec<Literal>),

    /// Single value for every other operator
    Single(Literal),
}

/// One field-level condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Predicate {
    /// Field name, alias or canonical reference
    pub field: String,

    /// Comparison operator
    pub operator: Operator,

    /// Value or value list
    pub value: PredicateValue,
}

impl Predicate {
    /// Predicate with a single value
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Literal>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: PredicateValue::Single(value.into()),
        }
    }

    /// Predicate with a value list
    pub fn list<I, V>(field: impl Into<String>, operator: Operator, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        Self {
            field: field.into(),
            operator,
            value: PredicateValue::List(values.into_iter().map(Into::into).collect()),
        }
    }
}

/// Symbolic date expression resolved at compile time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RelativePeriod {
    /// Start of today
    Today,
    /// Start of yesterday
    Yesterday,
    /// Start of the current week
    StartOfWeek,
    /// Start of the current month
    StartOfMonth,
    /// Start of the current year
    StartOfYear,
    /// Start of the current calendar quarter
    StartOfQuarter,
    /// Start of the previous calendar quarter
    LastQuarter,
    /// Start of the previous year
    LastYear,
    /// The last N days
    LastDays(u32),
    /// The last N weeks
    LastWeeks(u32),
    /// The last N months (from the start of the month)
    LastMonths(u32),
}

/// Upper bound on N in `last_<N>_<unit>` tokens
pub const MAX_RELATIVE_COUNT: u32 = 3650;

impl RelativePeriod {
    /// Canonical token
    pub fn token(&self) -> String {
        match self {
            RelativePeriod::Today => "today".to_string(),
            RelativePeriod::Yesterday => "yesterday".to_string(),
            RelativePeriod::StartOfWeek => "start_of_week".to_string(),
            RelativePeriod::StartOfMonth => "start_of_month".to_string(),
            RelativePeriod::StartOfYear => "start_of_year".to_string(),
            RelativePeriod::StartOfQuarter => "start_of_quarter".to_string(),
            RelativePeriod::LastQuarter => "last_quarter".to_string(),
            RelativePeriod::LastYear => "last_year".to_string(),
            RelativePeriod::LastDays(n) => format!("last_{}_days", n),
            RelativePeriod::LastWeeks(n) => format!("last_{}_weeks", n),
            RelativePeriod::LastMonths(n) => format!("last_{}_months", n),
        }
    }

    /// Parse a relative-period token
    ///
    /// Accepts underscores, spaces or dashes as separators, and a few
    /// conversational synonyms ("this week", "past 14 days").
    ///
    /// # Examples
    ///
    /// ```
    /// use adoq_domain::RelativePeriod;
    ///
    /// assert_eq!(RelativePeriod::parse("last_7_days"), Some(RelativePeriod::LastDays(7)));
    /// assert_eq!(RelativePeriod::parse("This Week"), Some(RelativePeriod::StartOfWeek));
    /// assert_eq!(RelativePeriod::parse("last week"), Some(RelativePeriod::LastWeeks(1)));
    /// assert_eq!(RelativePeriod::parse("last_0_days"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_");

        let period = match normalized.as_str() {
            "today" => RelativePeriod::Today,
            "yesterday" => RelativePeriod::Yesterday,
            "this_week" | "start_of_week" => RelativePeriod::StartOfWeek,
            "this_month" | "start_of_month" => RelativePeriod::StartOfMonth,
            "this_year" | "start_of_year" => RelativePeriod::StartOfYear,
            "this_quarter" | "start_of_quarter" => RelativePeriod::StartOfQuarter,
            "last_quarter" | "previous_quarter" => RelativePeriod::LastQuarter,
            "last_year" | "previous_year" => RelativePeriod::LastYear,
            "last_week" | "past_week" | "previous_week" => RelativePeriod::LastWeeks(1),
            "last_month" | "past_month" | "previous_month" => RelativePeriod::LastMonths(1),
            other => return Self::parse_counted(other),
        };
        Some(period)
    }

    fn parse_counted(token: &str) -> Option<Self> {
        let mut parts = token.split('_');
        let (Some(prefix), Some(count), Some(unit), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return None;
        };
        if prefix != "last" && prefix != "past" {
            return None;
        }

        let n: u32 = count.parse().ok()?;
        if n == 0 || n > MAX_RELATIVE_COUNT {
            return None;
        }

        match unit {
            "day" | "days" => Some(RelativePeriod::LastDays(n)),
            "week" | "weeks" => Some(RelativePeriod::LastWeeks(n)),
            "month" | "months" => Some(RelativePeriod::LastMonths(n)),
            _ => None,
        }
    }
}

impl fmt::Display for RelativePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

impl TryFrom<String> for RelativePeriod {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("Unknown relative period: {}", value))
    }
}

impl From<RelativePeriod> for String {
    fn from(period: RelativePeriod) -> Self {
        period.token()
    }
}

/// Resolved shape of a date window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRange {
    /// Relative-period token
    Relative(RelativePeriod),

    /// Absolute bounds (inclusive); at least one is present
    Absolute {
        /// Lower bound
        start: Option<NaiveDate>,
        /// Upper bound
        end: Option<NaiveDate>,
    },
}

fn default_date_field() -> String {
    refs::CHANGED_DATE.to_string()
}

/// Date constraint on one date field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DateWindow {
    /// Date field (defaults to the last-changed date)
    #[serde(default = "default_date_field")]
    pub field: String,

    /// Relative-period token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative: Option<RelativePeriod>,

    /// Absolute start date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,

    /// Absolute end date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    /// Window described by a relative period
    pub fn relative(field: impl Into<String>, period: RelativePeriod) -> Self {
        Self {
            field: field.into(),
            relative: Some(period),
            start: None,
            end: None,
        }
    }

    /// Window with absolute bounds
    pub fn between(
        field: impl Into<String>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Self {
        Self {
            field: field.into(),
            relative: None,
            start,
            end,
        }
    }

    /// The window's shape, or why it has none
    pub fn range(&self) -> Result<DateRange, String> {
        match (self.relative, self.start, self.end) {
            (Some(period), None, None) => Ok(DateRange::Relative(period)),
            (Some(_), _, _) => {
                Err("date window mixes a relative period with absolute dates".to_string())
            }
            (None, None, None) => Err("date window has neither a period nor dates".to_string()),
            (None, Some(start), Some(end)) if start > end => {
                Err(format!("date window start {} is after end {}", start, end))
            }
            (None, start, end) => Ok(DateRange::Absolute { start, end }),
        }
    }
}

/// Auxiliary per-record data the fetch executor should load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuxiliaryData {
    /// Discussion comments
    #[serde(default)]
    pub comments: bool,

    /// Change history (state transitions)
    #[serde(default)]
    pub history: bool,
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    /// Ascending
    Asc,
    /// Descending
    #[default]
    Desc,
}

impl SortDirection {
    /// Token in query text
    pub fn token(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Caller-requested primary ordering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SortSpec {
    /// Field to order by
    pub field: String,

    /// Direction
    #[serde(default)]
    pub direction: SortDirection,
}

/// Structured query intent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterSpec {
    /// Explicit work item IDs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<u64>,

    /// Field-level predicates (conjunction)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub predicates: Vec<Predicate>,

    /// Date window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_window: Option<DateWindow>,

    /// Free-text search terms (any may match)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub free_text_terms: Vec<String>,

    /// Auxiliary data to fetch
    #[serde(default)]
    pub include: AuxiliaryData,

    /// Primary ordering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,

    /// Requested result cap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
}

impl FilterSpec {
    /// Start building a FilterSpec
    pub fn builder() -> FilterSpecBuilder {
        FilterSpecBuilder::default()
    }

    /// True when the filter has no IDs, no predicates and no free-text terms
    ///
    /// A date window alone does not count: it would still select a large
    /// slice of the store.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.predicates.is_empty() && self.free_text_terms.is_empty()
    }
}

/// Builder with the convenience shapes users actually ask for
#[derive(Debug, Default)]
pub struct FilterSpecBuilder {
    spec: FilterSpec,
}

impl FilterSpecBuilder {
    /// Restrict to explicit IDs
    pub fn ids(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.spec.ids.extend(ids);
        self
    }

    /// Add an arbitrary predicate
    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.spec.predicates.push(predicate);
        self
    }

    fn equal_or_in<S: Into<String>>(
        self,
        field: &str,
        values: impl IntoIterator<Item = S>,
        single: Operator,
        many: Operator,
    ) -> Self {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        match values.len() {
            0 => self,
            1 => {
                let value = values.into_iter().next().unwrap_or_default();
                self.predicate(Predicate::new(field, single, value))
            }
            _ => self.predicate(Predicate::list(field, many, values)),
        }
    }

    /// Restrict to work item types (`=` for one, `IN` for several)
    pub fn work_item_types<S: Into<String>>(self, types: impl IntoIterator<Item = S>) -> Self {
        self.equal_or_in(refs::WORK_ITEM_TYPE, types, Operator::Eq, Operator::In)
    }

    /// Restrict to states
    pub fn states_in<S: Into<String>>(self, states: impl IntoIterator<Item = S>) -> Self {
        self.equal_or_in(refs::STATE, states, Operator::Eq, Operator::In)
    }

    /// Exclude states
    pub fn states_not_in<S: Into<String>>(self, states: impl IntoIterator<Item = S>) -> Self {
        self.equal_or_in(refs::STATE, states, Operator::Ne, Operator::NotIn)
    }

    /// Inclusive priority range; equal bounds produce one equality predicate
    pub fn priority_range(self, min: i64, max: i64) -> Self {
        if min == max {
            return self.predicate(Predicate::new(refs::PRIORITY, Operator::Eq, min));
        }
        self.predicate(Predicate::new(refs::PRIORITY, Operator::Ge, min))
            .predicate(Predicate::new(refs::PRIORITY, Operator::Le, max))
    }

    /// Require a tag
    pub fn tag(self, tag: impl Into<String>) -> Self {
        self.predicate(Predicate::new(refs::TAGS, Operator::Contains, tag.into()))
    }

    /// Restrict to an area subtree
    pub fn area_path(self, path: impl Into<String>) -> Self {
        self.predicate(Predicate::new(refs::AREA_PATH, Operator::Under, path.into()))
    }

    /// Restrict to an iteration subtree
    pub fn iteration_path(self, path: impl Into<String>) -> Self {
        self.predicate(Predicate::new(refs::ITERATION_PATH, Operator::Under, path.into()))
    }

    /// Restrict to an assignee ("me" selects the current user)
    pub fn assigned_to(self, who: impl Into<String>) -> Self {
        self.predicate(Predicate::new(refs::ASSIGNED_TO, Operator::Eq, who.into()))
    }

    /// Set the date window
    pub fn date_window(mut self, window: DateWindow) -> Self {
        self.spec.date_window = Some(window);
        self
    }

    /// Add a free-text search term
    pub fn free_text(mut self, term: impl Into<String>) -> Self {
        self.spec.free_text_terms.push(term.into());
        self
    }

    /// Fetch discussion comments
    pub fn include_comments(mut self, yes: bool) -> Self {
        self.spec.include.comments = yes;
        self
    }

    /// Fetch change history
    pub fn include_history(mut self, yes: bool) -> Self {
        self.spec.include.history = yes;
        self
    }

    /// Primary ordering
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.spec.sort = Some(SortSpec {
            field: field.into(),
            direction,
        });
        self
    }

    /// Requested result cap
    pub fn max_items(mut self, max_items: usize) -> Self {
        self.spec.max_items = Some(max_items);
        self
    }

    /// Finish
    pub fn build(self) -> FilterSpec {
        self.spec
    }
}

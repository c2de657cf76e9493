//! Relative date resolution
//!
//! WIQL has relative-date macros (`@Today`, `@StartOfWeek`, ...) that accept
//! a day or unit offset. Periods with no macro equivalent (quarters) are
//! computed from the compile context's date and emitted as literals.

use crate::escape::quote_literal;
use adoq_domain::RelativePeriod;
use chrono::{Datelike, Months, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

/// Date expression: a grammar macro, or a computed calendar date
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateExpr {
    /// Rendered macro such as `@Today - 7`
    Macro(String),

    /// Absolute date, rendered as a quoted literal
    Absolute(NaiveDate),
}

impl DateExpr {
    /// Render for insertion after an operator
    pub fn render(&self) -> String {
        match self {
            DateExpr::Macro(m) => m.clone(),
            DateExpr::Absolute(date) => quote_literal(&date.format("%Y-%m-%d").to_string()),
        }
    }
}

fn offset(base: &str, n: u64) -> String {
    format!("{} - {}", base, n)
}

/// Resolve a relative period against `today`
///
/// # Examples
///
/// ```
/// use adoq_domain::RelativePeriod;
/// use adoq_wiql::macros::resolve_period;
/// use chrono::NaiveDate;
///
/// let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
/// assert_eq!(resolve_period(RelativePeriod::LastDays(7), today).render(), "@Today - 7");
/// assert_eq!(resolve_period(RelativePeriod::StartOfQuarter, today).render(), "'2024-04-01'");
/// ```
pub fn resolve_period(period: RelativePeriod, today: NaiveDate) -> DateExpr {
    match period {
        RelativePeriod::Today => DateExpr::Macro("@Today".to_string()),
        RelativePeriod::Yesterday => DateExpr::Macro(offset("@Today", 1)),
        RelativePeriod::StartOfWeek => DateExpr::Macro("@StartOfWeek".to_string()),
        RelativePeriod::StartOfMonth => DateExpr::Macro("@StartOfMonth".to_string()),
        RelativePeriod::StartOfYear => DateExpr::Macro("@StartOfYear".to_string()),
        RelativePeriod::LastYear => DateExpr::Macro(offset("@StartOfYear", 1)),
        RelativePeriod::LastDays(n) => DateExpr::Macro(offset("@Today", u64::from(n))),
        RelativePeriod::LastWeeks(n) => DateExpr::Macro(offset("@Today", 7 * u64::from(n))),
        RelativePeriod::LastMonths(n) => DateExpr::Macro(offset("@StartOfMonth", u64::from(n))),
        RelativePeriod::StartOfQuarter => DateExpr::Absolute(quarter_start(today)),
        RelativePeriod::LastQuarter => {
            let this_quarter = quarter_start(today);
            DateExpr::Absolute(
                this_quarter
                    .checked_sub_months(Months::new(3))
                    .unwrap_or(this_quarter),
            )
        }
    }
}

/// First day of the calendar quarter containing `date`
pub fn quarter_start(date: NaiveDate) -> NaiveDate {
    let month = (date.month0() / 3) * 3 + 1;
    NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
}

static DATE_MACRO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^@(today|startofday|startofweek|startofmonth|startofyear)\s*(?:([+-])\s*(\d{1,5}))?$")
        .expect("Invalid regex")
});

/// Normalize a date macro written by hand or by the oracle
///
/// Returns the canonical spelling (`@startofweek-1` becomes
/// `@StartOfWeek - 1`), or `None` if `text` is not a date macro.
pub fn parse_date_macro(text: &str) -> Option<String> {
    let caps = DATE_MACRO.captures(text.trim())?;
    let name = match caps[1].to_ascii_lowercase().as_str() {
        "today" => "@Today",
        "startofday" => "@StartOfDay",
        "startofweek" => "@StartOfWeek",
        "startofmonth" => "@StartOfMonth",
        "startofyear" => "@StartOfYear",
        _ => return None,
    };
    match (caps.get(2), caps.get(3)) {
        (Some(sign), Some(n)) => {
            let n: u64 = n.as_str().parse().ok()?;
            Some(format!("{} {} {}", name, sign.as_str(), n))
        }
        _ => Some(name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_macro_periods() {
        let today = d(2024, 5, 15);
        let cases = [
            (RelativePeriod::Today, "@Today"),
            (RelativePeriod::Yesterday, "@Today - 1"),
            (RelativePeriod::StartOfWeek, "@StartOfWeek"),
            (RelativePeriod::StartOfMonth, "@StartOfMonth"),
            (RelativePeriod::StartOfYear, "@StartOfYear"),
            (RelativePeriod::LastWeeks(1), "@Today - 7"),
            (RelativePeriod::LastWeeks(2), "@Today - 14"),
            (RelativePeriod::LastMonths(1), "@StartOfMonth - 1"),
            (RelativePeriod::LastYear, "@StartOfYear - 1"),
        ];
        for (period, expected) in cases {
            assert_eq!(resolve_period(period, today).render(), expected, "{}", period);
        }
    }

    #[test]
    fn test_quarters_fall_back_to_dates() {
        assert_eq!(quarter_start(d(2024, 3, 31)), d(2024, 1, 1));
        assert_eq!(quarter_start(d(2024, 12, 1)), d(2024, 10, 1));

        let expr = resolve_period(RelativePeriod::LastQuarter, d(2024, 2, 10));
        assert_eq!(expr, DateExpr::Absolute(d(2023, 10, 1)));
    }

    #[test]
    fn test_parse_date_macro() {
        assert_eq!(parse_date_macro("@today"), Some("@Today".to_string()));
        assert_eq!(
            parse_date_macro("@startofweek-1"),
            Some("@StartOfWeek - 1".to_string())
        );
        assert_eq!(parse_date_macro("@Me"), None);
        assert_eq!(parse_date_macro("@Today; DROP"), None);
    }
}

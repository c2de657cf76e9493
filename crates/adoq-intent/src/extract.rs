//! Heuristic retrieval-criteria extraction
//!
//! Recognizes the criteria people actually type: IDs, work item types,
//! states, priorities, relative and absolute dates, tags, area paths,
//! "assigned to me" and quoted search phrases. Anything it recognizes
//! becomes part of a [`FilterSpec`]; anything else is left alone.

use adoq_domain::{refs, DateWindow, FieldRegistry, FilterSpec, RelativePeriod};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

// ============================================================================
// Regex Patterns
// ============================================================================

static HASH_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\d{1,9})\b").expect("Invalid regex"));
static KEYWORD_IDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:ids?|items?|work\s+items?|bugs?|tasks?|tickets?|stories)\s+#?(\d{1,9}(?:\s*(?:,|and)\s*#?\d{1,9})*)\b")
        .expect("Invalid regex")
});
static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("Invalid regex"));
static PRIORITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:priority\s*|pri\s*|p)([1-4])(?:\s*(?:-|to)\s*(?:p)?([1-4]))?\b")
        .expect("Invalid regex")
});
static COUNTED_PERIOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:last|past)\s+(\d{1,4})\s+(days?|weeks?|months?)\b").expect("Invalid regex")
});
static NAMED_PERIOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(today|yesterday|this\s+(?:week|month|year|quarter)|(?:last|past|previous)\s+(?:week|month|year|quarter))\b")
        .expect("Invalid regex")
});
static SINCE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:since|after|from)\s+(\d{4}-\d{2}-\d{2})\b").expect("Invalid regex")
});
static UNTIL_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:until|before|to|through)\s+(\d{4}-\d{2}-\d{2})\b").expect("Invalid regex")
});
static CREATED_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:created|opened|filed|reported|new)\b").expect("Invalid regex")
});
static TAGGED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\btag(?:ged)?\s+(?:with\s+)?(?:"([^"]+)"|'([^']+)'|([\w\-]+))"#).expect("Invalid regex")
});
static AREA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:area(?:\s+path)?|under)\s+"([^"]+)""#).expect("Invalid regex")
});
static ASSIGNED_TO_ME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:assigned\s+to\s+me|my\s+(?:bugs|tasks|items|work|stories|tickets|issues)|mine)\b")
        .expect("Invalid regex")
});
static ASSIGNED_TO_NAMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bassigned\s+to\s+"([^"]+)""#).expect("Invalid regex")
});
static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]{2,})""#).expect("Invalid regex"));
static MENTIONING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:mentioning|containing|mentions)\s+([A-Za-z][\w\-]{2,})\b").expect("Invalid regex")
});

/// Words that name a type in the registry but are too generic to count
const GENERIC_TYPE_WORDS: [&str; 4] = ["item", "items", "review", "reviews"];

/// State words and the states they select
const STATE_WORDS: &[(&str, &[&str], bool)] = &[
    ("active", &["Active"], true),
    ("resolved", &["Resolved"], true),
    ("closed", &["Closed"], true),
    ("done", &["Done"], true),
    ("open", &["Closed", "Removed", "Done"], false),
    ("unresolved", &["Resolved", "Closed", "Removed", "Done"], false),
];

/// Criteria recognized in an utterance
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Criteria {
    /// The filter assembled from them
    pub spec: FilterSpec,

    /// Names of the criteria that matched, for logging and confidence
    pub matched: Vec<&'static str>,
}

impl Criteria {
    /// Whether any retrieval criterion was recognized
    pub fn found(&self) -> bool {
        !self.matched.is_empty()
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn quoted_capture(caps: &regex::Captures<'_>) -> Option<String> {
    (1..caps.len())
        .find_map(|i| caps.get(i))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn period_from_count(n: u32, unit: &str) -> Option<RelativePeriod> {
    let token = format!("last_{}_{}", n, unit.to_lowercase().trim_end_matches('s'));
    RelativePeriod::parse(&token)
}

/// Heuristic extractor over a field registry
#[derive(Debug, Clone)]
pub struct CriteriaExtractor<'a> {
    registry: &'a FieldRegistry,
}

impl<'a> CriteriaExtractor<'a> {
    /// Extractor resolving type names through `registry`
    pub fn new(registry: &'a FieldRegistry) -> Self {
        Self { registry }
    }

    /// Recognize retrieval criteria in an utterance
    ///
    /// # Examples
    ///
    /// ```
    /// use adoq_domain::FieldRegistry;
    /// use adoq_intent::extract::CriteriaExtractor;
    ///
    /// let registry = FieldRegistry::standard();
    /// let criteria = CriteriaExtractor::new(&registry).extract("P1 bugs from the last 7 days");
    /// assert!(criteria.matched.contains(&"type"));
    /// assert!(criteria.matched.contains(&"priority"));
    /// assert!(criteria.matched.contains(&"date"));
    ///
    /// assert!(!CriteriaExtractor::new(&registry).extract("summarize those").found());
    /// ```
    pub fn extract(&self, utterance: &str) -> Criteria {
        let mut builder = FilterSpec::builder();
        let mut matched = Vec::new();
        let mut consumed_quotes: Vec<String> = Vec::new();

        // IDs
        let mut ids: Vec<u64> = HASH_ID
            .captures_iter(utterance)
            .filter_map(|c| c[1].parse().ok())
            .collect();
        for caps in KEYWORD_IDS.captures_iter(utterance) {
            ids.extend(NUMBER.find_iter(&caps[1]).filter_map(|m| m.as_str().parse::<u64>().ok()));
        }
        ids.retain(|id| *id > 0);
        ids.dedup();
        if !ids.is_empty() {
            builder = builder.ids(ids);
            matched.push("ids");
        }

        // Work item types
        let mut types: Vec<String> = Vec::new();
        let tokens = words(utterance);
        let mut i = 0;
        while i < tokens.len() {
            // Two-word types first ("user stories", "test cases")
            if let Some(next) = tokens.get(i + 1) {
                let pair = format!("{} {}", tokens[i], next);
                let resolution = self.registry.normalize_work_item_type(&pair);
                if resolution.mapped {
                    if !types.contains(&resolution.name) {
                        types.push(resolution.name);
                    }
                    i += 2;
                    continue;
                }
            }
            let word = tokens[i].as_str();
            if !GENERIC_TYPE_WORDS.contains(&word) {
                let resolution = self.registry.normalize_work_item_type(word);
                if resolution.mapped && !types.contains(&resolution.name) {
                    types.push(resolution.name);
                }
            }
            i += 1;
        }
        if !types.is_empty() {
            builder = builder.work_item_types(types);
            matched.push("type");
        }

        // States
        for (word, states, include) in STATE_WORDS {
            if tokens.iter().any(|t| t == word) {
                builder = if *include {
                    builder.states_in(states.iter().copied())
                } else {
                    builder.states_not_in(states.iter().copied())
                };
                matched.push("state");
                break;
            }
        }

        // Priority
        if let Some(caps) = PRIORITY.captures(utterance) {
            let low: i64 = caps[1].parse().unwrap_or(1);
            let high: i64 = caps.get(2).and_then(|m| m.as_str().parse().ok()).unwrap_or(low);
            builder = builder.priority_range(low.min(high), low.max(high));
            matched.push("priority");
        }

        // Dates
        let date_field = if CREATED_CUE.is_match(utterance) {
            refs::CREATED_DATE
        } else {
            refs::CHANGED_DATE
        };
        let period = COUNTED_PERIOD
            .captures(utterance)
            .and_then(|c| c[1].parse::<u32>().ok().and_then(|n| period_from_count(n, &c[2])))
            .or_else(|| NAMED_PERIOD.captures(utterance).and_then(|c| RelativePeriod::parse(&c[1])));
        let since = SINCE_DATE
            .captures(utterance)
            .and_then(|c| NaiveDate::parse_from_str(&c[1], "%Y-%m-%d").ok());
        let until = UNTIL_DATE
            .captures(utterance)
            .and_then(|c| NaiveDate::parse_from_str(&c[1], "%Y-%m-%d").ok());
        if since.is_some() || until.is_some() {
            builder = builder.date_window(DateWindow::between(date_field, since, until));
            matched.push("date");
        } else if let Some(period) = period {
            builder = builder.date_window(DateWindow::relative(date_field, period));
            matched.push("date");
        }

        // Tags
        for caps in TAGGED.captures_iter(utterance) {
            if let Some(tag) = quoted_capture(&caps) {
                consumed_quotes.push(tag.clone());
                builder = builder.tag(tag);
                matched.push("tag");
            }
        }

        // Area path
        if let Some(path) = AREA.captures(utterance).and_then(|c| quoted_capture(&c)) {
            consumed_quotes.push(path.clone());
            builder = builder.area_path(path);
            matched.push("area");
        }

        // Assignee
        if let Some(name) = ASSIGNED_TO_NAMED.captures(utterance).and_then(|c| quoted_capture(&c)) {
            consumed_quotes.push(name.clone());
            builder = builder.assigned_to(name);
            matched.push("assignee");
        } else if ASSIGNED_TO_ME.is_match(utterance) {
            builder = builder.assigned_to("me");
            matched.push("assignee");
        }

        // Free text
        for caps in QUOTED.captures_iter(utterance) {
            let phrase = caps[1].trim().to_string();
            if !phrase.is_empty() && !consumed_quotes.contains(&phrase) {
                builder = builder.free_text(phrase);
                matched.push("text");
            }
        }
        for caps in MENTIONING.captures_iter(utterance) {
            let term = caps[1].to_string();
            if self.registry.normalize_work_item_type(&term).mapped {
                continue;
            }
            builder = builder.free_text(term);
            matched.push("text");
        }

        // Auxiliary data, not criteria by themselves
        let lowered = utterance.to_lowercase();
        if lowered.contains("comment") || lowered.contains("discussion") {
            builder = builder.include_comments(true);
        }
        if lowered.contains("history") || lowered.contains("timeline") || lowered.contains("state change") {
            builder = builder.include_history(true);
        }

        matched.dedup();
        Criteria {
            spec: builder.build(),
            matched,
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: a hash-prefixed id is always extracted as that id
        #[test]
        fn test_hash_id_extracted(id in 1u64..999_999_999) {
            let registry = FieldRegistry::standard();
            let c = CriteriaExtractor::new(&registry).extract(&format!("what happened to #{} lately", id));
            prop_assert_eq!(c.spec.ids, vec![id]);
        }

        /// Property: extraction never panics and is deterministic
        #[test]
        fn test_arbitrary_text_is_deterministic(text in "\\PC{0,80}") {
            let registry = FieldRegistry::standard();
            let extractor = CriteriaExtractor::new(&registry);
            let first = extractor.extract(&text);
            let second = extractor.extract(&text);
            prop_assert_eq!(first.spec, second.spec);
            prop_assert_eq!(first.matched, second.matched);
        }
    }
}

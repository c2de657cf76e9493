//! Oracle prompt for intent classification

use adoq_cache::CacheStatus;
use adoq_domain::{AnalysisType, FieldRegistry};

/// Builds the classification prompt
pub struct PromptBuilder<'a> {
    utterance: &'a str,
    registry: &'a FieldRegistry,
    cache: Option<CacheStatus>,
    history: &'a [String],
    history_turns: usize,
}

impl<'a> PromptBuilder<'a> {
    /// Prompt for one utterance
    pub fn new(utterance: &'a str, registry: &'a FieldRegistry) -> Self {
        Self {
            utterance,
            registry,
            cache: None,
            history: &[],
            history_turns: 0,
        }
    }

    /// Describe the session's cached result set
    pub fn with_cache(mut self, status: Option<CacheStatus>) -> Self {
        self.cache = status;
        self
    }

    /// Include up to `turns` of the most recent conversation
    pub fn with_history(mut self, history: &'a [String], turns: usize) -> Self {
        self.history = history;
        self.history_turns = turns;
        self
    }

    /// Build the complete prompt
    pub fn build(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str(CLASSIFICATION_INSTRUCTIONS);
        prompt.push_str("\n\n");

        // Cache state
        match &self.cache {
            Some(status) if !status.expired => {
                prompt.push_str(&format!(
                    "Cached results: {} work items from \"{}\", fetched {}s ago.\n\n",
                    status.item_count,
                    status.description,
                    status.age.as_secs()
                ));
            }
            Some(_) => prompt.push_str("Cached results: expired; a new query is required.\n\n"),
            None => prompt.push_str("Cached results: none.\n\n"),
        }

        // Recent turns
        let start = self.history.len().saturating_sub(self.history_turns);
        let recent = &self.history[start..];
        if !recent.is_empty() {
            prompt.push_str("Recent conversation (oldest first):\n");
            for turn in recent {
                prompt.push_str(&format!("- {}\n", turn));
            }
            prompt.push('\n');
        }

        // Field vocabulary
        prompt.push_str("Known fields (reference: type):\n");
        for def in self.registry.fields() {
            prompt.push_str(&format!("- {}: {}\n", def.reference, def.value_type.as_str()));
        }
        prompt.push('\n');

        let types: Vec<&str> = AnalysisType::ALL.iter().map(|t| t.as_str()).collect();
        prompt.push_str(&format!("Analysis types: {}\n\n", types.join(", ")));

        prompt.push_str("User request:\n---\n");
        prompt.push_str(self.utterance);
        prompt.push_str("\n---\n\n");

        prompt.push_str(OUTPUT_FORMAT_REMINDER);
        prompt
    }
}

/// JSON shape the oracle must return
pub const DECISION_SCHEMA: &str = r#"{
  "intent_type": "NEW_QUERY | CACHED_ANALYSIS | COMBINED",
  "confidence": 0.0-1.0,
  "filter": {
    "ids": [123],
    "predicates": [{"field": "System.State", "operator": "=", "value": "Active"}],
    "date_window": {"field": "System.ChangedDate", "relative": "last_7_days"},
    "free_text_terms": ["login"],
    "include": {"comments": false, "history": false},
    "sort": {"field": "System.ChangedDate", "direction": "DESC"},
    "max_items": 100
  } | null,
  "analysis": {
    "analysis_type": "summary",
    "format_requirements": "optional",
    "prompt": "what to produce"
  } | null,
  "reasoning": "one sentence"
}"#;

const CLASSIFICATION_INSTRUCTIONS: &str = r#"Classify a request about Azure DevOps work items.

Intent types:
- NEW_QUERY: the user wants work items fetched. Provide "filter", set "analysis" to null.
- CACHED_ANALYSIS: the user wants the cached results analyzed. Provide "analysis", set "filter" to null.
- COMBINED: the user wants new items fetched and then analyzed. Provide both.

Rules:
- Use only the known fields listed below, by reference name
- Operators: =, <>, >, <, >=, <=, IN, NOT IN, CONTAINS, NOT CONTAINS, CONTAINS WORDS, NOT CONTAINS WORDS, UNDER, NOT UNDER
- Relative periods: today, yesterday, this_week, this_month, this_year, this_quarter, last_quarter, last_year, last_N_days, last_N_weeks, last_N_months
- Absolute dates use YYYY-MM-DD in "start" and "end"
- "me" means the current user
- Never invent IDs, names or paths the user did not mention
- If there are no cached results, do not answer CACHED_ANALYSIS"#;

const OUTPUT_FORMAT_REMINDER: &str = r#"Output format (one JSON object, no additional text):
{"intent_type": "...", "confidence": 0.0, "filter": null, "analysis": null, "reasoning": "..."}

Remember: Return ONLY valid JSON, no markdown code blocks, no explanations."#;

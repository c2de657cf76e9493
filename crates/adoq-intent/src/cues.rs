//! Natural-language cue detection
//!
//! Cue lists are configuration. Matching is on whole words after
//! lower-casing and stripping punctuation, so "report" does not fire on
//! "reporter" and multi-word cues ("tell me about") work.

use adoq_domain::AnalysisType;
use serde::{Deserialize, Serialize};

/// Configurable cue vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CueSet {
    /// Words and phrases that ask for analysis of a result set
    pub analysis: Vec<String>,

    /// Words and phrases that point back at previously fetched results
    pub cache_references: Vec<String>,

    /// Analysis-type keywords, checked in order; first hit wins
    pub analysis_types: Vec<(String, AnalysisType)>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for CueSet {
    fn default() -> Self {
        Self {
            analysis: strings(&[
                "summarize",
                "summarise",
                "summary",
                "analyze",
                "analyse",
                "analysis",
                "newsletter",
                "insights",
                "insight",
                "report",
                "trends",
                "patterns",
                "tell me about",
                "overview",
                "digest",
                "highlights",
                "recap",
                "timeline",
                "write up",
            ]),
            cache_references: strings(&[
                "cache",
                "cached",
                "those",
                "these",
                "them",
                "above",
                "that data",
                "these results",
                "the results",
                "last results",
                "same items",
            ]),
            analysis_types: vec![
                ("newsletter".to_string(), AnalysisType::Newsletter),
                ("insight".to_string(), AnalysisType::Insights),
                ("insights".to_string(), AnalysisType::Insights),
                ("trends".to_string(), AnalysisType::Insights),
                ("patterns".to_string(), AnalysisType::Insights),
                ("timeline".to_string(), AnalysisType::Timeline),
                ("history".to_string(), AnalysisType::Timeline),
                ("comments".to_string(), AnalysisType::Comments),
                ("discussion".to_string(), AnalysisType::Comments),
                ("report".to_string(), AnalysisType::Report),
                ("full analysis".to_string(), AnalysisType::Full),
                ("everything".to_string(), AnalysisType::Full),
            ],
        }
    }
}

/// Lower-cased words separated by single spaces, padded at both ends
fn padded_words(text: &str) -> String {
    let words: Vec<String> = text
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .map(|w| w.trim_matches('\'').to_lowercase())
        .filter(|w| !w.is_empty())
        .collect();
    format!(" {} ", words.join(" "))
}

fn contains_phrase(padded: &str, phrase: &str) -> bool {
    let phrase = padded_words(phrase);
    !phrase.trim().is_empty() && padded.contains(&phrase)
}

/// Cues found in one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueMatch {
    /// Analysis cues that matched
    pub analysis: Vec<String>,

    /// Cache-reference cues that matched
    pub cache_references: Vec<String>,

    /// Analysis type implied by the utterance, if any
    pub analysis_type: Option<AnalysisType>,
}

impl CueMatch {
    /// Whether the utterance asks for analysis
    pub fn wants_analysis(&self) -> bool {
        !self.analysis.is_empty() || self.analysis_type.is_some()
    }

    /// Whether the utterance points at earlier results
    pub fn references_cache(&self) -> bool {
        !self.cache_references.is_empty()
    }
}

impl CueSet {
    /// Scan an utterance
    ///
    /// # Examples
    ///
    /// ```
    /// use adoq_domain::AnalysisType;
    /// use adoq_intent::CueSet;
    ///
    /// let cues = CueSet::default().scan("Summarize the cached results as a newsletter");
    /// assert!(cues.wants_analysis());
    /// assert!(cues.references_cache());
    /// assert_eq!(cues.analysis_type, Some(AnalysisType::Newsletter));
    /// ```
    pub fn scan(&self, utterance: &str) -> CueMatch {
        let padded = padded_words(utterance);

        let matching = |list: &[String]| -> Vec<String> {
            list.iter()
                .filter(|cue| contains_phrase(&padded, cue))
                .cloned()
                .collect()
        };

        let analysis = matching(&self.analysis);
        let cache_references = matching(&self.cache_references);
        let analysis_type = self
            .analysis_types
            .iter()
            .find(|(cue, _)| contains_phrase(&padded, cue))
            .map(|(_, ty)| *ty);

        // A type keyword alone ("history", "comments") is not an analysis
        // request; it needs an analysis cue next to it.
        let analysis_type = match analysis_type {
            Some(AnalysisType::Timeline | AnalysisType::Comments | AnalysisType::Full)
                if analysis.is_empty() =>
            {
                None
            }
            other => other,
        };

        let analysis_type =
            analysis_type.or_else(|| (!analysis.is_empty()).then_some(AnalysisType::Summary));

        CueMatch {
            analysis,
            cache_references,
            analysis_type,
        }
    }

    /// Validate the cue lists
    pub fn validate(&self) -> Result<(), String> {
        if self.analysis.iter().all(|c| c.trim().is_empty()) {
            return Err("at least one analysis cue is required".to_string());
        }
        if self
            .analysis
            .iter()
            .chain(&self.cache_references)
            .chain(self.analysis_types.iter().map(|(c, _)| c))
            .any(|c| c.trim().is_empty())
        {
            return Err("cues must not be blank".to_string());
        }
        Ok(())
    }
}

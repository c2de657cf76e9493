//! Intent decisions produced by the classifier

use crate::filter::FilterSpec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a turn needs: a fetch, an analysis of cached data, or both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentKind {
    /// Fetch new data
    NewQuery,

    /// Analyze the session's cached result set
    CachedAnalysis,

    /// Fetch, then analyze the freshly fetched set
    Combined,
}

impl IntentKind {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::NewQuery => "NEW_QUERY",
            IntentKind::CachedAnalysis => "CACHED_ANALYSIS",
            IntentKind::Combined => "COMBINED",
        }
    }

    /// Whether this kind requires a fetch
    pub fn needs_fetch(&self) -> bool {
        matches!(self, IntentKind::NewQuery | IntentKind::Combined)
    }

    /// Whether this kind requires an analysis step
    pub fn needs_analysis(&self) -> bool {
        matches!(self, IntentKind::CachedAnalysis | IntentKind::Combined)
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of analysis requested over a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    /// Stakeholder newsletter
    Newsletter,
    /// Short summary
    Summary,
    /// Patterns and recommendations
    Insights,
    /// Digest of discussion comments
    Comments,
    /// Chronology of state changes
    Timeline,
    /// Formal status report
    Report,
    /// Everything above
    Full,
}

impl AnalysisType {
    /// All analysis types
    pub const ALL: [AnalysisType; 7] = [
        AnalysisType::Newsletter,
        AnalysisType::Summary,
        AnalysisType::Insights,
        AnalysisType::Comments,
        AnalysisType::Timeline,
        AnalysisType::Report,
        AnalysisType::Full,
    ];

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::Newsletter => "newsletter",
            AnalysisType::Summary => "summary",
            AnalysisType::Insights => "insights",
            AnalysisType::Comments => "comments",
            AnalysisType::Timeline => "timeline",
            AnalysisType::Report => "report",
            AnalysisType::Full => "full",
        }
    }

    /// Parse a wire name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to produce from a result set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Kind of analysis
    pub analysis_type: AnalysisType,

    /// Output format constraints ("bullet points", "under 200 words")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_requirements: Option<String>,

    /// The user's request, restated for the analysis step
    pub prompt: String,
}

impl AnalysisRequest {
    /// Request with no format constraints
    pub fn new(analysis_type: AnalysisType, prompt: impl Into<String>) -> Self {
        Self {
            analysis_type,
            format_requirements: None,
            prompt: prompt.into(),
        }
    }
}

/// Classification result for one utterance
///
/// The payload matches the kind: a filter for fetches, an analysis request
/// for analyses, both for combined turns. The constructors are the only way
/// to build one.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentDecision {
    kind: IntentKind,
    confidence: f64,
    filter: Option<FilterSpec>,
    analysis: Option<AnalysisRequest>,
    reasoning: String,
}

impl IntentDecision {
    /// A fetch of new data
    pub fn new_query(filter: FilterSpec, confidence: f64) -> Self {
        Self::build(IntentKind::NewQuery, confidence, Some(filter), None)
    }

    /// An analysis of the cached result set
    pub fn cached_analysis(analysis: AnalysisRequest, confidence: f64) -> Self {
        Self::build(IntentKind::CachedAnalysis, confidence, None, Some(analysis))
    }

    /// A fetch followed by an analysis of the new result set
    pub fn combined(filter: FilterSpec, analysis: AnalysisRequest, confidence: f64) -> Self {
        Self::build(IntentKind::Combined, confidence, Some(filter), Some(analysis))
    }

    fn build(
        kind: IntentKind,
        confidence: f64,
        filter: Option<FilterSpec>,
        analysis: Option<AnalysisRequest>,
    ) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            kind,
            confidence,
            filter,
            analysis,
            reasoning: String::new(),
        }
    }

    /// Attach a short explanation
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    /// Decision kind
    pub fn kind(&self) -> IntentKind {
        self.kind
    }

    /// Confidence in [0, 1]
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Filter for NEW_QUERY and COMBINED
    pub fn filter(&self) -> Option<&FilterSpec> {
        self.filter.as_ref()
    }

    /// Analysis request for CACHED_ANALYSIS and COMBINED
    pub fn analysis(&self) -> Option<&AnalysisRequest> {
        self.analysis.as_ref()
    }

    /// Explanation, possibly empty
    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    /// Take the payload apart
    pub fn into_parts(self) -> (Option<FilterSpec>, Option<AnalysisRequest>) {
        (self.filter, self.analysis)
    }
}

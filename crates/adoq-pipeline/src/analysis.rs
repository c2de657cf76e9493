//! Analysis of a result set by the text-generation oracle
//!
//! Records are compacted before they go into the prompt: titles and
//! comments are truncated, tags and comments are capped, and at most
//! `max_items_analyzed` records are included.

use crate::config::AnalyzerConfig;
use crate::error::PipelineError;
use adoq_domain::traits::LlmProvider;
use adoq_domain::{AnalysisRequest, AnalysisType, WorkItem};
use serde::Serialize;
use tracing::{debug, info};

/// Answer when there is nothing to analyze
pub const EMPTY_RESULT_SET: &str = "No work items available for analysis.";

/// Compact view of one comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompactComment {
    /// Author display name
    pub author: String,
    /// Posting date (YYYY-MM-DD)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Truncated body
    pub text: String,
}

/// Compact view of one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompactRecord {
    /// Work item ID
    pub id: u64,
    /// Work item type
    #[serde(rename = "type")]
    pub work_item_type: String,
    /// Truncated title
    pub title: String,
    /// Current state
    pub state: String,
    /// Assignee
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned: Option<String>,
    /// Priority
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    /// First tags
    pub tags: Vec<String>,
    /// Total comments on the record
    pub comment_count: usize,
    /// Most recent comments
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recent_comments: Vec<CompactComment>,
    /// State changes as "from -> to (date)"
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub state_changes: Vec<String>,
    /// Creation date (YYYY-MM-DD)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
    /// Last-changed date (YYYY-MM-DD)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_date: Option<String>,
}

/// Result of one analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisReport {
    /// Kind of analysis performed
    pub analysis_type: AnalysisType,

    /// Records included in the prompt
    pub items_analyzed: usize,

    /// Records in the result set
    pub total_items: usize,

    /// The oracle's answer
    pub text: String,
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Compacts result sets and asks the oracle to analyze them
pub struct Analyzer<L: LlmProvider> {
    llm: L,
    config: AnalyzerConfig,
}

impl<L> Analyzer<L>
where
    L: LlmProvider,
    L::Error: std::fmt::Display,
{
    /// Create a new Analyzer
    pub fn new(llm: L, config: AnalyzerConfig) -> Self {
        Self { llm, config }
    }

    /// Active configuration
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Compact one record
    pub fn compact(&self, item: &WorkItem) -> CompactRecord {
        let skip = item.comments.len().saturating_sub(self.config.max_comments);
        let recent_comments = item.comments[skip..]
            .iter()
            .map(|c| CompactComment {
                author: c.author.clone(),
                date: c.created_date.map(|d| d.format("%Y-%m-%d").to_string()),
                text: truncate(&c.text, self.config.comment_max_chars),
            })
            .collect();

        let state_changes = item
            .state_transitions
            .iter()
            .map(|t| {
                let from = t.from.as_deref().unwrap_or("(new)");
                match t.date {
                    Some(date) => format!("{} -> {} ({})", from, t.to, date.format("%Y-%m-%d")),
                    None => format!("{} -> {}", from, t.to),
                }
            })
            .collect();

        CompactRecord {
            id: item.id,
            work_item_type: item.work_item_type.clone(),
            title: truncate(&item.title, self.config.title_max_chars),
            state: item.state.clone(),
            assigned: item.assigned_to.clone(),
            priority: item.priority,
            tags: item.tags.iter().take(self.config.max_tags).cloned().collect(),
            comment_count: item.comments.len(),
            recent_comments,
            state_changes,
            created_date: item.created_date.map(|d| d.format("%Y-%m-%d").to_string()),
            changed_date: item.changed_date.map(|d| d.format("%Y-%m-%d").to_string()),
        }
    }

    /// Build the analysis prompt for a result set
    pub fn build_prompt(
        &self,
        items: &[WorkItem],
        request: &AnalysisRequest,
    ) -> Result<String, PipelineError> {
        let compact: Vec<CompactRecord> = items
            .iter()
            .take(self.config.max_items_analyzed)
            .map(|item| self.compact(item))
            .collect();
        let data = serde_json::to_string_pretty(&compact)
            .map_err(|e| PipelineError::Analysis(format!("Failed to encode records: {}", e)))?;

        let mut prompt = String::new();
        prompt.push_str(ANALYSIS_INSTRUCTIONS);
        prompt.push_str("\n\n");
        prompt.push_str(type_guidance(request.analysis_type));
        prompt.push_str("\n\n");

        prompt.push_str(&format!("User Request: {}\n", request.prompt));
        if let Some(format) = &request.format_requirements {
            prompt.push_str(&format!("Format Requirements: {}\n", format));
        }
        if items.len() > compact.len() {
            prompt.push_str(&format!(
                "Note: showing {} of {} work items.\n",
                compact.len(),
                items.len()
            ));
        }

        prompt.push_str("\nWork Items Data (JSON):\n");
        prompt.push_str(&data);
        prompt.push_str("\n\nAnalyze this data according to the user's request above.");
        Ok(prompt)
    }

    /// Analyze a result set
    pub fn analyze(
        &self,
        items: &[WorkItem],
        request: &AnalysisRequest,
    ) -> Result<AnalysisReport, PipelineError> {
        let items_analyzed = items.len().min(self.config.max_items_analyzed);

        if items.is_empty() {
            return Ok(AnalysisReport {
                analysis_type: request.analysis_type,
                items_analyzed: 0,
                total_items: 0,
                text: EMPTY_RESULT_SET.to_string(),
            });
        }

        let prompt = self.build_prompt(items, request)?;
        debug!("Analysis prompt length: {} chars", prompt.len());

        let text = self
            .llm
            .generate(&prompt, self.config.analysis_max_tokens)
            .map_err(|e| PipelineError::Analysis(e.to_string()))?;

        info!(
            analysis = %request.analysis_type,
            items = items_analyzed,
            total = items.len(),
            "Analysis complete"
        );

        Ok(AnalysisReport {
            analysis_type: request.analysis_type,
            items_analyzed,
            total_items: items.len(),
            text,
        })
    }
}

fn type_guidance(analysis_type: AnalysisType) -> &'static str {
    match analysis_type {
        AnalysisType::Newsletter => NEWSLETTER_GUIDANCE,
        AnalysisType::Summary => SUMMARY_GUIDANCE,
        AnalysisType::Insights => INSIGHTS_GUIDANCE,
        AnalysisType::Comments => COMMENTS_GUIDANCE,
        AnalysisType::Timeline => TIMELINE_GUIDANCE,
        AnalysisType::Report => REPORT_GUIDANCE,
        AnalysisType::Full => FULL_GUIDANCE,
    }
}

const ANALYSIS_INSTRUCTIONS: &str = r#"You are an Azure DevOps work item analysis assistant.
Input: a compact JSON list of work items.
Never fabricate fields or items. Highlight only evidence-supported patterns.
Respond directly to the user's request with structured, insight-dense output.
Comment text may contain HTML markup and @mention tags; present it as readable text."#;

const NEWSLETTER_GUIDANCE: &str = "Write a stakeholder newsletter: a headline, a short lead paragraph, highlights, and notable items with their IDs.";

const SUMMARY_GUIDANCE: &str = "Write a concise summary of the result set: what it contains, where it stands, and anything that needs attention.";

const INSIGHTS_GUIDANCE: &str = "Identify patterns: state distribution, priority hotspots, stale or unassigned items, comment activity. End with recommendations.";

const COMMENTS_GUIDANCE: &str = "Digest the discussion: main topics, open questions, decisions made, and who is involved.";

const TIMELINE_GUIDANCE: &str = "Build a chronology from state changes and dates, oldest first, and call out items that stalled.";

const REPORT_GUIDANCE: &str = "Write a formal status report with sections for overview, progress, risks and next steps.";

const FULL_GUIDANCE: &str = "Provide a full analysis: summary, insights, discussion digest, timeline and a status report section.";

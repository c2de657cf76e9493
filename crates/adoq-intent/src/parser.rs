//! Strict parsing of oracle decisions
//!
//! The oracle's output is untrusted input. Anything that does not match the
//! decision schema exactly, or whose filter would not compile, is rejected.

use crate::error::IntentError;
use adoq_domain::{
    refs, AnalysisRequest, AnalysisType, FieldRegistry, FilterSpec, IntentDecision, IntentKind,
    Literal, PredicateValue,
};
use adoq_wiql::Compiler;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDecision {
    intent_type: IntentKind,
    confidence: f64,
    #[serde(default)]
    filter: Option<FilterSpec>,
    #[serde(default)]
    analysis: Option<RawAnalysis>,
    #[serde(default)]
    reasoning: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAnalysis {
    analysis_type: AnalysisType,
    #[serde(default)]
    format_requirements: Option<String>,
    #[serde(default)]
    prompt: Option<String>,
}

/// Extract JSON from a response, handling markdown code blocks
fn extract_json(response: &str) -> Result<&str, IntentError> {
    let trimmed = response.trim();

    if !trimmed.starts_with("```") {
        return Ok(trimmed);
    }

    // Drop the opening fence line and the closing fence
    let body = trimmed
        .split_once('\n')
        .map(|(_, rest)| rest)
        .ok_or_else(|| IntentError::IntentExtraction("Empty code block".to_string()))?;
    let body = body.trim_end();
    Ok(body.strip_suffix("```").unwrap_or(body).trim())
}

/// Map work item type literals to the store's vocabulary
fn normalize_types(filter: &mut FilterSpec, registry: &FieldRegistry) {
    let normalize = |literal: &mut Literal| {
        if let Literal::Text(name) = literal {
            *name = registry.normalize_work_item_type(name).name;
        }
    };

    for predicate in &mut filter.predicates {
        let is_type_field = registry
            .resolve(&predicate.field)
            .map(|def| def.reference == refs::WORK_ITEM_TYPE)
            .unwrap_or(false);
        if !is_type_field {
            continue;
        }
        match &mut predicate.value {
            PredicateValue::Single(literal) => normalize(literal),
            PredicateValue::List(literals) => literals.iter_mut().for_each(normalize),
        }
    }
}

/// Parse an oracle response into a decision
///
/// `utterance` stands in for a missing analysis prompt.
pub fn parse_decision(
    response: &str,
    utterance: &str,
    compiler: &Compiler,
) -> Result<IntentDecision, IntentError> {
    let json = extract_json(response)?;
    let raw: RawDecision = serde_json::from_str(json)?;

    if !raw.confidence.is_finite() || !(0.0..=1.0).contains(&raw.confidence) {
        return Err(IntentError::IntentExtraction(format!(
            "confidence {} is outside [0, 1]",
            raw.confidence
        )));
    }

    let analysis = raw.analysis.map(|a| AnalysisRequest {
        analysis_type: a.analysis_type,
        format_requirements: a.format_requirements.filter(|f| !f.trim().is_empty()),
        prompt: a
            .prompt
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| utterance.to_string()),
    });

    let filter = match raw.filter {
        Some(mut filter) => {
            normalize_types(&mut filter, compiler.registry());
            compiler
                .check(&filter)
                .map_err(|e| IntentError::IntentExtraction(e.to_string()))?;
            Some(filter)
        }
        None => None,
    };

    let decision = match (raw.intent_type, filter, analysis) {
        (IntentKind::NewQuery, Some(filter), None) => {
            IntentDecision::new_query(filter, raw.confidence)
        }
        (IntentKind::CachedAnalysis, None, Some(analysis)) => {
            IntentDecision::cached_analysis(analysis, raw.confidence)
        }
        (IntentKind::Combined, Some(filter), Some(analysis)) => {
            IntentDecision::combined(filter, analysis, raw.confidence)
        }
        (kind, filter, analysis) => {
            return Err(IntentError::IntentExtraction(format!(
                "{} decision with filter {} and analysis {}",
                kind,
                if filter.is_some() { "present" } else { "absent" },
                if analysis.is_some() { "present" } else { "absent" },
            )));
        }
    };

    Ok(decision.with_reasoning(raw.reasoning))
}

#[cfg(test)]
mod tests {
    use super::*;
    use adoq_domain::{Operator, RelativePeriod};

    fn parse(response: &str) -> Result<IntentDecision, IntentError> {
        parse_decision(response, "the utterance", &Compiler::standard())
    }

    #[test]
    fn test_parse_new_query() {
        let decision = parse(
            r#"{
                "intent_type": "NEW_QUERY",
                "confidence": 0.9,
                "filter": {
                    "predicates": [
                        {"field": "System.WorkItemType", "operator": "=", "value": "bugs"},
                        {"field": "priority", "operator": "=", "value": 1}
                    ],
                    "date_window": {"relative": "last_7_days"}
                },
                "analysis": null,
                "reasoning": "explicit criteria"
            }"#,
        )
        .unwrap();

        assert_eq!(decision.kind(), IntentKind::NewQuery);
        assert_eq!(decision.reasoning(), "explicit criteria");
        let filter = decision.filter().unwrap();
        assert_eq!(
            filter.predicates[0].value,
            PredicateValue::Single(Literal::text("Bug"))
        );
        assert_eq!(filter.predicates[1].operator, Operator::Eq);
        assert_eq!(
            filter.date_window.as_ref().unwrap().relative,
            Some(RelativePeriod::LastDays(7))
        );
    }

    #[test]
    fn test_parse_fenced_cached_analysis() {
        let response = "```json\n{\"intent_type\": \"CACHED_ANALYSIS\", \"confidence\": 0.8, \"analysis\": {\"analysis_type\": \"newsletter\"}}\n```";
        let decision = parse(response).unwrap();

        assert_eq!(decision.kind(), IntentKind::CachedAnalysis);
        let analysis = decision.analysis().unwrap();
        assert_eq!(analysis.analysis_type, AnalysisType::Newsletter);
        assert_eq!(analysis.prompt, "the utterance");
    }

    #[test]
    fn test_unknown_keys_rejected_at_every_level() {
        for response in [
            r#"{"intent_type": "NEW_QUERY", "confidence": 0.9, "filter": {"ids": [1]}, "extra": 1}"#,
            r#"{"intent_type": "NEW_QUERY", "confidence": 0.9, "filter": {"ids": [1], "limit": 5}}"#,
            r#"{"intent_type": "NEW_QUERY", "confidence": 0.9, "filter": {"predicates": [{"field": "state", "operator": "=", "value": "Active", "negate": true}]}}"#,
            r#"{"intent_type": "CACHED_ANALYSIS", "confidence": 0.9, "analysis": {"analysis_type": "summary", "tone": "fun"}}"#,
        ] {
            assert!(matches!(parse(response), Err(IntentError::IntentExtraction(_))), "{}", response);
        }
    }

    #[test]
    fn test_invalid_vocabulary_rejected() {
        for response in [
            // Unknown field
            r#"{"intent_type": "NEW_QUERY", "confidence": 0.9, "filter": {"predicates": [{"field": "mood", "operator": "=", "value": "sad"}]}}"#,
            // Unknown operator
            r#"{"intent_type": "NEW_QUERY", "confidence": 0.9, "filter": {"predicates": [{"field": "state", "operator": "LIKE", "value": "A%"}]}}"#,
            // Operator not valid for the type
            r#"{"intent_type": "NEW_QUERY", "confidence": 0.9, "filter": {"predicates": [{"field": "priority", "operator": "CONTAINS", "value": 1}]}}"#,
            // Wrong value type
            r#"{"intent_type": "NEW_QUERY", "confidence": 0.9, "filter": {"predicates": [{"field": "priority", "operator": "=", "value": true}]}}"#,
            // Unknown analysis type
            r#"{"intent_type": "CACHED_ANALYSIS", "confidence": 0.9, "analysis": {"analysis_type": "poem"}}"#,
            // Unknown intent
            r#"{"intent_type": "DELETE", "confidence": 0.9}"#,
        ] {
            assert!(matches!(parse(response), Err(IntentError::IntentExtraction(_))), "{}", response);
        }
    }

    #[test]
    fn test_confidence_out_of_range() {
        let response = r#"{"intent_type": "NEW_QUERY", "confidence": 1.2, "filter": {"ids": [1]}}"#;
        assert!(matches!(parse(response), Err(IntentError::IntentExtraction(_))));
    }

    #[test]
    fn test_inconsistent_payload() {
        for response in [
            r#"{"intent_type": "NEW_QUERY", "confidence": 0.9}"#,
            r#"{"intent_type": "CACHED_ANALYSIS", "confidence": 0.9, "filter": {"ids": [1]}, "analysis": {"analysis_type": "summary"}}"#,
            r#"{"intent_type": "COMBINED", "confidence": 0.9, "filter": {"ids": [1]}}"#,
        ] {
            assert!(matches!(parse(response), Err(IntentError::IntentExtraction(_))), "{}", response);
        }
    }

    #[test]
    fn test_date_only_filter_rejected() {
        let response = r#"{"intent_type": "NEW_QUERY", "confidence": 0.9, "filter": {"date_window": {"relative": "today"}}}"#;
        assert!(matches!(parse(response), Err(IntentError::IntentExtraction(_))));
    }

    #[test]
    fn test_truncated_json() {
        let response = r#"{"intent_type": "NEW_QUERY", "confidence": 0.9, "filter": {"ids": [1"#;
        assert!(matches!(parse(response), Err(IntentError::IntentExtraction(_))));
    }
}

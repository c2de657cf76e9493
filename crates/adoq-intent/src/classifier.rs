//! Core Intent Classifier implementation

use crate::config::{ClassifierConfig, Strategy};
use crate::cues::CueMatch;
use crate::error::IntentError;
use crate::extract::{Criteria, CriteriaExtractor};
use crate::parser::parse_decision;
use crate::prompt::{PromptBuilder, DECISION_SCHEMA};
use adoq_cache::ResultCache;
use adoq_domain::traits::LlmProvider;
use adoq_domain::{AnalysisRequest, AnalysisType, IntentDecision, IntentKind, SessionId};
use adoq_wiql::Compiler;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

static FORMAT_REQUIREMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:in|as|under|within|using)\s+((?:\d+\s+(?:words|bullets|sentences|paragraphs))|(?:a\s+)?(?:bullet(?:ed)?\s+(?:points|list)|table|markdown|one\s+paragraph|plain\s+text))\b",
    )
    .expect("Invalid regex")
});

/// Session state the classifier may consult
#[derive(Debug, Clone, Copy)]
pub struct ClassifyContext<'a> {
    /// Session the utterance belongs to
    pub session_id: SessionId,

    /// Result cache holding the session's last fetch
    pub cache: &'a ResultCache,

    /// Previous user turns, oldest first
    pub history: &'a [String],
}

impl<'a> ClassifyContext<'a> {
    /// Context with no prior turns
    pub fn new(session_id: SessionId, cache: &'a ResultCache) -> Self {
        Self {
            session_id,
            cache,
            history: &[],
        }
    }

    /// Attach conversation history
    pub fn with_history(mut self, history: &'a [String]) -> Self {
        self.history = history;
        self
    }
}

/// Decides what each utterance needs: a fetch, an analysis, or both
pub struct IntentClassifier<L: LlmProvider> {
    llm: Option<L>,
    compiler: Arc<Compiler>,
    config: ClassifierConfig,
}

impl<L> IntentClassifier<L>
where
    L: LlmProvider,
    L::Error: std::fmt::Display,
{
    /// Create a classifier backed by an oracle
    pub fn new(llm: L, compiler: Arc<Compiler>, config: ClassifierConfig) -> Self {
        Self {
            llm: Some(llm),
            compiler,
            config,
        }
    }

    /// Create a classifier that only uses the heuristic
    pub fn heuristic_only(compiler: Arc<Compiler>, config: ClassifierConfig) -> Self {
        Self {
            llm: None,
            compiler,
            config,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify one utterance
    ///
    /// Every `Ok` decision has been checked against the session's cache:
    /// a cached analysis is only returned while the entry is fresh.
    pub fn classify(
        &self,
        utterance: &str,
        ctx: &ClassifyContext<'_>,
    ) -> Result<IntentDecision, IntentError> {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return Err(self.low_confidence(0.0));
        }

        let decision = match (&self.llm, self.config.strategy) {
            (Some(llm), Strategy::Oracle) => match self.classify_with_oracle(llm, utterance, ctx) {
                Ok(decision) => decision,
                Err(IntentError::Generation(msg)) if self.config.heuristic_fallback => {
                    warn!("Oracle failed ({}), falling back to heuristic", msg);
                    self.classify_heuristically(utterance)?
                }
                Err(e) => return Err(e),
            },
            (None, Strategy::Oracle) => {
                warn!("No oracle configured, using heuristic classification");
                self.classify_heuristically(utterance)?
            }
            (_, Strategy::Heuristic) => self.classify_heuristically(utterance)?,
        };

        let decision = self.apply_rules(decision, utterance, ctx)?;
        info!(
            session = %ctx.session_id,
            intent = %decision.kind(),
            confidence = decision.confidence(),
            "Classified utterance"
        );
        Ok(decision)
    }

    fn low_confidence(&self, confidence: f64) -> IntentError {
        IntentError::LowConfidence {
            confidence,
            threshold: self.config.confidence_threshold,
        }
    }

    fn criteria(&self, utterance: &str) -> Criteria {
        CriteriaExtractor::new(self.compiler.registry()).extract(utterance)
    }

    /// Ask the oracle and parse its answer strictly
    fn classify_with_oracle(
        &self,
        llm: &L,
        utterance: &str,
        ctx: &ClassifyContext<'_>,
    ) -> Result<IntentDecision, IntentError> {
        let cues = self.config.cues.scan(utterance);
        let budget = if cues.wants_analysis() && !self.criteria(utterance).found() {
            self.config.classification_max_tokens
        } else {
            self.config.extraction_max_tokens
        };

        let prompt = PromptBuilder::new(utterance, self.compiler.registry())
            .with_cache(ctx.cache.status(ctx.session_id))
            .with_history(ctx.history, self.config.history_turns)
            .build();
        debug!("Classification prompt length: {} chars", prompt.len());

        let response = llm
            .generate_structured(&prompt, DECISION_SCHEMA, budget)
            .map_err(|e| IntentError::Generation(e.to_string()))?;
        debug!("Oracle response length: {} chars", response.len());

        parse_decision(&response, utterance, &self.compiler)
    }

    fn analysis_request(&self, utterance: &str, cues: &CueMatch) -> AnalysisRequest {
        AnalysisRequest {
            analysis_type: cues.analysis_type.unwrap_or(AnalysisType::Summary),
            format_requirements: FORMAT_REQUIREMENT
                .captures(utterance)
                .map(|c| c[1].to_lowercase()),
            prompt: utterance.to_string(),
        }
    }

    /// Cue detection plus regex extraction
    fn classify_heuristically(&self, utterance: &str) -> Result<IntentDecision, IntentError> {
        let cues = self.config.cues.scan(utterance);
        let criteria = self.criteria(utterance);

        let retrieval = if criteria.found() {
            match self.compiler.check(&criteria.spec) {
                Ok(()) => true,
                // A bare date range ("this week") is not enough to fetch on
                Err(e) if !cues.wants_analysis() => {
                    return Err(IntentError::IntentExtraction(e.to_string()))
                }
                Err(_) => false,
            }
        } else {
            false
        };

        debug!(
            analysis = ?cues.analysis,
            cache_references = ?cues.cache_references,
            criteria = ?criteria.matched,
            "Heuristic signals"
        );

        // Naming a period or a type describes new items, not the cached ones
        let names_new_items = criteria.matched.iter().any(|m| matches!(*m, "date" | "type"));

        let decision = match (retrieval, cues.wants_analysis()) {
            (_, true) if cues.references_cache() && !names_new_items => {
                IntentDecision::cached_analysis(self.analysis_request(utterance, &cues), 0.85)
            }
            (true, true) => IntentDecision::combined(
                criteria.spec,
                self.analysis_request(utterance, &cues),
                0.75,
            ),
            (true, false) => {
                let confidence = (0.6 + 0.1 * criteria.matched.len() as f64).min(0.95);
                IntentDecision::new_query(criteria.spec, confidence)
            }
            (false, true) => IntentDecision::cached_analysis(
                self.analysis_request(utterance, &cues),
                0.7,
            ),
            (false, false) => return Err(self.low_confidence(0.2)),
        };

        Ok(decision.with_reasoning(format!(
            "heuristic: criteria {:?}, analysis cues {:?}, cache references {:?}",
            criteria.matched, cues.analysis, cues.cache_references
        )))
    }

    /// Threshold and cache-freshness rules, applied to every decision
    fn apply_rules(
        &self,
        decision: IntentDecision,
        utterance: &str,
        ctx: &ClassifyContext<'_>,
    ) -> Result<IntentDecision, IntentError> {
        if decision.confidence() < self.config.confidence_threshold {
            return Err(self.low_confidence(decision.confidence()));
        }

        if decision.kind() != IntentKind::CachedAnalysis
            || ctx.cache.get(ctx.session_id).is_some()
        {
            return Ok(decision);
        }

        if !self.config.downgrade_without_cache {
            return Err(IntentError::NoCachedData);
        }

        // Re-fetch instead: criteria in the utterance first, then the
        // filter that produced the expired entry
        let criteria = self.criteria(utterance);
        let filter = if criteria.found() && self.compiler.check(&criteria.spec).is_ok() {
            Some(criteria.spec)
        } else {
            ctx.cache
                .peek(ctx.session_id)
                .and_then(|entry| entry.origin().filter.clone())
        };

        match filter {
            Some(filter) => {
                info!(session = %ctx.session_id, "No fresh cache, downgrading to a new query");
                let confidence = decision.confidence();
                Ok(IntentDecision::new_query(filter, confidence)
                    .with_reasoning("no fresh cached results; re-running the query"))
            }
            None => Err(IntentError::NoCachedData),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adoq_cache::{CacheConfig, CacheEntry, CacheOrigin, ManualClock};
    use adoq_domain::{refs, FilterSpec, RelativePeriod, WorkItem};
    use adoq_llm::MockProvider;
    use std::time::Duration;

    fn heuristic() -> IntentClassifier<MockProvider> {
        IntentClassifier::heuristic_only(
            Arc::new(Compiler::standard()),
            ClassifierConfig {
                strategy: Strategy::Heuristic,
                ..ClassifierConfig::default()
            },
        )
    }

    fn oracle(provider: MockProvider, config: ClassifierConfig) -> IntentClassifier<MockProvider> {
        IntentClassifier::new(provider, Arc::new(Compiler::standard()), config)
    }

    fn cached(cache: &ResultCache, session: SessionId) {
        let filter = FilterSpec::builder().work_item_types(["Bug"]).build();
        cache.put(
            session,
            CacheEntry::new(
                vec![WorkItem::new(1, "Bug", "Crash", "Active")],
                CacheOrigin {
                    filter: Some(filter),
                    query: None,
                },
                "bugs",
            ),
        );
    }

    #[test]
    fn test_heuristic_new_query() {
        let cache = ResultCache::default();
        let ctx = ClassifyContext::new(SessionId::new(), &cache);

        let decision = heuristic()
            .classify("show P1 bugs changed in the last 7 days", &ctx)
            .unwrap();
        assert_eq!(decision.kind(), IntentKind::NewQuery);
        assert!(decision.confidence() >= 0.8);
        assert!(decision.analysis().is_none());
    }

    #[test]
    fn test_heuristic_combined() {
        let cache = ResultCache::default();
        let ctx = ClassifyContext::new(SessionId::new(), &cache);

        let decision = heuristic()
            .classify("summarize active bugs tagged security in bullet points", &ctx)
            .unwrap();
        assert_eq!(decision.kind(), IntentKind::Combined);
        let analysis = decision.analysis().unwrap();
        assert_eq!(analysis.analysis_type, AnalysisType::Summary);
        assert_eq!(analysis.format_requirements.as_deref(), Some("bullet points"));
    }

    #[test]
    fn test_criteria_outrank_cache_words() {
        let cache = ResultCache::default();
        let session = SessionId::new();
        cached(&cache, session);
        let ctx = ClassifyContext::new(session, &cache);

        let decision = heuristic()
            .classify("summarize P1 bugs from the previous month", &ctx)
            .unwrap();
        assert_eq!(decision.kind(), IntentKind::Combined);
        let filter = decision.filter().unwrap();
        assert_eq!(
            filter.date_window.as_ref().and_then(|w| w.relative),
            Some(RelativePeriod::LastMonths(1))
        );

        let decision = heuristic()
            .classify("summarize those bugs from last week", &ctx)
            .unwrap();
        assert_eq!(decision.kind(), IntentKind::Combined);

        let decision = heuristic().classify("summarize those", &ctx).unwrap();
        assert_eq!(decision.kind(), IntentKind::CachedAnalysis);
    }

    #[test]
    fn test_newsletter_with_fresh_cache() {
        let cache = ResultCache::default();
        let session = SessionId::new();
        cached(&cache, session);
        let ctx = ClassifyContext::new(session, &cache);

        let decision = heuristic()
            .classify("summarize the cached results as a newsletter", &ctx)
            .unwrap();
        assert_eq!(decision.kind(), IntentKind::CachedAnalysis);
        assert_eq!(
            decision.analysis().unwrap().analysis_type,
            AnalysisType::Newsletter
        );
        assert!(decision.filter().is_none());
    }

    #[test]
    fn test_newsletter_without_cache() {
        let cache = ResultCache::default();
        let ctx = ClassifyContext::new(SessionId::new(), &cache);

        let result = heuristic().classify("summarize the cached results as a newsletter", &ctx);
        assert_eq!(result, Err(IntentError::NoCachedData));
    }

    #[test]
    fn test_expired_cache_downgrades_when_enabled() {
        let clock = Arc::new(ManualClock::new());
        let cache = ResultCache::with_clock(CacheConfig { ttl_secs: 60 }, clock.clone());
        let session = SessionId::new();
        cached(&cache, session);
        clock.advance(Duration::from_secs(61));
        let ctx = ClassifyContext::new(session, &cache);

        let strict = heuristic();
        assert_eq!(
            strict.classify("analyze those", &ctx),
            Err(IntentError::NoCachedData)
        );

        let lenient = IntentClassifier::<MockProvider>::heuristic_only(
            Arc::new(Compiler::standard()),
            ClassifierConfig {
                strategy: Strategy::Heuristic,
                downgrade_without_cache: true,
                ..ClassifierConfig::default()
            },
        );
        let decision = lenient.classify("analyze those", &ctx).unwrap();
        assert_eq!(decision.kind(), IntentKind::NewQuery);
        assert_eq!(
            decision.filter().unwrap().predicates[0].field,
            refs::WORK_ITEM_TYPE
        );
    }

    #[test]
    fn test_neither_signal_is_low_confidence() {
        let cache = ResultCache::default();
        let ctx = ClassifyContext::new(SessionId::new(), &cache);

        for text in ["hello there", "   "] {
            assert!(matches!(
                heuristic().classify(text, &ctx),
                Err(IntentError::LowConfidence { .. })
            ));
        }
    }

    #[test]
    fn test_date_only_is_extraction_error() {
        let cache = ResultCache::default();
        let ctx = ClassifyContext::new(SessionId::new(), &cache);

        assert!(matches!(
            heuristic().classify("what changed this week", &ctx),
            Err(IntentError::IntentExtraction(_))
        ));
    }

    #[test]
    fn test_oracle_decision_and_budget() {
        let provider = MockProvider::new(
            r#"{"intent_type": "NEW_QUERY", "confidence": 0.9, "filter": {"ids": [42]}, "analysis": null, "reasoning": "id"}"#,
        );
        let classifier = oracle(provider.clone(), ClassifierConfig::default());
        let cache = ResultCache::default();
        let history = vec!["show my tasks".to_string()];
        let ctx = ClassifyContext::new(SessionId::new(), &cache).with_history(&history);

        let decision = classifier.classify("open item 42", &ctx).unwrap();
        assert_eq!(decision.filter().unwrap().ids, vec![42]);
        assert_eq!(provider.last_max_tokens(), Some(2000));
        assert!(provider.prompts()[0].contains("- show my tasks"));
    }

    #[test]
    fn test_oracle_cached_analysis_is_checked_against_cache() {
        let provider = MockProvider::new(
            r#"{"intent_type": "CACHED_ANALYSIS", "confidence": 0.9, "analysis": {"analysis_type": "insights"}}"#,
        );
        let classifier = oracle(provider.clone(), ClassifierConfig::default());
        let cache = ResultCache::default();
        let session = SessionId::new();
        let ctx = ClassifyContext::new(session, &cache);

        assert_eq!(
            classifier.classify("what patterns do you see", &ctx),
            Err(IntentError::NoCachedData)
        );
        assert_eq!(provider.last_max_tokens(), Some(500));

        cached(&cache, session);
        let decision = classifier.classify("what patterns do you see", &ctx).unwrap();
        assert_eq!(decision.kind(), IntentKind::CachedAnalysis);
    }

    #[test]
    fn test_oracle_low_confidence() {
        let provider = MockProvider::new(
            r#"{"intent_type": "NEW_QUERY", "confidence": 0.3, "filter": {"ids": [1]}}"#,
        );
        let classifier = oracle(provider, ClassifierConfig::default());
        let cache = ResultCache::default();
        let ctx = ClassifyContext::new(SessionId::new(), &cache);

        let result = classifier.classify("item 1 maybe", &ctx);
        assert_eq!(
            result,
            Err(IntentError::LowConfidence {
                confidence: 0.3,
                threshold: 0.6
            })
        );
    }

    #[test]
    fn test_oracle_failure_propagates_unless_fallback() {
        let provider = MockProvider::default();
        let cache = ResultCache::default();
        let ctx = ClassifyContext::new(SessionId::new(), &cache);
        let utterance = "show P1 bugs";

        // Register the error for the exact prompt the classifier will send
        let registry = Compiler::standard().registry().clone();
        let prompt = PromptBuilder::new(utterance, &registry)
            .with_cache(None)
            .with_history(&[], 5)
            .build();
        provider.add_error(prompt);

        let classifier = oracle(provider.clone(), ClassifierConfig::default());
        assert!(matches!(
            classifier.classify(utterance, &ctx),
            Err(IntentError::Generation(_))
        ));

        let classifier = oracle(
            provider,
            ClassifierConfig {
                heuristic_fallback: true,
                ..ClassifierConfig::default()
            },
        );
        let decision = classifier.classify(utterance, &ctx).unwrap();
        assert_eq!(decision.kind(), IntentKind::NewQuery);
    }

    #[test]
    fn test_oracle_garbage_is_extraction_error() {
        let provider = MockProvider::new("I think you want bugs.");
        let classifier = oracle(provider, ClassifierConfig::default());
        let cache = ResultCache::default();
        let ctx = ClassifyContext::new(SessionId::new(), &cache);

        assert!(matches!(
            classifier.classify("bugs please", &ctx),
            Err(IntentError::IntentExtraction(_))
        ));
    }
}

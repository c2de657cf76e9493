//! Turn orchestration: classify, compile, fetch, cache, analyze

use crate::analysis::{AnalysisReport, Analyzer};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use adoq_cache::{CacheEntry, CacheOrigin, ResultCache};
use adoq_domain::traits::{FetchExecutor, LlmProvider};
use adoq_domain::{
    AnalysisRequest, CompiledQuery, FilterSpec, IntentKind, PredicateValue, SessionId, WorkItem,
};
use adoq_intent::{ClassifierConfig, ClassifyContext, IntentClassifier};
use adoq_wiql::{CompileContext, Compiler};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// What a turn produced
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// New data was fetched and cached
    Fetched {
        /// The executed query
        query: CompiledQuery,
        /// The new cache entry
        entry: Arc<CacheEntry>,
    },

    /// The cached data was analyzed
    Analyzed {
        /// The analyzed entry
        entry: Arc<CacheEntry>,
        /// The analysis
        report: AnalysisReport,
    },

    /// New data was fetched, cached, then analyzed
    FetchedAndAnalyzed {
        /// The executed query
        query: CompiledQuery,
        /// The new cache entry
        entry: Arc<CacheEntry>,
        /// Analysis of the new entry
        report: AnalysisReport,
    },
}

impl TurnOutcome {
    /// The intent the turn carried out
    pub fn kind(&self) -> IntentKind {
        match self {
            TurnOutcome::Fetched { .. } => IntentKind::NewQuery,
            TurnOutcome::Analyzed { .. } => IntentKind::CachedAnalysis,
            TurnOutcome::FetchedAndAnalyzed { .. } => IntentKind::Combined,
        }
    }

    /// The entry the turn worked on
    pub fn entry(&self) -> &Arc<CacheEntry> {
        match self {
            TurnOutcome::Fetched { entry, .. }
            | TurnOutcome::Analyzed { entry, .. }
            | TurnOutcome::FetchedAndAnalyzed { entry, .. } => entry,
        }
    }

    /// The analysis, if the turn produced one
    pub fn report(&self) -> Option<&AnalysisReport> {
        match self {
            TurnOutcome::Fetched { .. } => None,
            TurnOutcome::Analyzed { report, .. }
            | TurnOutcome::FetchedAndAnalyzed { report, .. } => Some(report),
        }
    }
}

/// Short human-readable description of a filter
pub fn describe_filter(filter: &FilterSpec) -> String {
    let mut parts = Vec::new();

    if !filter.ids.is_empty() {
        let ids: Vec<String> = filter.ids.iter().map(|id| format!("#{}", id)).collect();
        parts.push(ids.join(", "));
    }
    for predicate in &filter.predicates {
        let value = match &predicate.value {
            PredicateValue::Single(literal) => literal.to_string(),
            PredicateValue::List(literals) => {
                let values: Vec<String> = literals.iter().map(|l| l.to_string()).collect();
                format!("({})", values.join(", "))
            }
        };
        parts.push(format!("{} {} {}", predicate.field, predicate.operator.token(), value));
    }
    if let Some(window) = &filter.date_window {
        match (&window.relative, window.start, window.end) {
            (Some(period), _, _) => parts.push(format!("{} {}", window.field, period)),
            (None, start, end) => parts.push(format!(
                "{} {}..{}",
                window.field,
                start.map(|d| d.to_string()).unwrap_or_default(),
                end.map(|d| d.to_string()).unwrap_or_default()
            )),
        }
    }
    for term in &filter.free_text_terms {
        parts.push(format!("\"{}\"", term));
    }

    if parts.is_empty() {
        "all work items".to_string()
    } else {
        parts.join("; ")
    }
}

/// Runs conversation turns against the store, the cache and the oracle
pub struct Pipeline<L, F>
where
    L: LlmProvider,
    F: FetchExecutor,
{
    classifier: Arc<IntentClassifier<L>>,
    analyzer: Arc<Analyzer<L>>,
    compiler: Arc<Compiler>,
    cache: Arc<ResultCache>,
    fetcher: Arc<F>,
    config: PipelineConfig,
}

impl<L, F> Pipeline<L, F>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
    F: FetchExecutor + Send + Sync + 'static,
    F::Error: std::fmt::Display,
{
    /// Assemble a pipeline from its parts
    pub fn new(
        classifier: IntentClassifier<L>,
        analyzer: Analyzer<L>,
        compiler: Arc<Compiler>,
        cache: Arc<ResultCache>,
        fetcher: F,
        config: PipelineConfig,
    ) -> Self {
        Self {
            classifier: Arc::new(classifier),
            analyzer: Arc::new(analyzer),
            compiler,
            cache,
            fetcher: Arc::new(fetcher),
            config,
        }
    }

    /// Assemble a pipeline where one oracle classifies and analyzes
    pub fn with_llm(
        llm: L,
        compiler: Arc<Compiler>,
        cache: Arc<ResultCache>,
        fetcher: F,
        classifier_config: ClassifierConfig,
        config: PipelineConfig,
    ) -> Self
    where
        L: Clone,
    {
        let classifier = IntentClassifier::new(llm.clone(), Arc::clone(&compiler), classifier_config);
        let analyzer = Analyzer::new(llm, config.analyzer.clone());
        Self::new(classifier, analyzer, compiler, cache, fetcher, config)
    }

    /// The shared result cache
    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Active configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run a blocking stage on the blocking pool under a deadline
    async fn run_blocking<T, Func>(
        stage: &'static str,
        deadline: Duration,
        work: Func,
    ) -> Result<T, PipelineError>
    where
        T: Send + 'static,
        Func: FnOnce() -> Result<T, PipelineError> + Send + 'static,
    {
        timeout(deadline, tokio::task::spawn_blocking(work))
            .await
            .map_err(|_| {
                warn!("{} exceeded {:?}", stage, deadline);
                PipelineError::Timeout(stage)
            })?
            .map_err(|e| PipelineError::Join(e.to_string()))?
    }

    /// Handle one user utterance
    pub async fn handle_turn(
        &self,
        session: SessionId,
        utterance: &str,
        history: &[String],
        ctx: &CompileContext,
    ) -> Result<TurnOutcome, PipelineError> {
        let classifier = Arc::clone(&self.classifier);
        let cache = Arc::clone(&self.cache);
        let text = utterance.to_string();
        let history = history.to_vec();

        let decision = Self::run_blocking(
            "classification",
            self.config.classification_timeout(),
            move || {
                let ctx = ClassifyContext::new(session, &cache).with_history(&history);
                classifier.classify(&text, &ctx).map_err(PipelineError::from)
            },
        )
        .await?;

        info!(
            session = %session,
            intent = %decision.kind(),
            confidence = decision.confidence(),
            "Handling turn"
        );

        let kind = decision.kind();
        match (kind, decision.into_parts()) {
            (IntentKind::NewQuery, (Some(filter), _)) => {
                let (query, entry) = self.fetch_and_cache(session, filter, ctx, utterance).await?;
                Ok(TurnOutcome::Fetched { query, entry })
            }
            (IntentKind::CachedAnalysis, (_, Some(request))) => {
                self.analyze_cached(session, request).await
            }
            (IntentKind::Combined, (Some(filter), Some(request))) => {
                let (query, entry) = self.fetch_and_cache(session, filter, ctx, utterance).await?;
                let report = self.analyze_entry(Arc::clone(&entry), request).await?;
                Ok(TurnOutcome::FetchedAndAnalyzed { query, entry, report })
            }
            // IntentDecision's constructors keep payload and kind in step
            (kind, _) => Err(PipelineError::Config(format!(
                "{} decision is missing its payload",
                kind
            ))),
        }
    }

    /// Compile and run a filter, replacing the session's cached set
    pub async fn run_query(
        &self,
        session: SessionId,
        filter: FilterSpec,
        ctx: &CompileContext,
    ) -> Result<TurnOutcome, PipelineError> {
        let description = describe_filter(&filter);
        let (query, entry) = self.fetch_and_cache(session, filter, ctx, &description).await?;
        Ok(TurnOutcome::Fetched { query, entry })
    }

    /// Complete and run a WHERE fragment, replacing the session's cached set
    pub async fn run_fragment(
        &self,
        session: SessionId,
        clause: &str,
        ctx: &CompileContext,
    ) -> Result<TurnOutcome, PipelineError> {
        let query = self.compiler.compile_fragment(clause, ctx)?;
        let items = self.fetch(&query).await?;
        let entry = self.cache.put(
            session,
            CacheEntry::new(items, CacheOrigin::from_query(query.clone()), clause.trim()),
        );
        Ok(TurnOutcome::Fetched { query, entry })
    }

    /// Analyze the session's cached set
    pub async fn analyze_cached(
        &self,
        session: SessionId,
        request: AnalysisRequest,
    ) -> Result<TurnOutcome, PipelineError> {
        let entry = self.cache.get(session).ok_or(PipelineError::NoCachedData)?;
        let report = self.analyze_entry(Arc::clone(&entry), request).await?;
        Ok(TurnOutcome::Analyzed { entry, report })
    }

    async fn fetch(&self, query: &CompiledQuery) -> Result<Vec<WorkItem>, PipelineError> {
        let fetcher = Arc::clone(&self.fetcher);
        let query = query.clone();
        debug!(query = %query, "Fetching");

        Self::run_blocking("fetch", self.config.fetch_timeout(), move || {
            fetcher
                .execute(&query)
                .map_err(|e| PipelineError::Fetch(e.to_string()))
        })
        .await
    }

    async fn fetch_and_cache(
        &self,
        session: SessionId,
        filter: FilterSpec,
        ctx: &CompileContext,
        description: &str,
    ) -> Result<(CompiledQuery, Arc<CacheEntry>), PipelineError> {
        let query = self.compiler.compile(&filter, ctx)?;

        // Nothing is cached unless the whole fetch succeeded
        let items = self.fetch(&query).await?;

        let entry = self.cache.put(
            session,
            CacheEntry::new(
                items,
                CacheOrigin::from_filter(filter, query.clone()),
                description,
            ),
        );
        Ok((query, entry))
    }

    async fn analyze_entry(
        &self,
        entry: Arc<CacheEntry>,
        request: AnalysisRequest,
    ) -> Result<AnalysisReport, PipelineError> {
        let analyzer = Arc::clone(&self.analyzer);
        Self::run_blocking("analysis", self.config.analysis_timeout(), move || {
            analyzer.analyze(entry.items(), &request)
        })
        .await
    }
}

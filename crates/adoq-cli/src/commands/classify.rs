//! Classify command implementation.

use crate::cli::ClassifyArgs;
use crate::config::AppConfig;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use adoq_cache::ResultCache;
use adoq_domain::SessionId;
use adoq_intent::{ClassifyContext, IntentClassifier, Strategy};
use adoq_llm::AzureOpenAiProvider;
use adoq_wiql::{CompileContext, Compiler};
use std::sync::Arc;
use tracing::{info, warn};

/// Execute the classify command.
///
/// Runs in a fresh session with an empty cache, so cached-analysis requests
/// are reported as such rather than answered.
pub fn execute_classify(
    args: ClassifyArgs,
    compiler: Arc<Compiler>,
    config: &AppConfig,
    formatter: &Formatter,
) -> Result<()> {
    let utterance = args.utterance.join(" ");
    if utterance.trim().is_empty() {
        return Err(CliError::InvalidInput("Utterance is empty".to_string()));
    }

    let classifier = build_classifier(config, Arc::clone(&compiler), args.heuristic);
    let cache = ResultCache::new(config.cache.clone());
    let ctx = ClassifyContext::new(SessionId::new(), &cache);

    let decision = classifier.classify(&utterance, &ctx)?;

    let query = match decision.filter() {
        Some(filter) => {
            let compile_ctx = CompileContext::new(args.project.or_else(|| config.project.clone()));
            Some(compiler.compile(filter, &compile_ctx)?)
        }
        None => None,
    };

    println!("{}", formatter.format_decision(&decision, query.as_ref())?);
    Ok(())
}

/// Classifier for the configured oracle, or a heuristic-only one.
pub fn build_classifier(
    config: &AppConfig,
    compiler: Arc<Compiler>,
    heuristic: bool,
) -> IntentClassifier<AzureOpenAiProvider> {
    let mut classifier_config = config.classifier.clone();

    if heuristic {
        classifier_config.strategy = Strategy::Heuristic;
        return IntentClassifier::heuristic_only(compiler, classifier_config);
    }
    if !config.has_llm() {
        info!("No [llm] endpoint configured, classifying heuristically");
        return IntentClassifier::heuristic_only(compiler, classifier_config);
    }

    match AzureOpenAiProvider::from_env(config.llm.clone()) {
        Ok(provider) => IntentClassifier::new(provider, compiler, classifier_config),
        Err(e) => {
            warn!("Oracle unavailable ({}), classifying heuristically", e);
            IntentClassifier::heuristic_only(compiler, classifier_config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adoq_domain::IntentKind;

    #[test]
    fn test_heuristic_flag_forces_heuristic() {
        let mut config = AppConfig::default();
        config.llm.endpoint = "https://example.openai.azure.com".to_string();
        config.llm.deployment = "gpt-4o-mini".to_string();

        let classifier = build_classifier(&config, Arc::new(Compiler::standard()), true);
        assert_eq!(classifier.config().strategy, Strategy::Heuristic);
    }

    #[test]
    fn test_without_endpoint_classifies_heuristically() {
        let config = AppConfig::default();
        let classifier = build_classifier(&config, Arc::new(Compiler::standard()), false);

        let cache = ResultCache::default();
        let ctx = ClassifyContext::new(SessionId::new(), &cache);
        let decision = classifier.classify("show me bug 4521", &ctx).unwrap();
        assert_eq!(decision.kind(), IntentKind::NewQuery);
        assert_eq!(decision.filter().unwrap().ids, vec![4521]);
    }
}

//! Analysis Orchestration
//!
//! Ties the pipeline together: prompt construction, provider routing,
//! response classification, the optimization-plan follow-up call, and the
//! deterministic score. The HTTP surface sitting above this crate only ever
//! talks to [`AnalysisEngine`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::classify::{
    ClassifiedSections, ClassifierStatsSnapshot, OptimizationPlan, ResponseClassifier,
    extract_plan, fallback_plan,
};
use crate::config::EngineConfig;
use crate::constants::generation;
use crate::prompt;
use crate::provider::{
    GenerationOptions, ProviderRouter, RouteOptions, StatsSnapshot, StatsStore, TokenUsage,
};
use crate::score::{self, GradeInfo};
use crate::types::{FormInput, Language, ProviderId, Result, UserTier};

/// Complete analysis result handed to the caller
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Deterministic score, always in [50, 85]
    pub score: u8,
    pub grade: GradeInfo,
    pub sections: ClassifiedSections,
    pub optimization_plan: OptimizationPlan,
    pub provider_used: ProviderId,
    pub fallback_used: bool,
    pub model: String,
    pub usage: TokenUsage,
    /// Score the model claimed for itself; informational only
    pub advisory_score: Option<u32>,
    pub timestamp: DateTime<Utc>,
}

/// One engine instance serves the whole process
pub struct AnalysisEngine {
    router: ProviderRouter,
    classifier: ResponseClassifier,
}

impl AnalysisEngine {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let stats = Arc::new(StatsStore::new());
        Ok(Self {
            router: ProviderRouter::from_config(config, stats),
            classifier: ResponseClassifier::new()?,
        })
    }

    /// Build an engine around an existing router; used by embedders that
    /// construct providers themselves
    pub fn with_router(router: ProviderRouter) -> Result<Self> {
        Ok(Self {
            router,
            classifier: ResponseClassifier::new()?,
        })
    }

    /// Run the full analysis pipeline for one form submission
    pub async fn analyze(
        &self,
        form: &FormInput,
        language: Language,
        tier: UserTier,
    ) -> Result<AnalysisReport> {
        let prompt = prompt::build_analysis_prompt(form, language, tier);
        let opts = RouteOptions::from_strategy(self.router.strategy());

        let outcome = self.router.route(&prompt, &opts).await?;
        info!(
            provider = %outcome.decision.provider_used,
            fallback = outcome.decision.fallback_used,
            latency_ms = outcome.result.latency_ms,
            "Analysis response received"
        );

        let sections = self.classifier.classify(&outcome.result.content);
        let advisory_score = self.classifier.advisory_score(&outcome.result.content);
        let value = score::score(form);
        if let Some(claimed) = advisory_score {
            info!(deterministic = value, claimed, "Model claimed its own score");
        }

        let optimization_plan = self.optimization_plan(&sections, language).await;

        Ok(AnalysisReport {
            score: value,
            grade: score::grade_for(value),
            sections,
            optimization_plan,
            provider_used: outcome.decision.provider_used,
            fallback_used: outcome.decision.fallback_used,
            model: outcome.result.model_used,
            usage: outcome.result.usage,
            advisory_score,
            timestamp: Utc::now(),
        })
    }

    /// Follow-up cycle extracting the improvement plan; a routing failure
    /// degrades to the canned plan instead of failing the analysis
    async fn optimization_plan(
        &self,
        sections: &ClassifiedSections,
        language: Language,
    ) -> OptimizationPlan {
        let follow_up = prompt::build_optimization_prompt(sections, language);
        let opts = RouteOptions {
            generation: GenerationOptions {
                max_tokens: Some(generation::OPTIMIZATION_MAX_TOKENS),
                prefer_fast: true,
                ..Default::default()
            },
            ..RouteOptions::from_strategy(self.router.strategy())
        };

        match self.router.route(&follow_up, &opts).await {
            Ok(outcome) => extract_plan(&outcome.result.content, language),
            Err(err) => {
                warn!(error = %err, "Optimization follow-up failed, using canned plan");
                fallback_plan(language)
            }
        }
    }

    /// Locally synthesized report built from the canned placeholder text;
    /// served by callers when routing fails entirely
    pub async fn sample_report(&self, form: &FormInput, language: Language) -> AnalysisReport {
        let primary = self.router.strategy().primary;
        let canned = crate::provider::placeholder_result(primary).await;
        let sections = self.classifier.classify(&canned.content);
        let advisory_score = self.classifier.advisory_score(&canned.content);
        let value = score::score(form);

        AnalysisReport {
            score: value,
            grade: score::grade_for(value),
            sections,
            optimization_plan: fallback_plan(language),
            provider_used: primary,
            fallback_used: false,
            model: canned.model_used,
            usage: canned.usage,
            advisory_score,
            timestamp: Utc::now(),
        }
    }

    pub fn provider_stats(&self) -> Vec<StatsSnapshot> {
        self.router.stats()
    }

    pub fn parsing_stats(&self) -> ClassifierStatsSnapshot {
        self.classifier.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrategyConfig;
    use crate::provider::{CallResult, ModelProvider, SharedProvider};
    use crate::types::EngineError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    const MARKED_ANALYSIS: &str = "\
***SCORE_START***
80 points; balanced layout; good light
***SCORE_END***
***DIRECTION_START***
south facing entrance draws steady light
***DIRECTION_END***
***LAYOUT_START***
keep the hall open and uncluttered
***LAYOUT_END***
***IMMEDIATE_START***
Move the shoe cabinet; rotate the sofa
***IMMEDIATE_END***
***REGULAR_START***
Monthly balcony cleaning; seasonal curtain swap
***REGULAR_END***";

    struct CannedProvider {
        id: ProviderId,
        content: &'static str,
        fail: bool,
        calls: AtomicU32,
    }

    impl CannedProvider {
        fn shared(id: ProviderId, content: &'static str, fail: bool) -> SharedProvider {
            Arc::new(Self {
                id,
                content,
                fail,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl ModelProvider for CannedProvider {
        async fn invoke(
            &self,
            _prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<CallResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(EngineError::upstream(self.id, "canned failure"));
            }
            Ok(CallResult {
                content: self.content.to_string(),
                model_used: "canned-model".to_string(),
                usage: TokenUsage::default(),
                finish_reason: Some("stop".to_string()),
                latency_ms: 5,
                placeholder: false,
            })
        }

        fn id(&self) -> ProviderId {
            self.id
        }

        fn model(&self) -> &str {
            "canned-model"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn mark_unavailable(&self) {}
    }

    fn engine_with(content: &'static str, fail: bool) -> AnalysisEngine {
        let providers = vec![
            CannedProvider::shared(ProviderId::Qwen, content, fail),
            CannedProvider::shared(ProviderId::DeepSeek, content, fail),
        ];
        let router = ProviderRouter::new(
            providers,
            StrategyConfig::default(),
            Arc::new(StatsStore::new()),
        );
        AnalysisEngine::with_router(router).unwrap()
    }

    fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn sample_form() -> FormInput {
        FormInput {
            house_type: Some("apartment".to_string()),
            direction: Some("south".to_string()),
            area: Some("100".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_full_pipeline_produces_report() {
        init_logging();
        let engine = engine_with(MARKED_ANALYSIS, false);
        let report = engine
            .analyze(&sample_form(), Language::En, UserTier::Free)
            .await
            .unwrap();

        assert!((50..=85).contains(&report.score));
        assert!(report.sections.score.starts_with("80 points"));
        assert!(report.sections.direction.contains("south facing"));
        assert!(report.optimization_plan.immediate.contains("shoe cabinet"));
        assert!(report.optimization_plan.regular.contains("Monthly"));
        assert_eq!(report.provider_used, ProviderId::Qwen);
        assert!(!report.fallback_used);
        assert_eq!(report.advisory_score, Some(80));
    }

    #[tokio::test]
    async fn test_deterministic_score_ignores_model_claim() {
        let engine = engine_with(MARKED_ANALYSIS, false);
        let form = sample_form();
        let first = engine
            .analyze(&form, Language::Zh, UserTier::Free)
            .await
            .unwrap();
        let second = engine
            .analyze(&form, Language::Zh, UserTier::Premium)
            .await
            .unwrap();
        // Same form, same score, regardless of tier or what the model said
        assert_eq!(first.score, second.score);
    }

    #[tokio::test]
    async fn test_routing_failure_propagates() {
        let engine = engine_with(MARKED_ANALYSIS, true);
        let err = engine
            .analyze(&sample_form(), Language::Zh, UserTier::Free)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AllProvidersFailed { .. }));
    }

    #[tokio::test]
    async fn test_unstructured_answer_still_yields_viable_report() {
        let engine = engine_with("A rambling answer about the pleasant flat with no markers.", false);
        let report = engine
            .analyze(&sample_form(), Language::En, UserTier::Free)
            .await
            .unwrap();
        assert!(report.sections.is_viable());
        assert!(!report.optimization_plan.is_empty());
    }

    #[tokio::test]
    async fn test_sample_report_is_complete() {
        let engine = engine_with(MARKED_ANALYSIS, false);
        let report = engine.sample_report(&sample_form(), Language::Zh).await;
        assert!((50..=85).contains(&report.score));
        assert!(report.sections.is_viable());
        assert!(!report.optimization_plan.is_empty());
        assert!(report.model.ends_with("-demo"));
    }
}

//! Provider Router
//!
//! Chooses which backend services a request, fails over between them, races
//! them in parallel, and keeps process-wide performance stats.
//!
//! ## Strategy
//!
//! - **Normal**: primary first, fallback only after a failure (sequential)
//! - **Parallel**: every available backend races; lowest-latency success wins
//! - **Speed test**: a short probe picks the faster backend, then normal
//!   routing is forced to it with fallback still armed
//!
//! Stats are the only mutable state shared across concurrent requests; they
//! live in an injected [`StatsStore`] and are updated exactly once per
//! attempt through synchronized accessors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures::future::join_all;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, RacePolicy, StrategyConfig};
use crate::constants::{generation, network};
use crate::types::{EngineError, ProviderId, Result};

use super::{CallResult, GenerationOptions, SharedProvider, create_provider};

// =============================================================================
// Performance Stats
// =============================================================================

#[derive(Debug, Default)]
struct ProviderStats {
    calls: u64,
    errors: u64,
    /// Accumulated latency of successful calls only
    total_latency_ms: u64,
}

/// Read-only view of one provider's running totals
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StatsSnapshot {
    pub provider: ProviderId,
    pub calls: u64,
    pub errors: u64,
    pub total_latency_ms: u64,
    /// Mean latency over successful calls; 0 when none succeeded yet
    pub avg_latency_ms: f64,
}

/// Process-wide per-provider counters.
///
/// Owned explicitly and injected into the router at construction; mutation
/// goes through the record methods so concurrent requests cannot lose
/// updates.
#[derive(Debug, Default)]
pub struct StatsStore {
    inner: DashMap<ProviderId, ProviderStats>,
}

impl StatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, provider: ProviderId, latency_ms: u64) {
        let mut entry = self.inner.entry(provider).or_default();
        entry.calls += 1;
        entry.total_latency_ms += latency_ms;
    }

    pub fn record_failure(&self, provider: ProviderId) {
        let mut entry = self.inner.entry(provider).or_default();
        entry.calls += 1;
        entry.errors += 1;
    }

    /// Snapshot of all counters; never blocks on in-flight calls
    pub fn snapshot(&self) -> Vec<StatsSnapshot> {
        self.inner
            .iter()
            .map(|entry| {
                let stats = entry.value();
                let successes = stats.calls - stats.errors;
                StatsSnapshot {
                    provider: *entry.key(),
                    calls: stats.calls,
                    errors: stats.errors,
                    total_latency_ms: stats.total_latency_ms,
                    avg_latency_ms: if successes > 0 {
                        stats.total_latency_ms as f64 / successes as f64
                    } else {
                        0.0
                    },
                }
            })
            .collect()
    }

    pub fn for_provider(&self, provider: ProviderId) -> Option<StatsSnapshot> {
        self.snapshot().into_iter().find(|s| s.provider == provider)
    }
}

// =============================================================================
// Routing Types
// =============================================================================

/// How a logical request was served
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingDecision {
    pub provider_used: ProviderId,
    /// True iff a second provider's result was used after the first failed
    pub fallback_used: bool,
    /// The provider that failed first, when fallback kicked in
    pub original_provider: Option<ProviderId>,
}

/// One settled attempt inside a parallel race, kept for observability
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub provider: ProviderId,
    pub success: bool,
    pub latency_ms: u64,
    pub error: Option<String>,
}

/// Observability payload produced by parallel and speed-test routing
#[derive(Debug, Clone, Default)]
pub struct RaceReport {
    pub success_count: usize,
    pub failure_count: usize,
    pub attempts: Vec<AttemptRecord>,
    /// All raw successful results, winner included
    pub results: Vec<(ProviderId, CallResult)>,
}

/// Per-request routing options
#[derive(Debug, Clone)]
pub struct RouteOptions {
    pub force_provider: Option<ProviderId>,
    pub enable_fallback: bool,
    pub parallel: bool,
    pub speed_test: bool,
    pub generation: GenerationOptions,
    /// Per-call deadline override
    pub timeout: Option<Duration>,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            force_provider: None,
            enable_fallback: true,
            parallel: false,
            speed_test: false,
            generation: GenerationOptions::default(),
            timeout: None,
        }
    }
}

impl RouteOptions {
    /// Options matching the configured strategy switches
    pub fn from_strategy(strategy: &StrategyConfig) -> Self {
        Self {
            enable_fallback: strategy.enable_fallback,
            parallel: strategy.parallel,
            speed_test: strategy.speed_test,
            ..Default::default()
        }
    }
}

/// Result of one logical routing request
#[derive(Debug, Clone)]
pub struct RouteOutcome {
    pub result: CallResult,
    pub decision: RoutingDecision,
    /// Present for parallel and speed-test modes
    pub race: Option<RaceReport>,
}

// =============================================================================
// Router
// =============================================================================

/// Selects, races, and fails over between the configured backends
pub struct ProviderRouter {
    /// Configured order is authoritative for selection tie-breaks
    providers: Vec<SharedProvider>,
    strategy: StrategyConfig,
    stats: Arc<StatsStore>,
    default_timeout: Duration,
}

impl ProviderRouter {
    pub fn new(providers: Vec<SharedProvider>, strategy: StrategyConfig, stats: Arc<StatsStore>) -> Self {
        Self {
            providers,
            strategy,
            stats,
            default_timeout: Duration::from_secs(network::DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Build the router and both clients from configuration
    pub fn from_config(config: &EngineConfig, stats: Arc<StatsStore>) -> Self {
        let order = [config.strategy.primary, config.strategy.fallback];
        let providers = order
            .iter()
            .map(|id| create_provider(*id, config.provider(*id)))
            .collect();
        Self::new(providers, config.strategy.clone(), stats)
    }

    pub fn stats(&self) -> Vec<StatsSnapshot> {
        self.stats.snapshot()
    }

    pub fn strategy(&self) -> &StrategyConfig {
        &self.strategy
    }

    fn provider(&self, id: ProviderId) -> Result<&SharedProvider> {
        self.providers
            .iter()
            .find(|p| p.id() == id)
            .ok_or(EngineError::NoProviderAvailable)
    }

    fn available_providers(&self) -> Vec<SharedProvider> {
        self.providers
            .iter()
            .filter(|p| p.is_available())
            .cloned()
            .collect()
    }

    /// Pick the provider for a normal-mode request.
    ///
    /// Configured primary wins if available, then the configured fallback,
    /// then the first available provider in configured order.
    pub fn select_provider(&self) -> Result<ProviderId> {
        for id in [self.strategy.primary, self.strategy.fallback] {
            if self.provider(id).map(|p| p.is_available()).unwrap_or(false) {
                return Ok(id);
            }
        }
        self.providers
            .iter()
            .find(|p| p.is_available())
            .map(|p| p.id())
            .ok_or(EngineError::NoProviderAvailable)
    }

    /// Route one logical request according to the options
    pub async fn route(&self, prompt: &str, opts: &RouteOptions) -> Result<RouteOutcome> {
        if opts.speed_test {
            self.speed_test_route(prompt, opts).await
        } else if opts.parallel {
            self.parallel_route(prompt, opts).await
        } else {
            self.normal_route(prompt, opts).await
        }
    }

    // -------------------------------------------------------------------------
    // Normal Mode
    // -------------------------------------------------------------------------

    async fn normal_route(&self, prompt: &str, opts: &RouteOptions) -> Result<RouteOutcome> {
        let first = match opts.force_provider {
            Some(id) => id,
            None => self.select_provider()?,
        };

        match self.attempt(first, prompt, opts).await {
            Ok(result) => Ok(RouteOutcome {
                result,
                decision: RoutingDecision {
                    provider_used: first,
                    fallback_used: false,
                    original_provider: None,
                },
                race: None,
            }),
            Err(first_error) if opts.enable_fallback => {
                let second = first.other();
                warn!(
                    failed = %first,
                    fallback = %second,
                    error = %first_error,
                    "Primary provider failed, trying fallback"
                );

                match self.attempt(second, prompt, opts).await {
                    Ok(result) => Ok(RouteOutcome {
                        result,
                        decision: RoutingDecision {
                            provider_used: second,
                            fallback_used: true,
                            original_provider: Some(first),
                        },
                        race: None,
                    }),
                    Err(second_error) => Err(EngineError::AllProvidersFailed {
                        primary: first,
                        primary_error: Box::new(first_error),
                        fallback: second,
                        fallback_error: Box::new(second_error),
                    }),
                }
            }
            Err(first_error) => Err(first_error),
        }
    }

    // -------------------------------------------------------------------------
    // Parallel Mode
    // -------------------------------------------------------------------------

    async fn parallel_route(&self, prompt: &str, opts: &RouteOptions) -> Result<RouteOutcome> {
        let participants = self.available_providers();
        if participants.is_empty() {
            return Err(EngineError::NoProviderAvailable);
        }

        match self.strategy.race_policy {
            RacePolicy::WaitForAll => self.race_wait_for_all(participants, prompt, opts).await,
            RacePolicy::FirstSuccess => self.race_first_success(participants, prompt, opts).await,
        }
    }

    /// Wait for every racer to settle, then pick the strictly fastest success
    async fn race_wait_for_all(
        &self,
        participants: Vec<SharedProvider>,
        prompt: &str,
        opts: &RouteOptions,
    ) -> Result<RouteOutcome> {
        let deadline = opts.timeout.unwrap_or(self.default_timeout);
        let futures = participants.into_iter().map(|provider| {
            let stats = Arc::clone(&self.stats);
            let prompt = prompt.to_string();
            let generation = opts.generation.clone();
            async move {
                let id = provider.id();
                let started = Instant::now();
                let outcome =
                    invoke_with_stats(provider, stats, &prompt, &generation, deadline).await;
                (id, started.elapsed().as_millis() as u64, outcome)
            }
        });

        let settled = join_all(futures).await;
        self.pick_race_winner(settled)
    }

    /// Return on the first success; losers keep running detached and still
    /// record their stats when they complete
    async fn race_first_success(
        &self,
        participants: Vec<SharedProvider>,
        prompt: &str,
        opts: &RouteOptions,
    ) -> Result<RouteOutcome> {
        let deadline = opts.timeout.unwrap_or(self.default_timeout);
        let total = participants.len();
        let (tx, mut rx) = mpsc::unbounded_channel();

        for provider in participants {
            let stats = Arc::clone(&self.stats);
            let prompt = prompt.to_string();
            let generation = opts.generation.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let id = provider.id();
                let started = Instant::now();
                let outcome =
                    invoke_with_stats(provider, stats, &prompt, &generation, deadline).await;
                let elapsed = started.elapsed().as_millis() as u64;
                if let Err(err) = &outcome {
                    debug!(provider = %id, error = %err, "Race participant failed");
                }
                // Receiver may be gone once a winner was declared
                let _ = tx.send((id, elapsed, outcome));
            });
        }
        drop(tx);

        let mut settled = Vec::new();
        while let Some(entry) = rx.recv().await {
            let won = entry.2.is_ok();
            settled.push(entry);
            if won || settled.len() == total {
                break;
            }
        }
        self.pick_race_winner(settled)
    }

    fn pick_race_winner(
        &self,
        settled: Vec<(ProviderId, u64, Result<CallResult>)>,
    ) -> Result<RouteOutcome> {
        let mut report = RaceReport::default();
        let mut failures: Vec<(ProviderId, EngineError)> = Vec::new();

        for (id, elapsed_ms, outcome) in settled {
            match outcome {
                Ok(result) => {
                    report.success_count += 1;
                    report.attempts.push(AttemptRecord {
                        provider: id,
                        success: true,
                        latency_ms: result.latency_ms,
                        error: None,
                    });
                    report.results.push((id, result));
                }
                Err(err) => {
                    report.failure_count += 1;
                    report.attempts.push(AttemptRecord {
                        provider: id,
                        success: false,
                        latency_ms: elapsed_ms,
                        error: Some(err.to_string()),
                    });
                    failures.push((id, err));
                }
            }
        }

        // Strict less-than: a later result only displaces the leader when it
        // is genuinely faster; non-responders never participate.
        let mut winner: Option<usize> = None;
        for (idx, (_, result)) in report.results.iter().enumerate() {
            match winner {
                None => winner = Some(idx),
                Some(best) if result.latency_ms < report.results[best].1.latency_ms => {
                    winner = Some(idx)
                }
                Some(_) => {}
            }
        }

        match winner {
            Some(idx) => {
                let (provider_used, result) = report.results[idx].clone();
                info!(
                    winner = %provider_used,
                    latency_ms = result.latency_ms,
                    successes = report.success_count,
                    failures = report.failure_count,
                    "Parallel race settled"
                );
                Ok(RouteOutcome {
                    result,
                    decision: RoutingDecision {
                        provider_used,
                        fallback_used: false,
                        original_provider: None,
                    },
                    race: Some(report),
                })
            }
            None => {
                let mut drained = failures.into_iter();
                match (drained.next(), drained.next()) {
                    (Some((primary, primary_error)), Some((fallback, fallback_error))) => {
                        Err(EngineError::AllProvidersFailed {
                            primary,
                            primary_error: Box::new(primary_error),
                            fallback,
                            fallback_error: Box::new(fallback_error),
                        })
                    }
                    (Some((_, only_error)), None) => Err(only_error),
                    _ => Err(EngineError::NoProviderAvailable),
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Speed-Test Mode
    // -------------------------------------------------------------------------

    /// Probe both backends with a canned prompt, then route normally forcing
    /// the faster one (fallback stays armed)
    async fn speed_test_route(&self, prompt: &str, opts: &RouteOptions) -> Result<RouteOutcome> {
        let participants = self.available_providers();
        if participants.is_empty() {
            return Err(EngineError::NoProviderAvailable);
        }

        let probe_deadline = Duration::from_secs(network::PROBE_TIMEOUT_SECS);
        let probe_generation = GenerationOptions {
            max_tokens: Some(50),
            prefer_fast: true,
            ..Default::default()
        };

        let probes = participants.into_iter().map(|provider| {
            let stats = Arc::clone(&self.stats);
            let generation = probe_generation.clone();
            async move {
                let id = provider.id();
                let outcome = invoke_with_stats(
                    provider,
                    stats,
                    generation::PROBE_PROMPT,
                    &generation,
                    probe_deadline,
                )
                .await;
                (id, outcome)
            }
        });

        let mut fastest: Option<(ProviderId, u64)> = None;
        for (id, outcome) in join_all(probes).await {
            match outcome {
                Ok(result) => {
                    debug!(provider = %id, latency_ms = result.latency_ms, "Probe settled");
                    match fastest {
                        Some((_, best)) if result.latency_ms >= best => {}
                        _ => fastest = Some((id, result.latency_ms)),
                    }
                }
                Err(err) => debug!(provider = %id, error = %err, "Probe failed"),
            }
        }

        let forced = fastest.map(|(id, latency)| {
            info!(provider = %id, latency_ms = latency, "Speed test winner");
            id
        });

        let routed = RouteOptions {
            force_provider: forced,
            enable_fallback: true,
            parallel: false,
            speed_test: false,
            ..opts.clone()
        };
        self.normal_route(prompt, &routed).await
    }

    // -------------------------------------------------------------------------
    // Single Attempt
    // -------------------------------------------------------------------------

    async fn attempt(
        &self,
        id: ProviderId,
        prompt: &str,
        opts: &RouteOptions,
    ) -> Result<CallResult> {
        let provider = Arc::clone(self.provider(id)?);
        let deadline = opts.timeout.unwrap_or(self.default_timeout);
        invoke_with_stats(
            provider,
            Arc::clone(&self.stats),
            prompt,
            &opts.generation,
            deadline,
        )
        .await
    }
}

/// Invoke one provider under a deadline, recording stats exactly once.
///
/// Deadline overruns surface as `Timeout` and count as failures, identical
/// to upstream errors for fallback purposes.
async fn invoke_with_stats(
    provider: SharedProvider,
    stats: Arc<StatsStore>,
    prompt: &str,
    generation: &GenerationOptions,
    deadline: Duration,
) -> Result<CallResult> {
    let id = provider.id();
    match tokio::time::timeout(deadline, provider.invoke(prompt, generation)).await {
        Ok(Ok(result)) => {
            stats.record_success(id, result.latency_ms);
            Ok(result)
        }
        Ok(Err(err)) => {
            stats.record_failure(id);
            Err(err)
        }
        Err(_) => {
            stats.record_failure(id);
            Err(EngineError::Timeout {
                provider: id,
                timeout: deadline,
            })
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ModelProvider, TokenUsage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    #[derive(Debug, Clone, Copy)]
    enum MockBehavior {
        Succeed,
        FailUpstream,
        FailAuth,
    }

    struct MockProvider {
        id: ProviderId,
        behavior: MockBehavior,
        delay: Duration,
        available: AtomicBool,
        invocations: AtomicU32,
    }

    impl MockProvider {
        fn new(id: ProviderId, behavior: MockBehavior, delay_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                id,
                behavior,
                delay: Duration::from_millis(delay_ms),
                available: AtomicBool::new(true),
                invocations: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl ModelProvider for MockProvider {
        async fn invoke(&self, _prompt: &str, _options: &GenerationOptions) -> Result<CallResult> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            if !self.is_available() {
                return Ok(CallResult {
                    content: "placeholder".to_string(),
                    model_used: format!("{}-demo", self.id),
                    usage: TokenUsage::default(),
                    finish_reason: None,
                    latency_ms: 1,
                    placeholder: true,
                });
            }
            tokio::time::sleep(self.delay).await;
            match self.behavior {
                MockBehavior::Succeed => Ok(CallResult {
                    content: format!("reply from {}", self.id),
                    model_used: "mock-model".to_string(),
                    usage: TokenUsage::default(),
                    finish_reason: Some("stop".to_string()),
                    latency_ms: self.delay.as_millis() as u64,
                    placeholder: false,
                }),
                MockBehavior::FailUpstream => {
                    Err(EngineError::upstream(self.id, "mock 502"))
                }
                MockBehavior::FailAuth => {
                    self.mark_unavailable();
                    Err(EngineError::Auth {
                        provider: self.id,
                        message: "mock 401".to_string(),
                    })
                }
            }
        }

        fn id(&self) -> ProviderId {
            self.id
        }

        fn model(&self) -> &str {
            "mock-model"
        }

        fn is_available(&self) -> bool {
            self.available.load(Ordering::Acquire)
        }

        fn mark_unavailable(&self) {
            self.available.store(false, Ordering::Release);
        }
    }

    fn router_with(
        qwen: Arc<MockProvider>,
        deepseek: Arc<MockProvider>,
    ) -> (ProviderRouter, Arc<StatsStore>) {
        let stats = Arc::new(StatsStore::new());
        let router = ProviderRouter::new(
            vec![qwen, deepseek],
            StrategyConfig::default(),
            Arc::clone(&stats),
        );
        (router, stats)
    }

    #[tokio::test]
    async fn test_normal_route_uses_primary() {
        let qwen = MockProvider::new(ProviderId::Qwen, MockBehavior::Succeed, 10);
        let deepseek = MockProvider::new(ProviderId::DeepSeek, MockBehavior::Succeed, 10);
        let (router, _) = router_with(Arc::clone(&qwen), Arc::clone(&deepseek));

        let outcome = router.route("hi", &RouteOptions::default()).await.unwrap();
        assert_eq!(outcome.decision.provider_used, ProviderId::Qwen);
        assert!(!outcome.decision.fallback_used);
        assert_eq!(deepseek.invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fallback_on_primary_failure() {
        let qwen = MockProvider::new(ProviderId::Qwen, MockBehavior::FailUpstream, 5);
        let deepseek = MockProvider::new(ProviderId::DeepSeek, MockBehavior::Succeed, 10);
        let (router, stats) = router_with(qwen, deepseek);

        let outcome = router.route("hi", &RouteOptions::default()).await.unwrap();
        assert!(outcome.decision.fallback_used);
        assert_eq!(outcome.decision.provider_used, ProviderId::DeepSeek);
        assert_eq!(outcome.decision.original_provider, Some(ProviderId::Qwen));

        let qwen_stats = stats.for_provider(ProviderId::Qwen).unwrap();
        assert_eq!(qwen_stats.calls, 1);
        assert_eq!(qwen_stats.errors, 1);
    }

    #[tokio::test]
    async fn test_fallback_disabled_propagates_error() {
        let qwen = MockProvider::new(ProviderId::Qwen, MockBehavior::FailUpstream, 5);
        let deepseek = MockProvider::new(ProviderId::DeepSeek, MockBehavior::Succeed, 10);
        let (router, _) = router_with(qwen, Arc::clone(&deepseek));

        let opts = RouteOptions {
            enable_fallback: false,
            ..Default::default()
        };
        let err = router.route("hi", &opts).await.unwrap_err();
        assert!(matches!(err, EngineError::Upstream { .. }));
        assert_eq!(deepseek.invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_both_failing_yields_aggregate_error() {
        let qwen = MockProvider::new(ProviderId::Qwen, MockBehavior::FailUpstream, 5);
        let deepseek = MockProvider::new(ProviderId::DeepSeek, MockBehavior::FailUpstream, 5);
        let (router, _) = router_with(qwen, deepseek);

        let err = router.route("hi", &RouteOptions::default()).await.unwrap_err();
        match err {
            EngineError::AllProvidersFailed {
                primary, fallback, ..
            } => {
                assert_eq!(primary, ProviderId::Qwen);
                assert_eq!(fallback, ProviderId::DeepSeek);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_no_provider_available() {
        let qwen = MockProvider::new(ProviderId::Qwen, MockBehavior::Succeed, 5);
        let deepseek = MockProvider::new(ProviderId::DeepSeek, MockBehavior::Succeed, 5);
        qwen.mark_unavailable();
        deepseek.mark_unavailable();
        let (router, _) = router_with(qwen, deepseek);

        assert!(matches!(
            router.select_provider(),
            Err(EngineError::NoProviderAvailable)
        ));
        assert!(matches!(
            router.route("hi", &RouteOptions::default()).await,
            Err(EngineError::NoProviderAvailable)
        ));
    }

    #[tokio::test]
    async fn test_select_falls_back_to_secondary_when_primary_down() {
        let qwen = MockProvider::new(ProviderId::Qwen, MockBehavior::Succeed, 5);
        let deepseek = MockProvider::new(ProviderId::DeepSeek, MockBehavior::Succeed, 5);
        qwen.mark_unavailable();
        let (router, _) = router_with(qwen, deepseek);

        assert_eq!(router.select_provider().unwrap(), ProviderId::DeepSeek);
    }

    #[tokio::test]
    async fn test_parallel_picks_fastest_success() {
        let qwen = MockProvider::new(ProviderId::Qwen, MockBehavior::Succeed, 90);
        let deepseek = MockProvider::new(ProviderId::DeepSeek, MockBehavior::Succeed, 40);
        let (router, _) = router_with(qwen, deepseek);

        let opts = RouteOptions {
            parallel: true,
            ..Default::default()
        };
        let outcome = router.route("hi", &opts).await.unwrap();
        assert_eq!(outcome.decision.provider_used, ProviderId::DeepSeek);

        let race = outcome.race.unwrap();
        assert_eq!(race.success_count, 2);
        assert_eq!(race.failure_count, 0);
        assert_eq!(race.results.len(), 2);
    }

    #[tokio::test]
    async fn test_parallel_all_failures_aggregate() {
        let qwen = MockProvider::new(ProviderId::Qwen, MockBehavior::FailUpstream, 5);
        let deepseek = MockProvider::new(ProviderId::DeepSeek, MockBehavior::FailUpstream, 5);
        let (router, _) = router_with(qwen, deepseek);

        let opts = RouteOptions {
            parallel: true,
            ..Default::default()
        };
        assert!(matches!(
            router.route("hi", &opts).await,
            Err(EngineError::AllProvidersFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_first_success_policy_returns_early() {
        let qwen = MockProvider::new(ProviderId::Qwen, MockBehavior::Succeed, 200);
        let deepseek = MockProvider::new(ProviderId::DeepSeek, MockBehavior::Succeed, 10);
        let stats = Arc::new(StatsStore::new());
        let strategy = StrategyConfig {
            race_policy: RacePolicy::FirstSuccess,
            ..Default::default()
        };
        let router = ProviderRouter::new(vec![qwen, deepseek], strategy, Arc::clone(&stats));

        let opts = RouteOptions {
            parallel: true,
            ..Default::default()
        };
        let started = Instant::now();
        let outcome = router.route("hi", &opts).await.unwrap();
        assert_eq!(outcome.decision.provider_used, ProviderId::DeepSeek);
        assert!(started.elapsed() < Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_speed_test_forces_faster_provider() {
        let qwen = MockProvider::new(ProviderId::Qwen, MockBehavior::Succeed, 80);
        let deepseek = MockProvider::new(ProviderId::DeepSeek, MockBehavior::Succeed, 20);
        let (router, _) = router_with(qwen, deepseek);

        let opts = RouteOptions {
            speed_test: true,
            ..Default::default()
        };
        let outcome = router.route("hi", &opts).await.unwrap();
        assert_eq!(outcome.decision.provider_used, ProviderId::DeepSeek);
        assert!(!outcome.decision.fallback_used);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure_and_triggers_fallback() {
        let qwen = MockProvider::new(ProviderId::Qwen, MockBehavior::Succeed, 500);
        let deepseek = MockProvider::new(ProviderId::DeepSeek, MockBehavior::Succeed, 10);
        let (router, stats) = router_with(qwen, deepseek);

        let opts = RouteOptions {
            timeout: Some(Duration::from_millis(50)),
            ..Default::default()
        };
        let outcome = router.route("hi", &opts).await.unwrap();
        assert!(outcome.decision.fallback_used);
        assert_eq!(outcome.decision.original_provider, Some(ProviderId::Qwen));
        assert_eq!(stats.for_provider(ProviderId::Qwen).unwrap().errors, 1);
    }

    #[tokio::test]
    async fn test_auth_failure_downgrades_then_placeholder() {
        let qwen = MockProvider::new(ProviderId::Qwen, MockBehavior::FailAuth, 5);
        let deepseek = MockProvider::new(ProviderId::DeepSeek, MockBehavior::FailUpstream, 5);
        let (router, _) = router_with(Arc::clone(&qwen), deepseek);

        // First call: auth failure, one-way downgrade
        let opts = RouteOptions {
            enable_fallback: false,
            ..Default::default()
        };
        assert!(router.route("hi", &opts).await.is_err());
        assert!(!qwen.is_available());

        // Second call to the same provider short-circuits to the placeholder
        let forced = RouteOptions {
            force_provider: Some(ProviderId::Qwen),
            enable_fallback: false,
            ..Default::default()
        };
        let outcome = router.route("hi", &forced).await.unwrap();
        assert!(outcome.result.placeholder);
    }

    #[test]
    fn test_stats_avg_over_successes_only() {
        let stats = StatsStore::new();
        stats.record_success(ProviderId::Qwen, 100);
        stats.record_success(ProviderId::Qwen, 300);
        stats.record_failure(ProviderId::Qwen);

        let snapshot = stats.for_provider(ProviderId::Qwen).unwrap();
        assert_eq!(snapshot.calls, 3);
        assert_eq!(snapshot.errors, 1);
        assert_eq!(snapshot.total_latency_ms, 400);
        assert!((snapshot.avg_latency_ms - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_stats_concurrent_updates_not_lost() {
        use std::thread;

        let stats = Arc::new(StatsStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..250 {
                        s.record_success(ProviderId::DeepSeek, 10);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = stats.for_provider(ProviderId::DeepSeek).unwrap();
        assert_eq!(snapshot.calls, 2000);
        assert_eq!(snapshot.total_latency_ms, 20000);
    }
}

//! Fengshui Engine - LLM-Backed Dwelling Analysis Core
//!
//! Provider orchestration and response classification for a dwelling-analysis
//! service. Two OpenAI-compatible backends (DeepSeek, Qwen) are routed with
//! fallback, parallel racing, and speed-test selection; free-text model output
//! is classified into fixed report sections; the displayed score is a
//! deterministic function of the form input, never of the model.
//!
//! ## Core Features
//!
//! - **Provider Routing**: primary/fallback, parallel racing, probe-based
//!   selection, per-provider performance stats
//! - **Graceful Degradation**: unconfigured or auth-failed backends serve
//!   marker-formatted placeholder results instead of erroring
//! - **Tiered Classification**: marker, heading, and keyword extraction
//!   tiers; classification never fails
//! - **Deterministic Scoring**: FNV-hashed form input, orientation base
//!   table, eight-level grading scale
//!
//! ## Quick Start
//!
//! ```ignore
//! use fengshui_engine::{AnalysisEngine, ConfigLoader, FormInput, Language, UserTier};
//!
//! let config = ConfigLoader::load()?;
//! let engine = AnalysisEngine::new(&config)?;
//! let report = engine.analyze(&form, Language::Zh, UserTier::Free).await?;
//! ```
//!
//! ## Modules
//!
//! - [`provider`]: backend clients, the router, performance stats
//! - [`classify`]: section classification and optimization-plan extraction
//! - [`score`]: deterministic scoring and grade bands
//! - [`prompt`]: outbound prompt construction
//! - [`engine`]: the orchestrating facade
//! - [`config`]: layered configuration loading

pub mod classify;
pub mod config;
pub mod constants;
pub mod engine;
pub mod prompt;
pub mod provider;
pub mod score;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{ConfigLoader, EngineConfig, ProviderSettings, RacePolicy, StrategyConfig};

// Error Types
pub use types::error::{EngineError, Result};

// Domain Types
pub use types::{FormInput, Language, ProviderId, UserTier};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use engine::{AnalysisEngine, AnalysisReport};

pub use classify::{
    ClassifiedSections, ClassifierStatsSnapshot, OptimizationPlan, ResponseClassifier,
};

pub use score::{GRADE_BANDS, GradeInfo, grade_for, score};

// =============================================================================
// Provider Re-exports
// =============================================================================

pub use provider::{
    // Clients
    CallResult,
    DeepSeekProvider,
    GenerationOptions,
    ModelProvider,
    // Router
    ProviderRouter,
    QwenProvider,
    RouteOptions,
    RouteOutcome,
    RoutingDecision,
    SharedProvider,
    // Stats
    StatsSnapshot,
    StatsStore,
    TokenUsage,
};

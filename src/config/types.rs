//! Configuration Types
//!
//! All configuration structures with sensible defaults. Availability of a
//! backend is derived from credential presence at startup; the routing
//! strategy mirrors the primary/fallback switch the service exposes.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{generation, network};
use crate::types::{EngineError, ProviderId, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// DeepSeek backend settings
    pub deepseek: ProviderSettings,

    /// Qwen backend settings
    pub qwen: ProviderSettings,

    /// Provider selection strategy
    pub strategy: StrategyConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            deepseek: ProviderSettings::default(),
            qwen: ProviderSettings::default(),
            strategy: StrategyConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `EngineError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        for (name, settings) in [("deepseek", &self.deepseek), ("qwen", &self.qwen)] {
            if !(0.0..=2.0).contains(&settings.temperature) {
                return Err(EngineError::Config(format!(
                    "{} temperature must be between 0.0 and 2.0, got {}",
                    name, settings.temperature
                )));
            }
            if settings.timeout_secs == 0 {
                return Err(EngineError::Config(format!(
                    "{} timeout_secs must be greater than 0",
                    name
                )));
            }
            if settings.max_tokens == 0 {
                return Err(EngineError::Config(format!(
                    "{} max_tokens must be greater than 0",
                    name
                )));
            }
            if let Some(base) = &settings.api_base {
                url::Url::parse(base).map_err(|e| {
                    EngineError::Config(format!("{} api_base is not a valid URL: {}", name, e))
                })?;
            }
        }

        if self.strategy.primary == self.strategy.fallback {
            return Err(EngineError::Config(
                "primary and fallback provider must differ".to_string(),
            ));
        }

        Ok(())
    }

    /// Settings for a given backend
    pub fn provider(&self, id: ProviderId) -> &ProviderSettings {
        match id {
            ProviderId::DeepSeek => &self.deepseek,
            ProviderId::Qwen => &self.qwen,
        }
    }
}

// =============================================================================
// Provider Settings
// =============================================================================

/// Per-provider configuration.
///
/// API keys are never serialized to output and are redacted in debug output.
/// Each client converts the key to `SecretString` internally.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// API key; falls back to the provider's conventional env var when unset.
    /// Never serialized back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// API base URL override (defaults to the backend's public endpoint)
    pub api_base: Option<String>,

    /// Model name override (defaults per backend)
    pub model: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Sampling temperature (0.0 = deterministic, 1.0 = creative)
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: usize,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: None,
            model: None,
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            temperature: generation::DEFAULT_TEMPERATURE,
            max_tokens: generation::DEFAULT_MAX_TOKENS,
        }
    }
}

impl ProviderSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

// =============================================================================
// Routing Strategy
// =============================================================================

/// How parallel routing synchronizes with its racers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RacePolicy {
    /// Wait for every racer to settle before picking the winner; losing
    /// results stay available for observability
    #[default]
    WaitForAll,
    /// Return as soon as one racer succeeds; losers keep running detached
    /// and still record their stats when they complete
    FirstSuccess,
}

/// Provider selection strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Preferred backend for normal routing
    pub primary: ProviderId,

    /// Backend tried when the primary fails
    pub fallback: ProviderId,

    /// Whether a primary failure is retried on the fallback
    pub enable_fallback: bool,

    /// Probe both backends and route to the faster one
    pub speed_test: bool,

    /// Invoke both backends concurrently and keep the fastest success
    pub parallel: bool,

    /// Synchronization policy for parallel routing
    pub race_policy: RacePolicy,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        // Qwen measured consistently faster in production, so it is the
        // shipped primary; DeepSeek covers fallback.
        Self {
            primary: ProviderId::Qwen,
            fallback: ProviderId::DeepSeek,
            enable_fallback: true,
            speed_test: false,
            parallel: false,
            race_policy: RacePolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_temperature() {
        let mut config = EngineConfig::default();
        config.deepseek.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_same_primary_and_fallback() {
        let mut config = EngineConfig::default();
        config.strategy.fallback = config.strategy.primary;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_malformed_api_base() {
        let mut config = EngineConfig::default();
        config.qwen.api_base = Some("not a url".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_omits_api_key() -> anyhow::Result<()> {
        let config = EngineConfig {
            deepseek: ProviderSettings {
                api_key: Some("sk-secret".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let rendered = toml::to_string(&config)?;
        assert!(!rendered.contains("sk-secret"));

        let parsed: EngineConfig = toml::from_str(&rendered)?;
        assert!(parsed.deepseek.api_key.is_none());
        assert_eq!(parsed.strategy.primary, ProviderId::Qwen);
        Ok(())
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let settings = ProviderSettings {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("REDACTED"));
    }
}

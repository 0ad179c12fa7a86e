//! Unified Error Type System
//!
//! Centralized error taxonomy for provider orchestration. The variants map
//! one-to-one onto the failure modes the router has to distinguish:
//!
//! - **Auth**: credential invalid/expired - triggers one-way provider disablement
//! - **Upstream**: transport / 5xx / malformed remote response
//! - **Timeout**: per-call deadline exceeded (treated like Upstream for fallback)
//! - **NoProviderAvailable**: no configured provider is usable
//! - **AllProvidersFailed**: fallback was attempted and also failed
//!
//! Classification never produces an error: the extraction pipeline always
//! resolves to a best-effort result instead.

use std::time::Duration;
use thiserror::Error;

use crate::types::ProviderId;

/// Convenience result alias used throughout the crate
pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    // -------------------------------------------------------------------------
    // Provider Errors
    // -------------------------------------------------------------------------
    /// Credential rejected by the remote endpoint (401/403).
    /// The owning client disables itself for the rest of the process.
    #[error("authentication failed for {provider}: {message}")]
    Auth { provider: ProviderId, message: String },

    /// Any other transport, 5xx, or malformed-response failure
    #[error("upstream failure from {provider}: {message}")]
    Upstream { provider: ProviderId, message: String },

    /// Per-call deadline exceeded
    #[error("timeout after {timeout:?} waiting for {provider}")]
    Timeout {
        provider: ProviderId,
        timeout: Duration,
    },

    // -------------------------------------------------------------------------
    // Router Errors
    // -------------------------------------------------------------------------
    /// No configured provider is usable for this request
    #[error("no configured provider is available")]
    NoProviderAvailable,

    /// Primary failed and the fallback attempt failed too
    #[error("all providers failed: {primary} ({primary_error}); {fallback} ({fallback_error})")]
    AllProvidersFailed {
        primary: ProviderId,
        primary_error: Box<EngineError>,
        fallback: ProviderId,
        fallback_error: Box<EngineError>,
    },

    // -------------------------------------------------------------------------
    // System Errors
    // -------------------------------------------------------------------------
    #[error("configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

impl EngineError {
    /// Classify an HTTP status from a provider endpoint into the taxonomy.
    ///
    /// 401/403 are authentication failures; everything else that reaches this
    /// point (5xx, unexpected 4xx) is an upstream failure the router may
    /// resolve via fallback.
    pub fn from_http_status(status: u16, provider: ProviderId, body: impl Into<String>) -> Self {
        let message = format!("HTTP {}: {}", status, body.into());
        match status {
            401 | 403 => Self::Auth { provider, message },
            _ => Self::Upstream { provider, message },
        }
    }

    /// Wrap a transport-level error (connect/read failure, body decode)
    pub fn upstream(provider: ProviderId, message: impl Into<String>) -> Self {
        Self::Upstream {
            provider,
            message: message.into(),
        }
    }

    /// True for credential failures that must disable the provider
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Provider that produced this error, when attributable to one
    pub fn provider(&self) -> Option<ProviderId> {
        match self {
            Self::Auth { provider, .. }
            | Self::Upstream { provider, .. }
            | Self::Timeout { provider, .. } => Some(*provider),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_classification() {
        let err = EngineError::from_http_status(401, ProviderId::DeepSeek, "invalid key");
        assert!(err.is_auth());
        assert_eq!(err.provider(), Some(ProviderId::DeepSeek));

        let err = EngineError::from_http_status(503, ProviderId::Qwen, "overloaded");
        assert!(!err.is_auth());
        assert!(matches!(err, EngineError::Upstream { .. }));
    }

    #[test]
    fn test_aggregate_error_display() {
        let err = EngineError::AllProvidersFailed {
            primary: ProviderId::Qwen,
            primary_error: Box::new(EngineError::upstream(ProviderId::Qwen, "502")),
            fallback: ProviderId::DeepSeek,
            fallback_error: Box::new(EngineError::Timeout {
                provider: ProviderId::DeepSeek,
                timeout: Duration::from_secs(30),
            }),
        };
        let text = err.to_string();
        assert!(text.contains("qwen"));
        assert!(text.contains("deepseek"));
    }
}

//! LLM Provider Abstraction
//!
//! Defines the `ModelProvider` trait the router orchestrates. Both concrete
//! backends speak the OpenAI-compatible chat-completions wire format, so the
//! request/response shapes live here and the per-backend modules only carry
//! their endpoint defaults, model selection, and system prompts.
//!
//! ## Modules
//!
//! - `deepseek`: DeepSeek backend (chat / reasoner model pair)
//! - `qwen`: Qwen backend via the DashScope compatible-mode endpoint
//! - `placeholder`: canned result served when a backend is not usable
//! - `router`: primary/fallback selection, parallel racing, performance stats

mod deepseek;
mod placeholder;
mod qwen;
mod router;

pub use deepseek::DeepSeekProvider;
pub use placeholder::placeholder_result;
pub use qwen::QwenProvider;
pub use router::{
    AttemptRecord, ProviderRouter, RaceReport, RouteOptions, RouteOutcome, RoutingDecision,
    StatsSnapshot, StatsStore,
};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::config::ProviderSettings;
use crate::types::{EngineError, ProviderId, Result};

// =============================================================================
// Call Result
// =============================================================================

/// Token usage metrics reported by the backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Outcome of exactly one provider invocation
#[derive(Debug, Clone)]
pub struct CallResult {
    /// Generated free text
    pub content: String,
    /// Model that actually served the request
    pub model_used: String,
    /// Token usage metrics
    pub usage: TokenUsage,
    /// Finish reason reported by the backend, if any
    pub finish_reason: Option<String>,
    /// Wall-clock latency of the call in milliseconds
    pub latency_ms: u64,
    /// True when this result was synthesized locally instead of fetched
    pub placeholder: bool,
}

/// Per-call generation parameters; `None` fields fall back to the
/// provider's configured defaults
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
    /// Hint that the call is a short follow-up and a fast model suffices
    pub prefer_fast: bool,
}

// =============================================================================
// Provider Trait
// =============================================================================

/// A remote text-generation backend reachable over HTTPS.
///
/// Implementations perform exactly one outbound request per `invoke` call;
/// retry and fallback are the router's responsibility. Availability moves in
/// one direction only: a client that observes an authentication failure
/// disables itself for the remainder of the process.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Issue one generation request
    async fn invoke(&self, prompt: &str, options: &GenerationOptions) -> Result<CallResult>;

    /// Stable identity of this backend
    fn id(&self) -> ProviderId;

    /// Model the provider would use for a default request
    fn model(&self) -> &str;

    /// Whether the backend is currently usable
    fn is_available(&self) -> bool;

    /// One-way downgrade; never re-enabled automatically
    fn mark_unavailable(&self);
}

/// Shared provider handle for concurrent routing
pub type SharedProvider = Arc<dyn ModelProvider>;

/// Construct the client for a backend from its settings
pub fn create_provider(id: ProviderId, settings: &ProviderSettings) -> SharedProvider {
    match id {
        ProviderId::DeepSeek => Arc::new(DeepSeekProvider::new(settings.clone())),
        ProviderId::Qwen => Arc::new(QwenProvider::new(settings.clone())),
    }
}

// =============================================================================
// OpenAI-Compatible Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: usize,
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// POST a chat-completions request and decode the reply.
///
/// Maps HTTP failures into the error taxonomy; 401/403 become `Auth` so the
/// caller can downgrade its availability flag.
pub(crate) async fn execute_chat(
    client: &reqwest::Client,
    api_base: &str,
    api_key: &SecretString,
    request: &ChatRequest,
    provider: ProviderId,
) -> Result<(ChatResponse, u64)> {
    let url = format!("{}/chat/completions", api_base.trim_end_matches('/'));
    let start = Instant::now();

    let response = client
        .post(&url)
        .header(
            "Authorization",
            format!("Bearer {}", api_key.expose_secret()),
        )
        .header("Content-Type", "application/json")
        .json(request)
        .send()
        .await
        .map_err(|e| EngineError::upstream(provider, format!("request failed: {}", e)))?;

    let latency_ms = start.elapsed().as_millis() as u64;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(EngineError::from_http_status(status, provider, body));
    }

    let body: ChatResponse = response
        .json()
        .await
        .map_err(|e| EngineError::upstream(provider, format!("malformed response: {}", e)))?;

    Ok((body, latency_ms))
}

/// Turn a decoded chat response into a `CallResult`
pub(crate) fn into_call_result(
    body: ChatResponse,
    fallback_model: &str,
    latency_ms: u64,
    provider: ProviderId,
) -> Result<CallResult> {
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| EngineError::upstream(provider, "no choices in response"))?;

    let content = choice
        .message
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| EngineError::upstream(provider, "empty completion content"))?;

    Ok(CallResult {
        content,
        model_used: body.model.unwrap_or_else(|| fallback_model.to_string()),
        usage: body.usage.unwrap_or_default(),
        finish_reason: choice.finish_reason,
        latency_ms,
        placeholder: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_call_result_requires_content() {
        let body = ChatResponse {
            choices: vec![Choice {
                message: ResponseMessage {
                    content: Some("   ".to_string()),
                },
                finish_reason: None,
            }],
            usage: None,
            model: None,
        };
        assert!(into_call_result(body, "m", 10, ProviderId::Qwen).is_err());
    }

    #[test]
    fn test_into_call_result_prefers_reported_model() {
        let body = ChatResponse {
            choices: vec![Choice {
                message: ResponseMessage {
                    content: Some("hello".to_string()),
                },
                finish_reason: Some("stop".to_string()),
            }],
            usage: Some(TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: Some("qwen-max-0919".to_string()),
        };
        let result = into_call_result(body, "qwen-max", 42, ProviderId::Qwen).unwrap();
        assert_eq!(result.model_used, "qwen-max-0919");
        assert_eq!(result.latency_ms, 42);
        assert_eq!(result.usage.total_tokens, 15);
        assert!(!result.placeholder);
    }
}

//! Qwen API Provider
//!
//! Backend client for the DashScope OpenAI compatible-mode endpoint. Ships
//! three model sizes; defaults to `qwen-max` for analyses and drops to
//! `qwen-turbo` for short follow-up calls.

use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ProviderSettings;
use crate::constants::network;
use crate::types::{ProviderId, Result};

use super::placeholder::placeholder_result;
use super::{
    CallResult, ChatMessage, ChatRequest, GenerationOptions, ModelProvider, execute_chat,
    into_call_result,
};

const DEFAULT_API_BASE: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
const MODEL_TURBO: &str = "qwen-turbo";
const MODEL_MAX: &str = "qwen-max";
const API_KEY_ENV: &str = "QWEN_API_KEY";

/// Qwen backend client with secure API key handling
pub struct QwenProvider {
    api_key: Option<SecretString>,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
    /// One-way availability flag, see `DeepSeekProvider`
    available: AtomicBool,
}

impl std::fmt::Debug for QwenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QwenProvider")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("available", &self.available.load(Ordering::Acquire))
            .finish()
    }
}

impl QwenProvider {
    pub fn new(settings: ProviderSettings) -> Self {
        let api_key = settings
            .api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty());

        let available = api_key.is_some();
        if !available {
            warn!("Qwen API key not configured, client starts in placeholder mode");
        }

        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .connect_timeout(Duration::from_secs(network::CONNECT_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            api_key: api_key.map(SecretString::from),
            api_base: settings
                .api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: settings
                .model
                .clone()
                .unwrap_or_else(|| MODEL_MAX.to_string()),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            client,
            available: AtomicBool::new(available),
        }
    }

    fn select_model(&self, options: &GenerationOptions) -> String {
        if let Some(model) = &options.model {
            return model.clone();
        }
        if options.prefer_fast {
            return MODEL_TURBO.to_string();
        }
        self.model.clone()
    }

    fn system_prompt() -> &'static str {
        "You are a professional dwelling-analysis consultant versed in classical \
         Chinese spatial theory: trigram orientation, Five Element interaction, and \
         period-based energy cycles. Read every configuration rationally, give \
         practical improvement advice suited to modern living, and stay clear of \
         superstition while respecting the tradition."
    }
}

#[async_trait]
impl ModelProvider for QwenProvider {
    async fn invoke(&self, prompt: &str, options: &GenerationOptions) -> Result<CallResult> {
        let api_key = match &self.api_key {
            Some(key) if self.is_available() => key,
            _ => {
                debug!("Qwen unavailable, serving placeholder result");
                return Ok(placeholder_result(self.id()).await);
            }
        };

        let model = self.select_model(options);
        info!(model = %model, "Invoking Qwen");

        let request = ChatRequest {
            model: model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: Self::system_prompt().to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
            temperature: options.temperature.unwrap_or(self.temperature),
            max_tokens: options.max_tokens.unwrap_or(self.max_tokens),
            stream: false,
        };

        match execute_chat(&self.client, &self.api_base, api_key, &request, self.id()).await {
            Ok((body, latency_ms)) => into_call_result(body, &model, latency_ms, self.id()),
            Err(err) => {
                if err.is_auth() {
                    warn!("Qwen credential rejected, disabling provider");
                    self.mark_unavailable();
                }
                Err(err)
            }
        }
    }

    fn id(&self) -> ProviderId {
        ProviderId::Qwen
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    fn mark_unavailable(&self) {
        self.available.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_with_key() -> QwenProvider {
        QwenProvider::new(ProviderSettings {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        })
    }

    #[test]
    fn test_default_model_is_max() {
        let provider = provider_with_key();
        assert_eq!(provider.model(), MODEL_MAX);
    }

    #[test]
    fn test_fast_preference_selects_turbo() {
        let provider = provider_with_key();
        let options = GenerationOptions {
            prefer_fast: true,
            ..Default::default()
        };
        assert_eq!(provider.select_model(&options), MODEL_TURBO);
    }

    #[tokio::test]
    async fn test_placeholder_after_downgrade() {
        let provider = provider_with_key();
        provider.mark_unavailable();
        let result = provider
            .invoke("probe", &GenerationOptions::default())
            .await
            .unwrap();
        assert!(result.placeholder);
        assert_eq!(result.model_used, "qwen-demo");
    }
}

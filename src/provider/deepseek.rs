//! DeepSeek API Provider
//!
//! Primary-class backend with two model variants: `deepseek-chat` for quick
//! follow-ups and `deepseek-reasoner` for full analyses. Model selection is
//! automatic unless the caller pins a model explicitly.

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

const DEFAULT_API_BASE: &str = "https://api.deepseek.com";
const MODEL_CHAT: &str = "deepseek-chat";
const MODEL_REASONER: &str = "deepseek-reasoner";
const API_KEY_ENV: &str = "DEEPSEEK_API_KEY";

/// Prompts containing any of these are routed to the reasoner model
const COMPLEXITY_HINTS: &[&str] = &[
    "analysis", "analyze", "evaluate", "layout", "orientation", "分析", "评估", "风水", "布局",
];

/// DeepSeek backend client with secure API key handling
pub struct DeepSeekProvider {
    api_key: Option<SecretString>,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
    /// One-way flag; cleared on construction without credential or after an
    /// authentication failure, never set again
    available: AtomicBool,
}

impl std::fmt::Debug for DeepSeekProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeepSeekProvider")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("available", &self.available.load(Ordering::Acquire))
            .finish()
    }
}

impl DeepSeekProvider {
    pub fn new(settings: ProviderSettings) -> Self {
        let api_key = settings
            .api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty());

        let available = api_key.is_some();
        if !available {
            warn!("DeepSeek API key not configured, client starts in placeholder mode");
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
                .unwrap_or_else(|| MODEL_REASONER.to_string()),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            client,
            available: AtomicBool::new(available),
        }
    }

    /// Pick chat vs. reasoner for this request.
    ///
    /// Explicit model wins; fast-preference picks chat; otherwise long or
    /// analysis-heavy prompts get the reasoner.
    fn select_model(&self, prompt: &str, options: &GenerationOptions) -> String {
        if let Some(model) = &options.model {
            return model.clone();
        }
        if options.prefer_fast {
            return MODEL_CHAT.to_string();
        }

        let lower = prompt.to_lowercase();
        let complex =
            prompt.chars().count() > 200 || COMPLEXITY_HINTS.iter().any(|k| lower.contains(k));
        if complex {
            MODEL_REASONER.to_string()
        } else {
            self.model.clone()
        }
    }

    fn system_prompt(model: &str) -> String {
        let base = "You are a professional dwelling-analysis consultant grounded in \
                    traditional Chinese spatial theory and modern architecture.";
        if model == MODEL_REASONER {
            format!(
                "{base} Think through every dimension of the question, combine classical \
                 theory with practical modern living, and give concrete actionable advice \
                 with its reasoning."
            )
        } else {
            format!("{base} Give accurate, concise advice.")
        }
    }
}

#[async_trait]
impl ModelProvider for DeepSeekProvider {
    async fn invoke(&self, prompt: &str, options: &GenerationOptions) -> Result<CallResult> {
        let api_key = match &self.api_key {
            Some(key) if self.is_available() => key,
            _ => {
                debug!("DeepSeek unavailable, serving placeholder result");
                return Ok(placeholder_result(self.id()).await);
            }
        };

        let model = self.select_model(prompt, options);
        info!(model = %model, "Invoking DeepSeek");

        let request = ChatRequest {
            model: model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: Self::system_prompt(&model),
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
                    warn!("DeepSeek credential rejected, disabling provider");
                    self.mark_unavailable();
                }
                Err(err)
            }
        }
    }

    fn id(&self) -> ProviderId {
        ProviderId::DeepSeek
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

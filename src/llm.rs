//! Language model gateway.
//!
//! A gateway performs exactly one generation call per request and reports
//! failures as [`GatewayError`]. Retry and fallback policy belongs to the
//! callers: every agent degrades to a safe default instead of retrying.

use crate::config::Config;
use crate::providers::{Provider, ProviderConfig};
use crate::{log_debug, log_warn};

use anyhow::Result;
use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::{anthropic, gemini, openai};
use std::sync::Arc;
use std::time::Duration;

/// Failure of a single generation call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The provider answered but produced no text
    #[error("empty response from language model")]
    EmptyResponse,
    /// Transport, authentication, rate limit or timeout failure
    #[error("provider error: {0}")]
    ProviderError(String),
}

/// A prompt plus generation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u64,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: 0.7,
            max_tokens: 1000,
        }
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Wraps one call to an external text-generation capability
#[async_trait]
pub trait LanguageModelGateway: Send + Sync {
    /// Generate text for `request`. Never panics on provider anomalies.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GatewayError>;

    /// Human-readable label of the model behind this gateway
    fn model_label(&self) -> String;
}

/// Provider-specific rig client, built once and reused for every call
#[derive(Clone)]
enum RigBackend {
    OpenAI(openai::Client),
    Anthropic(anthropic::Client),
    Google(gemini::Client),
}

/// Gateway backed by a `rig` provider client
#[derive(Clone)]
pub struct RigGateway {
    backend: RigBackend,
    provider: Provider,
    model: String,
}

impl RigGateway {
    /// Build a gateway for `provider`'s main model, resolving the API key from config or environment
    pub fn new(provider: Provider, provider_config: &ProviderConfig) -> Result<Self> {
        Self::with_model(
            provider,
            provider_config,
            provider_config.effective_model(provider),
        )
    }

    /// Build a gateway for an explicit `model`
    pub fn with_model(
        provider: Provider,
        provider_config: &ProviderConfig,
        model: &str,
    ) -> Result<Self> {
        let api_key = provider_config.resolve_api_key(provider)?;
        let backend = match provider {
            Provider::OpenAI => RigBackend::OpenAI(openai::Client::new(&api_key)),
            Provider::Anthropic => RigBackend::Anthropic(anthropic::Client::new(&api_key)),
            Provider::Google => RigBackend::Google(gemini::Client::new(&api_key)),
        };

        Ok(Self {
            backend,
            provider,
            model: model.to_string(),
        })
    }

    async fn prompt_once(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
        let temperature = f64::from(request.temperature);
        let prompt = request.prompt.as_str();

        let result = match &self.backend {
            RigBackend::OpenAI(client) => {
                let agent = client
                    .agent(&self.model)
                    .temperature(temperature)
                    .max_tokens(request.max_tokens)
                    .build();
                agent.prompt(prompt).await
            }
            RigBackend::Anthropic(client) => {
                let agent = client
                    .agent(&self.model)
                    .temperature(temperature)
                    .max_tokens(request.max_tokens)
                    .build();
                agent.prompt(prompt).await
            }
            RigBackend::Google(client) => {
                let agent = client
                    .agent(&self.model)
                    .temperature(temperature)
                    .max_tokens(request.max_tokens)
                    .build();
                agent.prompt(prompt).await
            }
        };

        let text = result.map_err(|e| GatewayError::ProviderError(e.to_string()))?;
        if text.trim().is_empty() {
            return Err(GatewayError::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl LanguageModelGateway for RigGateway {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
        tracing::debug!(
            model = %self.model_label(),
            prompt_chars = request.prompt.len(),
            temperature = request.temperature,
            max_tokens = request.max_tokens,
            "Prompting provider"
        );
        let result = self.prompt_once(request).await;
        match &result {
            Ok(text) => tracing::debug!(response_chars = text.len(), "Provider responded"),
            Err(e) => tracing::warn!("Provider call to {} failed: {}", self.model_label(), e),
        }
        result
    }

    fn model_label(&self) -> String {
        format!("{}/{}", self.provider, self.model)
    }
}

/// Applies a hard deadline to another gateway; an elapsed deadline is a provider error
pub struct TimeoutGateway {
    inner: Arc<dyn LanguageModelGateway>,
    timeout: Duration,
}

impl TimeoutGateway {
    pub fn new(inner: Arc<dyn LanguageModelGateway>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl LanguageModelGateway for TimeoutGateway {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
        if let Ok(result) = tokio::time::timeout(self.timeout, self.inner.generate(request)).await {
            result
        } else {
            log_warn!(
                "Gateway: {} timed out after {:?}",
                self.inner.model_label(),
                self.timeout
            );
            Err(GatewayError::ProviderError(format!(
                "timed out after {}s",
                self.timeout.as_secs()
            )))
        }
    }

    fn model_label(&self) -> String {
        self.inner.model_label()
    }
}

/// Offline gateway that echoes the tail of the prompt
#[derive(Debug, Clone, Copy, Default)]
pub struct DevModeGateway;

const DEV_ECHO_CHARS: usize = 120;

#[async_trait]
impl LanguageModelGateway for DevModeGateway {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
        let prompt = request.prompt.trim();
        let skip = prompt.chars().count().saturating_sub(DEV_ECHO_CHARS);
        let tail: String = prompt.chars().skip(skip).collect();
        Ok(format!("[DEV MODE] Echo: {tail}"))
    }

    fn model_label(&self) -> String {
        "dev-mode".to_string()
    }
}

/// Build the gateway for the active provider's main model
pub fn build_gateway(config: &Config) -> Result<Arc<dyn LanguageModelGateway>> {
    build_with(config, |provider, provider_config| {
        provider_config.effective_model(provider).to_string()
    })
}

/// Build the gateway for the active provider's fast model, used by the refinement rounds
pub fn build_fast_gateway(config: &Config) -> Result<Arc<dyn LanguageModelGateway>> {
    build_with(config, |provider, provider_config| {
        provider_config.effective_fast_model(provider).to_string()
    })
}

fn build_with(
    config: &Config,
    pick_model: impl Fn(Provider, &ProviderConfig) -> String,
) -> Result<Arc<dyn LanguageModelGateway>> {
    if config.runtime.dev_mode {
        log_debug!("Gateway: dev mode enabled, no provider calls will be made");
        return Ok(Arc::new(DevModeGateway));
    }

    let (provider, provider_config) = config.active_provider_config()?;
    let model = pick_model(provider, &provider_config);
    let gateway = RigGateway::with_model(provider, &provider_config, &model)?;
    Ok(Arc::new(TimeoutGateway::new(
        Arc::new(gateway),
        config.runtime.timeout(),
    )))
}

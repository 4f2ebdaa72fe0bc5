use crate::log_debug;
use crate::providers::{Provider, ProviderConfig, ProviderError};

use anyhow::{Context, Result, anyhow, bail};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Overrides the configured default provider
pub const PROVIDER_ENV: &str = "MAHAGURU_PROVIDER";
/// Forces dev mode (echo gateway, no network)
pub const DEV_MODE_ENV: &str = "MAHAGURU_DEV_MODE";
/// Overrides `runtime.timeout_seconds`
pub const TIMEOUT_ENV: &str = "MAHAGURU_TIMEOUT_SECONDS";

/// Configuration structure for the Mahaguru backend
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Config {
    /// Default LLM provider
    pub default_provider: String,
    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Query refinement dialogue settings
    #[serde(default)]
    pub refinement: RefinementConfig,
    /// Direct-answer settings
    #[serde(default)]
    pub answer: AnswerConfig,
    /// Timeouts, limits and storage locations
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Settings for the refinement agent, continuation and finalizer
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RefinementConfig {
    /// Total dialogue rounds before finalization is forced
    pub max_rounds: u32,
    /// Upper bound on follow-up questions per round
    pub max_suggestions: usize,
    pub refine_temperature: f32,
    pub refine_max_tokens: u64,
    pub finalize_temperature: f32,
    pub finalize_max_tokens: u64,
    /// Confidence reported when synthesis fails
    pub default_confidence: f32,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            max_rounds: 2,
            max_suggestions: 3,
            refine_temperature: 0.3,
            refine_max_tokens: 500,
            finalize_temperature: 0.3,
            finalize_max_tokens: 800,
            default_confidence: 0.7,
        }
    }
}

/// Settings for the direct-answer path
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AnswerConfig {
    pub temperature: f32,
    pub max_tokens: u64,
    /// How many of the most recent conversation messages are replayed
    pub history_window: usize,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1000,
            history_window: 5,
        }
    }
}

/// Runtime limits and storage locations
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Hard timeout for a single generation call
    pub timeout_seconds: u64,
    /// Answer every prompt locally instead of calling a provider
    pub dev_mode: bool,
    /// Longest accepted query, in characters
    pub max_query_chars: usize,
    /// Idle time after which an unfinished session is discarded
    pub session_ttl_minutes: i64,
    /// Directory for persisted sessions; in-memory sessions when unset
    pub sessions_dir: Option<PathBuf>,
    /// JSONL file receiving one record per finalized package
    pub records_file: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 60,
            dev_mode: false,
            max_query_chars: 4000,
            session_ttl_minutes: 60,
            sessions_dir: None,
            records_file: None,
        }
    }
}

impl RuntimeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_ttl_minutes)
    }
}

impl Config {
    /// Load the configuration file (or defaults) and apply environment overrides
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        log_debug!("Configuration loaded: {:?}", config.redacted());
        Ok(config)
    }

    /// Parse a configuration document
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            anyhow!("Invalid configuration file format: {e}. Please check your config.toml for syntax errors.")
        })
    }

    /// Apply `MAHAGURU_*` environment overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(provider) = std::env::var(PROVIDER_ENV) {
            let provider: Provider = provider.parse()?;
            self.set_default_provider(provider);
        }
        if let Ok(dev_mode) = std::env::var(DEV_MODE_ENV) {
            self.runtime.dev_mode = matches!(
                dev_mode.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Ok(timeout) = std::env::var(TIMEOUT_ENV) {
            self.runtime.timeout_seconds = timeout
                .trim()
                .parse()
                .with_context(|| format!("{TIMEOUT_ENV} must be a whole number of seconds"))?;
        }
        Ok(())
    }

    /// Reject settings the refinement pipeline cannot honor
    pub fn validate(&self) -> Result<()> {
        self.provider()?;
        if self.refinement.max_rounds == 0 {
            bail!("refinement.max_rounds must be at least 1");
        }
        if self.refinement.max_suggestions == 0 {
            bail!("refinement.max_suggestions must be at least 1");
        }
        for (name, temperature) in [
            ("refinement.refine_temperature", self.refinement.refine_temperature),
            ("refinement.finalize_temperature", self.refinement.finalize_temperature),
            ("answer.temperature", self.answer.temperature),
        ] {
            if !(0.0..=2.0).contains(&temperature) {
                bail!("{name} must be between 0.0 and 2.0, got {temperature}");
            }
        }
        if !(0.0..=1.0).contains(&self.refinement.default_confidence) {
            bail!("refinement.default_confidence must be between 0.0 and 1.0");
        }
        if self.runtime.timeout_seconds == 0 {
            bail!("runtime.timeout_seconds must be greater than zero");
        }
        Ok(())
    }

    /// Save the configuration to the file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        let config_content = toml::to_string_pretty(self)?;
        fs::write(&config_path, config_content)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        log_debug!("Configuration saved: {:?}", self.redacted());
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn get_config_path() -> Result<PathBuf> {
        let mut path =
            config_dir().ok_or_else(|| anyhow!("Unable to determine config directory"))?;
        path.push("mahaguru");
        fs::create_dir_all(&path)?;
        path.push("config.toml");
        Ok(path)
    }

    /// The configured default provider
    pub fn provider(&self) -> Result<Provider, ProviderError> {
        self.default_provider.parse()
    }

    /// Make `provider` the default, creating its provider section if missing
    pub fn set_default_provider(&mut self, provider: Provider) {
        self.default_provider = provider.name().to_string();
        self.providers
            .entry(provider.name().to_string())
            .or_insert_with(|| ProviderConfig::with_defaults(provider));
    }

    /// Get the configuration for a specific provider
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        let name = provider
            .parse::<Provider>()
            .map_or_else(|_| provider.to_lowercase(), |p| p.name().to_string());
        self.providers.get(&name)
    }

    /// Provider config for the default provider, defaulted when absent from the file
    pub fn active_provider_config(&self) -> Result<(Provider, ProviderConfig), ProviderError> {
        let provider = self.provider()?;
        let config = self
            .get_provider_config(provider.name())
            .cloned()
            .unwrap_or_else(|| ProviderConfig::with_defaults(provider));
        Ok((provider, config))
    }

    /// Update the active provider's settings
    pub fn update_provider(
        &mut self,
        provider: Option<Provider>,
        api_key: Option<String>,
        model: Option<String>,
        additional_params: Option<HashMap<String, String>>,
    ) -> Result<()> {
        if let Some(provider) = provider {
            self.set_default_provider(provider);
        }
        let active = self.provider()?;
        let provider_config = self
            .providers
            .entry(active.name().to_string())
            .or_insert_with(|| ProviderConfig::with_defaults(active));

        if let Some(key) = api_key {
            provider_config.api_key = key;
        }
        if let Some(model) = model {
            provider_config.model = model;
        }
        if let Some(params) = additional_params {
            provider_config.additional_params.extend(params);
        }

        log_debug!("Configuration updated: {:?}", self.redacted());
        Ok(())
    }

    /// Copy of this config with API keys masked, for logging
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for provider_config in copy.providers.values_mut() {
            if provider_config.has_api_key() {
                provider_config.api_key = "***".to_string();
            }
        }
        copy
    }
}

impl Default for Config {
    fn default() -> Self {
        let providers = Provider::ALL
            .iter()
            .map(|p| (p.name().to_string(), ProviderConfig::with_defaults(*p)))
            .collect();

        Self {
            default_provider: Provider::default().name().to_string(),
            providers,
            refinement: RefinementConfig::default(),
            answer: AnswerConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

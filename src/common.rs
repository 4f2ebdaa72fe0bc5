use crate::config::Config;
use crate::providers::Provider;
use anyhow::Result;
use clap::Args;

#[derive(Args, Clone, Default, Debug)]
pub struct CommonParams {
    /// Override default LLM provider
    #[arg(long, global = true, help = "Override default LLM provider", value_parser = available_providers_parser)]
    pub provider: Option<String>,

    /// Answer locally without calling a provider
    #[arg(long, global = true, help = "Answer locally without calling a provider (dev mode)")]
    pub dev: bool,

    /// Print machine-readable JSON instead of formatted output
    #[arg(long, global = true, help = "Print machine-readable JSON")]
    pub json: bool,
}

impl CommonParams {
    /// Apply the overrides to `config`; returns true if anything changed
    pub fn apply_to_config(&self, config: &mut Config) -> Result<bool> {
        let mut changes_made = false;

        if let Some(provider_str) = &self.provider {
            let provider: Provider = provider_str.parse()?;
            if config.default_provider != provider.name() {
                config.set_default_provider(provider);
                changes_made = true;
            }
        }

        if self.dev && !config.runtime.dev_mode {
            config.runtime.dev_mode = true;
            changes_made = true;
        }

        Ok(changes_made)
    }
}

/// Validates that a provider name is available in the system
pub fn available_providers_parser(s: &str) -> Result<String, String> {
    match s.parse::<Provider>() {
        Ok(provider) => Ok(provider.name().to_string()),
        Err(_) => Err(format!(
            "Invalid provider '{}'. Available providers: {}",
            s,
            Provider::all_names().join(", ")
        )),
    }
}

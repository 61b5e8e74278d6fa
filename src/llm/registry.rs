use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, ProviderEntry};
use crate::errors::{ScoutError, ScoutResult};
use crate::llm::provider::VisionProvider;
use crate::llm::providers::anthropic::AnthropicProvider;
use crate::llm::providers::ollama::OllamaProvider;
use crate::llm::providers::openai_compatible::OpenAiCompatibleProvider;
use crate::llm::providers::ProviderSettings;
use crate::llm::types::Pricing;

/// Provider variants. One is selected at startup and used for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[value(name = "openai")]
    OpenAi,
    Anthropic,
    Ollama,
}

impl ProviderKind {
    pub fn id(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Ollama => "ollama",
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4o",
            ProviderKind::Anthropic => "claude-sonnet-4-20250514",
            ProviderKind::Ollama => "gemma3:4b",
        }
    }

    fn default_api_base(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1/chat/completions",
            ProviderKind::Anthropic => "https://api.anthropic.com/v1/messages",
            ProviderKind::Ollama => "http://localhost:11434",
        }
    }

    /// Environment variable holding the API key (or base URL, for Ollama).
    fn default_env(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::Ollama => "OLLAMA_BASE_URL",
        }
    }

    fn default_pricing(self) -> Pricing {
        match self {
            ProviderKind::OpenAi => Pricing {
                input_per_mtok: 5.0,
                output_per_mtok: 15.0,
            },
            ProviderKind::Anthropic => Pricing {
                input_per_mtok: 3.0,
                output_per_mtok: 15.0,
            },
            ProviderKind::Ollama => Pricing::default(),
        }
    }

    fn entry(self, config: &AppConfig) -> &ProviderEntry {
        match self {
            ProviderKind::OpenAi => &config.vision.openai,
            ProviderKind::Anthropic => &config.vision.anthropic,
            ProviderKind::Ollama => &config.vision.ollama,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Resolves connection settings for `kind`.
///
/// Resolution order:
/// 1. `model_override` (CLI) for the model
/// 2. `[vision.<kind>]` entries in the config file
/// 3. built-in defaults
///
/// API keys come from the configured (or default) environment variable,
/// falling back to `api_key` in the config file. For Ollama the variable
/// names the base URL instead and no key is required.
pub fn resolve_settings(
    config: &AppConfig,
    kind: ProviderKind,
    model_override: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> ScoutResult<ProviderSettings> {
    let entry = kind.entry(config);
    let env_name = entry.api_key_env.as_deref().unwrap_or(kind.default_env());
    let from_env = env(env_name).filter(|v| !v.trim().is_empty());

    let (api_base, api_key) = match kind {
        ProviderKind::Ollama => {
            let base = entry
                .api_base
                .clone()
                .or(from_env)
                .unwrap_or_else(|| kind.default_api_base().to_string());
            (base, entry.api_key.clone().unwrap_or_default())
        }
        ProviderKind::OpenAi | ProviderKind::Anthropic => {
            let key = from_env
                .or_else(|| entry.api_key.clone())
                .ok_or_else(|| {
                    ScoutError::Config(format!(
                        "no API key for provider '{kind}': set {env_name} or vision.{kind}.api_key"
                    ))
                })?;
            let base = entry
                .api_base
                .clone()
                .unwrap_or_else(|| kind.default_api_base().to_string());
            (base, key)
        }
    };

    let model = model_override
        .map(str::to_string)
        .or_else(|| entry.model.clone())
        .unwrap_or_else(|| kind.default_model().to_string());

    let defaults = kind.default_pricing();
    let pricing = Pricing {
        input_per_mtok: entry.input_price_per_mtok.unwrap_or(defaults.input_per_mtok),
        output_per_mtok: entry.output_price_per_mtok.unwrap_or(defaults.output_per_mtok),
    };

    tracing::debug!(
        provider = %kind,
        model = %model,
        api_base = %api_base,
        "resolved provider settings"
    );

    Ok(ProviderSettings {
        api_base,
        model,
        api_key,
        pricing,
        request_timeout: Duration::from_secs(config.timeouts.request_secs),
    })
}

/// Builds the single active provider for this run.
pub fn build_provider(
    config: &AppConfig,
    kind: ProviderKind,
    model_override: Option<&str>,
) -> ScoutResult<Arc<dyn VisionProvider>> {
    let settings = resolve_settings(config, kind, model_override, |name| std::env::var(name).ok())?;
    let provider: Arc<dyn VisionProvider> = match kind {
        ProviderKind::OpenAi => Arc::new(OpenAiCompatibleProvider::new(kind.id().to_string(), settings)),
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(settings)),
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(settings)),
    };
    tracing::info!(provider = %kind, model = %provider.model(), "vision provider selected");
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn openai_requires_a_key() {
        let cfg = AppConfig::default();
        let err = resolve_settings(&cfg, ProviderKind::OpenAi, None, no_env).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn env_key_wins_over_config_key() {
        let mut cfg = AppConfig::default();
        cfg.vision.anthropic.api_key = Some("from-file".into());
        let settings = resolve_settings(&cfg, ProviderKind::Anthropic, None, |name| {
            (name == "ANTHROPIC_API_KEY").then(|| "from-env".to_string())
        })
        .unwrap();
        assert_eq!(settings.api_key, "from-env");
        assert_eq!(settings.model, "claude-sonnet-4-20250514");
        assert_eq!(settings.api_base, "https://api.anthropic.com/v1/messages");
    }

    #[test]
    fn model_override_beats_config_model() {
        let mut cfg = AppConfig::default();
        cfg.vision.openai.model = Some("gpt-4o-mini".into());
        cfg.vision.openai.api_key = Some("k".into());
        let from_cfg = resolve_settings(&cfg, ProviderKind::OpenAi, None, no_env).unwrap();
        assert_eq!(from_cfg.model, "gpt-4o-mini");
        let overridden =
            resolve_settings(&cfg, ProviderKind::OpenAi, Some("gpt-4.1"), no_env).unwrap();
        assert_eq!(overridden.model, "gpt-4.1");
        assert_eq!(overridden.pricing.input_per_mtok, 5.0);
    }

    #[test]
    fn ollama_needs_no_key_and_reads_base_from_env() {
        let cfg = AppConfig::default();
        let settings = resolve_settings(&cfg, ProviderKind::Ollama, None, |name| {
            (name == "OLLAMA_BASE_URL").then(|| "http://gpu-box:11434".to_string())
        })
        .unwrap();
        assert_eq!(settings.api_base, "http://gpu-box:11434");
        assert_eq!(settings.model, "gemma3:4b");
        assert_eq!(settings.pricing, Pricing::default());
    }
}

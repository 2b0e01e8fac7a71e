//! LLM integration.
//!
//! Supports:
//! - **OpenAI**: chat completions API
//! - **Anthropic**: messages API
//!
//! Both backends speak plain HTTP via `reqwest` and sit behind the
//! `LlmProvider` trait, so the pipeline can run against a test double.

pub mod anthropic;
pub mod costs;
pub mod openai;
pub mod provider;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;
pub use provider::*;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ConfigError, LlmError};

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Anthropic,
    OpenAi,
}

impl LlmBackend {
    /// Environment variable holding the API key for this backend.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }
}

impl FromStr for LlmBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(ConfigError::InvalidValue {
                key: "EMAIL_TRIAGE_BACKEND".to_string(),
                message: format!("unknown backend '{other}' (expected openai or anthropic)"),
            }),
        }
    }
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
    /// Override the API base URL (proxies, compatible servers).
    pub base_url: Option<String>,
    /// HTTP-level timeout for a single request.
    pub timeout: Duration,
}

impl LlmConfig {
    /// Read backend, key and base URL from the environment.
    ///
    /// A missing API key is a startup error.
    pub fn from_env(model: impl Into<String>, timeout: Duration) -> Result<Self, ConfigError> {
        Self::from_lookup(model, timeout, |key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(
        model: impl Into<String>,
        timeout: Duration,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = match get("EMAIL_TRIAGE_BACKEND") {
            Some(value) => value.parse()?,
            None => LlmBackend::OpenAi,
        };

        let key_var = backend.api_key_var();
        let api_key = get(key_var).ok_or_else(|| ConfigError::MissingEnvVar(key_var.to_string()))?;

        Ok(Self {
            backend,
            api_key: secrecy::SecretString::from(api_key),
            model: model.into(),
            base_url: get("EMAIL_TRIAGE_BASE_URL"),
            timeout,
        })
    }
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match config.backend {
        LlmBackend::Anthropic => {
            tracing::info!("Using Anthropic (model: {})", config.model);
            Ok(Arc::new(AnthropicProvider::new(
                config.api_key.clone(),
                &config.model,
                config.base_url.clone(),
                config.timeout,
            )?))
        }
        LlmBackend::OpenAi => {
            tracing::info!("Using OpenAI (model: {})", config.model);
            Ok(Arc::new(OpenAiProvider::new(
                config.api_key.clone(),
                &config.model,
                config.base_url.clone(),
                config.timeout,
            )?))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn config_from(pairs: &[(&str, &str)]) -> Result<LlmConfig, ConfigError> {
        LlmConfig::from_lookup("gpt-4o", Duration::from_secs(30), lookup(pairs))
    }

    #[test]
    fn anthropic_provider_constructs_without_network() {
        let config = LlmConfig {
            backend: LlmBackend::Anthropic,
            api_key: secrecy::SecretString::from("test-key"),
            model: "claude-sonnet-4-20250514".to_string(),
            base_url: None,
            timeout: Duration::from_secs(5),
        };
        let provider = create_provider(&config);
        assert!(provider.is_ok());
        assert_eq!(provider.unwrap().model_name(), "claude-sonnet-4-20250514");
    }

    #[test]
    fn openai_provider_constructs_without_network() {
        let config = LlmConfig {
            backend: LlmBackend::OpenAi,
            api_key: secrecy::SecretString::from("sk-test"),
            model: "gpt-4o".to_string(),
            base_url: None,
            timeout: Duration::from_secs(5),
        };
        let provider = create_provider(&config);
        assert!(provider.is_ok());
        assert_eq!(provider.unwrap().model_name(), "gpt-4o");
    }

    #[test]
    fn backend_parsing() {
        assert_eq!("OpenAI".parse::<LlmBackend>().unwrap(), LlmBackend::OpenAi);
        assert_eq!(" anthropic ".parse::<LlmBackend>().unwrap(), LlmBackend::Anthropic);
        assert!("gemini".parse::<LlmBackend>().is_err());
        assert_eq!(LlmBackend::OpenAi.api_key_var(), "OPENAI_API_KEY");
    }

    #[test]
    fn defaults_to_openai_with_key() {
        let config = config_from(&[("OPENAI_API_KEY", "sk-live")]).unwrap();
        assert_eq!(config.backend, LlmBackend::OpenAi);
        assert_eq!(config.api_key.expose_secret(), "sk-live");
        assert_eq!(config.model, "gpt-4o");
        assert!(config.base_url.is_none());
    }

    #[test]
    fn missing_openai_key_is_fatal() {
        let err = config_from(&[("ANTHROPIC_API_KEY", "ant-live")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref var) if var == "OPENAI_API_KEY"));
    }

    #[test]
    fn missing_anthropic_key_is_fatal() {
        let err = config_from(&[
            ("EMAIL_TRIAGE_BACKEND", "anthropic"),
            ("OPENAI_API_KEY", "sk-live"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref var) if var == "ANTHROPIC_API_KEY"));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let err = config_from(&[("OPENAI_API_KEY", "  ")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let err = config_from(&[
            ("EMAIL_TRIAGE_BACKEND", "gemini"),
            ("OPENAI_API_KEY", "sk-live"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "EMAIL_TRIAGE_BACKEND"));
    }

    #[test]
    fn anthropic_backend_with_base_url() {
        let config = config_from(&[
            ("EMAIL_TRIAGE_BACKEND", "Anthropic"),
            ("ANTHROPIC_API_KEY", "ant-live"),
            ("EMAIL_TRIAGE_BASE_URL", "http://proxy.local/v1"),
        ])
        .unwrap();
        assert_eq!(config.backend, LlmBackend::Anthropic);
        assert_eq!(config.api_key.expose_secret(), "ant-live");
        assert_eq!(config.base_url.as_deref(), Some("http://proxy.local/v1"));
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}

//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Who signs generated replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyPersona {
    /// Name used in the signature.
    pub name: String,
    /// Company the replies are sent on behalf of.
    pub company: String,
}

impl Default for ReplyPersona {
    fn default() -> Self {
        Self {
            name: "Customer Care Team".to_string(),
            company: "our company".to_string(),
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Model identifier sent with every request.
    pub model: String,
    /// Output cap for the classification call (only a label is expected).
    pub classify_max_tokens: u32,
    /// Sampling temperature for both calls.
    pub temperature: f32,
    /// Upper bound for every external call (LLM and action sink).
    pub call_timeout: Duration,
    /// Emails processed at once. 1 means strictly sequential.
    pub concurrency: usize,
    /// Signature for generated replies.
    pub persona: ReplyPersona,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            classify_max_tokens: 5,
            temperature: 0.0,
            call_timeout: Duration::from_secs(30),
            concurrency: 1,
            persona: ReplyPersona::default(),
        }
    }
}

impl PipelineConfig {
    /// Build a config from `EMAIL_TRIAGE_*` environment variables.
    ///
    /// Unset variables keep their defaults; malformed ones are errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(model) = lookup("EMAIL_TRIAGE_MODEL").filter(|m| !m.trim().is_empty()) {
            config.model = model.trim().to_string();
        }

        if let Some(raw) = lookup("EMAIL_TRIAGE_CALL_TIMEOUT_SECS") {
            let secs: u64 = parse_value("EMAIL_TRIAGE_CALL_TIMEOUT_SECS", &raw)?;
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "EMAIL_TRIAGE_CALL_TIMEOUT_SECS".to_string(),
                    message: "must be at least 1".to_string(),
                });
            }
            config.call_timeout = Duration::from_secs(secs);
        }

        if let Some(raw) = lookup("EMAIL_TRIAGE_CONCURRENCY") {
            let concurrency: usize = parse_value("EMAIL_TRIAGE_CONCURRENCY", &raw)?;
            if concurrency == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "EMAIL_TRIAGE_CONCURRENCY".to_string(),
                    message: "must be at least 1".to_string(),
                });
            }
            config.concurrency = concurrency;
        }

        if let Some(name) = lookup("EMAIL_TRIAGE_SIGNATURE_NAME") {
            config.persona.name = name;
        }
        if let Some(company) = lookup("EMAIL_TRIAGE_COMPANY") {
            config.persona.company = company;
        }

        Ok(config)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{raw}': {e}"),
    })
}

//! Error types for the email triage pipeline.
//!
//! Only configuration errors are fatal. Per-email failures are contained
//! inside the pipeline and reported as `ProcessingResult` rows.

use std::time::Duration;

use crate::actions::ActionKind;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },
}

/// The classification call could not produce a label at all.
///
/// Out-of-vocabulary labels are not errors; they are coerced to `other`.
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("classification call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("classification call timed out after {0:?}")]
    Timeout(Duration),
}

/// The reply generation call failed.
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("reply generation failed: {0}")]
    Llm(#[from] LlmError),

    #[error("reply generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("model returned an empty reply")]
    EmptyReply,

    #[error("reply was cut off at the provider's output limit")]
    Truncated,
}

/// A side-effecting collaborator call failed.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("{action} failed for email {email_id}: {reason}")]
    Failed {
        action: ActionKind,
        email_id: String,
        reason: String,
    },

    #[error("{action} for email {email_id} timed out after {timeout:?}")]
    Timeout {
        action: ActionKind,
        email_id: String,
        timeout: Duration,
    },
}

impl ActionError {
    /// Which action produced this error.
    pub fn action(&self) -> ActionKind {
        match self {
            Self::Failed { action, .. } | Self::Timeout { action, .. } => *action,
        }
    }
}

/// Errors loading an email dataset.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse email dataset: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate email id in dataset: {0}")]
    DuplicateId(String),
}

//! Classifier — one LLM call mapping an email to a `Category`.
//!
//! Output outside the vocabulary is coerced to `Category::Other`; only a
//! failed call is an error.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::config::PipelineConfig;
use crate::error::ClassificationError;
use crate::llm::costs;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::pipeline::types::{Category, Email};

/// Assigns each email one label from the closed vocabulary.
pub struct Classifier {
    llm: Arc<dyn LlmProvider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl Classifier {
    pub fn new(llm: Arc<dyn LlmProvider>, config: &PipelineConfig) -> Self {
        Self {
            llm,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.classify_max_tokens,
            timeout: config.call_timeout,
        }
    }

    /// Classify a single email.
    pub async fn classify(&self, email: &Email) -> Result<Category, ClassificationError> {
        let request = CompletionRequest::new(build_classify_messages(email))
            .with_model(&self.model)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let response = match tokio::time::timeout(self.timeout, self.llm.complete(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                error!(email_id = %email.id, error = %e, "Classification call failed");
                return Err(e.into());
            }
            Err(_) => {
                error!(email_id = %email.id, timeout = ?self.timeout, "Classification call timed out");
                return Err(ClassificationError::Timeout(self.timeout));
            }
        };

        debug!(
            email_id = %email.id,
            raw = %response.content,
            cost = %costs::call_cost(
                self.llm.cost_per_token(&self.model),
                response.input_tokens,
                response.output_tokens,
            ),
            "Classification response"
        );

        Ok(normalize_label(&email.id, &response.content))
    }
}

/// Resolve raw model output to a category, degrading to `Other`.
pub fn normalize_label(email_id: &str, raw: &str) -> Category {
    match Category::from_label(raw) {
        Some(category) => category,
        None => {
            warn!(
                email_id,
                raw = %raw.trim(),
                "Model returned a label outside the vocabulary; using 'other'"
            );
            Category::Other
        }
    }
}

fn build_classify_messages(email: &Email) -> Vec<ChatMessage> {
    let labels: Vec<String> = Category::ALL
        .iter()
        .map(|c| format!("- {}", c.as_str()))
        .collect();

    let system = format!(
        "You classify customer emails. Pick exactly one category:\n{}\n\n\
         Reply with the category name only, exactly as written above. No punctuation, no explanation.",
        labels.join("\n")
    );

    let user = format!(
        "Subject: {}\nBody: {}",
        email.subject_or_placeholder(),
        email.body_or_placeholder()
    );

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

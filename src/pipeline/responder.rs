//! Responder — drafts the reply text for a classified email.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use tracing::{debug, error, warn};

use crate::config::{PipelineConfig, ReplyPersona};
use crate::error::ResponseError;
use crate::llm::costs;
use crate::llm::provider::{ChatMessage, CompletionRequest, FinishReason, LlmProvider};
use crate::pipeline::types::{Category, Email};

/// Bracketed template slots such as `[recipient's name]` or `[Your Company]`.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[[^\]\n]{0,40}\b(name|recipient|company|date|number|signature|your)\b[^\]\n]{0,40}\]")
        .expect("placeholder pattern is valid")
});

/// Generates reply prose with a second LLM call.
pub struct Responder {
    llm: Arc<dyn LlmProvider>,
    model: String,
    temperature: f32,
    timeout: Duration,
    persona: ReplyPersona,
}

impl Responder {
    pub fn new(llm: Arc<dyn LlmProvider>, config: &PipelineConfig) -> Self {
        Self {
            llm,
            model: config.model.clone(),
            temperature: config.temperature,
            timeout: config.call_timeout,
            persona: config.persona.clone(),
        }
    }

    /// Draft a reply for `email`, written for the given category.
    ///
    /// The category is trusted as-is. No output cap is requested, and a reply
    /// the provider still cut off at its own limit is a failure.
    pub async fn generate_reply(
        &self,
        email: &Email,
        category: Category,
    ) -> Result<String, ResponseError> {
        let request = CompletionRequest::new(build_reply_messages(email, category, &self.persona))
            .with_model(&self.model)
            .with_temperature(self.temperature);

        let response = match tokio::time::timeout(self.timeout, self.llm.complete(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                error!(email_id = %email.id, category = %category, error = %e, "Reply generation failed");
                return Err(e.into());
            }
            Err(_) => {
                error!(email_id = %email.id, category = %category, "Reply generation timed out");
                return Err(ResponseError::Timeout(self.timeout));
            }
        };

        if response.finish_reason == FinishReason::Length {
            warn!(
                email_id = %email.id,
                category = %category,
                output_tokens = response.output_tokens,
                "Reply hit the output limit"
            );
            return Err(ResponseError::Truncated);
        }

        let reply = response.content.trim().to_string();
        if reply.is_empty() {
            warn!(email_id = %email.id, category = %category, "Model returned an empty reply");
            return Err(ResponseError::EmptyReply);
        }

        if let Some(found) = PLACEHOLDER.find(&reply) {
            warn!(
                email_id = %email.id,
                placeholder = found.as_str(),
                "Reply still contains a template placeholder"
            );
        }

        debug!(
            email_id = %email.id,
            category = %category,
            reply_len = reply.len(),
            cost = %costs::call_cost(
                self.llm.cost_per_token(&self.model),
                response.input_tokens,
                response.output_tokens,
            ),
            "Reply drafted"
        );

        Ok(reply)
    }
}

/// Category-specific steer for the reply.
fn category_guidance(category: Category) -> &'static str {
    match category {
        Category::Complaint => {
            "The customer is unhappy. Acknowledge the problem, apologise sincerely, \
             and explain that the issue has been escalated for urgent follow-up."
        }
        Category::Inquiry => {
            "The customer has a question. Answer what can be answered generally and \
             explain how they can get further details."
        }
        Category::Feedback => {
            "The customer is sharing feedback. Thank them warmly and confirm it has \
             been passed on to the team."
        }
        Category::SupportRequest => {
            "The customer needs technical help. Acknowledge the problem and confirm \
             a support ticket has been opened."
        }
        Category::Other => {
            "The email does not fit a standard category. Acknowledge it politely and \
             explain that the right person will follow up."
        }
    }
}

fn build_reply_messages(
    email: &Email,
    category: Category,
    persona: &ReplyPersona,
) -> Vec<ChatMessage> {
    let system = format!(
        "You write email replies on behalf of {company}. Be polite, professional and service focused.\n\n\
         Rules:\n\
         - Output only the email text. No commentary before or after it.\n\
         - Address the reader as \"you\". Never use placeholders such as \"[recipient's name]\" or \"[date]\".\n\
         - Keep it generic and self-contained; do not invent order details or promises.\n\
         - Sign the email as \"{name}\".",
        company = persona.company,
        name = persona.name,
    );

    let user = format!(
        "Classification: {category}\n{guidance}\n\n\
         Email:\n---\nSubject: {subject}\nBody: {body}\n---\n\n\
         Write the reply.",
        category = category.as_str(),
        guidance = category_guidance(category),
        subject = email.subject_or_placeholder(),
        body = email.body_or_placeholder(),
    );

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use super::*;
    use crate::error::LlmError;
    use crate::llm::provider::CompletionResponse;

    struct MockReplyLlm {
        reply: Option<String>,
        finish_reason: FinishReason,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl MockReplyLlm {
        fn new(reply: Option<&str>) -> Self {
            Self {
                reply: reply.map(Into::into),
                finish_reason: FinishReason::Stop,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn cut_off(reply: &str) -> Self {
            Self {
                finish_reason: FinishReason::Length,
                ..Self::new(Some(reply))
            }
        }
    }

    #[async_trait]
    impl LlmProvider for MockReplyLlm {
        fn model_name(&self) -> &str {
            "mock-responder"
        }

        fn cost_per_token(&self, _model: &str) -> (Decimal, Decimal) {
            (Decimal::ZERO, Decimal::ZERO)
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.seen.lock().unwrap().push(request);
            match &self.reply {
                Some(text) => Ok(CompletionResponse {
                    content: text.clone(),
                    input_tokens: 200,
                    output_tokens: 120,
                    finish_reason: self.finish_reason,
                    response_id: Some("resp-1".into()),
                }),
                None => Err(LlmError::RateLimited {
                    provider: "mock".into(),
                    retry_after: None,
                }),
            }
        }
    }

    fn email() -> Email {
        Email {
            id: "002".into(),
            from: "curious@example.com".into(),
            subject: Some("Mac support?".into()),
            body: Some("Is the premium package compatible with Mac OS?".into()),
            timestamp: "2024-03-15T11:45:00Z".into(),
        }
    }

    #[tokio::test]
    async fn reply_is_trimmed() {
        let llm = Arc::new(MockReplyLlm::new(Some("\n  Thanks for asking!  \n")));
        let responder = Responder::new(llm, &PipelineConfig::default());
        let reply = responder.generate_reply(&email(), Category::Inquiry).await.unwrap();
        assert_eq!(reply, "Thanks for asking!");
    }

    #[tokio::test]
    async fn failure_is_returned_not_raised() {
        let llm = Arc::new(MockReplyLlm::new(None));
        let responder = Responder::new(llm, &PipelineConfig::default());
        let err = responder
            .generate_reply(&email(), Category::Inquiry)
            .await
            .unwrap_err();
        assert!(matches!(err, ResponseError::Llm(LlmError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn blank_reply_is_a_failure() {
        let llm = Arc::new(MockReplyLlm::new(Some("   ")));
        let responder = Responder::new(llm, &PipelineConfig::default());
        let err = responder
            .generate_reply(&email(), Category::Feedback)
            .await
            .unwrap_err();
        assert!(matches!(err, ResponseError::EmptyReply));
    }

    #[tokio::test]
    async fn cut_off_reply_is_a_failure() {
        let llm = Arc::new(MockReplyLlm::cut_off("Dear customer, we are sorry that your order"));
        let responder = Responder::new(llm, &PipelineConfig::default());
        let err = responder
            .generate_reply(&email(), Category::Complaint)
            .await
            .unwrap_err();
        assert!(matches!(err, ResponseError::Truncated));
    }

    #[tokio::test]
    async fn request_has_no_output_cap() {
        let llm = Arc::new(MockReplyLlm::new(Some("Hello")));
        let responder = Responder::new(llm.clone(), &PipelineConfig::default());
        responder.generate_reply(&email(), Category::Other).await.unwrap();

        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen[0].max_tokens, None);
        assert_eq!(seen[0].temperature, Some(0.0));
    }

    #[test]
    fn prompt_carries_category_persona_and_rules() {
        let persona = ReplyPersona {
            name: "Dana from Acme".into(),
            company: "Acme".into(),
        };
        let messages = build_reply_messages(&email(), Category::Complaint, &persona);
        assert!(messages[0].content.contains("Acme"));
        assert!(messages[0].content.contains("Dana from Acme"));
        assert!(messages[0].content.contains("placeholders"));
        assert!(messages[1].content.contains("Classification: complaint"));
        assert!(messages[1].content.contains("Mac OS"));
    }

    #[test]
    fn placeholder_pattern() {
        assert!(PLACEHOLDER.is_match("Dear [Recipient's Name],"));
        assert!(PLACEHOLDER.is_match("Best, [Your Company]"));
        assert!(!PLACEHOLDER.is_match("Order [#12345] shipped"));
        assert!(!PLACEHOLDER.is_match("Dear customer, thank you."));
    }
}

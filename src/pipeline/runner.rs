//! Batch runner — classify, dispatch, record, for every email.
//!
//! **Core invariant: one result per input email, in input order.** No
//! single email's failure stops the batch.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{error, info};

use crate::actions::ActionSink;
use crate::config::PipelineConfig;
use crate::llm::provider::LlmProvider;
use crate::pipeline::classifier::Classifier;
use crate::pipeline::responder::Responder;
use crate::pipeline::router::{HandlerOutcome, Router};
use crate::pipeline::types::{BatchSummary, Email, ProcessingResult};

/// Runs batches of emails through the pipeline.
pub struct BatchRunner {
    classifier: Arc<Classifier>,
    router: Arc<Router>,
    concurrency: usize,
}

impl BatchRunner {
    pub fn new(classifier: Arc<Classifier>, router: Arc<Router>, concurrency: usize) -> Self {
        Self {
            classifier,
            router,
            concurrency: concurrency.max(1),
        }
    }

    /// Wire up classifier, responder and router around one shared provider.
    pub fn from_config(
        llm: Arc<dyn LlmProvider>,
        sink: Arc<dyn ActionSink>,
        config: &PipelineConfig,
    ) -> Self {
        let classifier = Arc::new(Classifier::new(Arc::clone(&llm), config));
        let responder = Arc::new(Responder::new(llm, config));
        let router = Arc::new(Router::new(responder, sink, config.call_timeout));
        Self::new(classifier, router, config.concurrency)
    }

    /// Process every email and return results in input order.
    ///
    /// Up to `concurrency` emails are in flight at once. Within one email
    /// the steps stay sequential.
    pub async fn run(&self, emails: &[Email]) -> Vec<ProcessingResult> {
        info!(
            count = emails.len(),
            concurrency = self.concurrency,
            "Processing email batch"
        );

        let results: Vec<ProcessingResult> = stream::iter(emails)
            .map(|email| self.process(email))
            .buffered(self.concurrency)
            .collect()
            .await;

        let summary = BatchSummary::from_results(&results);
        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Batch processing complete"
        );
        results
    }

    /// Process a single email end to end.
    pub async fn process(&self, email: &Email) -> ProcessingResult {
        info!(email_id = %email.id, from = %email.from, "Processing email");

        let category = match self.classifier.classify(email).await {
            Ok(category) => category,
            Err(e) => {
                return ProcessingResult {
                    email_id: email.id.clone(),
                    success: false,
                    category: None,
                    reply_text: String::new(),
                    error: Some(e.to_string()),
                    processed_at: Utc::now(),
                };
            }
        };

        info!(email_id = %email.id, category = %category, "Email classified");

        // Separate task so a panicking handler is recorded, not propagated.
        let router = Arc::clone(&self.router);
        let owned = email.clone();
        let dispatched =
            tokio::spawn(async move { router.dispatch(&owned, category).await }).await;

        let (success, reply_text, error) = match dispatched {
            Ok(HandlerOutcome::Completed { reply_text }) => (true, reply_text, None),
            Ok(HandlerOutcome::Failed { failure }) => (false, String::new(), Some(failure.to_string())),
            Err(join_error) => {
                error!(
                    email_id = %email.id,
                    category = %category,
                    error = %join_error,
                    "Handler aborted"
                );
                (false, String::new(), Some(format!("handler aborted: {join_error}")))
            }
        };

        ProcessingResult {
            email_id: email.id.clone(),
            success,
            category: Some(category),
            reply_text,
            error,
            processed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use super::*;
    use crate::actions::LoggingActionSink;
    use crate::error::LlmError;
    use crate::llm::provider::{CompletionRequest, CompletionResponse, FinishReason};
    use crate::pipeline::types::Category;

    /// Mock LLM: classification requests (capped) get a label keyed by
    /// subject; reply requests get a canned reply.
    struct ScriptedLlm {
        labels: Vec<(&'static str, Option<&'static str>)>,
        classify_calls: Mutex<usize>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn model_name(&self) -> &str {
            "scripted"
        }

        fn cost_per_token(&self, _model: &str) -> (Decimal, Decimal) {
            (Decimal::ZERO, Decimal::ZERO)
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            let user = &request.messages[1].content;
            let text = if request.max_tokens.is_some() {
                *self.classify_calls.lock().unwrap() += 1;
                let label = self
                    .labels
                    .iter()
                    .find(|(subject, _)| user.contains(subject))
                    .and_then(|(_, label)| *label);
                match label {
                    Some(label) => label.to_string(),
                    None => {
                        return Err(LlmError::RequestFailed {
                            provider: "scripted".into(),
                            reason: "boom".into(),
                        });
                    }
                }
            } else {
                "We appreciate your message.".to_string()
            };
            Ok(CompletionResponse {
                content: text,
                input_tokens: 0,
                output_tokens: 0,
                finish_reason: FinishReason::Stop,
                response_id: None,
            })
        }
    }

    fn email(id: &str, subject: &str) -> Email {
        Email {
            id: id.into(),
            from: format!("{id}@example.com"),
            subject: Some(subject.into()),
            body: Some("body".into()),
            timestamp: "2024-03-15T10:30:00Z".into(),
        }
    }

    fn runner(
        labels: Vec<(&'static str, Option<&'static str>)>,
        concurrency: usize,
    ) -> (BatchRunner, Arc<ScriptedLlm>) {
        let llm = Arc::new(ScriptedLlm {
            labels,
            classify_calls: Mutex::new(0),
        });
        let config = PipelineConfig {
            concurrency,
            ..PipelineConfig::default()
        };
        let runner =
            BatchRunner::from_config(llm.clone(), Arc::new(LoggingActionSink::new()), &config);
        (runner, llm)
    }

    #[tokio::test]
    async fn classification_failure_is_recorded_and_batch_continues() {
        let (runner, llm) = runner(
            vec![("first", Some("inquiry")), ("second", None), ("third", Some("feedback"))],
            1,
        );
        let emails = vec![email("a", "first"), email("b", "second"), email("c", "third")];
        let results = runner.run(&emails).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert_eq!(results[0].category, Some(Category::Inquiry));

        assert!(!results[1].success);
        assert_eq!(results[1].category, None);
        assert_eq!(results[1].category_label(), "unknown");
        assert_eq!(results[1].reply_text, "");
        assert!(results[1].error.as_deref().unwrap().contains("boom"));

        assert!(results[2].success);
        assert_eq!(results[2].category, Some(Category::Feedback));
        assert_eq!(results[2].reply_text, "We appreciate your message.");
        assert_eq!(*llm.classify_calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn concurrent_run_preserves_order() {
        let labels = vec![
            ("s0", Some("complaint")),
            ("s1", Some("inquiry")),
            ("s2", None),
            ("s3", Some("support_request")),
            ("s4", Some("nonsense")),
            ("s5", Some("other")),
        ];
        let emails: Vec<Email> = (0..6)
            .map(|i| email(&format!("id-{i}"), &format!("s{i}")))
            .collect();
        let (runner, llm) = runner(labels, 4);
        let results = runner.run(&emails).await;

        let ids: Vec<&str> = results.iter().map(|r| r.email_id.as_str()).collect();
        assert_eq!(ids, vec!["id-0", "id-1", "id-2", "id-3", "id-4", "id-5"]);
        assert_eq!(results[4].category, Some(Category::Other));
        assert!(results[4].success);
        assert!(!results[2].success);
        assert_eq!(*llm.classify_calls.lock().unwrap(), 6);
    }

    #[tokio::test]
    async fn empty_batch_yields_no_results() {
        let (runner, llm) = runner(vec![], 1);
        let results = runner.run(&[]).await;
        assert!(results.is_empty());
        assert_eq!(*llm.classify_calls.lock().unwrap(), 0);
    }

    #[test]
    fn zero_concurrency_is_clamped() {
        let (runner, _) = runner(vec![], 0);
        assert_eq!(runner.concurrency, 1);
    }
}

//! Router — one handler per category.
//!
//! Every handler drafts a reply, then runs its side effects in a fixed
//! order. Failures stay inside the handler: a failed draft skips the side
//! effects, a failed side effect does not stop the ones after it, and
//! either way the handler hands back an empty reply plus what went wrong.
//!
//! | Category          | Side effects, in order                                  |
//! |-------------------|---------------------------------------------------------|
//! | `complaint`       | send complaint response, open urgent ticket             |
//! | `inquiry`         | send standard response                                  |
//! | `feedback`        | log feedback, send standard response                    |
//! | `support_request` | open support ticket (no reply is sent)                  |
//! | `other`           | send standard response                                  |

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::actions::{ActionKind, ActionSink};
use crate::error::{ActionError, ResponseError};
use crate::pipeline::responder::Responder;
use crate::pipeline::types::{Category, Email};

/// Ticket context when the email has no body.
pub const NO_EMAIL_BODY: &str = "No email body";
/// Feedback text when the email has no body.
pub const NO_FEEDBACK: &str = "No feedback";

/// Why a handler could not complete.
#[derive(Debug)]
pub enum HandlerFailure {
    /// No reply was drafted; side effects were skipped.
    Response(ResponseError),
    /// The reply was drafted but at least one side effect failed.
    Actions(Vec<ActionError>),
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Response(e) => write!(f, "{e}"),
            Self::Actions(errors) => {
                let parts: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                write!(f, "{}", parts.join("; "))
            }
        }
    }
}

/// What a handler produced.
#[derive(Debug)]
pub enum HandlerOutcome {
    Completed { reply_text: String },
    Failed { failure: HandlerFailure },
}

impl HandlerOutcome {
    /// Reply text; empty for failed handlers.
    pub fn reply_text(&self) -> &str {
        match self {
            Self::Completed { reply_text } => reply_text,
            Self::Failed { .. } => "",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Dispatches classified emails to their category handler.
pub struct Router {
    responder: Arc<Responder>,
    sink: Arc<dyn ActionSink>,
    timeout: Duration,
}

impl Router {
    pub fn new(responder: Arc<Responder>, sink: Arc<dyn ActionSink>, timeout: Duration) -> Self {
        Self {
            responder,
            sink,
            timeout,
        }
    }

    /// Run the handler for `category`. Never fails; see `HandlerOutcome`.
    pub async fn dispatch(&self, email: &Email, category: Category) -> HandlerOutcome {
        let outcome = match category {
            Category::Complaint => self.handle_complaint(email).await,
            Category::Inquiry => self.handle_inquiry(email).await,
            Category::Feedback => self.handle_feedback(email).await,
            Category::SupportRequest => self.handle_support_request(email).await,
            Category::Other => self.handle_other(email).await,
        };

        match &outcome {
            HandlerOutcome::Completed { .. } => {
                info!(email_id = %email.id, category = %category, "Handler completed");
            }
            HandlerOutcome::Failed { failure } => {
                warn!(
                    email_id = %email.id,
                    category = %category,
                    failure = %failure,
                    "Handler failed; contained"
                );
            }
        }
        outcome
    }

    async fn handle_complaint(&self, email: &Email) -> HandlerOutcome {
        let reply = match self.draft(email, Category::Complaint).await {
            Ok(reply) => reply,
            Err(outcome) => return outcome,
        };

        let mut errors = Vec::new();
        self.perform(
            &mut errors,
            ActionKind::SendComplaintResponse,
            &email.id,
            self.sink.send_complaint_response(&email.id, &reply),
        )
        .await;
        self.perform(
            &mut errors,
            ActionKind::CreateUrgentTicket,
            &email.id,
            self.sink
                .create_urgent_ticket(&email.id, Category::Complaint, email.body_or(NO_EMAIL_BODY)),
        )
        .await;

        finish(reply, errors)
    }

    async fn handle_inquiry(&self, email: &Email) -> HandlerOutcome {
        let reply = match self.draft(email, Category::Inquiry).await {
            Ok(reply) => reply,
            Err(outcome) => return outcome,
        };

        let mut errors = Vec::new();
        self.perform(
            &mut errors,
            ActionKind::SendStandardResponse,
            &email.id,
            self.sink.send_standard_response(&email.id, &reply),
        )
        .await;

        finish(reply, errors)
    }

    async fn handle_feedback(&self, email: &Email) -> HandlerOutcome {
        let reply = match self.draft(email, Category::Feedback).await {
            Ok(reply) => reply,
            Err(outcome) => return outcome,
        };

        let mut errors = Vec::new();
        self.perform(
            &mut errors,
            ActionKind::LogCustomerFeedback,
            &email.id,
            self.sink
                .log_customer_feedback(&email.id, email.body_or(NO_FEEDBACK)),
        )
        .await;
        self.perform(
            &mut errors,
            ActionKind::SendStandardResponse,
            &email.id,
            self.sink.send_standard_response(&email.id, &reply),
        )
        .await;

        finish(reply, errors)
    }

    /// Opens a ticket only. The drafted reply is returned but not sent.
    async fn handle_support_request(&self, email: &Email) -> HandlerOutcome {
        let reply = match self.draft(email, Category::SupportRequest).await {
            Ok(reply) => reply,
            Err(outcome) => return outcome,
        };

        let mut errors = Vec::new();
        self.perform(
            &mut errors,
            ActionKind::CreateSupportTicket,
            &email.id,
            self.sink
                .create_support_ticket(&email.id, email.body_or(NO_EMAIL_BODY)),
        )
        .await;

        finish(reply, errors)
    }

    async fn handle_other(&self, email: &Email) -> HandlerOutcome {
        let reply = match self.draft(email, Category::Other).await {
            Ok(reply) => reply,
            Err(outcome) => return outcome,
        };

        let mut errors = Vec::new();
        self.perform(
            &mut errors,
            ActionKind::SendStandardResponse,
            &email.id,
            self.sink.send_standard_response(&email.id, &reply),
        )
        .await;

        finish(reply, errors)
    }

    /// Draft the reply, or build the failed outcome that ends the handler.
    async fn draft(&self, email: &Email, category: Category) -> Result<String, HandlerOutcome> {
        self.responder
            .generate_reply(email, category)
            .await
            .map_err(|e| HandlerOutcome::Failed {
                failure: HandlerFailure::Response(e),
            })
    }

    /// Await one side effect under the call timeout, collecting any error.
    async fn perform<F>(
        &self,
        errors: &mut Vec<ActionError>,
        action: ActionKind,
        email_id: &str,
        call: F,
    ) where
        F: Future<Output = Result<(), ActionError>>,
    {
        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ActionError::Timeout {
                action,
                email_id: email_id.to_string(),
                timeout: self.timeout,
            }),
        };

        if let Err(e) = result {
            warn!(email_id, action = %action, error = %e, "Side effect failed");
            errors.push(e);
        }
    }
}

fn finish(reply: String, errors: Vec<ActionError>) -> HandlerOutcome {
    if errors.is_empty() {
        HandlerOutcome::Completed { reply_text: reply }
    } else {
        HandlerOutcome::Failed {
            failure: HandlerFailure::Actions(errors),
        }
    }
}

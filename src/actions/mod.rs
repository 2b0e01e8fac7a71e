//! Side-effecting collaborators: reply delivery, ticketing, feedback log.
//!
//! The pipeline only sees the `ActionSink` trait. Real integrations live
//! outside this crate; `LoggingActionSink` stands in for them.

use std::fmt;

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::error::ActionError;
use crate::pipeline::types::Category;

/// The side effects a handler can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    SendComplaintResponse,
    SendStandardResponse,
    CreateUrgentTicket,
    CreateSupportTicket,
    LogCustomerFeedback,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SendComplaintResponse => "send_complaint_response",
            Self::SendStandardResponse => "send_standard_response",
            Self::CreateUrgentTicket => "create_urgent_ticket",
            Self::CreateSupportTicket => "create_support_ticket",
            Self::LogCustomerFeedback => "log_customer_feedback",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External systems the handlers notify.
///
/// Return values carry nothing the pipeline uses; `Err` lets handlers
/// contain and report the failure.
#[async_trait]
pub trait ActionSink: Send + Sync {
    /// Deliver a reply to a complaint.
    async fn send_complaint_response(&self, email_id: &str, reply: &str)
    -> Result<(), ActionError>;

    /// Deliver an ordinary reply.
    async fn send_standard_response(&self, email_id: &str, reply: &str)
    -> Result<(), ActionError>;

    /// Open a high-priority ticket.
    async fn create_urgent_ticket(
        &self,
        email_id: &str,
        category: Category,
        context: &str,
    ) -> Result<(), ActionError>;

    /// Open a regular support ticket.
    async fn create_support_ticket(&self, email_id: &str, context: &str)
    -> Result<(), ActionError>;

    /// Record customer feedback.
    async fn log_customer_feedback(&self, email_id: &str, feedback: &str)
    -> Result<(), ActionError>;
}

/// Sink that only logs what it would have done.
#[derive(Debug, Default, Clone)]
pub struct LoggingActionSink;

impl LoggingActionSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ActionSink for LoggingActionSink {
    async fn send_complaint_response(
        &self,
        email_id: &str,
        reply: &str,
    ) -> Result<(), ActionError> {
        info!(email_id, reply_len = reply.len(), "Sending complaint response");
        Ok(())
    }

    async fn send_standard_response(
        &self,
        email_id: &str,
        reply: &str,
    ) -> Result<(), ActionError> {
        info!(email_id, reply_len = reply.len(), "Sending standard response");
        Ok(())
    }

    async fn create_urgent_ticket(
        &self,
        email_id: &str,
        category: Category,
        context: &str,
    ) -> Result<(), ActionError> {
        let ticket_id = Uuid::new_v4();
        info!(
            email_id,
            %ticket_id,
            category = %category,
            context_len = context.len(),
            "Creating urgent ticket"
        );
        Ok(())
    }

    async fn create_support_ticket(
        &self,
        email_id: &str,
        context: &str,
    ) -> Result<(), ActionError> {
        let ticket_id = Uuid::new_v4();
        info!(email_id, %ticket_id, context_len = context.len(), "Creating support ticket");
        Ok(())
    }

    async fn log_customer_feedback(
        &self,
        email_id: &str,
        feedback: &str,
    ) -> Result<(), ActionError> {
        info!(email_id, feedback = %feedback, "Logging customer feedback");
        Ok(())
    }
}

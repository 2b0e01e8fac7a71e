//! Email datasets: the built-in sample set and JSON file loading.

use std::collections::HashSet;
use std::path::Path;

use tracing::{info, warn};

use crate::error::DatasetError;
use crate::pipeline::types::Email;

/// Five representative customer emails, one per expected category.
pub fn sample_emails() -> Vec<Email> {
    vec![
        sample(
            "001",
            "angry.customer@example.com",
            "Broken product received",
            "I received my order #12345 yesterday but it arrived completely damaged. \
             This is unacceptable and I demand a refund immediately. This is the worst \
             customer service I've experienced.",
            "2024-03-15T10:30:00Z",
        ),
        sample(
            "002",
            "curious.shopper@example.com",
            "Question about product specifications",
            "Hi, I'm interested in buying your premium package but I couldn't find \
             information about whether it's compatible with Mac OS. Could you please \
             clarify this? Thanks!",
            "2024-03-15T11:45:00Z",
        ),
        sample(
            "003",
            "happy.user@example.com",
            "Amazing customer support",
            "I just wanted to say thank you for the excellent support I received from \
             Sarah on your team. She went above and beyond to help resolve my issue. \
             Keep up the great work!",
            "2024-03-15T13:15:00Z",
        ),
        sample(
            "004",
            "tech.user@example.com",
            "Need help with installation",
            "I've been trying to install the software for the past hour but keep getting \
             error code 5123. I've already tried restarting my computer and clearing the \
             cache. Please help!",
            "2024-03-15T14:20:00Z",
        ),
        sample(
            "005",
            "business.client@example.com",
            "Partnership opportunity",
            "Our company is interested in exploring potential partnership opportunities \
             with your organization. Would it be possible to schedule a call next week to \
             discuss this further?",
            "2024-03-15T15:00:00Z",
        ),
    ]
}

fn sample(id: &str, from: &str, subject: &str, body: &str, timestamp: &str) -> Email {
    Email {
        id: id.to_string(),
        from: from.to_string(),
        subject: Some(subject.to_string()),
        body: Some(body.to_string()),
        timestamp: timestamp.to_string(),
    }
}

/// Parse a JSON array of emails.
///
/// Ids must be unique. Unparseable timestamps are kept but logged.
pub fn parse_emails(json: &str) -> Result<Vec<Email>, DatasetError> {
    let emails: Vec<Email> = serde_json::from_str(json)?;

    {
        let mut seen = HashSet::with_capacity(emails.len());
        for email in &emails {
            if !seen.insert(email.id.as_str()) {
                return Err(DatasetError::DuplicateId(email.id.clone()));
            }
            if email.received_at().is_none() {
                warn!(email_id = %email.id, timestamp = %email.timestamp, "Email timestamp is not ISO-8601");
            }
        }
    }

    Ok(emails)
}

/// Load a JSON array of emails from disk.
pub async fn load_emails(path: &Path) -> Result<Vec<Email>, DatasetError> {
    let raw = tokio::fs::read_to_string(path).await?;
    let emails = parse_emails(&raw)?;
    info!(path = %path.display(), count = emails.len(), "Loaded email dataset");
    Ok(emails)
}

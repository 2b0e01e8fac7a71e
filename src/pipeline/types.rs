//! Shared types for the email triage pipeline.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stand-in for a missing subject when prompting the model.
pub const NO_SUBJECT: &str = "No subject";
/// Stand-in for a missing body when prompting the model.
pub const NO_BODY: &str = "No body";

// ── Email ───────────────────────────────────────────────────────────

/// An inbound email.
///
/// Ingestion lives outside the pipeline; the pipeline only reads these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    /// Unique identifier.
    pub id: String,
    /// Sender address.
    pub from: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    /// ISO-8601 receive time, as delivered.
    #[serde(default)]
    pub timestamp: String,
}

impl Email {
    /// Subject, or a fixed placeholder when absent.
    pub fn subject_or_placeholder(&self) -> &str {
        self.subject.as_deref().unwrap_or(NO_SUBJECT)
    }

    /// Body, or a fixed placeholder when absent.
    pub fn body_or_placeholder(&self) -> &str {
        self.body.as_deref().unwrap_or(NO_BODY)
    }

    /// Body, or `fallback` when absent.
    pub fn body_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.body.as_deref().unwrap_or(fallback)
    }

    /// Parsed receive time, if the timestamp is valid RFC 3339.
    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

// ── Category ────────────────────────────────────────────────────────

/// Classification label for an email. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Complaint,
    Inquiry,
    Feedback,
    SupportRequest,
    Other,
}

impl Category {
    /// Every category, in vocabulary order.
    pub const ALL: [Category; 5] = [
        Self::Complaint,
        Self::Inquiry,
        Self::Feedback,
        Self::SupportRequest,
        Self::Other,
    ];

    /// Wire label, as the model is asked to produce it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complaint => "complaint",
            Self::Inquiry => "inquiry",
            Self::Feedback => "feedback",
            Self::SupportRequest => "support_request",
            Self::Other => "other",
        }
    }

    /// Match raw model output against the vocabulary.
    ///
    /// Trims and lower-cases first. Returns `None` for anything outside the
    /// set; callers decide how to degrade.
    pub fn from_label(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Processing result ───────────────────────────────────────────────

/// Outcome of running one email through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub email_id: String,
    /// True only when classification succeeded and the handler hit no failure.
    pub success: bool,
    /// `None` when classification itself failed.
    pub category: Option<Category>,
    /// Empty when no reply was produced.
    pub reply_text: String,
    /// What went wrong, for unsuccessful rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub processed_at: DateTime<Utc>,
}

impl ProcessingResult {
    /// Label for display; `unknown` when classification failed.
    pub fn category_label(&self) -> &'static str {
        self.category.map(|c| c.as_str()).unwrap_or("unknown")
    }
}

// ── Batch summary ───────────────────────────────────────────────────

/// Aggregate counts over a batch of results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Count per category label, including `unknown`.
    pub by_category: BTreeMap<String, usize>,
}

impl BatchSummary {
    pub fn from_results(results: &[ProcessingResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Default::default()
        };
        for result in results {
            if result.success {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            *summary
                .by_category
                .entry(result.category_label().to_string())
                .or_insert(0) += 1;
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(subject: Option<&str>, body: Option<&str>) -> Email {
        Email {
            id: "001".into(),
            from: "someone@example.com".into(),
            subject: subject.map(Into::into),
            body: body.map(Into::into),
            timestamp: "2024-03-15T10:30:00Z".into(),
        }
    }

    #[test]
    fn from_label_normalizes_case_and_whitespace() {
        assert_eq!(Category::from_label("  Complaint\n"), Some(Category::Complaint));
        assert_eq!(
            Category::from_label("SUPPORT_REQUEST"),
            Some(Category::SupportRequest)
        );
        assert_eq!(Category::from_label("other"), Some(Category::Other));
    }

    #[test]
    fn from_label_rejects_out_of_vocabulary() {
        assert_eq!(Category::from_label("SPAM"), None);
        assert_eq!(Category::from_label("support request"), None);
        assert_eq!(Category::from_label(""), None);
    }

    #[test]
    fn labels_round_trip_through_serde() {
        for category in Category::ALL {
            let json = serde_json::to_value(category).unwrap();
            assert_eq!(json, category.as_str());
            assert_eq!(Category::from_label(category.as_str()), Some(category));
        }
    }

    #[test]
    fn placeholders_fill_missing_fields() {
        let e = email(None, None);
        assert_eq!(e.subject_or_placeholder(), NO_SUBJECT);
        assert_eq!(e.body_or_placeholder(), NO_BODY);
        assert_eq!(e.body_or("No feedback"), "No feedback");

        let e = email(Some("Hi"), Some("Body"));
        assert_eq!(e.subject_or_placeholder(), "Hi");
        assert_eq!(e.body_or("No feedback"), "Body");
    }

    #[test]
    fn email_deserializes_with_missing_optional_fields() {
        let e: Email = serde_json::from_str(r#"{"id": "9", "from": "a@b.c"}"#).unwrap();
        assert!(e.subject.is_none());
        assert!(e.body.is_none());
        assert!(e.received_at().is_none());
    }

    #[test]
    fn received_at_parses_iso_timestamp() {
        let e = email(None, None);
        let at = e.received_at().unwrap();
        assert_eq!(at.to_rfc3339(), "2024-03-15T10:30:00+00:00");
    }

    #[test]
    fn summary_counts_unknown_category() {
        let now = Utc::now();
        let results = vec![
            ProcessingResult {
                email_id: "1".into(),
                success: true,
                category: Some(Category::Complaint),
                reply_text: "sorry".into(),
                error: None,
                processed_at: now,
            },
            ProcessingResult {
                email_id: "2".into(),
                success: false,
                category: None,
                reply_text: String::new(),
                error: Some("timeout".into()),
                processed_at: now,
            },
        ];
        let summary = BatchSummary::from_results(&results);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.by_category["complaint"], 1);
        assert_eq!(summary.by_category["unknown"], 1);
    }

    #[test]
    fn result_serialization_omits_missing_error() {
        let result = ProcessingResult {
            email_id: "1".into(),
            success: true,
            category: Some(Category::SupportRequest),
            reply_text: "We opened a ticket.".into(),
            error: None,
            processed_at: Utc::now(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["category"], "support_request");
        assert!(json.get("error").is_none());
    }
}

//! Advisory text capabilities: ticket categorization and analytics summaries.
//!
//! Both are injected and best-effort. Callers bound every call with the
//! configured timeout and treat any failure as "no label" / "no summary".

use crate::error::{JurisdictionError, Result};

/// Labels a complaint with a category.
#[async_trait::async_trait]
pub trait TicketClassifier: Send + Sync {
    /// Return a category label for `text`, or `Unavailable`.
    async fn classify(&self, text: &str) -> Result<String>;
}

/// Produces a short narrative summary of a set of complaints.
#[async_trait::async_trait]
pub trait TicketSummarizer: Send + Sync {
    /// Summarize the given complaint descriptions, or `Unavailable`.
    async fn summarize(&self, descriptions: &[String]) -> Result<String>;
}

/// Classifier used when no categorization backend is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledClassifier;

#[async_trait::async_trait]
impl TicketClassifier for DisabledClassifier {
    async fn classify(&self, _text: &str) -> Result<String> {
        Err(JurisdictionError::Unavailable(
            "ticket classifier not configured".into(),
        ))
    }
}

/// Summarizer used when no summarization backend is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSummarizer;

#[async_trait::async_trait]
impl TicketSummarizer for DisabledSummarizer {
    async fn summarize(&self, _descriptions: &[String]) -> Result<String> {
        Err(JurisdictionError::Unavailable(
            "ticket summarizer not configured".into(),
        ))
    }
}

/// Complaint categories understood by the keyword classifier.
pub const CATEGORIES: [&str; 9] = [
    "Infrastructure",
    "Water",
    "Electricity",
    "Security",
    "Healthcare",
    "Education",
    "Waste Management",
    "Land Dispute",
    "Other",
];

const FALLBACK_CATEGORY: &str = "Other";

/// Offline classifier matching lowercase keywords.
///
/// Rules are checked in order; the first category with a matching keyword
/// wins. Text matching nothing is labelled "Other".
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    rules: Vec<(String, Vec<String>)>,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        let rules: [(&str, &[&str]); 8] = [
            ("Water", &["water", "tap", "pipe", "borehole", "flood"]),
            (
                "Electricity",
                &["electricity", "power", "blackout", "transformer", "outage"],
            ),
            (
                "Security",
                &["theft", "robbery", "security", "violence", "police"],
            ),
            (
                "Healthcare",
                &["clinic", "hospital", "health", "medicine", "nurse"],
            ),
            ("Education", &["school", "teacher", "classroom", "student"]),
            (
                "Waste Management",
                &["garbage", "waste", "rubbish", "trash", "sewage"],
            ),
            (
                "Land Dispute",
                &["land", "boundary", "plot", "title deed", "neighbour"],
            ),
            (
                "Infrastructure",
                &["road", "bridge", "pothole", "building", "drainage"],
            ),
        ];
        Self {
            rules: rules
                .into_iter()
                .map(|(category, words)| {
                    (
                        category.to_string(),
                        words.iter().map(|w| (*w).to_string()).collect(),
                    )
                })
                .collect(),
        }
    }
}

impl KeywordClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule checked after the existing ones.
    #[must_use]
    pub fn with_rule(mut self, category: impl Into<String>, keywords: &[&str]) -> Self {
        self.rules.push((
            category.into(),
            keywords.iter().map(|k| k.to_lowercase()).collect(),
        ));
        self
    }

    fn label(&self, text: &str) -> &str {
        let haystack = text.to_lowercase();
        self.rules
            .iter()
            .find(|(_, words)| words.iter().any(|w| haystack.contains(w.as_str())))
            .map_or(FALLBACK_CATEGORY, |(category, _)| category.as_str())
    }
}

#[async_trait::async_trait]
impl TicketClassifier for KeywordClassifier {
    async fn classify(&self, text: &str) -> Result<String> {
        Ok(self.label(text).to_string())
    }
}

use serde::Serialize;

use crate::Heading;

/// Result of harvesting a single URL. Serializes in the wire shape
/// `{"url", "status": "success", "headings"}` or `{"url", "status": "error", "error"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status")]
pub enum UrlOutcome {
    #[serde(rename = "success")]
    Success {
        #[serde(rename = "url")]
        resolved_url: String,
        headings: Vec<Heading>,
    },
    #[serde(rename = "error")]
    Failure {
        #[serde(rename = "url")]
        resolved_url: String,
        #[serde(rename = "error")]
        error_message: String,
    },
}

impl UrlOutcome {
    pub fn resolved_url(&self) -> &str {
        match self {
            UrlOutcome::Success { resolved_url, .. } | UrlOutcome::Failure { resolved_url, .. } => {
                resolved_url
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UrlOutcome::Success { .. })
    }

    /// Headings of a successful outcome, `None` for a failure.
    pub fn headings(&self) -> Option<&[Heading]> {
        match self {
            UrlOutcome::Success { headings, .. } => Some(headings),
            UrlOutcome::Failure { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            UrlOutcome::Success { .. } => None,
            UrlOutcome::Failure { error_message, .. } => Some(error_message),
        }
    }
}

/// One outcome per requested URL, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct HarvestResult {
    #[serde(rename = "results")]
    outcomes: Vec<UrlOutcome>,
}

impl HarvestResult {
    pub fn new(outcomes: Vec<UrlOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn outcomes(&self) -> &[UrlOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }
}

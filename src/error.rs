//! Error taxonomy of the assessment engine.

use crate::catalog::CatalogIssue;
use crate::models::{DimensionId, PromptId};

/// Errors raised by catalog loading, sessions and result assembly.
///
/// `InvalidCatalog` and `DimensionNotCovered` are authoring errors and are
/// raised by the load-time validation pass. `InvalidAnswer`,
/// `SessionComplete` and `SubmissionInFlight` are caller errors; the session
/// is left untouched when they occur. `InconsistentResult` is an internal
/// invariant violation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid catalog '{catalog}': {}", format_issues(.issues))]
    InvalidCatalog {
        catalog: String,
        issues: Vec<CatalogIssue>,
    },
    #[error("Invalid answer for prompt '{prompt}': {reason}")]
    InvalidAnswer { prompt: PromptId, reason: String },
    #[error("Session is complete; there is no current prompt")]
    SessionComplete,
    #[error("Session is not complete yet; answer the remaining prompts first")]
    SessionIncomplete,
    #[error("Dimension '{dimension}' is not covered by any answered prompt")]
    DimensionNotCovered { dimension: DimensionId },
    #[error("Inconsistent result: {0}")]
    InconsistentResult(String),
    #[error("Another answer for session '{session}' is still being applied")]
    SubmissionInFlight { session: String },
    #[error("Unknown catalog: {0}")]
    UnknownCatalog(String),
}

impl EngineError {
    pub(crate) fn invalid_answer(prompt: &PromptId, reason: impl Into<String>) -> Self {
        Self::InvalidAnswer {
            prompt: prompt.clone(),
            reason: reason.into(),
        }
    }

    /// Whether the caller can recover by re-prompting.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidAnswer { .. } | Self::SessionComplete | Self::SubmissionInFlight { .. }
        )
    }
}

fn format_issues(issues: &[CatalogIssue]) -> String {
    issues
        .iter()
        .map(|issue| issue.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

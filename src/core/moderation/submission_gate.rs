// Submission gate - translates moderation verdicts into write decisions.
//
// Route handlers call this before persisting a post, message, comment,
// profile field or service listing. The gate never stores anything itself.

use super::moderation_models::{Context, ModerationError, Severity};
use super::moderation_service::ModerationEngine;
use std::sync::Arc;

/// What the caller should do with a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionDecision {
    /// Clean content - store as submitted
    Publish { text: String },
    /// Store the filtered text and queue it for a moderator
    PublishFlagged {
        text: String,
        warnings: Vec<String>,
        severity: Severity,
    },
    /// Refuse the write
    Reject {
        reasons: Vec<String>,
        warnings: Vec<String>,
        severity: Severity,
    },
}

impl SubmissionDecision {
    pub fn is_rejected(&self) -> bool {
        matches!(self, SubmissionDecision::Reject { .. })
    }

    /// Text to persist, if the write goes ahead.
    pub fn text(&self) -> Option<&str> {
        match self {
            SubmissionDecision::Publish { text } => Some(text.as_str()),
            SubmissionDecision::PublishFlagged { text, .. } => Some(text.as_str()),
            SubmissionDecision::Reject { .. } => None,
        }
    }
}

pub struct SubmissionGate {
    engine: Arc<ModerationEngine>,
}

impl SubmissionGate {
    pub fn new(engine: Arc<ModerationEngine>) -> Self {
        Self { engine }
    }

    /// Review content submitted under a known context.
    pub fn review(&self, text: &str, context: Context) -> SubmissionDecision {
        let verdict = self.engine.moderate(text, context);

        if verdict.severity == Severity::Critical {
            tracing::warn!(
                context = %context,
                reasons = ?verdict.reasons,
                "Critical content held for safety review"
            );
        }

        if verdict.should_block {
            tracing::info!(
                context = %context,
                severity = %verdict.severity,
                "Submission rejected"
            );
            return SubmissionDecision::Reject {
                reasons: verdict.reasons,
                warnings: verdict.warnings,
                severity: verdict.severity,
            };
        }

        if !verdict.is_safe {
            return SubmissionDecision::PublishFlagged {
                text: verdict.filtered_text,
                warnings: verdict.warnings,
                severity: verdict.severity,
            };
        }

        SubmissionDecision::Publish {
            text: verdict.filtered_text,
        }
    }

    /// Review content tagged with a raw context string from the request.
    pub fn review_tagged(
        &self,
        text: &str,
        tag: &str,
    ) -> Result<SubmissionDecision, ModerationError> {
        let context: Context = tag.parse()?;
        Ok(self.review(text, context))
    }
}

// Moderation domain models - data structures for the content filter.
//
// These are pure domain types with no transport dependencies.
// The route layer decides what to do with a verdict (reject, store filtered, queue).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ModerationError {
    #[error("Unknown moderation context: {0:?}")]
    UnknownContext(String),
}

/// What kind of content is being checked.
///
/// The context only gates the fraud check; profanity and spam run everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Context {
    #[default]
    General,
    Post,
    Message,
    Comment,
    Profile,
    /// Marketplace / service listings
    Service,
}

impl Context {
    pub const ALL: [Context; 6] = [
        Context::General,
        Context::Post,
        Context::Message,
        Context::Comment,
        Context::Profile,
        Context::Service,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Context::General => "general",
            Context::Post => "post",
            Context::Message => "message",
            Context::Comment => "comment",
            Context::Profile => "profile",
            Context::Service => "service",
        }
    }

    /// Fraud patterns only apply where users can solicit each other directly.
    pub fn runs_fraud_check(&self) -> bool {
        matches!(self, Context::Message | Context::Service | Context::Comment)
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Context {
    type Err = ModerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        Context::ALL
            .into_iter()
            .find(|ctx| ctx.as_str().eq_ignore_ascii_case(tag))
            .ok_or_else(|| ModerationError::UnknownContext(s.to_string()))
    }
}

/// How serious a finding is. Ordering matters: `Low < Medium < High < Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Returns the higher of the two; severity never goes down within a call.
    pub fn raise(self, to: Severity) -> Severity {
        self.max(to)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(label)
    }
}

/// Result of one `moderate` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationVerdict {
    pub is_safe: bool,
    /// Blocking verdicts must not be persisted as-is
    pub should_block: bool,
    pub warnings: Vec<String>,
    pub reasons: Vec<String>,
    pub severity: Severity,
    /// Input with flagged terms censored (first letter kept)
    pub filtered_text: String,
}

impl ModerationVerdict {
    /// The default verdict: nothing found, text passed through unchanged.
    pub fn safe(text: &str) -> Self {
        Self {
            is_safe: true,
            should_block: false,
            warnings: Vec::new(),
            reasons: Vec::new(),
            severity: Severity::Low,
            filtered_text: text.to_string(),
        }
    }
}

/// Outcome of the profanity check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfanityMatch {
    pub found: bool,
    /// Matched spans of the normalized text, in discovery order
    pub matched_terms: Vec<String>,
}

/// A spam or fraud rule that fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternHit {
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_parsing() {
        assert_eq!("message".parse::<Context>().unwrap(), Context::Message);
        assert_eq!(" Service ".parse::<Context>().unwrap(), Context::Service);
        assert_eq!(
            "chat".parse::<Context>(),
            Err(ModerationError::UnknownContext("chat".to_string()))
        );
    }

    #[test]
    fn test_fraud_gating() {
        let gated: Vec<Context> = Context::ALL
            .into_iter()
            .filter(|c| c.runs_fraud_check())
            .collect();
        assert_eq!(
            gated,
            vec![Context::Message, Context::Comment, Context::Service]
        );
    }

    #[test]
    fn test_severity_never_lowers() {
        assert_eq!(Severity::High.raise(Severity::Medium), Severity::High);
        assert_eq!(Severity::Low.raise(Severity::Medium), Severity::Medium);
        assert_eq!(Severity::High.raise(Severity::Critical), Severity::Critical);
    }

    #[test]
    fn test_verdict_wire_format() {
        let verdict = ModerationVerdict::safe("merhaba");
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["isSafe"], true);
        assert_eq!(json["shouldBlock"], false);
        assert_eq!(json["severity"], "low");
        assert_eq!(json["filteredText"], "merhaba");
    }
}

// Content moderation for a community app: profanity, spam and fraud checks
// over user-submitted text.
//
// **Architecture Overview:**
// - `core/` = Business logic (rule tables, engine, submission gate)
// - `infra/` = Implementations of core traits (rule sources on disk)
//
// Route handlers build one `ModerationEngine` at start-up, wrap it in an
// `Arc`, and call `moderate` (or go through `SubmissionGate`) before writes.

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
pub mod core;
#[path = "infra/infra_layer.rs"]
pub mod infra;

pub use crate::core::moderation::{
    Context, ModerationEngine, ModerationError, ModerationVerdict, RuleError, RuleSource,
    RuleTable, Severity, SubmissionDecision, SubmissionGate,
};

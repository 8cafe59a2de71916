// Core moderation module - contains the content filter business logic.
// Following the same pattern as the other core modules.

pub mod moderation_models;
pub mod moderation_rules;
pub mod moderation_service;
pub mod submission_gate;
pub mod text_normalize;

pub use moderation_models::*;
pub use moderation_rules::{
    BuiltinRuleSource, PatternRuleSpec, RuleError, RuleSource, RuleTable, SpamRuleSpec,
};
pub use moderation_service::*;
pub use submission_gate::*;

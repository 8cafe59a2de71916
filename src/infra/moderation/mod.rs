pub mod json_rule_source;

pub use json_rule_source::JsonRuleSource;

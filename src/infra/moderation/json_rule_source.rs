use crate::core::moderation::{RuleError, RuleSource, RuleTable};
use async_trait::async_trait;
use std::path::PathBuf;

/// Rule table kept in a JSON file, so moderators can tune the lexicon
/// without a rebuild. Read once at start-up.
pub struct JsonRuleSource {
    path: PathBuf,
}

impl JsonRuleSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Write `table` as pretty JSON, replacing any existing file.
    pub async fn save(&self, table: &RuleTable) -> Result<(), RuleError> {
        let json = serde_json::to_vec_pretty(table)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl RuleSource for JsonRuleSource {
    async fn load(&self) -> Result<RuleTable, RuleError> {
        let bytes = tokio::fs::read(&self.path).await?;
        let table = serde_json::from_slice(&bytes)?;
        Ok(table)
    }

    fn describe(&self) -> String {
        format!("JSON file {}", self.path.display())
    }
}

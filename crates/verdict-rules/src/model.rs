use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use verdict_core::{DatasetSchema, Rule, RuleTarget};

/// Current rule-set contract version.
pub const RULESET_VERSION: &str = "0.1";

/// A batch of rules evaluated together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RuleSet {
    /// Contract version of this document.
    pub ruleset_version: String,
    pub rules: Vec<Rule>,
    /// Column types of target tables, used by lint and typed sources.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub datasets: Vec<DeclaredTable>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            ruleset_version: RULESET_VERSION.to_string(),
            rules,
            datasets: Vec::new(),
        }
    }

    /// Declared table matching the rule target, ignoring the column.
    pub fn declared_table(&self, target: &RuleTarget) -> Option<&DeclaredTable> {
        self.datasets.iter().find(|table| table.matches(target))
    }
}

/// Column types declared for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DeclaredTable {
    pub workspace_id: String,
    pub dataset_name: String,
    pub table_name: String,
    pub columns: DatasetSchema,
}

impl DeclaredTable {
    pub fn matches(&self, target: &RuleTarget) -> bool {
        self.workspace_id == target.workspace_id
            && self.dataset_name == target.dataset_name
            && self.table_name == target.table_name
    }
}

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Evaluation strategy applied by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    /// Null/blank detection on a column or across a whole row.
    Completeness,
    /// Magnitude bound on floating point values.
    Accuracy,
    /// Two-column equality (`left == right`).
    Consistency,
    /// Duplicate detection on a column.
    Uniqueness,
    /// Expression mini-language (`regex:`, `length:`, `in:`, `range:`).
    Validity,
    /// Extension point; records the expression without evaluating it.
    Custom,
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleCategory::Completeness => "completeness",
            RuleCategory::Accuracy => "accuracy",
            RuleCategory::Consistency => "consistency",
            RuleCategory::Uniqueness => "uniqueness",
            RuleCategory::Validity => "validity",
            RuleCategory::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Severity metadata; not consumed by the evaluator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RuleSeverity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// Dataset location a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RuleTarget {
    pub workspace_id: String,
    pub dataset_name: String,
    pub table_name: String,
    /// Column the rule inspects; empty or absent means "no column".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
}

impl RuleTarget {
    pub fn new(
        workspace_id: impl Into<String>,
        dataset_name: impl Into<String>,
        table_name: impl Into<String>,
    ) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            dataset_name: dataset_name.into(),
            table_name: table_name.into(),
            column_name: None,
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column_name = Some(column.into());
        self
    }

    /// Column name, treating an empty string as unset.
    pub fn column(&self) -> Option<&str> {
        self.column_name
            .as_deref()
            .filter(|column| !column.is_empty())
    }

    /// `workspace/dataset/table` path used in logs and messages.
    pub fn path(&self) -> String {
        format!(
            "{}/{}/{}",
            self.workspace_id, self.dataset_name, self.table_name
        )
    }
}

/// Declarative data-quality rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Rule {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub category: RuleCategory,
    pub target: RuleTarget,
    /// Category-dependent expression (validity mini-language, `a == b`, custom text).
    #[serde(default)]
    pub expression: String,
    /// Percentage for completeness, magnitude bound for accuracy.
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub severity: RuleSeverity,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Rule {
    pub fn new(id: impl Into<String>, category: RuleCategory, target: RuleTarget) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            category,
            target,
            expression: String::new(),
            threshold: 0.0,
            severity: RuleSeverity::default(),
            enabled: true,
        }
    }

    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = expression.into();
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn column(&self) -> Option<&str> {
        self.target.column()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_column_counts_as_unset() {
        let target = RuleTarget::new("ws", "sales", "orders").with_column("");
        assert_eq!(target.column(), None);
        let target = target.with_column("id");
        assert_eq!(target.column(), Some("id"));
    }

    #[test]
    fn deserializes_with_defaults() {
        let rule: Rule = serde_json::from_str(
            r#"{
                "id": "r1",
                "name": "orders complete",
                "category": "completeness",
                "target": {"workspace_id": "ws", "dataset_name": "sales", "table_name": "orders"}
            }"#,
        )
        .expect("parse rule");
        assert!(rule.enabled);
        assert_eq!(rule.severity, RuleSeverity::Medium);
        assert_eq!(rule.threshold, 0.0);
        assert!(rule.expression.is_empty());
        assert_eq!(rule.column(), None);
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Percentage of checked records that passed a completeness rule.
pub const COMPLETION_RATE: &str = "CompletionRate";
/// Number of distinct values seen by a uniqueness rule.
pub const UNIQUE_COUNT: &str = "UniqueCount";
/// Number of distinct values that occurred more than once.
pub const DUPLICATE_COUNT: &str = "DuplicateCount";
/// Raw validity expression, kept for traceability.
pub const VALIDATION_RULE: &str = "ValidationRule";
/// Raw custom expression.
pub const CUSTOM_EXPRESSION: &str = "CustomExpression";
pub const NOTE: &str = "Note";

pub const CUSTOM_NOTE: &str = "Custom rule execution requires expression evaluator";

/// Category-dependent metrics keyed by name.
pub type Metrics = BTreeMap<String, MetricValue>;

/// Metric payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Count(u64),
    Number(f64),
    Text(String),
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Count(value) => Some(*value as f64),
            MetricValue::Number(value) => Some(*value),
            MetricValue::Text(_) => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            MetricValue::Count(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetricValue::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricValue::Count(value) => write!(f, "{value}"),
            MetricValue::Number(value) => write!(f, "{value:.2}"),
            MetricValue::Text(value) => f.write_str(value),
        }
    }
}

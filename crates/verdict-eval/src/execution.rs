use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use verdict_core::{DataSource, Rule, RuleCategory};

use crate::engine::RuleEvaluator;
use crate::errors::EvalError;
use crate::metrics::Metrics;
use crate::model::Violation;
use crate::sampler::take_first;

/// Violations kept on a persisted execution record by default.
pub const DEFAULT_PERSISTED_VIOLATIONS: usize = 10;

/// Lifecycle state of a rule execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionDetails {
    /// First violations in row order, truncated for persistence.
    pub violations: Vec<Violation>,
    /// Violations produced before truncation.
    pub violations_total: u64,
    pub metrics: Metrics,
}

/// Persistable record of one rule run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleExecution {
    pub id: Uuid,
    pub rule_id: String,
    pub rule_name: String,
    pub category: RuleCategory,
    pub executed_at: DateTime<Utc>,
    pub status: ExecutionStatus,
    pub records_checked: u64,
    pub records_passed: u64,
    pub records_failed: u64,
    pub success_rate: f64,
    pub details: Option<ExecutionDetails>,
    pub error_message: Option<String>,
    pub duration_ms: u64,
}

impl RuleExecution {
    fn pending(rule: &Rule) -> Self {
        Self {
            id: Uuid::new_v4(),
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            category: rule.category,
            executed_at: Utc::now(),
            status: ExecutionStatus::Pending,
            records_checked: 0,
            records_passed: 0,
            records_failed: 0,
            success_rate: 0.0,
            details: None,
            error_message: None,
            duration_ms: 0,
        }
    }

    /// Details serialized as a JSON document, if present.
    pub fn details_json(&self) -> Result<Option<String>, EvalError> {
        self.details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(EvalError::from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionOptions {
    pub max_persisted_violations: usize,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            max_persisted_violations: DEFAULT_PERSISTED_VIOLATIONS,
        }
    }
}

/// Run one rule against `source` and capture the outcome as a record.
///
/// Never fails: disabled rules are `Skipped` without touching the source,
/// evaluation faults become `Failed` with the error message.
pub fn execute_rule(
    evaluator: &RuleEvaluator,
    rule: &Rule,
    source: &dyn DataSource,
    options: &ExecutionOptions,
) -> RuleExecution {
    let mut execution = RuleExecution::pending(rule);

    if !rule.enabled {
        info!(event = "rule_skipped", rule_id = %rule.id);
        execution.status = ExecutionStatus::Skipped;
        return execution;
    }

    info!(event = "rule_started", rule_id = %rule.id, category = %rule.category);
    execution.status = ExecutionStatus::Running;
    let start = Instant::now();

    match evaluator.evaluate_source(rule, source) {
        Ok(result) => {
            let violations_total = result.violations.len() as u64 + result.violations_omitted;
            execution.status = ExecutionStatus::Completed;
            execution.records_checked = result.records_checked;
            execution.records_passed = result.records_passed;
            execution.records_failed = result.records_failed;
            execution.success_rate = result.success_rate;
            execution.details = Some(ExecutionDetails {
                violations: take_first(&result.violations, options.max_persisted_violations),
                violations_total,
                metrics: result.metrics,
            });
        }
        Err(err) => {
            warn!(event = "rule_failed", rule_id = %rule.id, error = %err);
            execution.status = ExecutionStatus::Failed;
            execution.error_message = Some(err.to_string());
        }
    }

    execution.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        event = "rule_finished",
        rule_id = %rule.id,
        status = %execution.status,
        duration_ms = execution.duration_ms
    );
    execution
}

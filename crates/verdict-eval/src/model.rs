use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use verdict_core::{Record, RuleCategory};

use crate::metrics::Metrics;

/// Options for rule evaluation.
#[derive(Debug, Clone, Default)]
pub struct EvaluateOptions {
    /// Keep at most this many violations; later ones are counted, not stored.
    /// `None` keeps the complete list.
    pub max_violations: Option<usize>,
    /// Checked before each record; a cancelled token aborts the evaluation.
    pub cancellation: Option<CancellationToken>,
}

/// Cooperative cancellation flag shared between a caller and an evaluation.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// A record that failed its rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// 0-based position in the iterated row sequence.
    pub row_index: u64,
    /// Snapshot of the offending record.
    pub row_data: Record,
    pub message: String,
}

/// Outcome of evaluating one rule against one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub rule_id: String,
    pub category: RuleCategory,
    pub records_checked: u64,
    pub records_passed: u64,
    pub records_failed: u64,
    /// `100 * passed / checked`, or 0 for an empty dataset.
    pub success_rate: f64,
    /// Violations in increasing `row_index` order.
    pub violations: Vec<Violation>,
    /// Violations dropped by [`EvaluateOptions::max_violations`].
    #[serde(default, skip_serializing_if = "is_zero")]
    pub violations_omitted: u64,
    pub metrics: Metrics,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

use std::collections::HashSet;
use std::time::Instant;

use tracing::{debug, info, warn};
use verdict_core::{
    DataSource, Dataset, Expression, Record, Rule, RuleCategory, Value, ValueKey, equality_operands,
};

use crate::aggregate::{Tally, finalize};
use crate::errors::EvalError;
use crate::metrics::{
    COMPLETION_RATE, CUSTOM_EXPRESSION, CUSTOM_NOTE, DUPLICATE_COUNT, MetricValue, Metrics, NOTE,
    UNIQUE_COUNT, VALIDATION_RULE,
};
use crate::model::{EvaluateOptions, EvaluationResult};
use crate::sampler::ViolationLog;

/// Evaluate rules against datasets.
///
/// Stateless between calls; one evaluator can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct RuleEvaluator {
    options: EvaluateOptions,
}

impl RuleEvaluator {
    pub fn new(options: EvaluateOptions) -> Self {
        Self { options }
    }

    /// Fetch the rule's target from `source` and evaluate it.
    pub fn evaluate_source(
        &self,
        rule: &Rule,
        source: &dyn DataSource,
    ) -> Result<EvaluationResult, EvalError> {
        debug!(
            rule_id = %rule.id,
            source = source.name(),
            target = %rule.target.path(),
            "fetching dataset"
        );
        let dataset = source.fetch(&rule.target)?;
        self.evaluate(rule, dataset)
    }

    /// Make a single pass over `dataset` and compute the rule's verdict.
    pub fn evaluate(&self, rule: &Rule, dataset: Dataset<'_>) -> Result<EvaluationResult, EvalError> {
        let start = Instant::now();
        let Dataset {
            total_records,
            rows,
            ..
        } = dataset;

        let mut check = Check::prepare(rule);
        let mut tally = Tally::default();
        let mut log = ViolationLog::new(self.options.max_violations);

        for (row_index, row) in rows.enumerate() {
            if let Some(token) = &self.options.cancellation
                && token.is_cancelled()
            {
                return Err(EvalError::Cancelled {
                    rule_id: rule.id.clone(),
                    records_checked: tally.checked,
                });
            }

            let row = row?;
            tally.checked += 1;
            match check.inspect(&row) {
                Verdict::Pass => {}
                Verdict::Fail(message) => {
                    tally.failed += 1;
                    log.push(row_index as u64, row, message);
                }
                Verdict::Repeat => tally.failed += 1,
            }
        }

        if tally.checked != total_records {
            warn!(
                rule_id = %rule.id,
                reported = total_records,
                iterated = tally.checked,
                "record count reported by source differs from rows iterated"
            );
        }

        let metrics = check.metrics(&tally);
        let result = finalize(rule, tally, log, metrics);

        info!(
            rule_id = %rule.id,
            category = %rule.category,
            checked = result.records_checked,
            failed = result.records_failed,
            success_rate = result.success_rate,
            duration_ms = start.elapsed().as_millis() as u64,
            "rule evaluated"
        );

        Ok(result)
    }
}

/// Evaluate with default options.
pub fn evaluate(rule: &Rule, dataset: Dataset<'_>) -> Result<EvaluationResult, EvalError> {
    RuleEvaluator::default().evaluate(rule, dataset)
}

/// Per-record outcome.
enum Verdict {
    Pass,
    /// Failed; record a violation with this message.
    Fail(String),
    /// Failed; counted without a new violation entry.
    Repeat,
}

/// Category strategy prepared once per evaluation.
enum Check {
    RowCompleteness {
        threshold: f64,
    },
    ColumnCompleteness {
        column: String,
    },
    Uniqueness {
        column: Option<String>,
        seen: HashSet<ValueKey>,
        duplicates: HashSet<ValueKey>,
    },
    Validity {
        column: Option<String>,
        expression: Expression,
    },
    Accuracy {
        column: Option<String>,
        threshold: f64,
    },
    Consistency {
        /// `None` when the expression is not a `left == right` pair.
        columns: Option<(String, String)>,
    },
    Custom {
        expression: String,
    },
}

impl Check {
    fn prepare(rule: &Rule) -> Self {
        let column = rule.column().map(str::to_string);
        match rule.category {
            RuleCategory::Completeness => match column {
                Some(column) => Check::ColumnCompleteness { column },
                None => Check::RowCompleteness {
                    threshold: rule.threshold,
                },
            },
            RuleCategory::Uniqueness => Check::Uniqueness {
                column,
                seen: HashSet::new(),
                duplicates: HashSet::new(),
            },
            RuleCategory::Validity => Check::Validity {
                column,
                expression: Expression::parse(&rule.expression),
            },
            RuleCategory::Accuracy => Check::Accuracy {
                column,
                threshold: rule.threshold,
            },
            RuleCategory::Consistency => Check::Consistency {
                columns: equality_operands(&rule.expression),
            },
            RuleCategory::Custom => Check::Custom {
                expression: rule.expression.clone(),
            },
        }
    }

    fn inspect(&mut self, row: &Record) -> Verdict {
        match self {
            Check::RowCompleteness { threshold } => {
                if row.is_empty() {
                    return Verdict::Pass;
                }
                let blank = row.values().filter(|value| value.is_blank()).count();
                let completeness = 1.0 - blank as f64 / row.len() as f64;
                if completeness * 100.0 < *threshold {
                    Verdict::Fail(format!(
                        "Row completeness {:.2}% below threshold {}%",
                        completeness * 100.0,
                        threshold
                    ))
                } else {
                    Verdict::Pass
                }
            }
            Check::ColumnCompleteness { column } => match row.get(column.as_str()) {
                Some(value) if value.is_blank() => {
                    Verdict::Fail(format!("Column '{column}' is null or empty"))
                }
                _ => Verdict::Pass,
            },
            Check::Uniqueness {
                column,
                seen,
                duplicates,
            } => {
                let Some(value) = lookup(row, column) else {
                    return Verdict::Pass;
                };
                let key = value.key();
                if seen.contains(&key) {
                    if duplicates.insert(key) {
                        Verdict::Fail(format!("Duplicate value found: {value}"))
                    } else {
                        Verdict::Repeat
                    }
                } else {
                    seen.insert(key);
                    Verdict::Pass
                }
            }
            Check::Validity { column, expression } => match lookup(row, column) {
                Some(value) if !expression.accepts(value) => Verdict::Fail(format!(
                    "Value '{value}' does not match validation rule: {}",
                    expression.raw()
                )),
                _ => Verdict::Pass,
            },
            Check::Accuracy { column, threshold } => match lookup(row, column) {
                Some(Value::Float(number)) if number.abs() > *threshold => Verdict::Fail(format!(
                    "Value {number} exceeds accuracy threshold {threshold}"
                )),
                // Only floating point values are subject to the bound.
                _ => Verdict::Pass,
            },
            Check::Consistency { columns } => {
                let Some((left, right)) = columns else {
                    return Verdict::Pass;
                };
                match (row.get(left.as_str()), row.get(right.as_str())) {
                    (Some(left_value), Some(right_value))
                        if left_value.key() != right_value.key() =>
                    {
                        Verdict::Fail(format!(
                            "Inconsistency: {left}={left_value} != {right}={right_value}"
                        ))
                    }
                    _ => Verdict::Pass,
                }
            }
            Check::Custom { .. } => Verdict::Pass,
        }
    }

    fn metrics(&self, tally: &Tally) -> Metrics {
        let mut metrics = Metrics::new();
        match self {
            Check::RowCompleteness { .. } | Check::ColumnCompleteness { .. } => {
                metrics.insert(
                    COMPLETION_RATE.to_string(),
                    MetricValue::Number(crate::aggregate::success_rate(
                        tally.passed(),
                        tally.checked,
                    )),
                );
            }
            Check::Uniqueness {
                seen, duplicates, ..
            } => {
                metrics.insert(
                    UNIQUE_COUNT.to_string(),
                    MetricValue::Count(seen.len() as u64),
                );
                metrics.insert(
                    DUPLICATE_COUNT.to_string(),
                    MetricValue::Count(duplicates.len() as u64),
                );
            }
            Check::Validity { expression, .. } => {
                metrics.insert(
                    VALIDATION_RULE.to_string(),
                    MetricValue::Text(expression.raw().to_string()),
                );
            }
            Check::Custom { expression } => {
                metrics.insert(
                    CUSTOM_EXPRESSION.to_string(),
                    MetricValue::Text(expression.clone()),
                );
                metrics.insert(NOTE.to_string(), MetricValue::Text(CUSTOM_NOTE.to_string()));
            }
            Check::Accuracy { .. } | Check::Consistency { .. } => {}
        }
        metrics
    }
}

fn lookup<'r>(row: &'r Record, column: &Option<String>) -> Option<&'r Value> {
    column.as_deref().and_then(|column| row.get(column))
}

//! Rule evaluation engine for Verdict.
//!
//! Takes a [`verdict_core::Rule`] and a [`verdict_core::Dataset`], makes one
//! pass over the rows, and returns per-record pass/fail counts, a success
//! rate, violation examples and category-specific metrics.

pub mod aggregate;
pub mod engine;
pub mod errors;
pub mod execution;
pub mod metrics;
pub mod model;
pub mod report;
pub mod sampler;

pub use aggregate::success_rate;
pub use engine::{RuleEvaluator, evaluate};
pub use errors::EvalError;
pub use execution::{
    DEFAULT_PERSISTED_VIOLATIONS, ExecutionDetails, ExecutionOptions, ExecutionStatus,
    RuleExecution, execute_rule,
};
pub use metrics::{MetricValue, Metrics};
pub use model::{CancellationToken, EvaluateOptions, EvaluationResult, Violation};
pub use report::render_report;
pub use sampler::{ViolationLog, take_first};

//! Core contracts for Verdict.
//!
//! This crate defines the value model, rule definitions, the dataset handle
//! consumed by the evaluator, and the expression mini-language used by
//! validity rules.

pub mod dataset;
pub mod error;
pub mod expression;
pub mod rule;
pub mod value;

pub use dataset::{DataSource, Dataset, DatasetSchema, Record, RowStream, record};
pub use error::{Error, Result};
pub use expression::{Expression, LengthOp, PassReason, Predicate, equality_operands};
pub use rule::{Rule, RuleCategory, RuleSeverity, RuleTarget};
pub use value::{TIMESTAMP_FORMAT, Value, ValueKey, ValueKind};

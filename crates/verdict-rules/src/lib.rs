//! Rule-set contracts and validation for Verdict.
//!
//! A rule set is a JSON document listing rules and, optionally, the column
//! types of the tables they target. Validation runs in three steps: JSON
//! Schema check, typed parse, and lint.

pub mod errors;
pub mod model;
pub mod schema;
pub mod validate;

pub use errors::{IssueSeverity, Result, RulesError, ValidationIssue, ValidationReport};
pub use model::{DeclaredTable, RULESET_VERSION, RuleSet};
pub use schema::ruleset_json_schema;
pub use validate::{ValidatedRuleSet, lint_ruleset, load_ruleset, validate_ruleset_json};

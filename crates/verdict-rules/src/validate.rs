use std::collections::HashSet;

use jsonschema::JSONSchema;
use serde_json::Value;
use verdict_core::{Expression, Predicate, Rule, RuleCategory, ValueKind, equality_operands};

use crate::errors::{RulesError, ValidationIssue, ValidationReport};
use crate::model::{DeclaredTable, RULESET_VERSION, RuleSet};

/// Parsed rule set with lint warnings.
#[derive(Debug, Clone)]
pub struct ValidatedRuleSet {
    pub ruleset: RuleSet,
    pub warnings: Vec<ValidationIssue>,
}

/// Validate a rule-set JSON document against the rule-set JSON Schema.
pub fn validate_ruleset_json(
    ruleset_json: &Value,
    ruleset_schema: &Value,
) -> Result<ValidationReport, RulesError> {
    let compiled =
        JSONSchema::compile(ruleset_schema).map_err(|err| RulesError::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();
    if let Err(errors) = compiled.validate(ruleset_json) {
        for error in errors {
            let path = normalized_json_pointer(&error.instance_path.to_string());
            report.push(ValidationIssue::error(
                "schema_violation",
                path,
                error.to_string(),
            ));
        }
    }

    Ok(report)
}

/// Check a parsed rule set for mistakes the evaluator would silently accept.
///
/// The evaluator resolves malformed rules to a passing default; lint reports
/// each such case as a warning so authors see them before a run.
pub fn lint_ruleset(ruleset: &RuleSet) -> ValidationReport {
    let mut report = ValidationReport::default();

    if ruleset.ruleset_version != RULESET_VERSION {
        report.push(
            ValidationIssue::error(
                "ruleset_version_unsupported",
                "/ruleset_version",
                format!(
                    "ruleset_version '{}' is not supported",
                    ruleset.ruleset_version
                ),
            )
            .with_hint(format!("set ruleset_version to \"{RULESET_VERSION}\"")),
        );
    }

    lint_datasets(&ruleset.datasets, &mut report);

    if ruleset.rules.is_empty() {
        report.push(
            ValidationIssue::error("rules_empty", "/rules", "rule set has no rules")
                .with_hint("add at least one rule"),
        );
    }

    let mut seen_ids = HashSet::new();
    for (idx, rule) in ruleset.rules.iter().enumerate() {
        let base_path = format!("/rules/{idx}");
        if rule.id.trim().is_empty() {
            report.push(ValidationIssue::error(
                "rule_id_empty",
                format!("{base_path}/id"),
                "rule id must not be empty",
            ));
        } else if !seen_ids.insert(rule.id.as_str()) {
            report.push(
                ValidationIssue::error(
                    "duplicate_rule_id",
                    format!("{base_path}/id"),
                    format!("rule id '{}' is used more than once", rule.id),
                )
                .with_hint("give every rule a unique id"),
            );
        }

        if !rule.enabled {
            report.push(ValidationIssue::warning(
                "rule_disabled",
                &base_path,
                format!("rule '{}' is disabled and will be skipped", rule.id),
            ));
        }

        lint_rule(rule, &base_path, ruleset.declared_table(&rule.target), &mut report);
    }

    report
}

/// Validate the rule set end-to-end: structure, parse, then lint.
pub fn load_ruleset(
    ruleset_json: &Value,
    ruleset_schema: &Value,
) -> Result<ValidatedRuleSet, ValidationReport> {
    let structural = match validate_ruleset_json(ruleset_json, ruleset_schema) {
        Ok(report) => report,
        Err(err) => {
            let mut report = ValidationReport::default();
            report.push(ValidationIssue::error(
                "schema_validation_error",
                "/",
                err.to_string(),
            ));
            return Err(report);
        }
    };
    if !structural.is_ok() {
        return Err(structural);
    }

    let ruleset: RuleSet = match serde_json::from_value(ruleset_json.clone()) {
        Ok(ruleset) => ruleset,
        Err(err) => {
            let mut report = ValidationReport::default();
            report.push(ValidationIssue::error(
                "invalid_ruleset_json",
                "/",
                err.to_string(),
            ));
            return Err(report);
        }
    };

    let lint = lint_ruleset(&ruleset);
    if !lint.is_ok() {
        return Err(lint);
    }

    Ok(ValidatedRuleSet {
        ruleset,
        warnings: lint.warnings,
    })
}

fn lint_datasets(datasets: &[DeclaredTable], report: &mut ValidationReport) {
    let mut seen = HashSet::new();
    for (idx, table) in datasets.iter().enumerate() {
        let key = format!(
            "{}/{}/{}",
            table.workspace_id, table.dataset_name, table.table_name
        );
        if !seen.insert(key.clone()) {
            report.push(
                ValidationIssue::error(
                    "duplicate_declared_table",
                    format!("/datasets/{idx}"),
                    format!("table '{key}' is declared more than once"),
                )
                .with_hint("merge the column declarations into one entry"),
            );
        }
    }
}

fn lint_rule(
    rule: &Rule,
    base_path: &str,
    declared: Option<&DeclaredTable>,
    report: &mut ValidationReport,
) {
    let column_path = format!("{base_path}/target/column_name");
    let column = rule.column();

    if column.is_none()
        && matches!(
            rule.category,
            RuleCategory::Uniqueness | RuleCategory::Validity | RuleCategory::Accuracy
        )
    {
        report.push(
            ValidationIssue::warning(
                "column_missing",
                &column_path,
                format!(
                    "{} rule '{}' has no column; every record will pass",
                    rule.category, rule.id
                ),
            )
            .with_hint("set target.column_name"),
        );
    }

    if let (Some(column), Some(table)) = (column, declared) {
        check_declared_column(column, table, &column_path, report);
    }

    match rule.category {
        RuleCategory::Completeness => {
            if column.is_none() && !(0.0..=100.0).contains(&rule.threshold) {
                report.push(ValidationIssue::warning(
                    "threshold_out_of_range",
                    format!("{base_path}/threshold"),
                    format!(
                        "completeness threshold {} is outside 0..=100",
                        rule.threshold
                    ),
                ));
            }
        }
        RuleCategory::Accuracy => {
            if rule.threshold < 0.0 {
                report.push(ValidationIssue::warning(
                    "negative_threshold",
                    format!("{base_path}/threshold"),
                    format!(
                        "accuracy threshold {} is negative; every float value will fail",
                        rule.threshold
                    ),
                ));
            }
        }
        RuleCategory::Validity => {
            let expression = Expression::parse(&rule.expression);
            if let Some(reason) = expression.pass_reason() {
                report.push(
                    ValidationIssue::warning(
                        "expression_pass_through",
                        format!("{base_path}/expression"),
                        format!(
                            "expression '{}' accepts every value: {reason}",
                            rule.expression
                        ),
                    )
                    .with_hint("use regex:, length:, in: or range:"),
                );
            }
            let declared_kind = column
                .zip(declared)
                .and_then(|(column, table)| table.columns.get(column).map(|kind| (column, *kind)));
            if let Some((column, kind)) = declared_kind {
                let mismatch = match expression.predicate() {
                    Predicate::Range { .. } => !kind.is_numeric(),
                    Predicate::Regex(_) | Predicate::Length { .. } | Predicate::OneOf(_) => {
                        kind != ValueKind::Text
                    }
                    Predicate::PassThrough(_) => false,
                };
                if mismatch {
                    report.push(ValidationIssue::warning(
                        "expression_type_mismatch",
                        format!("{base_path}/expression"),
                        format!(
                            "expression '{}' on {kind} column '{column}' never fails a record",
                            rule.expression
                        ),
                    ));
                }
            }
        }
        RuleCategory::Consistency => match equality_operands(&rule.expression) {
            Some((left, right)) => {
                if let Some(table) = declared {
                    let expression_path = format!("{base_path}/expression");
                    check_declared_column(&left, table, &expression_path, report);
                    check_declared_column(&right, table, &expression_path, report);
                }
            }
            None => {
                report.push(
                    ValidationIssue::warning(
                        "consistency_expression_malformed",
                        format!("{base_path}/expression"),
                        format!(
                            "expression '{}' is not of the form 'left == right'; the rule is a no-op",
                            rule.expression
                        ),
                    )
                    .with_hint("write the expression as 'column_a == column_b'"),
                );
            }
        },
        RuleCategory::Custom => {
            report.push(ValidationIssue::warning(
                "custom_rule_stub",
                format!("{base_path}/expression"),
                format!(
                    "custom rule '{}' records its expression but checks no records",
                    rule.id
                ),
            ));
        }
        RuleCategory::Uniqueness => {}
    }
}

fn check_declared_column(
    column: &str,
    table: &DeclaredTable,
    path: &str,
    report: &mut ValidationReport,
) {
    if !table.columns.contains_key(column) {
        report.push(ValidationIssue::warning(
            "unknown_column",
            path,
            format!(
                "column '{column}' is not declared for table '{}.{}'",
                table.dataset_name, table.table_name
            ),
        ));
    }
}

fn normalized_json_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdict_core::{DatasetSchema, RuleTarget};

    fn target() -> RuleTarget {
        RuleTarget::new("ws", "demo", "users")
    }

    fn users_table() -> DeclaredTable {
        DeclaredTable {
            workspace_id: "ws".to_string(),
            dataset_name: "demo".to_string(),
            table_name: "users".to_string(),
            columns: DatasetSchema::from([
                ("Age".to_string(), ValueKind::Int),
                ("Name".to_string(), ValueKind::Text),
            ]),
        }
    }

    #[test]
    fn empty_ruleset_is_an_error() {
        let report = lint_ruleset(&RuleSet::new(Vec::new()));
        assert_eq!(report.codes(), vec!["rules_empty"]);
    }

    #[test]
    fn duplicate_ids_are_errors() {
        let rule = Rule::new("r1", RuleCategory::Completeness, target().with_column("Name"));
        let report = lint_ruleset(&RuleSet::new(vec![rule.clone(), rule]));
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].code, "duplicate_rule_id");
        assert_eq!(report.errors[0].path, "/rules/1/id");
    }

    #[test]
    fn permissive_defaults_are_reported_as_warnings() {
        let mut ruleset = RuleSet::new(vec![
            Rule::new("no_col", RuleCategory::Uniqueness, target()),
            Rule::new("bad_len", RuleCategory::Validity, target().with_column("Name"))
                .with_expression("length:abc"),
            Rule::new("cons", RuleCategory::Consistency, target()).with_expression("a != b"),
            Rule::new("custom", RuleCategory::Custom, target()),
            Rule::new("range_text", RuleCategory::Validity, target().with_column("Name"))
                .with_expression("range:1,2"),
            Rule::new("ghost", RuleCategory::Completeness, target().with_column("Ghost")),
            Rule::new("rows", RuleCategory::Completeness, target()).with_threshold(120.0),
            Rule::new("acc", RuleCategory::Accuracy, target().with_column("Age"))
                .with_threshold(-1.0),
        ]);
        ruleset.datasets.push(users_table());

        let report = lint_ruleset(&ruleset);
        assert!(report.is_ok(), "unexpected errors: {:?}", report.errors);
        assert_eq!(
            report.codes(),
            vec![
                "column_missing",
                "expression_pass_through",
                "consistency_expression_malformed",
                "custom_rule_stub",
                "expression_type_mismatch",
                "unknown_column",
                "threshold_out_of_range",
                "negative_threshold",
            ]
        );
    }

    #[test]
    fn well_formed_rules_lint_clean() {
        let mut ruleset = RuleSet::new(vec![
            Rule::new("age_range", RuleCategory::Validity, target().with_column("Age"))
                .with_expression("range:18,65"),
            Rule::new("name_present", RuleCategory::Completeness, target().with_column("Name")),
            Rule::new("same", RuleCategory::Consistency, target()).with_expression("Name == Name"),
        ]);
        ruleset.datasets.push(users_table());

        let report = lint_ruleset(&ruleset);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn unsupported_version_is_an_error() {
        let mut ruleset = RuleSet::new(vec![Rule::new(
            "r",
            RuleCategory::Completeness,
            target(),
        )]);
        ruleset.ruleset_version = "9.9".to_string();
        let report = lint_ruleset(&ruleset);
        assert_eq!(report.errors[0].code, "ruleset_version_unsupported");
    }
}

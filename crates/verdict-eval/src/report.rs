use crate::execution::{ExecutionStatus, RuleExecution};

const MAX_EXAMPLES_PER_RULE: usize = 3;

/// Render a deterministic markdown report for a batch of rule executions.
///
/// Rows follow the order of `executions`; nothing time-dependent besides the
/// recorded durations is emitted.
pub fn render_report(executions: &[RuleExecution]) -> String {
    let mut lines = Vec::new();

    lines.push("# Verdict Rule Report".to_string());
    lines.push(String::new());
    lines.push("## Run summary".to_string());
    lines.push(format!("- rules: {}", executions.len()));
    for status in [
        ExecutionStatus::Completed,
        ExecutionStatus::Failed,
        ExecutionStatus::Skipped,
    ] {
        let count = executions
            .iter()
            .filter(|execution| execution.status == status)
            .count();
        lines.push(format!("- {status}: {count}"));
    }
    let checked: u64 = executions.iter().map(|e| e.records_checked).sum();
    let failed: u64 = executions.iter().map(|e| e.records_failed).sum();
    lines.push(format!("- records_checked: {checked}"));
    lines.push(format!("- records_failed: {failed}"));
    lines.push(String::new());

    lines.push("## Rules".to_string());
    lines.push("| rule | category | status | checked | passed | failed | success_rate |".to_string());
    lines.push("| --- | --- | --- | --- | --- | --- | --- |".to_string());
    for execution in executions {
        lines.push(format!(
            "| {} | {} | {} | {} | {} | {} | {:.2}% |",
            execution.rule_id,
            execution.category,
            execution.status,
            execution.records_checked,
            execution.records_passed,
            execution.records_failed,
            execution.success_rate
        ));
    }
    lines.push(String::new());

    let with_violations = executions
        .iter()
        .filter_map(|execution| {
            execution
                .details
                .as_ref()
                .filter(|details| !details.violations.is_empty())
                .map(|details| (execution, details))
        })
        .collect::<Vec<_>>();
    if !with_violations.is_empty() {
        lines.push("## Top violations".to_string());
        for (execution, details) in with_violations {
            lines.push(format!(
                "### {} ({} total)",
                execution.rule_id, details.violations_total
            ));
            for violation in details.violations.iter().take(MAX_EXAMPLES_PER_RULE) {
                lines.push(format!("- row {}: {}", violation.row_index, violation.message));
            }
        }
        lines.push(String::new());
    }

    let with_metrics = executions
        .iter()
        .filter_map(|execution| {
            execution
                .details
                .as_ref()
                .filter(|details| !details.metrics.is_empty())
                .map(|details| (execution, details))
        })
        .collect::<Vec<_>>();
    if !with_metrics.is_empty() {
        lines.push("## Metrics".to_string());
        for (execution, details) in with_metrics {
            let rendered = details
                .metrics
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!("- {}: {}", execution.rule_id, rendered));
        }
        lines.push(String::new());
    }

    let failures = executions
        .iter()
        .filter(|execution| execution.status == ExecutionStatus::Failed)
        .collect::<Vec<_>>();
    if !failures.is_empty() {
        lines.push("## Failures".to_string());
        for execution in &failures {
            lines.push(format!(
                "- {}: {}",
                execution.rule_id,
                execution.error_message.as_deref().unwrap_or("unknown error")
            ));
        }
        lines.push(String::new());
    }

    lines.push("## Recommendations".to_string());
    lines.extend(recommendations(executions));
    lines.join("\n")
}

fn recommendations(executions: &[RuleExecution]) -> Vec<String> {
    let mut lines = Vec::new();
    if executions
        .iter()
        .any(|execution| execution.status == ExecutionStatus::Failed)
    {
        lines.push("- check data source connectivity for failed rules and re-run.".to_string());
    }
    if executions
        .iter()
        .any(|execution| execution.status == ExecutionStatus::Skipped)
    {
        lines.push("- skipped rules are disabled; enable them to include their checks.".to_string());
    }
    if executions.iter().any(|execution| {
        execution.status == ExecutionStatus::Completed
            && execution.records_checked > 0
            && execution.records_failed > 0
    }) {
        lines.push("- inspect top violations and fix the upstream data or the rule.".to_string());
    }
    if executions
        .iter()
        .all(|execution| execution.records_failed == 0)
    {
        lines.push("- no violations detected; compare success rates across runs for drift.".to_string());
    }
    lines
}

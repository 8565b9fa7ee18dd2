use verdict_core::Rule;

use crate::metrics::Metrics;
use crate::model::EvaluationResult;
use crate::sampler::ViolationLog;

/// Running counters for one evaluation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub checked: u64,
    pub failed: u64,
}

impl Tally {
    pub fn passed(&self) -> u64 {
        self.checked.saturating_sub(self.failed)
    }
}

/// Percentage of passed records, 0 when nothing was checked.
pub fn success_rate(passed: u64, checked: u64) -> f64 {
    if checked == 0 {
        return 0.0;
    }
    100.0 * passed as f64 / checked as f64
}

/// Build the final result from the accumulated pass state.
pub fn finalize(rule: &Rule, tally: Tally, log: ViolationLog, metrics: Metrics) -> EvaluationResult {
    let records_passed = tally.passed();
    let (violations, violations_omitted) = log.into_parts();

    EvaluationResult {
        rule_id: rule.id.clone(),
        category: rule.category,
        records_checked: tally.checked,
        records_passed,
        records_failed: tally.failed,
        success_rate: success_rate(records_passed, tally.checked),
        violations,
        violations_omitted,
        metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_rate_handles_empty_and_partial() {
        assert_eq!(success_rate(0, 0), 0.0);
        assert_eq!(success_rate(90, 100), 90.0);
        assert_eq!(success_rate(3, 3), 100.0);
        assert_eq!(success_rate(0, 7), 0.0);
    }
}

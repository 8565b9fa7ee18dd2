use thiserror::Error;

/// Errors emitted by the evaluation engine.
///
/// Malformed rule expressions are never errors; they resolve to a passing
/// default. Only dataset access faults and cancellation abort an evaluation.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Dataset access failed; the source error is passed through unchanged.
    #[error(transparent)]
    Source(#[from] verdict_core::Error),
    #[error("evaluation of rule '{rule_id}' cancelled after {records_checked} record(s)")]
    Cancelled { rule_id: String, records_checked: u64 },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

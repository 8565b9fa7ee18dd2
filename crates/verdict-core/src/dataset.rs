use std::collections::BTreeMap;

use crate::error::Result;
use crate::rule::RuleTarget;
use crate::value::{Value, ValueKind};

/// One row of a dataset, keyed by column name.
pub type Record = BTreeMap<String, Value>;

/// Declared column types; advisory, evaluation reads runtime value types.
pub type DatasetSchema = BTreeMap<String, ValueKind>;

/// Single-pass row sequence; row-level faults are surfaced as `Err` items.
pub type RowStream<'a> = Box<dyn Iterator<Item = Result<Record>> + Send + 'a>;

/// Rows plus metadata for one rule evaluation.
pub struct Dataset<'a> {
    /// Record count reported by the source.
    pub total_records: u64,
    pub schema: DatasetSchema,
    pub rows: RowStream<'a>,
}

impl Dataset<'static> {
    /// Build a dataset from already-materialized rows.
    pub fn from_records(schema: DatasetSchema, records: Vec<Record>) -> Self {
        Self {
            total_records: records.len() as u64,
            schema,
            rows: Box::new(records.into_iter().map(Ok)),
        }
    }

    pub fn empty() -> Self {
        Self::from_records(DatasetSchema::new(), Vec::new())
    }
}

impl<'a> Dataset<'a> {
    pub fn new(total_records: u64, schema: DatasetSchema, rows: RowStream<'a>) -> Self {
        Self {
            total_records,
            schema,
            rows,
        }
    }
}

impl std::fmt::Debug for Dataset<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("total_records", &self.total_records)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Dataset access capability consumed by the evaluator.
///
/// Implementations own connection management; the evaluator only iterates
/// the returned rows once and propagates any error unchanged.
pub trait DataSource: Send + Sync {
    /// Short identifier of the backend (e.g. `mock`, `csv`).
    fn name(&self) -> &'static str;

    /// Materialize (or open a stream over) the rows addressed by `target`.
    fn fetch(&self, target: &RuleTarget) -> Result<Dataset<'_>>;
}

/// Build a record from `(column, value)` pairs.
pub fn record<K, V, I>(pairs: I) -> Record
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

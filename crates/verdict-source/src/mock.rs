use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use verdict_core::{DataSource, Dataset, DatasetSchema, Record, Result, RuleTarget, Value, ValueKind};

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 42;

const DEFAULT_ROWS: u64 = 100;

/// Deterministic synthetic dataset for demos and tests.
///
/// Every fetch regenerates the same rows from the configured seed, whatever
/// the target: `Id` (1-based), `Name` (null every 10th row), `Email` (null
/// every 15th row), `Age` in 18..80, `Score` in 0..100 and `Status`
/// (`Active` every 5th row, `Inactive` otherwise).
#[derive(Debug, Clone)]
pub struct MockSource {
    seed: u64,
    rows: u64,
}

impl MockSource {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rows: DEFAULT_ROWS,
        }
    }

    pub fn with_rows(mut self, rows: u64) -> Self {
        self.rows = rows;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn schema() -> DatasetSchema {
        DatasetSchema::from([
            ("Id".to_string(), ValueKind::Int),
            ("Name".to_string(), ValueKind::Text),
            ("Email".to_string(), ValueKind::Text),
            ("Age".to_string(), ValueKind::Int),
            ("Score".to_string(), ValueKind::Float),
            ("Status".to_string(), ValueKind::Text),
        ])
    }

    /// Materialize the fixture rows.
    pub fn records(&self) -> Vec<Record> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        (1..=self.rows as i64)
            .map(|id| generate_row(id, &mut rng))
            .collect()
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl DataSource for MockSource {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn fetch(&self, target: &RuleTarget) -> Result<Dataset<'_>> {
        debug!(
            target = %target.path(),
            seed = self.seed,
            rows = self.rows,
            "generating mock dataset"
        );
        Ok(Dataset::from_records(Self::schema(), self.records()))
    }
}

fn generate_row(id: i64, rng: &mut impl Rng) -> Record {
    let name = if id % 10 == 0 {
        Value::Null
    } else {
        Value::Text(format!("User{id}"))
    };
    let email = if id % 15 == 0 {
        Value::Null
    } else {
        Value::Text(format!("user{id}@example.com"))
    };
    let status = if id % 5 == 0 { "Active" } else { "Inactive" };

    Record::from([
        ("Id".to_string(), Value::Int(id)),
        ("Name".to_string(), name),
        ("Email".to_string(), email),
        ("Age".to_string(), Value::Int(rng.random_range(18..80))),
        ("Score".to_string(), Value::Float(rng.random::<f64>() * 100.0)),
        ("Status".to_string(), Value::from(status)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> RuleTarget {
        RuleTarget::new("ws", "demo", "users")
    }

    #[test]
    fn same_seed_yields_same_rows() {
        let a = MockSource::new(7).records();
        let b = MockSource::new(7).records();
        assert_eq!(a, b);

        let c = MockSource::new(8).records();
        assert_ne!(a, c);
    }

    #[test]
    fn fixture_shape() {
        let source = MockSource::default();
        let dataset = source.fetch(&target()).expect("fetch mock");
        assert_eq!(dataset.total_records, 100);
        assert_eq!(dataset.schema.len(), 6);
        assert_eq!(dataset.schema.get("Score"), Some(&ValueKind::Float));

        let rows = dataset.rows.collect::<Result<Vec<_>>>().expect("rows");
        assert_eq!(rows.len(), 100);

        let first = &rows[0];
        assert_eq!(first.get("Id"), Some(&Value::Int(1)));
        assert_eq!(first.get("Name"), Some(&Value::from("User1")));
        assert_eq!(first.get("Email"), Some(&Value::from("user1@example.com")));
        assert_eq!(first.get("Status"), Some(&Value::from("Inactive")));

        assert_eq!(rows[9].get("Name"), Some(&Value::Null));
        assert_eq!(rows[14].get("Email"), Some(&Value::Null));
        assert_eq!(rows[4].get("Status"), Some(&Value::from("Active")));

        let null_names = rows
            .iter()
            .filter(|row| row.get("Name").is_some_and(Value::is_null))
            .count();
        assert_eq!(null_names, 10);

        for row in &rows {
            match row.get("Age") {
                Some(Value::Int(age)) => assert!((18..80).contains(age)),
                other => panic!("unexpected age {other:?}"),
            }
            match row.get("Score") {
                Some(Value::Float(score)) => assert!((0.0..100.0).contains(score)),
                other => panic!("unexpected score {other:?}"),
            }
        }
    }

    #[test]
    fn row_count_is_configurable() {
        let source = MockSource::new(1).with_rows(3);
        assert_eq!(source.records().len(), 3);
    }
}

use std::collections::HashMap;

use verdict_core::{DataSource, Dataset, DatasetSchema, Error, Record, Result, RuleTarget};

#[derive(Debug, Clone)]
struct StoredTable {
    schema: DatasetSchema,
    records: Vec<Record>,
}

/// Data source over tables held in memory; rows are cloned per fetch.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    tables: HashMap<String, StoredTable>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        workspace_id: &str,
        dataset_name: &str,
        table_name: &str,
        schema: DatasetSchema,
        records: Vec<Record>,
    ) {
        self.tables.insert(
            table_key(workspace_id, dataset_name, table_name),
            StoredTable { schema, records },
        );
    }

    /// Builder form of [`InMemorySource::insert`].
    pub fn with_table(
        mut self,
        workspace_id: &str,
        dataset_name: &str,
        table_name: &str,
        schema: DatasetSchema,
        records: Vec<Record>,
    ) -> Self {
        self.insert(workspace_id, dataset_name, table_name, schema, records);
        self
    }
}

impl DataSource for InMemorySource {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn fetch(&self, target: &RuleTarget) -> Result<Dataset<'_>> {
        let key = table_key(
            &target.workspace_id,
            &target.dataset_name,
            &target.table_name,
        );
        let table = self
            .tables
            .get(&key)
            .ok_or_else(|| Error::NotFound(format!("table '{key}' is not loaded")))?;

        Ok(Dataset::new(
            table.records.len() as u64,
            table.schema.clone(),
            Box::new(table.records.iter().cloned().map(Ok)),
        ))
    }
}

fn table_key(workspace_id: &str, dataset_name: &str, table_name: &str) -> String {
    format!("{workspace_id}/{dataset_name}/{table_name}")
}

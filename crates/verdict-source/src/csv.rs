use std::collections::HashMap;
use std::fs::{File, create_dir_all};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use verdict_core::{
    DataSource, Dataset, DatasetSchema, Error, Record, Result, RuleTarget, TIMESTAMP_FORMAT, Value,
    ValueKind,
};

/// Data source reading `<root>/<dataset>/<table>.csv`.
///
/// Columns with a declared type are parsed strictly and a bad cell fails the
/// row stream. Undeclared columns get one type each, inferred from all of
/// their cells: a mix of integers and floats reads as float, any other mix
/// reads as text. Text cells keep their surrounding whitespace.
#[derive(Debug, Clone)]
pub struct CsvSource {
    root: PathBuf,
    schemas: HashMap<String, DatasetSchema>,
}

impl CsvSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            schemas: HashMap::new(),
        }
    }

    /// Declare column types for one table.
    pub fn with_schema(mut self, dataset_name: &str, table_name: &str, schema: DatasetSchema) -> Self {
        self.schemas
            .insert(table_key(dataset_name, table_name), schema);
        self
    }

    pub fn table_path(&self, dataset_name: &str, table_name: &str) -> PathBuf {
        self.root
            .join(dataset_name)
            .join(format!("{table_name}.csv"))
    }
}

impl DataSource for CsvSource {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn fetch(&self, target: &RuleTarget) -> Result<Dataset<'_>> {
        let path = self.table_path(&target.dataset_name, &target.table_name);
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "dataset file not found: {}",
                path.display()
            )));
        }

        let declared = self
            .schemas
            .get(&table_key(&target.dataset_name, &target.table_name))
            .cloned()
            .unwrap_or_default();

        let scan = scan_table(&path, &declared)?;
        debug!(
            path = %path.display(),
            records = scan.total_records,
            columns = scan.headers.len(),
            "csv table scanned"
        );

        let reader = open_reader(&path)?;
        let headers = scan.headers;
        let column_kinds = headers
            .iter()
            .map(|header| scan.schema.get(header).copied())
            .collect::<Vec<_>>();

        let rows = reader
            .into_records()
            .enumerate()
            .map(move |(row_idx, result)| {
                let record = result.map_err(|err| Error::InvalidDataset(err.to_string()))?;
                let mut row = Record::new();
                for (col_idx, header) in headers.iter().enumerate() {
                    let raw = record.get(col_idx).unwrap_or_default();
                    let value = parse_cell(column_kinds[col_idx], raw).map_err(|message| {
                        Error::InvalidDataset(format!(
                            "{} row {}: {}",
                            header,
                            row_idx + 1,
                            message
                        ))
                    })?;
                    row.insert(header.clone(), value);
                }
                Ok(row)
            });

        Ok(Dataset::new(scan.total_records, scan.schema, Box::new(rows)))
    }
}

struct TableScan {
    headers: Vec<String>,
    total_records: u64,
    schema: DatasetSchema,
}

/// First pass: count rows and settle the type of every undeclared column.
fn scan_table(path: &Path, declared: &DatasetSchema) -> Result<TableScan> {
    let mut reader = open_reader(path)?;
    let headers = reader
        .headers()
        .map_err(|err| Error::InvalidDataset(err.to_string()))?
        .iter()
        .map(|header| header.trim().to_string())
        .collect::<Vec<_>>();

    let mut schema = DatasetSchema::new();
    let mut undeclared = Vec::new();
    for (col_idx, header) in headers.iter().enumerate() {
        match declared.get(header) {
            Some(kind) => {
                schema.insert(header.clone(), *kind);
            }
            None => undeclared.push(col_idx),
        }
    }
    for column in declared.keys() {
        if !headers.contains(column) {
            warn!(path = %path.display(), column = %column, "declared column missing from csv");
        }
    }

    let mut total_records = 0u64;
    for result in reader.records() {
        let record = result.map_err(|err| Error::InvalidDataset(err.to_string()))?;
        total_records += 1;
        for &col_idx in &undeclared {
            let Some(kind) = record.get(col_idx).and_then(|raw| infer_value(raw).kind()) else {
                continue;
            };
            let header = &headers[col_idx];
            let merged = match schema.get(header) {
                Some(current) => widen(*current, kind),
                None => kind,
            };
            schema.insert(header.clone(), merged);
        }
    }

    Ok(TableScan {
        headers,
        total_records,
        schema,
    })
}

fn open_reader(path: &Path) -> Result<::csv::Reader<File>> {
    ::csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|err| Error::DataSource(format!("{}: {}", path.display(), err)))
}

/// Common type of two inferred cell types.
fn widen(current: ValueKind, next: ValueKind) -> ValueKind {
    match (current, next) {
        (current, next) if current == next => current,
        (ValueKind::Int, ValueKind::Float) | (ValueKind::Float, ValueKind::Int) => ValueKind::Float,
        _ => ValueKind::Text,
    }
}

fn parse_cell(kind: Option<ValueKind>, raw: &str) -> std::result::Result<Value, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        return Ok(Value::Null);
    }

    // Only all-null columns have no type.
    let Some(kind) = kind else {
        return Ok(Value::Text(raw.to_string()));
    };

    match kind {
        ValueKind::Int => trimmed
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| format!("invalid integer '{trimmed}'")),
        ValueKind::Float => parse_float(trimmed)
            .map(Value::Float)
            .ok_or_else(|| format!("invalid float '{trimmed}'")),
        ValueKind::Bool => parse_bool(trimmed)
            .map(Value::Bool)
            .ok_or_else(|| format!("invalid boolean '{trimmed}'")),
        ValueKind::Timestamp => NaiveDateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT)
            .map(Value::Timestamp)
            .map_err(|_| format!("invalid timestamp '{trimmed}'")),
        ValueKind::Text => Ok(Value::Text(raw.to_string())),
    }
}

fn infer_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    if is_plain_number(trimmed) {
        if !trimmed.contains(['.', 'e', 'E'])
            && let Ok(value) = trimmed.parse::<i64>()
        {
            return Value::Int(value);
        }
        if let Some(value) = parse_float(trimmed) {
            return Value::Float(value);
        }
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(value) = NaiveDateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT) {
        return Value::Timestamp(value);
    }
    Value::Text(raw.to_string())
}

/// Finite float written with digits; rejects `nan`, `inf` and friends.
fn parse_float(text: &str) -> Option<f64> {
    if !text.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Decimal literal without a leading zero, so codes like `01234` stay text.
fn is_plain_number(text: &str) -> bool {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    let integral = unsigned
        .split(['.', 'e', 'E'])
        .next()
        .unwrap_or_default();
    unsigned.chars().any(|c| c.is_ascii_digit())
        && unsigned
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        && !(integral.len() > 1 && integral.starts_with('0'))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "t" | "1" => Some(true),
        "false" | "f" | "0" => Some(false),
        _ => None,
    }
}

/// Write records as CSV with columns in schema order (falling back to the
/// first record's columns). Returns the number of rows written.
pub fn write_csv(path: &Path, schema: &DatasetSchema, records: &[Record]) -> Result<u64> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }

    let columns = if schema.is_empty() {
        records
            .first()
            .map(|record| record.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default()
    } else {
        schema.keys().cloned().collect::<Vec<_>>()
    };

    let file = BufWriter::new(File::create(path)?);
    let mut writer = ::csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    let to_error = |err: ::csv::Error| Error::DataSource(err.to_string());

    writer.write_record(&columns).map_err(to_error)?;
    for record in records {
        let cells = columns
            .iter()
            .map(|column| record.get(column).map(csv_cell).unwrap_or_default())
            .collect::<Vec<_>>();
        writer.write_record(&cells).map_err(to_error)?;
    }
    writer.flush()?;

    Ok(records.len() as u64)
}

fn csv_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        // Debug keeps a trailing `.0` so floats are not re-read as integers.
        Value::Float(value) => format!("{value:?}"),
        other => other.to_string(),
    }
}

fn table_key(dataset_name: &str, table_name: &str) -> String {
    format!("{dataset_name}/{table_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_declared_cells() {
        assert_eq!(parse_cell(Some(ValueKind::Int), " 42 "), Ok(Value::Int(42)));
        assert_eq!(parse_cell(Some(ValueKind::Float), "1"), Ok(Value::Float(1.0)));
        assert_eq!(parse_cell(Some(ValueKind::Bool), "t"), Ok(Value::Bool(true)));
        assert_eq!(parse_cell(Some(ValueKind::Text), "NULL"), Ok(Value::Null));
        assert!(parse_cell(Some(ValueKind::Int), "forty").is_err());
    }

    #[test]
    fn infers_undeclared_cells() {
        assert_eq!(infer_value("7"), Value::Int(7));
        assert_eq!(infer_value("7.0"), Value::Float(7.0));
        assert_eq!(infer_value("TRUE"), Value::Bool(true));
        assert_eq!(infer_value("1"), Value::Int(1));
        assert!(matches!(infer_value("2024-01-02T03:04:05"), Value::Timestamp(_)));
        assert_eq!(infer_value(" Active "), Value::from(" Active "));
        assert_eq!(infer_value(" 12 "), Value::Int(12));
        assert_eq!(infer_value(""), Value::Null);
    }

    #[test]
    fn non_numeric_spellings_stay_text() {
        assert_eq!(infer_value("Nan"), Value::from("Nan"));
        assert_eq!(infer_value("Infinity"), Value::from("Infinity"));
        assert_eq!(infer_value("-inf"), Value::from("-inf"));
        assert_eq!(infer_value("01234"), Value::from("01234"));
        assert_eq!(infer_value("0"), Value::Int(0));
        assert_eq!(infer_value("-0.5"), Value::Float(-0.5));
        assert_eq!(infer_value("1e3"), Value::Float(1000.0));
        assert!(parse_cell(Some(ValueKind::Float), "NaN").is_err());
    }

    #[test]
    fn mixed_columns_widen() {
        assert_eq!(widen(ValueKind::Int, ValueKind::Float), ValueKind::Float);
        assert_eq!(widen(ValueKind::Int, ValueKind::Int), ValueKind::Int);
        assert_eq!(widen(ValueKind::Float, ValueKind::Text), ValueKind::Text);
        assert_eq!(widen(ValueKind::Bool, ValueKind::Int), ValueKind::Text);
    }

    #[test]
    fn float_cells_keep_decimal_point() {
        assert_eq!(csv_cell(&Value::Float(50.0)), "50.0");
        assert_eq!(csv_cell(&Value::Null), "");
    }
}

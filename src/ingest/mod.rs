//! CSV-to-table ingestion driven by declared column mappings.
//!
//! Each dataset lists the source headers it understands, the target column
//! each one feeds, and how the cell is coerced. Headers are checked before the
//! first insert; a bad cell aborts the rest of its file.

pub mod financial;
pub mod tourism;

use crate::error::{Result, WarehouseError};
use crate::schema::Table;
use crate::warehouse::{Session, SqlValue};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, info_span, warn, Instrument};

/// How a source cell becomes a bound value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Trimmed string; empty is NULL.
    Text,
    /// Whole number; empty is an error.
    Integer,
    /// Float; empty is an error.
    Float,
    /// Float; empty or a not-available marker is NULL.
    NullableFloat,
    /// "yes" in any casing is true, anything else false.
    YesNo,
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub source: &'static str,
    pub target: &'static str,
    pub kind: ColumnKind,
    /// Required headers must be present; optional ones become NULL when absent.
    pub required: bool,
}

/// A declared mapping from one CSV layout to one table.
#[derive(Debug, Clone, Copy)]
pub struct Dataset {
    pub name: &'static str,
    pub table: Table,
    pub columns: &'static [ColumnSpec],
}

impl Dataset {
    pub fn target_columns(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.target).collect()
    }

    pub fn insert_statement(&self) -> String {
        self.table.insert_statement(&self.target_columns())
    }

    /// Position of each declared column in `headers`, or `None` for an
    /// absent optional column.
    pub fn resolve(&self, headers: &StringRecord) -> std::result::Result<Vec<Option<usize>>, String> {
        let find = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));

        let mut missing = Vec::new();
        let plan: Vec<Option<usize>> = self
            .columns
            .iter()
            .map(|spec| {
                let idx = find(spec.source);
                if idx.is_none() && spec.required {
                    missing.push(spec.source);
                }
                idx
            })
            .collect();
        if !missing.is_empty() {
            return Err(format!("missing required columns: {}", missing.join(", ")));
        }
        Ok(plan)
    }

    /// Headers the mapping does not know about.
    pub fn unknown_headers<'h>(&self, headers: &'h StringRecord) -> Vec<&'h str> {
        headers
            .iter()
            .filter(|h| {
                !h.trim().is_empty()
                    && !self
                        .columns
                        .iter()
                        .any(|spec| h.trim().eq_ignore_ascii_case(spec.source))
            })
            .collect()
    }

    /// Coerce one record into insert parameters, in declared column order.
    pub fn coerce(
        &self,
        plan: &[Option<usize>],
        record: &StringRecord,
    ) -> std::result::Result<Vec<SqlValue>, String> {
        self.columns
            .iter()
            .zip(plan)
            .map(|(spec, idx)| {
                // Short rows read as empty trailing cells.
                let raw = idx.map(|i| record.get(i).unwrap_or(""));
                coerce(spec.kind, raw).map_err(|msg| format!("column '{}': {}", spec.source, msg))
            })
            .collect()
    }
}

/// Case-insensitive "yes" check; every other value, including empty, is false.
pub fn parse_bool(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("yes")
}

const NOT_AVAILABLE: [&str; 6] = ["", "na", "n/a", "nan", "null", "-"];

/// Coerce a raw cell. `None` means the column is absent from the file.
pub fn coerce(kind: ColumnKind, raw: Option<&str>) -> std::result::Result<SqlValue, String> {
    let Some(raw) = raw else {
        return Ok(SqlValue::Null);
    };
    let value = raw.trim();
    match kind {
        ColumnKind::Text if value.is_empty() => Ok(SqlValue::Null),
        ColumnKind::Text => Ok(SqlValue::Text(value.to_string())),
        ColumnKind::Integer => parse_integer(value).map(SqlValue::Integer),
        ColumnKind::Float => parse_float(value).map(SqlValue::Real),
        ColumnKind::NullableFloat => {
            if NOT_AVAILABLE.iter().any(|na| value.eq_ignore_ascii_case(na)) {
                Ok(SqlValue::Null)
            } else {
                parse_float(value).map(SqlValue::Real)
            }
        }
        ColumnKind::YesNo => Ok(SqlValue::Boolean(parse_bool(value))),
    }
}

fn parse_integer(value: &str) -> std::result::Result<i64, String> {
    if value.is_empty() {
        return Err("expected an integer, got an empty value".to_string());
    }
    if let Ok(i) = value.parse::<i64>() {
        return Ok(i);
    }
    match value.parse::<f64>() {
        // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            Ok(f as i64)
        }
        _ => Err(format!("expected an integer, got {value:?}")),
    }
}

fn parse_float(value: &str) -> std::result::Result<f64, String> {
    if value.is_empty() {
        return Err("expected a number, got an empty value".to_string());
    }
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() => Ok(f),
        _ => Err(format!("expected a number, got {value:?}")),
    }
}

/// Rows taken from one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub file: String,
    pub rows: usize,
}

impl FileSummary {
    /// True for files that carry a header line and nothing else.
    pub fn header_only(&self) -> bool {
        self.rows == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub dataset: &'static str,
    pub table: Table,
    pub files: Vec<FileSummary>,
}

impl IngestSummary {
    pub fn total_rows(&self) -> usize {
        self.files.iter().map(|f| f.rows).sum()
    }
}

/// CSV files directly inside `dir`, sorted by name.
pub fn csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| WarehouseError::Ingestion {
            file: dir.display().to_string(),
            row: None,
            message: format!("cannot read directory: {e}"),
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Load every CSV file in `dir` into the dataset's table, one insert per row.
///
/// With no session the files are parsed and coerced but nothing is written,
/// which is how a dry run works.
pub async fn ingest_dir(
    dataset: &Dataset,
    dir: &Path,
    session: Option<&dyn Session>,
) -> Result<IngestSummary> {
    let files = csv_files(dir)?;
    if files.is_empty() {
        warn!("No CSV files found in {}", dir.display());
    }

    let mut summary = IngestSummary {
        dataset: dataset.name,
        table: dataset.table,
        files: Vec::with_capacity(files.len()),
    };
    for path in files {
        let file = file_label(&path);
        let span = info_span!("ingest_file", dataset = dataset.name, file = %file);
        let result = ingest_file(dataset, &path, session).instrument(span).await?;
        summary.files.push(result);
    }
    Ok(summary)
}

/// Load one CSV file. Rows inserted before a failing row stay in the table.
pub async fn ingest_file(
    dataset: &Dataset,
    path: &Path,
    session: Option<&dyn Session>,
) -> Result<FileSummary> {
    let file = file_label(path);
    let fail = |row: Option<usize>, message: String| WarehouseError::Ingestion {
        file: file.clone(),
        row,
        message,
    };

    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| fail(None, e.to_string()))?;
    let headers = reader
        .headers()
        .map_err(|e| fail(None, format!("unreadable header: {e}")))?
        .clone();

    let plan = dataset.resolve(&headers).map_err(|msg| fail(None, msg))?;
    for header in dataset.unknown_headers(&headers) {
        warn!("Ignoring unrecognized column {:?}", header);
    }
    for (spec, idx) in dataset.columns.iter().zip(&plan) {
        if idx.is_none() {
            debug!("Optional column {:?} absent; {} will be NULL", spec.source, spec.target);
        }
    }

    let sql = dataset.insert_statement();
    match session {
        Some(_) => info!("Uploading {} to {}...", file, dataset.table),
        None => info!("Scanning {} (dry run)", file),
    }

    let mut rows = 0;
    for (idx, record) in reader.records().enumerate() {
        let row_number = idx + 1;
        let record = record.map_err(|e| fail(Some(row_number), e.to_string()))?;
        let params = dataset
            .coerce(&plan, &record)
            .map_err(|msg| fail(Some(row_number), msg))?;
        if let Some(session) = session {
            session
                .execute(&sql, &params)
                .await
                .map_err(|e| fail(Some(row_number), format!("insert failed: {e}")))?;
        }
        rows += 1;
    }

    if rows == 0 {
        warn!("{} has a header but no data rows", file);
    }
    info!("Processed {} ({} rows)", file, rows);
    Ok(FileSummary { file, rows })
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::error::Result;
    use crate::warehouse::{Dialect, Row, Session, SqlValue};
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// Records every statement; optionally fails the n-th execute (1-based).
    pub struct RecordingSession {
        pub statements: Arc<Mutex<Vec<(String, Vec<SqlValue>)>>>,
        pub fail_on: Option<usize>,
    }

    impl RecordingSession {
        pub fn new() -> Self {
            Self {
                statements: Arc::new(Mutex::new(Vec::new())),
                fail_on: None,
            }
        }
    }

    #[async_trait]
    impl Session for RecordingSession {
        fn dialect(&self) -> Dialect {
            Dialect::Snowflake
        }

        async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
            let mut statements = self.statements.lock().await;
            if self.fail_on == Some(statements.len() + 1) {
                return Err(crate::error::WarehouseError::Query("connection reset".to_string()));
            }
            statements.push((sql.to_string(), params.to_vec()));
            Ok(1)
        }

        async fn query(&self, _sql: &str, _params: &[SqlValue]) -> Result<Vec<Row>> {
            Ok(Vec::new())
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_bool_truth_table() {
        for yes in ["yes", "Yes", "YES", " yes ", "yEs\t"] {
            assert!(parse_bool(yes), "{yes:?} should be true");
        }
        for no in ["", " ", "no", "No", "y", "true", "1", "yes please", "ye s"] {
            assert!(!parse_bool(no), "{no:?} should be false");
        }
    }

    #[test]
    fn test_coerce_rules() {
        assert_eq!(coerce(ColumnKind::Integer, Some(" 3 ")), Ok(SqlValue::Integer(3)));
        assert_eq!(coerce(ColumnKind::Integer, Some("3.0")), Ok(SqlValue::Integer(3)));
        assert!(coerce(ColumnKind::Integer, Some("3.5")).is_err());
        assert!(coerce(ColumnKind::Integer, Some("")).is_err());
        assert!(coerce(ColumnKind::Integer, Some("1e20")).is_err());
        assert!(coerce(ColumnKind::Integer, Some("-1e19")).is_err());
        assert_eq!(coerce(ColumnKind::Integer, Some("1e3")), Ok(SqlValue::Integer(1000)));
        assert_eq!(coerce(ColumnKind::Float, Some("12.5")), Ok(SqlValue::Real(12.5)));
        assert!(coerce(ColumnKind::Float, Some("")).is_err());
        assert_eq!(coerce(ColumnKind::NullableFloat, Some("")), Ok(SqlValue::Null));
        assert_eq!(coerce(ColumnKind::NullableFloat, Some("N/A")), Ok(SqlValue::Null));
        assert!(coerce(ColumnKind::NullableFloat, Some("lots")).is_err());
        for non_finite in ["inf", "-inf", "Infinity", "NaN"] {
            assert!(coerce(ColumnKind::Float, Some(non_finite)).is_err(), "{non_finite}");
        }
        assert!(coerce(ColumnKind::NullableFloat, Some("inf")).is_err());
        assert_eq!(coerce(ColumnKind::Text, Some("")), Ok(SqlValue::Null));
        assert_eq!(coerce(ColumnKind::YesNo, Some("")), Ok(SqlValue::Boolean(false)));
        assert_eq!(coerce(ColumnKind::YesNo, None), Ok(SqlValue::Null));
    }

    #[test]
    fn test_csv_files_filters_and_sorts() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.csv"), "x\n").unwrap();
        fs::write(dir.path().join("a.CSV"), "x\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "x\n").unwrap();
        fs::create_dir(dir.path().join("nested.csv")).unwrap();

        let files = csv_files(dir.path()).unwrap();
        let names: Vec<String> = files.iter().map(|p| file_label(p)).collect();
        assert_eq!(names, vec!["a.CSV", "b.csv"]);
    }

    #[test]
    fn test_csv_files_missing_dir_is_an_error() {
        let dir = tempdir().unwrap();
        let err = csv_files(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, WarehouseError::Ingestion { row: None, .. }));
    }
}

//! CSV directory ingest.
//!
//! A data directory holds one file per record family:
//!
//! - `tickets.csv`
//! - `jobs.csv`
//! - `product_metrics.csv`
//!
//! Every cell enters the validator as text (empty cells become nulls); no
//! typing happens here.

use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use tracing::debug;

use crate::domain::RecordFamily;
use crate::error::AppError;
use crate::schema::{RawDataset, RawTable, Value};

/// Read all three family files from `dir`.
pub fn read_dataset_dir(dir: &Path) -> Result<RawDataset, AppError> {
    if !dir.is_dir() {
        return Err(AppError::configuration(format!(
            "data directory '{}' does not exist",
            dir.display()
        )));
    }

    let mut raw = RawDataset::default();
    for family in RecordFamily::ALL {
        let path = dir.join(format!("{}.csv", family.table_label()));
        if !path.is_file() {
            return Err(AppError::configuration(format!(
                "missing {family} file '{}'",
                path.display()
            )));
        }
        *raw.table_mut(family) = read_csv_table(&path)?;
    }
    Ok(raw)
}

/// Load one CSV file as a raw table with normalized headers.
pub fn read_csv_table(path: &Path) -> Result<RawTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::io(format!("failed to read CSV headers of '{}': {e}", path.display())))?
        .clone();

    let mut table = RawTable::new(headers.iter().map(normalize_header_name));
    let width = table.columns.len();

    for (idx, result) in reader.records().enumerate() {
        // +2: 1-based, after the header line.
        let line = idx + 2;
        let record = result.map_err(|e| AppError::io(format!("{}:{line}: CSV parse error: {e}", path.display())))?;
        table.push_row(record_cells(&record, width));
    }

    debug!(path = %path.display(), rows = table.len(), columns = width, "read csv");
    Ok(table)
}

fn record_cells(record: &StringRecord, width: usize) -> Vec<Value> {
    (0..width)
        .map(|i| match record.get(i) {
            Some(s) if !s.is_empty() => Value::Text(s.to_string()),
            _ => Value::Null,
        })
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, validation reports a missing column.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

//! Exports: filtered families and the forecast as CSV, KPIs as JSON.
//!
//! The files are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::domain::{DataSource, ForecastRow, OperationalKpis, ProductKpis};
use crate::error::AppError;

/// Combined KPI document written by [`write_kpis_json`].
#[derive(Debug, Clone, Serialize)]
pub struct KpiReport<'a> {
    pub operational: &'a OperationalKpis,
    pub product: &'a ProductKpis,
    pub issues: &'a [String],
}

/// Serialize rows with `csv` + `serde`; headers come from the field names.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::io(format!("failed to create CSV '{}': {e}", path.display())))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::io(format!("failed to write CSV row to '{}': {e}", path.display())))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::io(format!("failed to flush CSV '{}': {e}", path.display())))?;
    Ok(())
}

pub fn write_forecast_csv(path: &Path, rows: &[ForecastRow]) -> Result<(), AppError> {
    write_csv(path, rows)
}

pub fn write_kpis_json(path: &Path, report: &KpiReport<'_>) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("failed to create KPI JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::io(format!("failed to write KPI JSON: {e}")))?;
    Ok(())
}

/// Write every family plus forecast and KPIs into `dir` (created if needed).
///
/// Returns the paths written, in order.
pub fn export_all(
    dir: &Path,
    data: &DataSource,
    forecast: &[ForecastRow],
    kpis: &KpiReport<'_>,
) -> Result<Vec<PathBuf>, AppError> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::io(format!("failed to create export directory '{}': {e}", dir.display())))?;

    let paths = [
        dir.join("tickets.csv"),
        dir.join("jobs.csv"),
        dir.join("product_metrics.csv"),
        dir.join("forecast.csv"),
        dir.join("kpis.json"),
    ];
    write_csv(&paths[0], &data.tickets)?;
    write_csv(&paths[1], &data.jobs)?;
    write_csv(&paths[2], &data.product_metrics)?;
    write_forecast_csv(&paths[3], forecast)?;
    write_kpis_json(&paths[4], kpis)?;

    info!(dir = %dir.display(), files = paths.len(), "exports written");
    Ok(paths.to_vec())
}

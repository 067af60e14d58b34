//! Filesystem I/O.
//!
//! - CSV directory ingest (`ingest`)
//! - CSV/JSON exports (`export`)

pub mod export;
pub mod ingest;

pub use export::{KpiReport, export_all, write_csv, write_forecast_csv, write_kpis_json};
pub use ingest::{read_csv_table, read_dataset_dir};

//! Source selection: warehouse, CSV directory, or seeded mock data.
//!
//! Every path ends in the schema validator; there is no silent fallback from a
//! failing warehouse to mock data.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::WarehouseConfig;
use crate::data::mock::{MockOptions, generate_mock_data};
use crate::data::sql::select_all;
use crate::data::warehouse::{QueryRunner, WarehouseClient};
use crate::domain::{DataSource, RecordFamily, SourceKind};
use crate::error::AppError;
use crate::schema::{RawDataset, validate_dataset, validate_source};

#[derive(Debug, Clone, Default)]
pub struct LoadConfig {
    pub warehouse: WarehouseConfig,
    pub mock: MockOptions,
    pub data_dir: Option<PathBuf>,
}

/// Warehouse when `use_external`, otherwise mock data.
pub fn load_data(use_external: bool, config: &LoadConfig) -> Result<DataSource, AppError> {
    if use_external {
        config.warehouse.ensure_configured()?;
        let client = WarehouseClient::new(&config.warehouse)?;
        load_from_warehouse(&client, &config.warehouse)
    } else {
        load_mock(&config.mock)
    }
}

/// Resolve a CLI source choice. `Auto` uses the warehouse only when it is configured.
pub fn load_source(kind: SourceKind, config: &LoadConfig) -> Result<DataSource, AppError> {
    match kind {
        SourceKind::Auto => load_data(config.warehouse.is_configured(), config),
        SourceKind::Mock => load_data(false, config),
        SourceKind::Warehouse => load_data(true, config),
        SourceKind::Csv => {
            let dir = config
                .data_dir
                .as_deref()
                .ok_or_else(|| AppError::usage("--source csv requires --data-dir"))?;
            load_from_dir(dir)
        }
    }
}

/// One `SELECT *` per family, then timestamp normalization and validation.
pub fn load_from_warehouse(runner: &dyn QueryRunner, config: &WarehouseConfig) -> Result<DataSource, AppError> {
    config.ensure_configured()?;

    let mut raw = RawDataset::default();
    for family in RecordFamily::ALL {
        let table = match family {
            RecordFamily::Tickets => &config.table_tickets,
            RecordFamily::Jobs => &config.table_jobs,
            RecordFamily::ProductMetrics => &config.table_product_metrics,
        };
        let sql = select_all(table)?;
        let rows = runner.run_query(&sql)?;
        info!(%family, table = %table, rows = rows.len(), "loaded from warehouse");
        *raw.table_mut(family) = rows;
    }

    raw.normalize_temporal_columns();
    validate_dataset(&raw)
}

pub fn load_mock(options: &MockOptions) -> Result<DataSource, AppError> {
    let data = generate_mock_data(options)?;
    info!(
        days = options.days,
        seed = options.seed,
        anchor = %options.anchor,
        tickets = data.tickets.len(),
        "generated mock data"
    );
    validate_source(&data)
}

pub fn load_from_dir(dir: &Path) -> Result<DataSource, AppError> {
    let mut raw = crate::io::ingest::read_dataset_dir(dir)?;
    for (family, table) in [
        (RecordFamily::Tickets, &raw.tickets),
        (RecordFamily::Jobs, &raw.jobs),
        (RecordFamily::ProductMetrics, &raw.product_metrics),
    ] {
        info!(%family, dir = %dir.display(), rows = table.len(), "loaded from csv");
    }
    raw.normalize_temporal_columns();
    validate_dataset(&raw)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use chrono::NaiveDate;

    use super::*;
    use crate::config::{MapProvider, SecretChain};
    use crate::schema::{RawTable, Value};

    /// Serves canned tables keyed by SQL text and records every statement.
    struct FakeRunner {
        tables: HashMap<String, RawTable>,
        seen: RefCell<Vec<String>>,
        fail_with: Option<AppError>,
    }

    impl FakeRunner {
        fn new() -> Self {
            Self {
                tables: HashMap::new(),
                seen: RefCell::new(Vec::new()),
                fail_with: None,
            }
        }

        fn serve(mut self, table: &str, rows: RawTable) -> Self {
            self.tables.insert(format!("SELECT * FROM {table}"), rows);
            self
        }
    }

    impl QueryRunner for FakeRunner {
        fn run_query(&self, sql: &str) -> Result<RawTable, AppError> {
            self.seen.borrow_mut().push(sql.to_string());
            if let Some(err) = &self.fail_with {
                return Err(err.clone());
            }
            Ok(self.tables.get(sql).cloned().unwrap_or_default())
        }
    }

    fn configured() -> WarehouseConfig {
        WarehouseConfig::resolve(&SecretChain::new().with(MapProvider::new(
            "test",
            [
                ("DATABRICKS_HOST", "adb-1.azuredatabricks.net"),
                ("DATABRICKS_HTTP_PATH", "/sql/1.0/warehouses/abc"),
                ("DATABRICKS_TOKEN", "t"),
            ],
        )))
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn warehouse_tables() -> FakeRunner {
        let mut tickets = RawTable::new(["ticket_id", "timestamp", "produto", "tnps"]);
        tickets.push_row(vec![text("1"), text("2025-03-01 10:00:00"), text("Pessoal"), text("40")]);
        tickets.push_row(vec![text("2"), text("2025-03-02T11:30:00"), text("Consignado"), Value::Null]);

        let mut jobs = RawTable::new(["job", "timestamp", "status", "duration_s"]);
        jobs.push_row(vec![text("etl_jobs"), text("2025-03-01 02:00:00"), text("SUCCESS"), text("600")]);

        let mut products = RawTable::new([
            "date",
            "product",
            "applications",
            "approvals",
            "conversions",
            "eligibility_rate",
        ]);
        products.push_row(vec![
            text("2025-03-01 00:00:00"),
            text("Cartão"),
            text("100"),
            text("50"),
            text("20"),
            text("0.7"),
        ]);

        FakeRunner::new()
            .serve("analytics.lending.tickets", tickets)
            .serve("analytics.lending.jobs", jobs)
            .serve("analytics.lending.product_metrics", products)
    }

    #[test]
    fn warehouse_rows_are_normalized_and_validated() {
        let runner = warehouse_tables();
        let data = load_from_warehouse(&runner, &configured()).unwrap();
        assert_eq!(data.tickets.len(), 2);
        assert_eq!(data.tickets[1].tnps, None);
        assert_eq!(data.jobs[0].duration_s, 600);
        assert_eq!(data.product_metrics[0].date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(runner.seen.borrow().len(), 3);
    }

    #[test]
    fn missing_configuration_fails_before_any_query() {
        let runner = warehouse_tables();
        let err = load_from_warehouse(&runner, &WarehouseConfig::default()).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        assert!(err.to_string().contains("DATABRICKS_HOST"));
        assert!(runner.seen.borrow().is_empty());
    }

    #[test]
    fn load_data_external_checks_configuration_first() {
        let err = load_data(true, &LoadConfig::default()).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn rejected_statement_propagates_as_query_error() {
        let mut runner = warehouse_tables();
        runner.fail_with = Some(AppError::query("TABLE_OR_VIEW_NOT_FOUND"));
        let err = load_from_warehouse(&runner, &configured()).unwrap_err();
        assert!(matches!(err, AppError::Query(_)));
        assert_eq!(runner.seen.borrow().len(), 1);
    }

    #[test]
    fn malformed_warehouse_rows_fail_validation() {
        let mut tickets = RawTable::new(["ticket_id", "timestamp"]);
        tickets.push_row(vec![text("0"), text("not a date")]);
        let runner = FakeRunner::new().serve("analytics.lending.tickets", tickets);
        let err = load_from_warehouse(&runner, &configured()).unwrap_err();
        let violations = err.violations().unwrap();
        assert!(violations.contains(RecordFamily::Tickets, 0, "ticket_id"));
        assert!(violations.contains(RecordFamily::Tickets, 0, "timestamp"));
    }

    #[test]
    fn csv_source_requires_a_directory() {
        let err = load_source(SourceKind::Csv, &LoadConfig::default()).unwrap_err();
        assert!(matches!(err, AppError::Usage(_)));
    }

    #[test]
    fn mock_path_is_validated_and_deterministic() {
        let config = LoadConfig {
            mock: MockOptions::new(10, 7).with_anchor(NaiveDate::from_ymd_opt(2025, 1, 11).unwrap()),
            ..LoadConfig::default()
        };
        let a = load_data(false, &config).unwrap();
        let b = load_source(SourceKind::Mock, &config).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.jobs.len(), 50);
    }
}

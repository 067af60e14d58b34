//! End-to-end runs of the mock pipeline through the public API.

use std::collections::BTreeMap;
use std::fs;

use chrono::NaiveDate;
use lending_ops::app::pipeline::{PipelineConfig, run_pipeline};
use lending_ops::data::{LoadConfig, MockOptions, load_source};
use lending_ops::domain::{Facet, SourceKind};
use lending_ops::error::AppError;
use lending_ops::io::{KpiReport, export_all};

fn anchor() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

fn mock_config() -> PipelineConfig {
    PipelineConfig {
        source: SourceKind::Mock,
        load: LoadConfig {
            mock: MockOptions::new(60, 42).with_anchor(anchor()),
            ..LoadConfig::default()
        },
        start: None,
        end: None,
        selections: BTreeMap::new(),
        horizon: 14,
    }
}

#[test]
fn mock_run_is_reproducible() {
    let a = run_pipeline(&mock_config()).unwrap();
    let b = run_pipeline(&mock_config()).unwrap();
    assert_eq!(a.data, b.data);
    assert_eq!(a.operational, b.operational);
    assert_eq!(a.forecast, b.forecast);
}

#[test]
fn mock_run_produces_every_output() {
    let out = run_pipeline(&mock_config()).unwrap();

    assert!(!out.data.tickets.is_empty());
    assert!(!out.data.jobs.is_empty());
    assert!(!out.data.product_metrics.is_empty());
    assert!(out.issues.is_empty(), "mock data should be consistent: {:?}", out.issues);

    let kpis = &out.operational;
    assert_eq!(kpis.tickets_total, out.filtered.tickets.len());
    assert!((0.0..=100.0).contains(&kpis.fcr));
    assert!((0.0..=100.0).contains(&kpis.reopen_rate));
    assert!(kpis.ait_mean >= 0.0);

    let future: Vec<_> = out.forecast.iter().filter(|r| r.is_future()).collect();
    assert_eq!(future.len(), 14);
    let last_observed = out.forecast.iter().rev().find(|r| !r.is_future()).unwrap();
    assert_eq!(future[0].date, last_observed.date.succ_opt().unwrap());
    // Beyond the data the moving average is frozen, so the projection is a straight line.
    let step = future[1].predicted - future[0].predicted;
    assert!(future.windows(2).all(|w| (w[1].predicted - w[0].predicted - step).abs() < 1e-6));

    let scores = out.propensity.expect("enough product rows");
    assert!(scores.iter().all(|p| (0.0..=1.0).contains(p)));
}

#[test]
fn date_and_facet_filters_narrow_all_families() {
    let mut config = mock_config();
    let start = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
    let end = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();
    config.start = Some(start);
    config.end = Some(end);
    config.selections.insert(Facet::Produto, vec!["Consignado".to_string()]);

    let out = run_pipeline(&config).unwrap();
    assert!(!out.filtered.tickets.is_empty());
    assert!(out.filtered.tickets.iter().all(|t| {
        let day = t.timestamp.date();
        day >= start && day <= end && t.produto.as_deref() == Some("Consignado")
    }));
    assert!(out.filtered.jobs.iter().all(|j| j.timestamp.date() >= start && j.timestamp.date() <= end));
    assert!(out.filtered.product_metrics.iter().all(|p| p.product == "Consignado"));
    assert!(out.breakdowns.convenios.iter().all(|c| c.tickets > 0));
}

#[test]
fn csv_source_requires_a_directory() {
    let mut config = mock_config();
    config.source = SourceKind::Csv;
    let err = run_pipeline(&config).unwrap_err();
    assert!(matches!(err, AppError::Usage(_)));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn warehouse_source_without_settings_is_a_configuration_error() {
    let mut config = mock_config();
    config.source = SourceKind::Warehouse;
    let err = run_pipeline(&config).unwrap_err();
    assert!(matches!(err, AppError::Configuration(_)));
}

#[test]
fn export_then_reload_from_csv_directory() {
    let out = run_pipeline(&mock_config()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let kpis = KpiReport {
        operational: &out.operational,
        product: &out.product,
        issues: &out.issues,
    };
    export_all(dir.path(), &out.filtered, &out.forecast, &kpis).unwrap();

    let forecast_csv = fs::read_to_string(dir.path().join("forecast.csv")).unwrap();
    assert!(forecast_csv.starts_with("date,observed,predicted\n"));

    let load = LoadConfig {
        data_dir: Some(dir.path().to_path_buf()),
        ..LoadConfig::default()
    };
    let reloaded = load_source(SourceKind::Csv, &load).unwrap();
    assert_eq!(reloaded.tickets.len(), out.filtered.tickets.len());
    assert_eq!(reloaded.jobs, out.filtered.jobs);
    assert_eq!(reloaded.product_metrics.len(), out.filtered.product_metrics.len());
}

#[test]
fn broken_csv_reports_schema_violations() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("tickets.csv"),
        "ticket_id,timestamp,fcr,reopen,ait_min,tnps\n1,2025-01-01 10:00:00,2,0,5.0,10\n",
    )
    .unwrap();
    fs::write(dir.path().join("jobs.csv"), "job,timestamp,status,duration_s\n").unwrap();
    fs::write(
        dir.path().join("product_metrics.csv"),
        "date,product,applications,approvals,conversions,eligibility_rate\n",
    )
    .unwrap();

    let load = LoadConfig {
        data_dir: Some(dir.path().to_path_buf()),
        ..LoadConfig::default()
    };
    let err = load_source(SourceKind::Csv, &load).unwrap_err();
    assert_eq!(err.exit_code(), 3);
    let violations = err.violations().unwrap();
    assert!(violations.iter().any(|v| v.column == "fcr"));
}

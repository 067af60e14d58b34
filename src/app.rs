//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - installs the log subscriber
//! - resolves warehouse settings and picks a data source
//! - runs the shared pipeline
//! - prints reports/plots and writes optional exports

use std::collections::BTreeMap;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, CommonArgs, ExportArgs, ForecastArgs, SummaryArgs};
use crate::config::WarehouseConfig;
use crate::data::{LoadConfig, MockOptions, load_source};
use crate::domain::{Facet, SourceKind};
use crate::error::AppError;
use crate::io::KpiReport;
use crate::report;

pub mod pipeline;

use pipeline::{PipelineConfig, RunOutput, run_pipeline};

/// Violations listed by `lops validate` before truncating.
const VIOLATION_LISTING_LIMIT: usize = 50;

/// Entry point for the `lops` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Summary(args) => handle_summary(args),
        Command::Facets(args) => handle_facets(args),
        Command::Forecast(args) => handle_forecast(args),
        Command::Validate(args) => handle_validate(args),
        Command::Export(args) => handle_export(args),
    }
}

/// Logs go to stderr so stdout stays clean for reports.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // `try_init` so repeated calls (tests) don't panic.
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn handle_summary(args: SummaryArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args.common);
    let run = run_pipeline(&config)?;

    println!("Source: {}", describe_source(&config));
    println!("{}", report::format_row_counts(&run.data));
    print_filter(&run);
    println!("{}", report::format_kpis(&run.operational, &run.product));
    println!("{}", report::format_issues(&run.issues));
    println!("{}", report::format_breakdowns(&run.breakdowns));
    println!("{}", report::format_propensity(run.propensity.as_deref().unwrap_or(&[])));
    println!("{}", report::format_forecast_table(&run.forecast));

    if !args.no_plot {
        println!("{}", crate::plot::render_forecast_plot(&run.forecast, args.width, args.height));
    }
    Ok(())
}

fn handle_facets(args: CommonArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args);
    let data = load_source(config.source, &config.load)?;
    let facets = crate::filter::derive_facets(&data);
    println!("{}", report::format_facets(&facets));
    Ok(())
}

fn handle_forecast(args: ForecastArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args.common);
    let run = run_pipeline(&config)?;

    print_filter(&run);
    println!("{}", report::format_forecast_table(&run.forecast));

    if let Some(path) = &args.export {
        crate::io::write_forecast_csv(path, &run.forecast)?;
        info!(path = %path.display(), rows = run.forecast.len(), "forecast exported");
    }
    Ok(())
}

fn handle_validate(args: CommonArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args);
    println!("Source: {}", describe_source(&config));

    match load_source(config.source, &config.load) {
        Ok(data) => {
            println!("{}", report::format_row_counts(&data));
            println!("Validation: ok");
            Ok(())
        }
        Err(err) => {
            if let Some(violations) = err.violations() {
                println!("{}", report::format_violations(violations, VIOLATION_LISTING_LIMIT));
            }
            Err(err)
        }
    }
}

fn handle_export(args: ExportArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args.common);
    let run = run_pipeline(&config)?;

    let kpis = KpiReport {
        operational: &run.operational,
        product: &run.product,
        issues: &run.issues,
    };
    let written = crate::io::export_all(&args.dir, &run.filtered, &run.forecast, &kpis)?;
    for path in written {
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn print_filter(run: &RunOutput) {
    match &run.spec {
        Some(spec) => println!("{}", report::format_filter(spec)),
        None => println!("Filter: none (no ticket dates)\n"),
    }
}

fn describe_source(config: &PipelineConfig) -> String {
    match config.source {
        SourceKind::Mock => format!("mock data ({} days, seed {})", config.load.mock.days, config.load.mock.seed),
        SourceKind::Csv => match &config.load.data_dir {
            Some(dir) => format!("csv directory {}", dir.display()),
            None => "csv directory (not given)".to_string(),
        },
        SourceKind::Auto | SourceKind::Warehouse => config.load.warehouse.describe(),
    }
}

pub fn pipeline_config_from_args(args: &CommonArgs) -> PipelineConfig {
    // Mock runs never need the warehouse; skip the secret lookups.
    let warehouse = match args.source {
        SourceKind::Mock | SourceKind::Csv => WarehouseConfig::default(),
        SourceKind::Auto | SourceKind::Warehouse => WarehouseConfig::from_env(),
    };
    debug!(?warehouse, "resolved warehouse settings");

    let mut mock = MockOptions::new(args.days, args.seed);
    if let Some(anchor) = args.anchor {
        mock = mock.with_anchor(anchor);
    }

    let selections: BTreeMap<Facet, Vec<String>> = Facet::ALL
        .into_iter()
        .map(|facet| (facet, args.filter.values(facet).to_vec()))
        .filter(|(_, values)| !values.is_empty())
        .collect();

    PipelineConfig {
        source: args.source,
        load: LoadConfig {
            warehouse,
            mock,
            data_dir: args.data_dir.clone(),
        },
        start: args.filter.start,
        end: args.filter.end,
        selections,
        horizon: args.horizon,
    }
}

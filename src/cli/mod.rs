//! Command-line parsing for the lending operations pipeline.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! loading/filtering/forecasting code. `app` turns these structs into pipeline
//! inputs.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::data::{DEFAULT_MOCK_DAYS, DEFAULT_MOCK_SEED};
use crate::domain::{Facet, SourceKind};
use crate::forecast::DEFAULT_HORIZON;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "lops", version, about = "Lending operations KPIs and naive forecasts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Raise the default log level to debug (RUST_LOG still wins).
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load, filter, and print KPIs, consistency issues, breakdowns and the forecast.
    Summary(SummaryArgs),
    /// Print the available filter facets.
    Facets(CommonArgs),
    /// Print the forecast table (optionally export it as CSV).
    Forecast(ForecastArgs),
    /// Load and validate only; print row counts per family.
    Validate(CommonArgs),
    /// Write the filtered families, the forecast and the KPIs to a directory.
    Export(ExportArgs),
}

/// Options shared by every subcommand.
#[derive(Debug, Args, Clone)]
pub struct CommonArgs {
    /// Data source. `auto` uses the warehouse when credentials resolve.
    #[arg(long, value_enum, default_value_t = SourceKind::Auto)]
    pub source: SourceKind,

    /// Directory with tickets.csv, jobs.csv and product_metrics.csv (for `--source csv`).
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Days of mock history.
    #[arg(long, default_value_t = DEFAULT_MOCK_DAYS)]
    pub days: usize,

    /// Seed for the mock generator.
    #[arg(long, default_value_t = DEFAULT_MOCK_SEED)]
    pub seed: u64,

    /// Anchor (last) day for mock data; defaults to today (UTC).
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub anchor: Option<NaiveDate>,

    /// Forecast horizon in days.
    #[arg(long, default_value_t = DEFAULT_HORIZON)]
    pub horizon: usize,

    #[command(flatten)]
    pub filter: FilterArgs,
}

/// Date range and facet selections.
///
/// Facet flags are repeatable: `--estado SP --estado RJ`.
#[derive(Debug, Args, Clone, Default)]
pub struct FilterArgs {
    /// First day (inclusive); defaults to the earliest ticket day.
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub start: Option<NaiveDate>,

    /// Last day (inclusive); defaults to the latest ticket day.
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub end: Option<NaiveDate>,

    #[arg(long)]
    pub canal: Vec<String>,
    #[arg(long)]
    pub produto: Vec<String>,
    #[arg(long)]
    pub convenio: Vec<String>,
    #[arg(long)]
    pub segmento: Vec<String>,
    #[arg(long)]
    pub estado: Vec<String>,
    #[arg(long)]
    pub prioridade: Vec<String>,
    #[arg(long)]
    pub categoria: Vec<String>,
}

impl FilterArgs {
    /// Values given for one facet (empty when unrestricted).
    pub fn values(&self, facet: Facet) -> &[String] {
        match facet {
            Facet::Canal => &self.canal,
            Facet::Produto => &self.produto,
            Facet::Convenio => &self.convenio,
            Facet::Segmento => &self.segmento,
            Facet::Estado => &self.estado,
            Facet::Prioridade => &self.prioridade,
            Facet::Categoria => &self.categoria,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct ForecastArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Also write the forecast table as CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Output directory (created if needed).
    #[arg(long, value_name = "DIR")]
    pub dir: PathBuf,
}

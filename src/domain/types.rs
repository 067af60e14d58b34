//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - produced by the validator (remote, CSV, or mock sources)
//! - copied and narrowed by the filter engine
//! - exported to CSV/JSON

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Product label whose tickets carry a `convenio`.
pub const CONSIGNADO: &str = "Consignado";

/// The three fixed record families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordFamily {
    Tickets,
    Jobs,
    ProductMetrics,
}

impl RecordFamily {
    pub const ALL: [RecordFamily; 3] = [RecordFamily::Tickets, RecordFamily::Jobs, RecordFamily::ProductMetrics];

    /// Table/file stem used for this family.
    pub fn table_label(self) -> &'static str {
        match self {
            RecordFamily::Tickets => "tickets",
            RecordFamily::Jobs => "jobs",
            RecordFamily::ProductMetrics => "product_metrics",
        }
    }
}

impl fmt::Display for RecordFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_label())
    }
}

/// Where the dataset comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Use the warehouse when credentials resolve, otherwise mock data.
    Auto,
    /// Synthetic data from the seeded generator.
    Mock,
    /// One `SELECT *` per family against the SQL warehouse.
    Warehouse,
    /// `tickets.csv`, `jobs.csv` and `product_metrics.csv` from a directory.
    Csv,
}

/// A customer-service ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket_id: i64,
    pub timestamp: NaiveDateTime,
    pub canal: Option<String>,
    pub produto: Option<String>,
    /// Only meaningful for `produto == "Consignado"`.
    pub convenio: Option<String>,
    pub segmento: Option<String>,
    pub estado: Option<String>,
    pub prioridade: Option<String>,
    pub categoria: Option<String>,
    /// First contact resolution flag (0/1).
    pub fcr: Option<u8>,
    /// Reopened flag (0/1).
    pub reopen: Option<u8>,
    /// Interaction time in minutes.
    pub ait_min: Option<f64>,
    pub tnps: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Success,
    Failed,
    Skipped,
}

impl JobStatus {
    pub const LABELS: [&'static str; 3] = ["SUCCESS", "FAILED", "SKIPPED"];

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Success => "SUCCESS",
            JobStatus::Failed => "FAILED",
            JobStatus::Skipped => "SKIPPED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "SUCCESS" => Some(JobStatus::Success),
            "FAILED" => Some(JobStatus::Failed),
            "SKIPPED" => Some(JobStatus::Skipped),
            _ => None,
        }
    }
}

/// One execution of a scheduled data job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRun {
    pub job: String,
    pub timestamp: NaiveDateTime,
    pub status: JobStatus,
    pub duration_s: i64,
}

/// Daily funnel figures for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductMetric {
    pub date: NaiveDate,
    pub product: String,
    pub applications: i64,
    pub approvals: i64,
    pub conversions: i64,
    pub eligibility_rate: f64,
}

/// A loaded (or filtered) dataset: one collection per record family.
///
/// A loaded `DataSource` is treated as an immutable snapshot. Filtering always
/// produces a new value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSource {
    pub tickets: Vec<Ticket>,
    pub jobs: Vec<JobRun>,
    pub product_metrics: Vec<ProductMetric>,
    /// Facet columns the source ticket table did not have. Selections on them are ignored.
    pub absent_facets: BTreeSet<Facet>,
}

impl DataSource {
    pub fn row_counts(&self) -> [(RecordFamily, usize); 3] {
        [
            (RecordFamily::Tickets, self.tickets.len()),
            (RecordFamily::Jobs, self.jobs.len()),
            (RecordFamily::ProductMetrics, self.product_metrics.len()),
        ]
    }
}

/// Categorical ticket columns that can be filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facet {
    Canal,
    Produto,
    Convenio,
    Segmento,
    Estado,
    Prioridade,
    Categoria,
}

impl Facet {
    pub const ALL: [Facet; 7] = [
        Facet::Canal,
        Facet::Produto,
        Facet::Convenio,
        Facet::Segmento,
        Facet::Estado,
        Facet::Prioridade,
        Facet::Categoria,
    ];

    /// Column name in the ticket schema.
    pub fn column(self) -> &'static str {
        match self {
            Facet::Canal => "canal",
            Facet::Produto => "produto",
            Facet::Convenio => "convenio",
            Facet::Segmento => "segmento",
            Facet::Estado => "estado",
            Facet::Prioridade => "prioridade",
            Facet::Categoria => "categoria",
        }
    }

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            Facet::Canal => "Canal",
            Facet::Produto => "Produto",
            Facet::Convenio => "Convênio (Consignado)",
            Facet::Segmento => "Segmento",
            Facet::Estado => "UF",
            Facet::Prioridade => "Prioridade",
            Facet::Categoria => "Categoria",
        }
    }

    pub fn ticket_value(self, ticket: &Ticket) -> Option<&str> {
        let value = match self {
            Facet::Canal => &ticket.canal,
            Facet::Produto => &ticket.produto,
            Facet::Convenio => &ticket.convenio,
            Facet::Segmento => &ticket.segmento,
            Facet::Estado => &ticket.estado,
            Facet::Prioridade => &ticket.prioridade,
            Facet::Categoria => &ticket.categoria,
        };
        value.as_deref()
    }
}

/// Available filter options derived from the ticket family.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FacetSet {
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    /// Sorted distinct non-null values per facet (empty when the column is absent).
    pub values: BTreeMap<Facet, Vec<String>>,
}

impl FacetSet {
    pub fn values_of(&self, facet: Facet) -> &[String] {
        self.values.get(&facet).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A user selection: inclusive date range plus allowed values per facet.
///
/// An empty (or missing) value set means "no restriction" for that facet.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub selections: BTreeMap<Facet, BTreeSet<String>>,
}

impl FilterSpec {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            selections: BTreeMap::new(),
        }
    }

    /// Replace the allowed values for one facet.
    pub fn with<I, S>(mut self, facet: Facet, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selections
            .insert(facet, values.into_iter().map(Into::into).collect());
        self
    }

    pub fn selected(&self, facet: Facet) -> Option<&BTreeSet<String>> {
        self.selections.get(&facet).filter(|set| !set.is_empty())
    }
}

/// Operational summary over filtered tickets and jobs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationalKpis {
    pub tickets_total: usize,
    /// Count of reopened tickets.
    pub backlog: usize,
    /// First contact resolution, percent.
    pub fcr: f64,
    /// Reopen rate, percent.
    pub reopen_rate: f64,
    pub ait_mean: f64,
    pub tnps_mean: f64,
    pub jobs_total: usize,
}

/// Funnel summary over filtered product metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductKpis {
    /// Σconversions / Σapplications, percent.
    pub conversion_rate: f64,
    /// Mean eligibility rate, percent.
    pub eligibility_rate: f64,
}

/// One row of a forecast table.
///
/// `observed` is `None` for future (out-of-sample) days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub date: NaiveDate,
    pub observed: Option<f64>,
    pub predicted: f64,
}

impl ForecastRow {
    pub fn is_future(&self) -> bool {
        self.observed.is_none()
    }
}

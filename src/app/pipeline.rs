//! Shared pipeline logic used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load + validate -> facets -> filter -> KPIs/consistency/breakdowns -> forecast/propensity
//!
//! The subcommands can then focus on presentation (which blocks to print or export).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::info;

use crate::data::{LoadConfig, load_source};
use crate::domain::{DataSource, Facet, FacetSet, FilterSpec, ForecastRow, OperationalKpis, ProductKpis, SourceKind};
use crate::error::AppError;
use crate::filter::{apply_filters, derive_facets};
use crate::forecast::{conversion_features, forecast_series, score_propensity};
use crate::metrics::{Breakdowns, compute_breakdowns, compute_operational_kpis, compute_product_kpis};
use crate::quality::check_consistency;

/// Inputs of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub source: SourceKind,
    pub load: LoadConfig,
    /// Overrides for the facet date range.
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Allowed values per facet; facets left out are unrestricted.
    pub selections: BTreeMap<Facet, Vec<String>>,
    pub horizon: usize,
}

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub data: DataSource,
    pub facets: FacetSet,
    /// `None` when there is no date range to filter on (no tickets and no `--start/--end`).
    pub spec: Option<FilterSpec>,
    pub filtered: DataSource,
    pub operational: OperationalKpis,
    pub product: ProductKpis,
    pub issues: Vec<String>,
    pub breakdowns: Breakdowns,
    pub forecast: Vec<ForecastRow>,
    /// Skipped for fewer than two product rows.
    pub propensity: Option<Vec<f64>>,
}

/// Load from the configured source and run everything downstream.
pub fn run_pipeline(config: &PipelineConfig) -> Result<RunOutput, AppError> {
    let data = load_source(config.source, &config.load)?;
    run_pipeline_with_data(config, data)
}

/// Execute the pipeline on an already validated dataset.
pub fn run_pipeline_with_data(config: &PipelineConfig, data: DataSource) -> Result<RunOutput, AppError> {
    // 1) Facets and the filter selection.
    let facets = derive_facets(&data);
    let spec = build_filter_spec(&facets, config.start, config.end, &config.selections);

    // 2) Filter all three families consistently.
    let filtered = match &spec {
        Some(spec) => apply_filters(&data, spec),
        None => data.clone(),
    };

    // 3) Aggregates and advisory checks.
    let operational = compute_operational_kpis(&filtered.tickets, &filtered.jobs);
    let product = compute_product_kpis(&filtered.product_metrics);
    let issues = check_consistency(&filtered.tickets, &filtered.product_metrics);
    let breakdowns = compute_breakdowns(&filtered);

    // 4) Forecast the daily ticket count series.
    let series: Vec<(NaiveDate, f64)> = breakdowns
        .daily_counts
        .iter()
        .map(|d| (d.date, d.tickets as f64))
        .collect();
    let forecast = forecast_series(&series, config.horizon);

    // 5) Conversion propensity over the most recent product rows.
    let (features, labels) = conversion_features(&filtered.product_metrics);
    let propensity = if features.len() < 2 {
        None
    } else {
        Some(score_propensity(&features, Some(&labels))?)
    };

    info!(
        tickets = filtered.tickets.len(),
        forecast_rows = forecast.len(),
        issues = issues.len(),
        "pipeline complete"
    );

    Ok(RunOutput {
        data,
        facets,
        spec,
        filtered,
        operational,
        product,
        issues,
        breakdowns,
        forecast,
        propensity,
    })
}

/// Facet date range (with optional overrides) plus the explicit selections.
///
/// Facets without values stay unrestricted, so tickets with a null column are
/// kept unless the user narrows that facet.
pub fn build_filter_spec(
    facets: &FacetSet,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    selections: &BTreeMap<Facet, Vec<String>>,
) -> Option<FilterSpec> {
    let start = start.or(facets.min_date)?;
    let end = end.or(facets.max_date)?;

    let spec = selections
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .fold(FilterSpec::new(start, end), |spec, (facet, values)| {
            spec.with(*facet, values.iter().cloned())
        });
    Some(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MockOptions, generate_mock_data};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            source: SourceKind::Mock,
            load: LoadConfig::default(),
            start: None,
            end: None,
            selections: BTreeMap::new(),
            horizon: 7,
        }
    }

    fn mock() -> DataSource {
        generate_mock_data(&MockOptions::new(30, 7).with_anchor(d(2025, 3, 1))).unwrap()
    }

    #[test]
    fn spec_defaults_to_facet_range_and_skips_empty_selections() {
        let facets = FacetSet {
            min_date: Some(d(2025, 1, 1)),
            max_date: Some(d(2025, 1, 31)),
            values: BTreeMap::new(),
        };
        let mut selections = BTreeMap::new();
        selections.insert(Facet::Estado, vec!["SP".to_string()]);
        selections.insert(Facet::Canal, Vec::new());

        let spec = build_filter_spec(&facets, None, Some(d(2025, 1, 10)), &selections).unwrap();
        assert_eq!(spec.start, d(2025, 1, 1));
        assert_eq!(spec.end, d(2025, 1, 10));
        assert!(spec.selected(Facet::Estado).is_some());
        assert!(!spec.selections.contains_key(&Facet::Canal));
    }

    #[test]
    fn no_dates_means_no_spec() {
        assert!(build_filter_spec(&FacetSet::default(), None, None, &BTreeMap::new()).is_none());
        assert!(build_filter_spec(&FacetSet::default(), Some(d(2025, 1, 1)), Some(d(2025, 1, 2)), &BTreeMap::new()).is_some());
    }

    #[test]
    fn unrestricted_run_keeps_every_row() {
        let data = mock();
        let out = run_pipeline_with_data(&config(), data.clone()).unwrap();
        assert_eq!(out.filtered.tickets.len(), data.tickets.len());
        assert_eq!(out.operational.tickets_total, data.tickets.len());
        let observed = out.forecast.iter().filter(|r| !r.is_future()).count();
        assert_eq!(observed, out.breakdowns.daily_counts.len());
        assert_eq!(out.forecast.len(), observed + 7);
        assert_eq!(out.propensity.as_ref().map(Vec::len), Some(30));
    }

    #[test]
    fn selection_narrows_every_ticket_view() {
        let mut cfg = config();
        cfg.selections.insert(Facet::Estado, vec!["SP".to_string()]);
        let out = run_pipeline_with_data(&cfg, mock()).unwrap();
        assert!(out.filtered.tickets.iter().all(|t| t.estado.as_deref() == Some("SP")));
        assert_eq!(out.operational.tickets_total, out.filtered.tickets.len());
    }

    #[test]
    fn empty_dataset_runs_without_spec() {
        let out = run_pipeline_with_data(&config(), DataSource::default()).unwrap();
        assert!(out.spec.is_none());
        assert!(out.forecast.is_empty());
        assert!(out.propensity.is_none());
        assert_eq!(out.operational, OperationalKpis::default());
    }
}

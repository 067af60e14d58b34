//! Date-window and categorical filtering.
//!
//! Bounds differ per family and are pinned by the tests below:
//!
//! - tickets, jobs: `start <= timestamp < end + 1 day`
//! - product metrics: `start <= date <= end`
//!
//! Within a facet any selected value matches; across facets every restriction
//! must hold. A null value never matches a non-empty selection. A selection on
//! a facet whose column the source did not have is ignored.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::info;

use crate::domain::{DataSource, Facet, FilterSpec, JobRun, ProductMetric, Ticket};

/// Narrow every family to the selection. The input is left untouched.
pub fn apply_filters(data: &DataSource, spec: &FilterSpec) -> DataSource {
    let tickets: Vec<Ticket> = data
        .tickets
        .iter()
        .filter(|t| in_window(t.timestamp, spec) && matches_selections(t, spec, &data.absent_facets))
        .cloned()
        .collect();

    let jobs: Vec<JobRun> = data
        .jobs
        .iter()
        .filter(|j| in_window(j.timestamp, spec))
        .cloned()
        .collect();

    let products = spec.selected(Facet::Produto);
    let product_metrics: Vec<ProductMetric> = data
        .product_metrics
        .iter()
        .filter(|p| in_date_range(p.date, spec) && allows(products, Some(p.product.as_str())))
        .cloned()
        .collect();

    info!(
        start = %spec.start,
        end = %spec.end,
        tickets = tickets.len(),
        jobs = jobs.len(),
        product_metrics = product_metrics.len(),
        "filters applied"
    );

    DataSource {
        tickets,
        jobs,
        product_metrics,
        absent_facets: data.absent_facets.clone(),
    }
}

/// `start <= ts < end + 1 day`. An `end` at the last representable date has no upper bound.
fn in_window(ts: NaiveDateTime, spec: &FilterSpec) -> bool {
    let Some(start) = spec.start.and_hms_opt(0, 0, 0) else {
        return false;
    };
    if ts < start {
        return false;
    }
    match spec.end.succ_opt().and_then(|d| d.and_hms_opt(0, 0, 0)) {
        Some(upper) => ts < upper,
        None => true,
    }
}

fn in_date_range(date: NaiveDate, spec: &FilterSpec) -> bool {
    spec.start <= date && date <= spec.end
}

fn matches_selections(ticket: &Ticket, spec: &FilterSpec, absent: &BTreeSet<Facet>) -> bool {
    Facet::ALL
        .into_iter()
        .filter(|facet| !absent.contains(facet))
        .all(|facet| allows(spec.selected(facet), facet.ticket_value(ticket)))
}

fn allows(selection: Option<&BTreeSet<String>>, value: Option<&str>) -> bool {
    match (selection, value) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(set), Some(v)) => set.contains(v),
    }
}

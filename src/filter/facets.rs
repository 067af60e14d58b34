//! Facet derivation: what the user can filter on.

use std::collections::BTreeSet;

use crate::domain::{DataSource, Facet, FacetSet, FilterSpec};

/// Date bounds of the ticket timestamps plus sorted distinct values per categorical column.
pub fn derive_facets(data: &DataSource) -> FacetSet {
    let dates = data.tickets.iter().map(|t| t.timestamp.date());
    let min_date = dates.clone().min();
    let max_date = dates.max();

    let values = Facet::ALL
        .into_iter()
        .map(|facet| {
            let distinct: BTreeSet<&str> = data.tickets.iter().filter_map(|t| facet.ticket_value(t)).collect();
            (facet, distinct.into_iter().map(str::to_string).collect())
        })
        .collect();

    FacetSet {
        min_date,
        max_date,
        values,
    }
}

impl FilterSpec {
    /// Everything selected over the full facet date range.
    ///
    /// `None` when there are no tickets to take a date range from.
    pub fn from_facets(facets: &FacetSet) -> Option<Self> {
        let (start, end) = (facets.min_date?, facets.max_date?);
        let spec = Facet::ALL.into_iter().fold(FilterSpec::new(start, end), |spec, facet| {
            spec.with(facet, facets.values_of(facet).iter().cloned())
        });
        Some(spec)
    }
}

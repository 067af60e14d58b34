//! Reporting: plain-text blocks for the terminal.

pub mod format;

pub use format::{
    format_breakdowns, format_facets, format_filter, format_forecast_table, format_issues, format_kpis,
    format_propensity, format_row_counts, format_violations,
};

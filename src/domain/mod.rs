//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the three record families (`Ticket`, `JobRun`, `ProductMetric`) and `DataSource`
//! - filter inputs/outputs (`Facet`, `FacetSet`, `FilterSpec`)
//! - aggregate outputs (`OperationalKpis`, `ProductKpis`, `ForecastRow`)

pub mod types;

pub use types::*;

//! Forecast engine: daily series projection and the propensity model.

pub mod propensity;
pub mod series;

pub use propensity::{CONVERSION_WINDOW, FeatureTable, conversion_features, score_propensity};
pub use series::{DEFAULT_HORIZON, forecast_series};

//! Numeric helpers: least squares, interpolation, descriptive statistics.

pub mod interp;
pub mod ols;
pub mod stats;

pub use interp::linear_interp;
pub use ols::{fit_trend, solve_least_squares};

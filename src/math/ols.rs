//! Least squares solves.
//!
//! The forecast trend is a two-column problem (`[1, t]`) and the propensity
//! model solves small Newton systems; both go through the SVD solver below.
//! (Nalgebra's `QR::solve` is intended for square systems and will panic for
//! non-square matrices.)

use nalgebra::{DMatrix, DVector};

/// Solve `min ‖xβ − y‖²` using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Fit `y = intercept + slope·t` over `t = 0..n-1`.
///
/// Fewer than two points give a flat line through the first value (or zero).
pub fn fit_trend(y: &[f64]) -> Option<(f64, f64)> {
    match y {
        [] => return Some((0.0, 0.0)),
        [only] => return Some((*only, 0.0)),
        _ => {}
    }

    let n = y.len();
    let x = DMatrix::from_fn(n, 2, |r, c| if c == 0 { 1.0 } else { r as f64 });
    let beta = solve_least_squares(&x, &DVector::from_column_slice(y))?;
    Some((beta[0], beta[1]))
}

//! Conversion propensity: a small L2-regularized logistic regression.
//!
//! Features are scaled by their standard deviation (no centering). The model is
//! fit with Newton iterations on
//!
//! ```text
//! ½‖w‖² + C · Σ logloss(yᵢ, σ(b + xᵢᵀw))
//! ```
//!
//! with `C = 1` and an unpenalized intercept `b`.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::domain::ProductMetric;
use crate::error::AppError;
use crate::math::solve_least_squares;
use crate::math::stats::{mean_present, median, std_dev};

const C: f64 = 1.0;
const MAX_ITER: usize = 200;
const TOL: f64 = 1e-8;
/// Rows fed to the conversion model (most recent by date).
pub const CONVERSION_WINDOW: usize = 30;

/// Rectangular numeric features; `None` is a missing cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<f64>>>,
}

impl FeatureTable {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Option<f64>>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Dense matrix with missing (or non-finite) cells set to zero.
    fn zero_filled(&self) -> DMatrix<f64> {
        let d = self.columns.len();
        DMatrix::from_fn(self.rows.len(), d, |r, c| {
            self.rows[r].get(c).copied().flatten().filter(|v| v.is_finite()).unwrap_or(0.0)
        })
    }
}

/// Features `(applications, approvals)` and label `conversions > 0` for the
/// last [`CONVERSION_WINDOW`] rows by date.
pub fn conversion_features(product_metrics: &[ProductMetric]) -> (FeatureTable, Vec<Option<bool>>) {
    let mut sorted: Vec<&ProductMetric> = product_metrics.iter().collect();
    sorted.sort_by_key(|p| p.date);
    let tail = &sorted[sorted.len().saturating_sub(CONVERSION_WINDOW)..];

    let mut features = FeatureTable::new(["applications", "approvals"]);
    let mut labels = Vec::with_capacity(tail.len());
    for p in tail {
        features.push_row(vec![Some(p.applications as f64), Some(p.approvals as f64)]);
        labels.push(Some(p.conversions > 0));
    }
    (features, labels)
}

/// P(positive) per row.
///
/// Without usable labels (absent or all missing), rows whose feature mean is
/// strictly above the median row mean are the positives. When every labeled
/// row has the same class the score is that class for every row.
pub fn score_propensity(features: &FeatureTable, labels: Option<&[Option<bool>]>) -> Result<Vec<f64>, AppError> {
    let n = features.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    if let Some(labels) = labels {
        if labels.len() != n {
            return Err(AppError::usage(format!(
                "propensity labels ({}) do not match feature rows ({n})",
                labels.len()
            )));
        }
    }

    let labels: Vec<Option<bool>> = match labels {
        Some(l) if l.iter().any(Option::is_some) => l.to_vec(),
        _ => synthetic_labels(features),
    };
    let x = features.zero_filled();

    let train: Vec<(usize, bool)> = labels
        .iter()
        .enumerate()
        .filter_map(|(i, l)| l.map(|v| (i, v)))
        .collect();
    let positives = train.iter().filter(|(_, y)| *y).count();
    if positives == 0 || positives == train.len() {
        let constant = if positives == 0 { 0.0 } else { 1.0 };
        debug!(rows = n, constant, "single-class labels; constant propensity");
        return Ok(vec![constant; n]);
    }

    let scale = column_scales(&x, &train);
    let design = with_intercept(&x, &scale);
    let beta = fit_logistic(&design, &train);
    let z = &design * &beta;
    Ok(z.iter().map(|v| sigmoid(*v)).collect())
}

/// Row means skip missing cells; an all-missing row counts as 0.
fn synthetic_labels(features: &FeatureTable) -> Vec<Option<bool>> {
    let row_means: Vec<f64> = features
        .rows
        .iter()
        .map(|row| mean_present(row.iter().map(|v| (*v).filter(|x| x.is_finite()))).unwrap_or(0.0))
        .collect();
    let med = median(&row_means).unwrap_or(0.0);
    row_means.iter().map(|m| Some(*m > med)).collect()
}

/// Population std of each column over the training rows; zero-variance columns keep scale 1.
fn column_scales(x: &DMatrix<f64>, train: &[(usize, bool)]) -> Vec<f64> {
    (0..x.ncols())
        .map(|c| {
            let values: Vec<f64> = train.iter().map(|(r, _)| x[(*r, c)]).collect();
            match std_dev(&values) {
                Some(s) if s > 0.0 && s.is_finite() => s,
                _ => 1.0,
            }
        })
        .collect()
}

/// `[1 | x / scale]`
fn with_intercept(x: &DMatrix<f64>, scale: &[f64]) -> DMatrix<f64> {
    DMatrix::from_fn(x.nrows(), x.ncols() + 1, |r, c| if c == 0 { 1.0 } else { x[(r, c - 1)] / scale[c - 1] })
}

fn fit_logistic(design: &DMatrix<f64>, train: &[(usize, bool)]) -> DVector<f64> {
    let d = design.ncols();
    let mut beta = DVector::<f64>::zeros(d);

    for iter in 0..MAX_ITER {
        let mut grad = DVector::<f64>::zeros(d);
        let mut hess = DMatrix::<f64>::zeros(d, d);
        for &(r, y) in train {
            let row = design.row(r).transpose();
            let p = sigmoid(row.dot(&beta));
            let target = if y { 1.0 } else { 0.0 };
            grad += &row * (C * (p - target));
            hess += &row * row.transpose() * (C * p * (1.0 - p));
        }
        // L2 on weights only.
        for j in 1..d {
            grad[j] += beta[j];
            hess[(j, j)] += 1.0;
        }

        let step = match hess.clone().cholesky() {
            Some(chol) => chol.solve(&grad),
            None => match solve_least_squares(&hess, &grad) {
                Some(step) => step,
                None => break,
            },
        };
        beta -= &step;

        if step.amax() < TOL {
            debug!(iterations = iter + 1, "logistic fit converged");
            break;
        }
    }

    beta
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

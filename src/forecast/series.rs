//! Naive daily forecast: the average of a linear trend and a trailing moving average.
//!
//! Steps:
//!
//! 1. drop non-finite points, sort by date (last value wins on duplicates)
//! 2. reindex to a daily calendar, interpolating gaps linearly
//! 3. OLS trend over `t = 0..n-1`
//! 4. trailing moving average (window `min(7, max(1, n/4))`), back-filled
//! 5. prediction = (trend + moving average) / 2; future days hold the last average

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::ForecastRow;
use crate::math::{fit_trend, linear_interp};
use crate::math::stats::mean;

pub const DEFAULT_HORIZON: usize = 14;
const MAX_MA_WINDOW: usize = 7;

pub fn forecast_series(series: &[(NaiveDate, f64)], horizon: usize) -> Vec<ForecastRow> {
    let points: BTreeMap<NaiveDate, f64> = series.iter().filter(|(_, v)| v.is_finite()).copied().collect();
    let (dates, y) = reindex_daily(&points);
    let n = y.len();
    if n == 0 {
        return Vec::new();
    }

    let (intercept, slope) = fit_trend(&y).unwrap_or_else(|| (mean(&y).unwrap_or(0.0), 0.0));
    let trend = |t: usize| intercept + slope * t as f64;

    let window = MAX_MA_WINDOW.min((n / 4).max(1));
    let ma = moving_average(&y, window);
    debug!(n, horizon, window, slope, intercept, "forecast fitted");

    let mut out: Vec<ForecastRow> = dates
        .iter()
        .zip(&y)
        .enumerate()
        .map(|(i, (date, value))| ForecastRow {
            date: *date,
            observed: Some(*value),
            predicted: (trend(i) + ma[i]) / 2.0,
        })
        .collect();

    let last_ma = ma[n - 1];
    let mut date = dates[n - 1];
    for k in 0..horizon {
        let Some(next) = date.succ_opt() else {
            break;
        };
        date = next;
        out.push(ForecastRow {
            date,
            observed: None,
            predicted: (trend(n + k) + last_ma) / 2.0,
        });
    }

    out
}

/// Contiguous days from the first to the last point, gaps filled by interpolation.
fn reindex_daily(points: &BTreeMap<NaiveDate, f64>) -> (Vec<NaiveDate>, Vec<f64>) {
    let mut dates = Vec::new();
    let mut values = Vec::new();

    let known: Vec<(NaiveDate, f64)> = points.iter().map(|(d, v)| (*d, *v)).collect();
    let Some(&(first, first_value)) = known.first() else {
        return (dates, values);
    };
    dates.push(first);
    values.push(first_value);

    for pair in known.windows(2) {
        let (d0, v0) = pair[0];
        let (d1, v1) = pair[1];
        let span = (d1 - d0).num_days() as f64;
        for day in d0.iter_days().skip(1).take_while(|d| *d <= d1) {
            let offset = (day - d0).num_days() as f64;
            dates.push(day);
            values.push(linear_interp((0.0, v0), (span, v1), offset));
        }
    }

    (dates, values)
}

/// Trailing mean; the first `window - 1` positions take the first full window's value.
fn moving_average(y: &[f64], window: usize) -> Vec<f64> {
    let n = y.len();
    let window = window.clamp(1, n.max(1));
    let mut ma = vec![0.0; n];
    let mut sum: f64 = y[..window].iter().sum();
    ma[window - 1] = sum / window as f64;
    for i in window..n {
        sum += y[i] - y[i - window];
        ma[i] = sum / window as f64;
    }
    let first_full = ma[window - 1];
    for slot in ma.iter_mut().take(window - 1) {
        *slot = first_full;
    }
    ma
}

//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observed values: `o`
//! - in-sample prediction: `-` line
//! - out-of-sample prediction: `~` line

use crate::domain::ForecastRow;

/// Render observed vs predicted values of a forecast table.
///
/// The x axis is the row position (one column per day at most).
pub fn render_forecast_plot(rows: &[ForecastRow], width: usize, height: usize) -> String {
    let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
        return "Plot: no data\n".to_string();
    };

    let (lo, hi) = value_bounds(rows).unwrap_or((0.0, 1.0));
    let span = (hi - lo).abs();
    let margin = (span * 0.05).max(1e-12);
    let mut canvas = Canvas::new(
        width.max(10),
        height.max(5),
        (rows.len() as f64 - 1.0).max(1.0),
        (lo - margin, hi + margin),
    );

    // The forecast segment starts at the last in-sample point so both lines join.
    let in_sample = rows.iter().filter(|r| !r.is_future()).count();
    let join = in_sample.saturating_sub(1);
    let predicted = |(i, r): (usize, &ForecastRow)| (i as f64, r.predicted);

    let fitted: Vec<(f64, f64)> = rows.iter().enumerate().take(in_sample).map(predicted).collect();
    let ahead: Vec<(f64, f64)> = rows.iter().enumerate().skip(join).map(predicted).collect();
    canvas.path(&fitted, '-');
    canvas.path(&ahead, '~');

    // Points last so they sit on top of the lines.
    for (i, r) in rows.iter().enumerate() {
        if let Some(obs) = r.observed {
            canvas.mark(i as f64, obs, 'o');
        }
    }

    let (y_lo, y_hi) = canvas.y_bounds;
    let mut out = format!("Plot: {} .. {} | y=[{y_lo:.2}, {y_hi:.2}]\n", first.date, last.date);
    out.push_str(&canvas.render());
    out.push_str("o observed  - fitted  ~ forecast\n");
    out
}

/// Smallest and largest of every observed and predicted value.
fn value_bounds(rows: &[ForecastRow]) -> Option<(f64, f64)> {
    let values = rows.iter().flat_map(|r| r.observed.into_iter().chain(Some(r.predicted)));
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

    if !lo.is_finite() || !hi.is_finite() {
        None
    } else if hi > lo {
        Some((lo, hi))
    } else {
        // Flat series: give it a unit band.
        Some((lo - 0.5, lo + 0.5))
    }
}

/// Fixed-size character grid with row 0 at the top (largest y).
struct Canvas {
    cells: Vec<Vec<char>>,
    x_max: f64,
    y_bounds: (f64, f64),
}

impl Canvas {
    fn new(width: usize, height: usize, x_max: f64, y_bounds: (f64, f64)) -> Self {
        Self {
            cells: vec![vec![' '; width]; height],
            x_max,
            y_bounds,
        }
    }

    fn width(&self) -> usize {
        self.cells[0].len()
    }

    fn height(&self) -> usize {
        self.cells.len()
    }

    fn cell(&self, x: f64, y: f64) -> (isize, isize) {
        let (y_lo, y_hi) = self.y_bounds;
        let u = (x / self.x_max).clamp(0.0, 1.0);
        let v = ((y - y_lo) / (y_hi - y_lo)).clamp(0.0, 1.0);
        let cols = (self.width() - 1) as f64;
        let rows = (self.height() - 1) as f64;
        ((u * cols).round() as isize, (rows - v * rows).round() as isize)
    }

    /// Overwrites whatever is already there.
    fn mark(&mut self, x: f64, y: f64, ch: char) {
        let (col, row) = self.cell(x, y);
        self.cells[row as usize][col as usize] = ch;
    }

    fn path(&mut self, points: &[(f64, f64)], ch: char) {
        let mut prev: Option<(isize, isize)> = None;
        for &(x, y) in points {
            let here = self.cell(x, y);
            self.segment(prev.unwrap_or(here), here, ch);
            prev = Some(here);
        }
    }

    /// Bresenham between two cells; only blank cells are written.
    fn segment(&mut self, from: (isize, isize), to: (isize, isize), ch: char) {
        let (mut col, mut row) = from;
        let dx = (to.0 - col).abs();
        let dy = -(to.1 - row).abs();
        let step_x = if col < to.0 { 1 } else { -1 };
        let step_y = if row < to.1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            if let Some(cell) = self
                .cells
                .get_mut(row as usize)
                .and_then(|line| line.get_mut(col as usize))
            {
                if *cell == ' ' {
                    *cell = ch;
                }
            }

            if (col, row) == to {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                col += step_x;
            }
            if e2 <= dx {
                err += dx;
                row += step_y;
            }
        }
    }

    fn render(&self) -> String {
        let mut out = String::with_capacity((self.width() + 1) * self.height());
        for line in &self.cells {
            out.extend(line.iter());
            out.push('\n');
        }
        out
    }
}

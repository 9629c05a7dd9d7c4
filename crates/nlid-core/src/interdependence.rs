//! Directional nonlinear interdependence between two recurrence matrices
//!
//! For row `i`, with all distances measured in the *target* space and
//! `k` the number of the *source*'s recurrent neighbours of `i`:
//!
//! - `R_all`: mean distance from `i` to every admissible point
//! - `R_own`: mean distance from `i` to its `k` nearest admissible points
//! - `R_cond`: mean distance from `i` to the source's recurrent neighbours
//!
//! Since the `k` nearest points are never farther on average than any other
//! `k` points, `R_own <= R_cond` and the row statistic
//! `(R_all - R_cond) / (R_all - R_own)` is at most 1. It equals 1 when the
//! source neighbourhoods coincide with the target's nearest points and sits
//! near 0 when they are unrelated. The directional score averages it over
//! usable rows.

use crate::error::DegenerateError;
use crate::recurrence::{map_rows, RecurrenceMatrix};
use crate::types::ScorePair;

/// One direction of the interdependence measure.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DirectionalScore {
    /// Mean row statistic; `None` if no row was usable
    pub value: Option<f64>,
    /// Rows contributing to `value`
    pub rows_used: usize,
    /// Rows skipped (isolated point or flat distance profile)
    pub rows_excluded: usize,
}

impl DirectionalScore {
    fn from_rows(rows: impl ExactSizeIterator<Item = Option<f64>>) -> Self {
        let n = rows.len();
        let (sum, rows_used) = rows
            .flatten()
            .fold((0.0, 0_usize), |(sum, used), m| (sum + m, used + 1));
        Self {
            value: (rows_used > 0).then(|| sum / rows_used as f64),
            rows_used,
            rows_excluded: n - rows_used,
        }
    }
}

/// Score of `source` neighbourhoods mapped onto `target` distances.
///
/// Rows where either matrix has no neighbour besides the point itself, or
/// where the target's distance profile is flat, are excluded.
#[must_use]
pub fn directional_score(source: &RecurrenceMatrix, target: &RecurrenceMatrix) -> DirectionalScore {
    let n = source.size().min(target.size());
    let rows = map_rows(n, |i| {
        let mut scratch = Vec::with_capacity(n);
        row_statistic(source, target, i, &target.row_distances(i), &mut scratch)
    });
    DirectionalScore::from_rows(rows.into_iter())
}

/// Row statistic for row `i`; `target_row` holds target distances from `i`.
fn row_statistic(
    source: &RecurrenceMatrix,
    target: &RecurrenceMatrix,
    i: usize,
    target_row: &[f64],
    scratch: &mut Vec<f64>,
) -> Option<f64> {
    let k = source.neighbor_count(i);
    if k == 0 || target.neighbor_count(i) == 0 {
        return None;
    }
    let r_all = target.mean_distance(i)?;
    let r_cond = source.neighbors(i).map(|j| target_row[j]).sum::<f64>() / k as f64;

    scratch.clear();
    scratch.extend(target.admissible_columns(i).map(|j| target_row[j]));
    let k = k.min(scratch.len());
    if k == 0 {
        return None;
    }
    scratch.select_nth_unstable_by(k - 1, f64::total_cmp);
    // Same point set as `r_cond` in the self-coupled case; rounding must not
    // push the ratio above 1
    let r_own = (scratch[..k].iter().sum::<f64>() / k as f64).min(r_cond);

    let spread = r_all - r_own;
    if spread <= 0.0 {
        return None;
    }
    Some((r_all - r_cond) / spread)
}

/// Both directional scores for one window.
///
/// `xy` maps X neighbourhoods onto Y distances, `yx` the reverse. Each row's
/// distances are computed once and shared by both directions.
///
/// # Errors
///
/// [`DegenerateError::SizeMismatch`] if the matrices differ in size.
pub fn interdependence(x: &RecurrenceMatrix, y: &RecurrenceMatrix) -> Result<ScorePair, DegenerateError> {
    if x.size() != y.size() {
        return Err(DegenerateError::SizeMismatch { x: x.size(), y: y.size() });
    }
    let n = x.size();
    let rows = map_rows(n, |i| {
        let mut scratch = Vec::with_capacity(n);
        let xy = row_statistic(x, y, i, &y.row_distances(i), &mut scratch);
        let yx = row_statistic(y, x, i, &x.row_distances(i), &mut scratch);
        (xy, yx)
    });
    Ok(ScorePair {
        xy: DirectionalScore::from_rows(rows.iter().map(|r| r.0)).value,
        yx: DirectionalScore::from_rows(rows.iter().map(|r| r.1)).value,
    })
}

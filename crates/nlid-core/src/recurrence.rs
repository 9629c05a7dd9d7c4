//! Recurrence (proximity) matrices over a delay-embedded trajectory
//!
//! Cell `(i, j)` is recurrent when points `i` and `j` lie within the
//! effective radius of each other. The radius is either absolute
//! ([`ThresholdMode::Fixed`]) or a fraction of the trajectory's largest
//! pairwise distance ([`ThresholdMode::Dynamic`]), which makes recurrence
//! density independent of signal amplitude.
//!
//! The matrix is kept sparse: each row stores its sorted neighbour indices
//! (diagonal included) plus the distance statistics the interdependence
//! measure needs. The owned trajectory answers any other distance query, so
//! no dense `n x n` float buffer is ever allocated.

use serde::{Deserialize, Serialize};

use crate::embedding::Trajectory;
use crate::error::ConfigError;

// ============================================================================
// Parameters
// ============================================================================

/// Distance between two embedded points.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// L2 norm
    #[default]
    Euclidean,
    /// L-infinity (maximum) norm
    Chebyshev,
    /// L1 norm
    Manhattan,
}

impl DistanceMetric {
    /// Distance between equal-length points `a` and `b`
    #[inline]
    #[must_use]
    pub fn distance(self, a: &[f64], b: &[f64]) -> f64 {
        let diffs = a.iter().zip(b).map(|(x, y)| x - y);
        match self {
            Self::Euclidean => diffs.map(|d| d * d).sum::<f64>().sqrt(),
            Self::Chebyshev => diffs.map(f64::abs).fold(0.0, f64::max),
            Self::Manhattan => diffs.map(f64::abs).sum(),
        }
    }
}

/// How the recurrence radius is derived from the threshold.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Radius equals the threshold
    Fixed,
    /// Radius equals threshold x maximum pairwise distance
    #[default]
    Dynamic,
}

/// Recurrence construction parameters.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecurrenceParams {
    /// Absolute radius (fixed) or fraction of max distance (dynamic)
    pub threshold: f64,
    /// Threshold interpretation
    pub mode: ThresholdMode,
    /// Point distance
    pub metric: DistanceMetric,
    /// Minimum index separation for two distinct points to be neighbours;
    /// 0 and 1 disable the exclusion
    pub theiler_window: usize,
}

impl Default for RecurrenceParams {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            mode: ThresholdMode::Dynamic,
            metric: DistanceMetric::Euclidean,
            theiler_window: 0,
        }
    }
}

impl RecurrenceParams {
    /// # Errors
    ///
    /// [`ConfigError::InvalidThreshold`] if the threshold is not a positive
    /// finite number, or exceeds 1 in dynamic mode.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.threshold;
        if !(threshold.is_finite() && threshold > 0.0) {
            return Err(ConfigError::InvalidThreshold {
                threshold,
                reason: "must be positive and finite",
            });
        }
        if self.mode == ThresholdMode::Dynamic && threshold > 1.0 {
            return Err(ConfigError::InvalidThreshold {
                threshold,
                reason: "dynamic threshold is a fraction of the maximum distance (<= 1)",
            });
        }
        Ok(())
    }

    /// Effective radius for a trajectory whose largest pairwise distance is
    /// `max_distance`
    #[inline]
    #[must_use]
    pub fn radius(&self, max_distance: f64) -> f64 {
        match self.mode {
            ThresholdMode::Fixed => self.threshold,
            ThresholdMode::Dynamic => self.threshold * max_distance,
        }
    }
}

// ============================================================================
// Recurrence Matrix
// ============================================================================

/// Per-row distance totals and neighbours from one scan
#[derive(Clone, Debug, Default)]
struct RowScan {
    max: f64,
    sum: f64,
    count: usize,
    indices: Vec<usize>,
    neighbor_sum: f64,
}

/// Square recurrence structure over one trajectory.
#[derive(Clone, Debug)]
pub struct RecurrenceMatrix {
    trajectory: Trajectory,
    metric: DistanceMetric,
    theiler_window: usize,
    max_distance: f64,
    radius: f64,
    /// Sorted neighbour indices per row, including the row itself
    rows: Vec<Vec<usize>>,
    /// Mean distance to all admissible points
    mean_distance: Vec<Option<f64>>,
    /// Mean distance to recurrent neighbours (self excluded)
    neighbor_mean_distance: Vec<Option<f64>>,
}

impl RecurrenceMatrix {
    /// Build the recurrence matrix of `trajectory`.
    ///
    /// A fixed radius needs a single O(n^2) scan, parallel over rows, that
    /// collects neighbours and per-row distance means together. A dynamic
    /// radius first finds the largest distance over the upper triangle only
    /// (distances are symmetric), then runs the same scan.
    ///
    /// `params` is expected to be validated.
    #[must_use]
    pub fn build(trajectory: Trajectory, params: &RecurrenceParams) -> Self {
        let n = trajectory.len();
        let metric = params.metric;
        let theiler_window = params.theiler_window;
        let traj = &trajectory;

        let dynamic_max = (params.mode == ThresholdMode::Dynamic).then(|| {
            map_rows(n, |i| {
                let p = traj.point(i);
                traj.points().skip(i + 1).map(|q| metric.distance(p, q)).fold(0.0, f64::max)
            })
            .into_iter()
            .fold(0.0, f64::max)
        });
        let radius = params.radius(dynamic_max.unwrap_or(0.0));

        let scans: Vec<RowScan> = map_rows(n, |i| {
            let p = traj.point(i);
            let mut scan = RowScan::default();
            for (j, q) in traj.points().enumerate() {
                if j == i {
                    scan.indices.push(j);
                    continue;
                }
                let d = metric.distance(p, q);
                scan.max = scan.max.max(d);
                if !admissible(i, j, theiler_window) {
                    continue;
                }
                scan.sum += d;
                scan.count += 1;
                if d <= radius {
                    scan.indices.push(j);
                    scan.neighbor_sum += d;
                }
            }
            scan
        });

        let max_distance =
            dynamic_max.unwrap_or_else(|| scans.iter().map(|s| s.max).fold(0.0, f64::max));

        let mut rows = Vec::with_capacity(n);
        let mut mean_distance = Vec::with_capacity(n);
        let mut neighbor_mean_distance = Vec::with_capacity(n);
        for scan in scans {
            let neighbors = scan.indices.len() - 1;
            mean_distance.push((scan.count > 0).then(|| scan.sum / scan.count as f64));
            neighbor_mean_distance.push((neighbors > 0).then(|| scan.neighbor_sum / neighbors as f64));
            rows.push(scan.indices);
        }

        Self {
            trajectory,
            metric,
            theiler_window,
            max_distance,
            radius,
            rows,
            mean_distance,
            neighbor_mean_distance,
        }
    }

    /// Number of rows (trajectory length)
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.rows.len()
    }

    /// Effective recurrence radius
    #[inline]
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Largest pairwise distance in the trajectory
    #[inline]
    #[must_use]
    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    /// Distance metric
    #[inline]
    #[must_use]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Theiler exclusion window
    #[inline]
    #[must_use]
    pub fn theiler_window(&self) -> usize {
        self.theiler_window
    }

    /// Underlying trajectory
    #[must_use]
    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// Whether cell `(i, j)` is recurrent
    #[must_use]
    pub fn is_recurrent(&self, i: usize, j: usize) -> bool {
        i == j || self.rows[i].binary_search(&j).is_ok()
    }

    /// Sorted recurrent columns of row `i`, including `i`
    #[must_use]
    pub fn row(&self, i: usize) -> &[usize] {
        &self.rows[i]
    }

    /// Recurrent neighbours of `i`, excluding `i`
    pub fn neighbors(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        self.rows[i].iter().copied().filter(move |&j| j != i)
    }

    /// Number of recurrent neighbours of `i`, excluding `i`
    #[must_use]
    pub fn neighbor_count(&self, i: usize) -> usize {
        self.rows[i].len() - 1
    }

    /// Fraction of recurrent cells, diagonal included
    #[must_use]
    pub fn recurrence_rate(&self) -> f64 {
        let n = self.size();
        if n == 0 {
            return 0.0;
        }
        let cells: usize = self.rows.iter().map(Vec::len).sum();
        cells as f64 / (n * n) as f64
    }

    /// Distance between trajectory points `i` and `j`
    #[inline]
    #[must_use]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.metric.distance(self.trajectory.point(i), self.trajectory.point(j))
    }

    /// Distances from point `i` to every point, in index order
    #[must_use]
    pub fn row_distances(&self, i: usize) -> Vec<f64> {
        let p = self.trajectory.point(i);
        self.trajectory.points().map(|q| self.metric.distance(p, q)).collect()
    }

    /// Columns `j != i` that may be neighbours of `i` under the Theiler window
    pub fn admissible_columns(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.size()).filter(move |&j| j != i && admissible(i, j, self.theiler_window))
    }

    /// Mean distance from `i` to every admissible point
    #[must_use]
    pub fn mean_distance(&self, i: usize) -> Option<f64> {
        self.mean_distance[i]
    }

    /// Mean distance from `i` to its recurrent neighbours; `None` for an
    /// isolated point
    #[must_use]
    pub fn neighbor_mean_distance(&self, i: usize) -> Option<f64> {
        self.neighbor_mean_distance[i]
    }
}

/// Whether distinct points `i` and `j` are far enough apart in time
#[inline]
fn admissible(i: usize, j: usize, theiler_window: usize) -> bool {
    i.abs_diff(j) >= theiler_window.max(1)
}

/// Evaluate `f` for every row index, in parallel when enabled
#[cfg(feature = "parallel")]
pub(crate) fn map_rows<T, F>(n: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Send + Sync,
{
    use rayon::prelude::*;

    (0..n).into_par_iter().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn map_rows<T, F>(n: usize, f: F) -> Vec<T>
where
    F: Fn(usize) -> T,
{
    (0..n).map(f).collect()
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::embedding::{reconstruct, EmbeddingParams};

    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
    }

    fn matrix(window: &[f64], params: &RecurrenceParams) -> RecurrenceMatrix {
        let traj = reconstruct(window, &EmbeddingParams::new(3, 1)).unwrap();
        RecurrenceMatrix::build(traj, params)
    }

    #[test]
    fn test_symmetric_with_recurrent_diagonal() {
        let window = noise(120, 7);
        for metric in [DistanceMetric::Euclidean, DistanceMetric::Chebyshev, DistanceMetric::Manhattan] {
            let params = RecurrenceParams { threshold: 0.3, metric, ..Default::default() };
            let rm = matrix(&window, &params);
            let n = rm.size();
            assert_eq!(n, 118);
            for i in 0..n {
                assert!(rm.is_recurrent(i, i));
                for j in 0..n {
                    assert_eq!(rm.is_recurrent(i, j), rm.is_recurrent(j, i), "{metric:?} ({i},{j})");
                }
            }
        }
    }

    #[test]
    fn test_dynamic_density_scale_invariant() {
        let window = noise(200, 11);
        let params = RecurrenceParams::default();
        let base = matrix(&window, &params);

        // Power-of-two scaling is exact in floating point
        for scale in [1024.0, 1.0 / 128.0] {
            let scaled: Vec<f64> = window.iter().map(|x| x * scale).collect();
            let rm = matrix(&scaled, &params);
            assert_eq!(rm.recurrence_rate(), base.recurrence_rate());
            for i in 0..rm.size() {
                assert_eq!(rm.row(i), base.row(i));
            }
        }

        let scaled: Vec<f64> = window.iter().map(|x| x * 37.3).collect();
        let rate = matrix(&scaled, &params).recurrence_rate();
        assert!((rate - base.recurrence_rate()).abs() < 1e-3);
    }

    #[test]
    fn test_fixed_radius_is_absolute() {
        let window = noise(150, 3);
        let params = RecurrenceParams { threshold: 0.4, mode: ThresholdMode::Fixed, ..Default::default() };
        let base = matrix(&window, &params);
        assert_eq!(base.radius(), 0.4);

        let scaled: Vec<f64> = window.iter().map(|x| x * 4.0).collect();
        let rm = matrix(&scaled, &params);
        assert!(rm.recurrence_rate() < base.recurrence_rate());
    }

    #[test]
    fn test_dynamic_radius_fraction_of_max() {
        let window = noise(80, 5);
        let rm = matrix(&window, &RecurrenceParams::default());

        let mut max = 0.0_f64;
        for i in 0..rm.size() {
            for j in 0..rm.size() {
                max = max.max(rm.distance(i, j));
            }
        }
        assert_eq!(rm.max_distance(), max);
        assert!((rm.radius() - 0.1 * max).abs() < 1e-15);

        for i in 0..rm.size() {
            for j in rm.neighbors(i) {
                assert!(rm.distance(i, j) <= rm.radius());
            }
        }
    }

    #[test]
    fn test_fixed_and_dynamic_scans_agree() {
        let window = noise(90, 13);
        let dynamic = matrix(&window, &RecurrenceParams::default());
        let fixed = matrix(
            &window,
            &RecurrenceParams { threshold: dynamic.radius(), mode: ThresholdMode::Fixed, ..Default::default() },
        );

        assert_eq!(fixed.max_distance(), dynamic.max_distance());
        assert_eq!(fixed.radius(), dynamic.radius());
        for i in 0..fixed.size() {
            assert_eq!(fixed.row(i), dynamic.row(i));
            assert_eq!(fixed.mean_distance(i), dynamic.mean_distance(i));
            assert_eq!(fixed.neighbor_mean_distance(i), dynamic.neighbor_mean_distance(i));
        }
    }

    #[test]
    fn test_row_distances_and_admissible_columns() {
        let window = noise(40, 17);
        let params = RecurrenceParams { theiler_window: 3, ..Default::default() };
        let rm = matrix(&window, &params);

        let row = rm.row_distances(10);
        assert_eq!(row.len(), rm.size());
        assert_eq!(row[10], 0.0);
        assert_eq!(row[25], rm.distance(10, 25));

        let cols: Vec<usize> = rm.admissible_columns(10).collect();
        assert_eq!(cols.len(), rm.size() - 5);
        assert!(cols.iter().all(|&j| j.abs_diff(10) >= 3));
    }

    #[test]
    fn test_theiler_window_excludes_temporal_neighbors() {
        let window: Vec<f64> = (0..100).map(|i| (f64::from(i) * 0.05).sin()).collect();
        let params = RecurrenceParams { theiler_window: 5, ..Default::default() };
        let rm = matrix(&window, &params);

        for i in 0..rm.size() {
            assert!(rm.is_recurrent(i, i));
            assert!(rm.neighbors(i).all(|j| i.abs_diff(j) >= 5));
        }
    }

    #[test]
    fn test_constant_trajectory_fully_recurrent() {
        let rm = matrix(&[2.5; 20], &RecurrenceParams::default());
        assert_eq!(rm.radius(), 0.0);
        assert_eq!(rm.recurrence_rate(), 1.0);
        assert_eq!(rm.mean_distance(0), Some(0.0));
        assert_eq!(rm.neighbor_mean_distance(0), Some(0.0));
    }

    #[test]
    fn test_isolated_points_have_no_neighbor_mean() {
        let window = noise(60, 9);
        let params = RecurrenceParams { threshold: 1e-12, mode: ThresholdMode::Fixed, ..Default::default() };
        let rm = matrix(&window, &params);
        for i in 0..rm.size() {
            assert_eq!(rm.neighbor_count(i), 0);
            assert_eq!(rm.neighbor_mean_distance(i), None);
            assert!(rm.mean_distance(i).is_some());
        }
    }

    #[test]
    fn test_threshold_validation() {
        let mut params = RecurrenceParams::default();
        assert!(params.validate().is_ok());

        params.threshold = 1.5;
        assert!(params.validate().is_err());
        params.mode = ThresholdMode::Fixed;
        assert!(params.validate().is_ok());

        params.threshold = 0.0;
        assert!(params.validate().is_err());
        params.threshold = f64::NAN;
        assert!(params.validate().is_err());
    }
}

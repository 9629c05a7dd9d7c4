//! Delay-embedding phase-space reconstruction

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, DegenerateError};

/// Embedding dimension and delay.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingParams {
    /// Embedding dimension m (>= 2)
    pub dimension: usize,
    /// Time delay tau in samples (>= 1)
    pub delay: usize,
}

impl EmbeddingParams {
    /// Create parameters without validation
    #[must_use]
    pub const fn new(dimension: usize, delay: usize) -> Self {
        Self { dimension, delay }
    }

    /// Samples spanned by one embedded point beyond its first, `(m-1)*tau`
    #[inline]
    #[must_use]
    pub const fn span(&self) -> usize {
        self.dimension.saturating_sub(1) * self.delay
    }

    /// Trajectory length for a window of `window_len` samples, if positive.
    /// Zero-dimensional points never form a trajectory.
    #[must_use]
    pub fn trajectory_len(&self, window_len: usize) -> Option<usize> {
        if self.dimension == 0 {
            return None;
        }
        window_len.checked_sub(self.span()).filter(|&n| n > 0)
    }

    /// # Errors
    ///
    /// [`ConfigError::InvalidEmbedding`] if `dimension < 2` or `delay < 1`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dimension < 2 || self.delay < 1 {
            return Err(ConfigError::InvalidEmbedding {
                dimension: self.dimension,
                delay: self.delay,
            });
        }
        Ok(())
    }
}

impl Default for EmbeddingParams {
    fn default() -> Self {
        Self::new(3, 1)
    }
}

/// Delay-embedded trajectory, stored row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory {
    dimension: usize,
    coords: Vec<f64>,
}

impl Trajectory {
    /// Number of points
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.coords.len().checked_div(self.dimension).unwrap_or(0)
    }

    /// Whether the trajectory has no points
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Embedding dimension
    #[inline]
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Coordinates of point `i`
    #[inline]
    #[must_use]
    pub fn point(&self, i: usize) -> &[f64] {
        &self.coords[i * self.dimension..(i + 1) * self.dimension]
    }

    /// Iterate points in order
    pub fn points(&self) -> impl ExactSizeIterator<Item = &[f64]> {
        self.coords.chunks_exact(self.dimension)
    }
}

/// Reconstruct the trajectory of `window`.
///
/// Point `i` is `(x[i], x[i+tau], ..., x[i+(m-1)*tau])`.
///
/// # Errors
///
/// [`DegenerateError::EmbeddingTooShort`] if `window.len() <= (m-1)*tau`
/// or `m` is zero.
pub fn reconstruct(window: &[f64], params: &EmbeddingParams) -> Result<Trajectory, DegenerateError> {
    let EmbeddingParams { dimension, delay } = *params;
    let n = params.trajectory_len(window.len()).ok_or(DegenerateError::EmbeddingTooShort {
        window_len: window.len(),
        dimension,
        delay,
    })?;

    let mut coords = Vec::with_capacity(n * dimension);
    for i in 0..n {
        coords.extend((0..dimension).map(|k| window[i + k * delay]));
    }

    Ok(Trajectory { dimension, coords })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trajectory_length() {
        let window: Vec<f64> = (0..100).map(f64::from).collect();
        for (m, tau) in [(2, 1), (3, 1), (3, 5), (7, 10)] {
            let params = EmbeddingParams::new(m, tau);
            let traj = reconstruct(&window, &params).unwrap();
            assert_eq!(traj.len(), 100 - (m - 1) * tau);
            assert_eq!(traj.dimension(), m);
        }
    }

    #[test]
    fn test_point_layout() {
        let window = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let traj = reconstruct(&window, &EmbeddingParams::new(3, 2)).unwrap();
        assert_eq!(traj.len(), 2);
        assert_eq!(traj.point(0), &[0.0, 2.0, 4.0]);
        assert_eq!(traj.point(1), &[1.0, 3.0, 5.0]);
        assert_eq!(traj.points().count(), 2);
    }

    #[test]
    fn test_too_short_window_fails() {
        let params = EmbeddingParams::new(3, 2);
        for len in [0, 3, 4] {
            let window = vec![1.0; len];
            assert_eq!(
                reconstruct(&window, &params),
                Err(DegenerateError::EmbeddingTooShort { window_len: len, dimension: 3, delay: 2 })
            );
        }
        assert_eq!(reconstruct(&[1.0; 5], &params).unwrap().len(), 1);
    }

    #[test]
    fn test_zero_dimension_is_degenerate() {
        let params = EmbeddingParams::new(0, 1);
        assert_eq!(params.trajectory_len(10), None);
        assert_eq!(
            reconstruct(&[1.0; 10], &params),
            Err(DegenerateError::EmbeddingTooShort { window_len: 10, dimension: 0, delay: 1 })
        );
    }

    #[test]
    fn test_validate() {
        assert!(EmbeddingParams::new(3, 1).validate().is_ok());
        assert!(EmbeddingParams::new(1, 1).validate().is_err());
        assert!(EmbeddingParams::new(3, 0).validate().is_err());
    }
}

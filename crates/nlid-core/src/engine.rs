//! Per-window analysis capability
//!
//! [`InterdependenceEngine`] is the seam between orchestration and the
//! recurrence primitives: reconstruct a window, build its recurrence matrix,
//! score a matrix pair. [`RecurrenceNlid`] is the reference implementation;
//! alternative metrics or threshold strategies plug in behind the trait
//! without touching the band pipeline.

use crate::config::AnalysisConfig;
use crate::embedding::{reconstruct, EmbeddingParams, Trajectory};
use crate::error::{ConfigError, DegenerateError};
use crate::interdependence::interdependence;
use crate::recurrence::{RecurrenceMatrix, RecurrenceParams};
use crate::types::ScorePair;

/// Window-level NLID operations.
pub trait InterdependenceEngine: Send + Sync {
    /// Delay-embed one window.
    ///
    /// # Errors
    ///
    /// [`DegenerateError::EmbeddingTooShort`] if the window cannot hold a
    /// single embedded point.
    fn reconstruct(&self, window: &[f64]) -> Result<Trajectory, DegenerateError>;

    /// Build the recurrence matrix of a trajectory.
    fn build_matrix(&self, trajectory: Trajectory) -> RecurrenceMatrix;

    /// Score a pair of matrices from the same window.
    ///
    /// # Errors
    ///
    /// [`DegenerateError::SizeMismatch`] if the matrices differ in size.
    fn compute_scores(
        &self,
        x: &RecurrenceMatrix,
        y: &RecurrenceMatrix,
    ) -> Result<ScorePair, DegenerateError>;

    /// Full chain for one synchronized window pair.
    ///
    /// # Errors
    ///
    /// Any [`DegenerateError`] from the individual steps.
    fn analyze_window(&self, x: &[f64], y: &[f64]) -> Result<ScorePair, DegenerateError> {
        let rx = self.build_matrix(self.reconstruct(x)?);
        let ry = self.build_matrix(self.reconstruct(y)?);
        self.compute_scores(&rx, &ry)
    }
}

/// Delay embedding + thresholded recurrence + neighbourhood interdependence.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RecurrenceNlid {
    embedding: EmbeddingParams,
    recurrence: RecurrenceParams,
}

impl RecurrenceNlid {
    /// Create an engine from validated parameters.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidEmbedding`] or [`ConfigError::InvalidThreshold`].
    pub fn new(embedding: EmbeddingParams, recurrence: RecurrenceParams) -> Result<Self, ConfigError> {
        embedding.validate()?;
        recurrence.validate()?;
        Ok(Self { embedding, recurrence })
    }

    /// Engine for the embedding and recurrence sections of `config`.
    ///
    /// # Errors
    ///
    /// See [`RecurrenceNlid::new`].
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, ConfigError> {
        Self::new(config.embedding, config.recurrence)
    }

    /// Embedding parameters
    #[must_use]
    pub fn embedding(&self) -> &EmbeddingParams {
        &self.embedding
    }

    /// Recurrence parameters
    #[must_use]
    pub fn recurrence(&self) -> &RecurrenceParams {
        &self.recurrence
    }
}

impl InterdependenceEngine for RecurrenceNlid {
    fn reconstruct(&self, window: &[f64]) -> Result<Trajectory, DegenerateError> {
        reconstruct(window, &self.embedding)
    }

    fn build_matrix(&self, trajectory: Trajectory) -> RecurrenceMatrix {
        RecurrenceMatrix::build(trajectory, &self.recurrence)
    }

    fn compute_scores(
        &self,
        x: &RecurrenceMatrix,
        y: &RecurrenceMatrix,
    ) -> Result<ScorePair, DegenerateError> {
        interdependence(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::DistanceMetric;

    #[test]
    fn test_invalid_parameters_rejected() {
        assert!(RecurrenceNlid::new(EmbeddingParams::new(1, 1), RecurrenceParams::default()).is_err());

        let bad_threshold = RecurrenceParams { threshold: -1.0, ..Default::default() };
        assert!(RecurrenceNlid::new(EmbeddingParams::default(), bad_threshold).is_err());
    }

    #[test]
    fn test_analyze_window_short_window_degenerate() {
        let engine = RecurrenceNlid::default();
        assert!(matches!(
            engine.analyze_window(&[1.0, 2.0], &[1.0, 2.0]),
            Err(DegenerateError::EmbeddingTooShort { .. })
        ));
    }

    #[test]
    fn test_analyze_identical_windows() {
        let window: Vec<f64> = (0..200).map(|i| (f64::from(i) * 0.37).sin() + (f64::from(i) * 0.11).cos()).collect();
        let recurrence = RecurrenceParams { metric: DistanceMetric::Chebyshev, ..Default::default() };
        let engine = RecurrenceNlid::new(EmbeddingParams::new(3, 2), recurrence).unwrap();

        let scores = engine.analyze_window(&window, &window).unwrap();
        assert!((scores.xy.unwrap() - 1.0).abs() < 1e-12);
        assert!((scores.yx.unwrap() - 1.0).abs() < 1e-12);
    }
}

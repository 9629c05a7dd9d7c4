//! Band pipeline: filter → window → embed → recurrence → score → aggregate
//!
//! One [`BandPipeline`] serves any number of channel pairs. Per band it
//! filters both channels once, slices synchronized windows, scores every
//! window pair in parallel and reduces the scores with a
//! [`ScoreAccumulator`]. Bands are independent and also run in parallel.
//!
//! # Example
//!
//! ```rust
//! use nlid_core::{AnalysisConfig, Signal, WindowConfig};
//! use nlid_native::processing::pipeline::BandPipeline;
//!
//! let samples: Vec<f64> = (0..1024).map(|i| (i as f64 * 0.2).sin()).collect();
//! let signal = Signal::new("Cz", samples).unwrap();
//!
//! let config = AnalysisConfig {
//!     window: WindowConfig { length: 256, overlap: 0.5 },
//!     ..Default::default()
//! };
//! let pipeline = BandPipeline::new(config).unwrap();
//!
//! for result in pipeline.run(&signal, &signal).unwrap() {
//!     println!("{}: {:?} / {:?}", result.band, result.mean_xy, result.mean_yx);
//! }
//! ```

use std::fmt;

use rayon::prelude::*;
use tracing::{debug, trace, warn};

use nlid_core::config::AnalysisConfig;
use nlid_core::engine::{InterdependenceEngine, RecurrenceNlid};
use nlid_core::error::{ConfigError, DataError, DegenerateError, NlidError};
use nlid_core::filter::BandFilter;
use nlid_core::types::{Band, BandResult, ScorePair, Signal};
use nlid_core::window::{Window, WindowPlan};

// ============================================================================
// Pipeline Stages
// ============================================================================

/// Lifecycle of one band run, reported in log events.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    /// Not started
    Idle,
    /// Bandpass filtering both channels
    Filtering,
    /// Generating synchronized windows
    Windowing,
    /// Delay-embedding one window pair
    Embedding,
    /// Building recurrence matrices
    RecurrenceBuilding,
    /// Scoring a matrix pair
    ScoreComputing,
    /// Reducing window scores
    Aggregating,
    /// Finished, possibly with missing values
    Done,
    /// Aborted on malformed input
    Failed,
}

impl PipelineStage {
    /// Stage name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Filtering => "filtering",
            Self::Windowing => "windowing",
            Self::Embedding => "embedding",
            Self::RecurrenceBuilding => "recurrence",
            Self::ScoreComputing => "scoring",
            Self::Aggregating => "aggregating",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Whether the run ends in this stage
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Score Aggregation
// ============================================================================

/// Running sums and counts of window scores.
///
/// `merge` is commutative and associative, so partial accumulators from
/// windows finished in any order combine to the same totals.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ScoreAccumulator {
    sum_xy: f64,
    count_xy: usize,
    sum_yx: f64,
    count_yx: usize,
    windows: usize,
    degenerate: usize,
}

impl ScoreAccumulator {
    /// Add the scores of one window
    pub fn push(&mut self, scores: ScorePair) {
        self.windows += 1;
        if let Some(xy) = scores.xy {
            self.sum_xy += xy;
            self.count_xy += 1;
        }
        if let Some(yx) = scores.yx {
            self.sum_yx += yx;
            self.count_yx += 1;
        }
    }

    /// Count a window that could not be scored
    pub fn push_degenerate(&mut self) {
        self.windows += 1;
        self.degenerate += 1;
    }

    /// Combine two partial accumulators
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            sum_xy: self.sum_xy + other.sum_xy,
            count_xy: self.count_xy + other.count_xy,
            sum_yx: self.sum_yx + other.sum_yx,
            count_yx: self.count_yx + other.count_yx,
            windows: self.windows + other.windows,
            degenerate: self.degenerate + other.degenerate,
        }
    }

    /// Mean X→Y score, if any window defined one
    #[must_use]
    pub fn mean_xy(&self) -> Option<f64> {
        (self.count_xy > 0).then(|| self.sum_xy / self.count_xy as f64)
    }

    /// Mean Y→X score, if any window defined one
    #[must_use]
    pub fn mean_yx(&self) -> Option<f64> {
        (self.count_yx > 0).then(|| self.sum_yx / self.count_yx as f64)
    }

    /// Windows seen
    #[must_use]
    pub fn windows(&self) -> usize {
        self.windows
    }

    /// Final record for `band`
    #[must_use]
    pub fn finish(self, band: &str) -> BandResult {
        BandResult {
            band: band.to_string(),
            mean_xy: self.mean_xy(),
            mean_yx: self.mean_yx(),
            windows: self.windows,
            scored_xy: self.count_xy,
            scored_yx: self.count_yx,
            degenerate_windows: self.degenerate,
        }
    }
}

// ============================================================================
// Band Pipeline
// ============================================================================

/// Per-band NLID analysis of one channel pair.
///
/// X is the target channel, Y the reference channel.
pub struct BandPipeline<E = RecurrenceNlid> {
    config: AnalysisConfig,
    plan: WindowPlan,
    engine: E,
}

impl BandPipeline<RecurrenceNlid> {
    /// Create a pipeline with the reference recurrence engine.
    ///
    /// # Errors
    ///
    /// The first [`ConfigError`] found in `config`.
    pub fn new(config: AnalysisConfig) -> Result<Self, ConfigError> {
        let engine = RecurrenceNlid::from_config(&config)?;
        Self::with_engine(config, engine)
    }
}

impl<E: InterdependenceEngine> BandPipeline<E> {
    /// Create a pipeline around a custom engine.
    ///
    /// # Errors
    ///
    /// The first [`ConfigError`] found in `config`.
    pub fn with_engine(config: AnalysisConfig, engine: E) -> Result<Self, ConfigError> {
        config.validate()?;
        let plan = config.window_plan()?;
        Ok(Self { config, plan, engine })
    }

    /// Run configuration
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Window plan derived from the configuration
    pub fn plan(&self) -> &WindowPlan {
        &self.plan
    }

    /// Per-window engine
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Analyse every configured band, in catalog order.
    ///
    /// # Errors
    ///
    /// [`DataError::LengthMismatch`] if the channels differ in length.
    pub fn run(&self, target: &Signal, reference: &Signal) -> Result<Vec<BandResult>, NlidError> {
        check_lengths(target, reference)?;
        self.config
            .bands
            .as_slice()
            .par_iter()
            .map(|band| self.run_band(target, reference, band))
            .collect()
    }

    /// Analyse one band.
    ///
    /// A signal shorter than the window yields a result with missing means,
    /// not an error. Degenerate windows are counted and skipped.
    ///
    /// # Errors
    ///
    /// [`DataError::LengthMismatch`] for unequal channels,
    /// [`ConfigError::InvalidBand`] for a band outside (0, Nyquist).
    pub fn run_band(
        &self,
        target: &Signal,
        reference: &Signal,
        band: &Band,
    ) -> Result<BandResult, NlidError> {
        if let Err(err) = check_lengths(target, reference) {
            warn!(band = %band.name, stage = %PipelineStage::Failed, "{err}");
            return Err(err.into());
        }

        debug!(band = %band.name, stage = %PipelineStage::Filtering, samples = target.len());
        let filter = BandFilter::design(
            self.config.sample_rate_hz,
            band,
            self.config.filter.order,
            self.config.filter.mode,
        )?;
        let x = filter.apply(target.samples());
        let y = filter.apply(reference.samples());

        let windows: Vec<(Window<'_>, Window<'_>)> = self.plan.paired(&x, &y).collect();
        debug!(band = %band.name, stage = %PipelineStage::Windowing, windows = windows.len());
        if windows.is_empty() {
            warn!(
                band = %band.name,
                samples = x.len(),
                window = self.plan.length(),
                "signal shorter than one window; band result will be missing"
            );
            debug!(band = %band.name, stage = %PipelineStage::Done, windows = 0);
            return Ok(BandResult::missing(&band.name));
        }

        let totals = windows
            .par_iter()
            .fold(ScoreAccumulator::default, |mut acc, (wx, wy)| {
                match self.analyze_pair(wx, wy) {
                    Ok(scores) => acc.push(scores),
                    Err(err) => {
                        warn!(band = %band.name, start = wx.start, "degenerate window: {err}");
                        acc.push_degenerate();
                    }
                }
                acc
            })
            .reduce(ScoreAccumulator::default, ScoreAccumulator::merge);

        debug!(band = %band.name, stage = %PipelineStage::Aggregating, windows = totals.windows());
        let result = totals.finish(&band.name);
        debug!(
            band = %band.name,
            stage = %PipelineStage::Done,
            mean_xy = ?result.mean_xy,
            mean_yx = ?result.mean_yx
        );
        Ok(result)
    }

    /// Embed, build and score one synchronized window pair
    fn analyze_pair(&self, wx: &Window<'_>, wy: &Window<'_>) -> Result<ScorePair, DegenerateError> {
        trace!(start = wx.start, stage = %PipelineStage::Embedding);
        let tx = self.engine.reconstruct(wx.samples)?;
        let ty = self.engine.reconstruct(wy.samples)?;

        trace!(start = wx.start, stage = %PipelineStage::RecurrenceBuilding, points = tx.len());
        let rx = self.engine.build_matrix(tx);
        let ry = self.engine.build_matrix(ty);

        trace!(start = wx.start, stage = %PipelineStage::ScoreComputing);
        self.engine.compute_scores(&rx, &ry)
    }
}

fn check_lengths(target: &Signal, reference: &Signal) -> Result<(), DataError> {
    if target.len() == reference.len() {
        Ok(())
    } else {
        Err(DataError::LengthMismatch { target: target.len(), reference: reference.len() })
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use nlid_core::types::BandCatalog;
    use nlid_core::window::WindowConfig;

    use super::*;

    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
    }

    fn signal(channel: &str, samples: Vec<f64>) -> Signal {
        Signal::new(channel, samples).unwrap()
    }

    fn short_window_config() -> AnalysisConfig {
        AnalysisConfig {
            window: WindowConfig { length: 512, overlap: 0.5 },
            ..Default::default()
        }
    }

    #[test]
    fn test_identical_channels_self_couple_in_every_band() {
        let x = signal("F3", noise(2048, 1));
        let pipeline = BandPipeline::new(short_window_config()).unwrap();

        let results = pipeline.run(&x, &x).unwrap();
        let names: Vec<&str> = results.iter().map(|r| r.band.as_str()).collect();
        assert_eq!(names, ["Delta", "Theta", "Alpha", "Beta", "All"]);

        for result in &results {
            assert_eq!(result.windows, 7);
            assert_eq!(result.degenerate_windows, 0);
            assert!((result.mean_xy.unwrap() - 1.0).abs() < 1e-9, "{result:?}");
            assert!((result.mean_yx.unwrap() - 1.0).abs() < 1e-9, "{result:?}");
        }
    }

    #[test]
    fn test_independent_noise_full_length_window_delta() {
        let config = AnalysisConfig {
            sample_rate_hz: 128.0,
            window: WindowConfig { length: 7680, overlap: 0.2 },
            bands: BandCatalog::new(vec![Band::new("Delta", 0.5, 4.0)]),
            ..Default::default()
        };
        let pipeline = BandPipeline::new(config).unwrap();
        let x = signal("F4", noise(7680, 2));
        let y = signal("F3", noise(7680, 3));

        let results = pipeline.run(&x, &y).unwrap();
        assert_eq!(results.len(), 1);

        let delta = &results[0];
        assert_eq!(delta.band, "Delta");
        assert_eq!(delta.windows, 1);
        let (xy, yx) = (delta.mean_xy.unwrap(), delta.mean_yx.unwrap());
        assert!(xy.is_finite() && yx.is_finite());
        // Chance level for unrelated channels
        assert!(xy.abs() < 0.05 && yx.abs() < 0.05, "xy = {xy}, yx = {yx}");
    }

    #[test]
    fn test_signal_shorter_than_window_is_missing() {
        let pipeline = BandPipeline::new(short_window_config()).unwrap();
        let x = signal("T3", noise(300, 4));
        let y = signal("T4", noise(300, 5));

        let results = pipeline.run(&x, &y).unwrap();
        assert_eq!(results.len(), 5);
        for result in results {
            assert_eq!(result, BandResult::missing(result.band.clone()));
            assert!(result.is_missing());
        }
    }

    #[test]
    fn test_band_above_nyquist_rejected_up_front() {
        let config = AnalysisConfig {
            bands: BandCatalog::new(vec![Band::new("Wide", 0.5, 80.0)]),
            ..short_window_config()
        };
        assert!(matches!(BandPipeline::new(config), Err(ConfigError::InvalidBand { .. })));

        let pipeline = BandPipeline::new(short_window_config()).unwrap();
        let x = signal("C3", noise(1024, 6));
        let err = pipeline.run_band(&x, &x, &Band::new("Wide", 0.5, 80.0)).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_length_mismatch_is_data_error() {
        let pipeline = BandPipeline::new(short_window_config()).unwrap();
        let x = signal("C3", noise(1024, 7));
        let y = signal("C4", noise(1000, 8));

        assert_eq!(
            pipeline.run(&x, &y).unwrap_err(),
            NlidError::Data(DataError::LengthMismatch { target: 1024, reference: 1000 })
        );
    }

    #[test]
    fn test_degenerate_windows_counted() {
        // Window of 3 samples cannot hold a (m=3, tau=2) embedding
        let config = AnalysisConfig {
            window: WindowConfig { length: 3, overlap: 0.0 },
            embedding: nlid_core::EmbeddingParams::new(3, 2),
            ..Default::default()
        };
        let pipeline = BandPipeline::new(config).unwrap();
        let x = signal("O1", noise(30, 9));

        let result = pipeline.run_band(&x, &x, &Band::new("Alpha", 8.0, 12.0)).unwrap();
        assert_eq!(result.windows, 10);
        assert_eq!(result.degenerate_windows, 10);
        assert!(result.is_missing());
    }

    #[test]
    fn test_accumulator_merge_order_independent() {
        let scores = [
            ScorePair::new(0.2, 0.4),
            ScorePair { xy: Some(0.6), yx: None },
            ScorePair::undefined(),
            ScorePair::new(0.1, 0.3),
        ];

        let mut sequential = ScoreAccumulator::default();
        for s in scores {
            sequential.push(s);
        }
        sequential.push_degenerate();

        let mut left = ScoreAccumulator::default();
        left.push(scores[3]);
        left.push_degenerate();
        let mut right = ScoreAccumulator::default();
        right.push(scores[1]);
        right.push(scores[0]);
        right.push(scores[2]);

        let merged = right.merge(left);
        assert_eq!(merged.merge(ScoreAccumulator::default()).windows(), 5);

        let a = sequential.finish("Alpha");
        let b = merged.finish("Alpha");
        assert_eq!(a.windows, b.windows);
        assert_eq!(a.scored_xy, 3);
        assert_eq!(a.scored_yx, 2);
        assert!((a.mean_xy.unwrap() - b.mean_xy.unwrap()).abs() < 1e-12);
        assert!((a.mean_yx.unwrap() - 0.35).abs() < 1e-12);
        assert_eq!(a.degenerate_windows, 1);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(PipelineStage::RecurrenceBuilding.to_string(), "recurrence");
        assert!(PipelineStage::Done.is_terminal());
        assert!(PipelineStage::Failed.is_terminal());
        assert!(!PipelineStage::Idle.is_terminal());
    }
}

//! Run configuration
//!
//! One explicit [`AnalysisConfig`] value carries every parameter of a run:
//! sample rate, filter design, windowing, embedding, recurrence threshold and
//! band catalog. Nothing is read from process-wide state, so runs with
//! different parameters can execute side by side.

use serde::{Deserialize, Serialize};

use crate::embedding::EmbeddingParams;
use crate::error::ConfigError;
use crate::filter::{FilterMode, MAX_FILTER_ORDER};
use crate::recurrence::RecurrenceParams;
use crate::types::BandCatalog;
use crate::window::{WindowConfig, WindowPlan};

// ============================================================================
// Filter Configuration
// ============================================================================

/// Bandpass design parameters.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Butterworth prototype order
    pub order: usize,
    /// Causal or zero-phase application
    pub mode: FilterMode,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self { order: 4, mode: FilterMode::Causal }
    }
}

// ============================================================================
// Analysis Configuration
// ============================================================================

/// Complete parameter set for an NLID run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Sample rate of every channel in Hz
    pub sample_rate_hz: f64,
    /// Bandpass design
    pub filter: FilterConfig,
    /// Window length and overlap
    pub window: WindowConfig,
    /// Delay embedding
    pub embedding: EmbeddingParams,
    /// Recurrence threshold
    pub recurrence: RecurrenceParams,
    /// Bands analysed, in output order
    pub bands: BandCatalog,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 128.0,
            filter: FilterConfig::default(),
            window: WindowConfig::default(),
            embedding: EmbeddingParams::default(),
            recurrence: RecurrenceParams::default(),
            bands: BandCatalog::standard(),
        }
    }
}

impl AnalysisConfig {
    /// Nyquist frequency in Hz
    #[inline]
    #[must_use]
    pub fn nyquist_hz(&self) -> f64 {
        self.sample_rate_hz / 2.0
    }

    /// Window plan for this configuration.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidWindow`].
    pub fn window_plan(&self) -> Result<WindowPlan, ConfigError> {
        self.window.plan()
    }

    /// Check every section, returning the first violation.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] variant describing the invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_rate_hz.is_finite() && self.sample_rate_hz > 0.0) {
            return Err(ConfigError::InvalidSampleRate { sample_rate_hz: self.sample_rate_hz });
        }
        if self.filter.order == 0 || self.filter.order > MAX_FILTER_ORDER {
            return Err(ConfigError::InvalidFilterOrder {
                order: self.filter.order,
                max: MAX_FILTER_ORDER,
            });
        }
        self.window_plan()?;
        self.embedding.validate()?;
        self.recurrence.validate()?;
        self.bands.validate(self.sample_rate_hz)
    }
}

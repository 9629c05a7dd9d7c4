//! Core types for NLID analysis
//!
//! - [`Signal`]: immutable sampled channel
//! - [`Band`] / [`BandCatalog`]: frequency bands analysed per run
//! - [`Montage`] / [`ChannelPair`]: admissible channels and the analysed pair
//! - [`ScorePair`] / [`BandResult`]: per-window and per-band outputs

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, DataError};

// ============================================================================
// Signal
// ============================================================================

/// An ordered sequence of finite samples at a fixed (externally known) rate.
///
/// Immutable once constructed; every processing stage allocates its own
/// output.
#[derive(Clone, Debug, PartialEq)]
pub struct Signal {
    samples: Vec<f64>,
}

impl Signal {
    /// Create a signal, rejecting non-finite samples.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::MalformedSample`] naming `channel` and the index
    /// of the first NaN or infinite sample.
    pub fn new(channel: &str, samples: Vec<f64>) -> Result<Self, DataError> {
        if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
            return Err(DataError::MalformedSample {
                channel: channel.to_string(),
                index,
            });
        }
        Ok(Self { samples })
    }

    /// Sample values
    #[inline]
    #[must_use]
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Number of samples
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the signal holds no samples
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl AsRef<[f64]> for Signal {
    fn as_ref(&self) -> &[f64] {
        &self.samples
    }
}

// ============================================================================
// Frequency Bands
// ============================================================================

/// A named frequency interval.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Band {
    /// Band name, used as the result key
    pub name: String,
    /// Lower edge in Hz
    pub low_hz: f64,
    /// Upper edge in Hz
    pub high_hz: f64,
}

impl Band {
    /// Create a band
    #[must_use]
    pub fn new(name: impl Into<String>, low_hz: f64, high_hz: f64) -> Self {
        Self { name: name.into(), low_hz, high_hz }
    }

    /// Check the band against the Nyquist frequency of `sample_rate_hz`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBand`] unless
    /// `0 < low_hz < high_hz < sample_rate_hz / 2`.
    pub fn validate(&self, sample_rate_hz: f64) -> Result<(), ConfigError> {
        let nyquist_hz = sample_rate_hz / 2.0;
        let ok = self.low_hz.is_finite()
            && self.high_hz.is_finite()
            && self.low_hz > 0.0
            && self.high_hz < nyquist_hz
            && self.low_hz < self.high_hz;

        if ok {
            Ok(())
        } else {
            Err(ConfigError::InvalidBand {
                name: self.name.clone(),
                low_hz: self.low_hz,
                high_hz: self.high_hz,
                nyquist_hz,
            })
        }
    }
}

/// Ordered set of bands configured once per run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BandCatalog(Vec<Band>);

impl BandCatalog {
    /// Create a catalog from bands, keeping their order
    #[must_use]
    pub fn new(bands: Vec<Band>) -> Self {
        Self(bands)
    }

    /// Delta, Theta, Alpha, Beta and the combined 0.5-30 Hz range
    #[must_use]
    pub fn standard() -> Self {
        Self(vec![
            Band::new("Delta", 0.5, 4.0),
            Band::new("Theta", 4.0, 8.0),
            Band::new("Alpha", 8.0, 12.0),
            Band::new("Beta", 12.0, 30.0),
            Band::new("All", 0.5, 30.0),
        ])
    }

    /// Look up a band by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Band> {
        self.0.iter().find(|b| b.name == name)
    }

    /// Iterate bands in catalog order
    pub fn iter(&self) -> impl Iterator<Item = &Band> {
        self.0.iter()
    }

    /// Bands as a slice
    #[must_use]
    pub fn as_slice(&self) -> &[Band] {
        &self.0
    }

    /// Number of bands
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Validate every band and reject duplicate names.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self, sample_rate_hz: f64) -> Result<(), ConfigError> {
        if self.0.is_empty() {
            return Err(ConfigError::EmptyBandCatalog);
        }
        for (i, band) in self.0.iter().enumerate() {
            band.validate(sample_rate_hz)?;
            if self.0[..i].iter().any(|b| b.name == band.name) {
                return Err(ConfigError::DuplicateBand { name: band.name.clone() });
            }
        }
        Ok(())
    }
}

impl Default for BandCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl<'a> IntoIterator for &'a BandCatalog {
    type Item = &'a Band;
    type IntoIter = core::slice::Iter<'a, Band>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ============================================================================
// Channels
// ============================================================================

/// Admissible channel names. An empty montage admits any name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Montage(Vec<String>);

impl Montage {
    /// 16-channel 10-20 scalp montage
    pub const STANDARD_16: [&'static str; 16] = [
        "F7", "F3", "F4", "F8", "T3", "C3", "Cz", "C4", "T4", "T5", "P3", "Pz", "P4", "T6", "O1",
        "O2",
    ];

    /// Create a montage from channel names
    #[must_use]
    pub fn new<I, S>(channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(channels.into_iter().map(Into::into).collect())
    }

    /// The standard 16-channel montage
    #[must_use]
    pub fn standard() -> Self {
        Self::new(Self::STANDARD_16)
    }

    /// A montage admitting every channel name
    #[must_use]
    pub fn any() -> Self {
        Self(Vec::new())
    }

    /// Whether `channel` is admissible
    #[must_use]
    pub fn contains(&self, channel: &str) -> bool {
        self.0.is_empty() || self.0.iter().any(|c| c == channel)
    }

    /// Channel names
    #[must_use]
    pub fn channels(&self) -> &[String] {
        &self.0
    }
}

impl Default for Montage {
    fn default() -> Self {
        Self::standard()
    }
}

/// A directed channel pair. X is the target, Y the reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelPair {
    /// Reference channel (Y)
    pub reference: String,
    /// Target channel (X)
    pub target: String,
}

impl ChannelPair {
    /// Create a pair
    #[must_use]
    pub fn new(reference: impl Into<String>, target: impl Into<String>) -> Self {
        Self { reference: reference.into(), target: target.into() }
    }

    /// Check the pair against a montage.
    ///
    /// # Errors
    ///
    /// [`ConfigError::SameChannel`] if both names match,
    /// [`ConfigError::UnknownChannel`] if either is outside the montage.
    pub fn validate(&self, montage: &Montage) -> Result<(), ConfigError> {
        for channel in [&self.reference, &self.target] {
            if !montage.contains(channel) {
                return Err(ConfigError::UnknownChannel { channel: channel.clone() });
            }
        }
        if self.reference == self.target {
            return Err(ConfigError::SameChannel { channel: self.target.clone() });
        }
        Ok(())
    }
}

// ============================================================================
// Scores
// ============================================================================

/// Directional interdependence scores for one window.
///
/// `None` marks a direction with no usable recurrence rows.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScorePair {
    /// X neighbourhoods mapped onto Y distances
    pub xy: Option<f64>,
    /// Y neighbourhoods mapped onto X distances
    pub yx: Option<f64>,
}

impl ScorePair {
    /// Both directions defined
    #[must_use]
    pub fn new(xy: f64, yx: f64) -> Self {
        Self { xy: Some(xy), yx: Some(yx) }
    }

    /// Neither direction defined
    #[must_use]
    pub const fn undefined() -> Self {
        Self { xy: None, yx: None }
    }
}

/// Scores for one (file, channel pair, band), averaged over windows.
///
/// `mean_xy`/`mean_yx` are `None` when no window produced a score; they
/// serialize as `null`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BandResult {
    /// Band name
    pub band: String,
    /// Mean X→Y score
    pub mean_xy: Option<f64>,
    /// Mean Y→X score
    pub mean_yx: Option<f64>,
    /// Windows generated for the band
    pub windows: usize,
    /// Windows contributing to `mean_xy`
    pub scored_xy: usize,
    /// Windows contributing to `mean_yx`
    pub scored_yx: usize,
    /// Windows rejected as degenerate
    pub degenerate_windows: usize,
}

impl BandResult {
    /// A result with no windows at all
    #[must_use]
    pub fn missing(band: impl Into<String>) -> Self {
        Self {
            band: band.into(),
            mean_xy: None,
            mean_yx: None,
            windows: 0,
            scored_xy: 0,
            scored_yx: 0,
            degenerate_windows: 0,
        }
    }

    /// Whether either mean is missing
    #[must_use]
    pub fn is_missing(&self) -> bool {
        self.mean_xy.is_none() || self.mean_yx.is_none()
    }
}

// ============================================================================
// Tests
// ============================================================================

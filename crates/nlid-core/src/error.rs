//! Error types for NLID analysis
//!
//! Errors are split by how far they propagate:
//!
//! - [`ConfigError`]: invalid run parameters. Fatal, raised before any
//!   computation starts.
//! - [`DataError`]: a file or channel that cannot be analysed. Scoped to the
//!   offending file/channel; the batch continues.
//! - [`DegenerateError`]: a window or structure too small to score. Never
//!   fatal; surfaces as a missing value.
//!
//! [`NlidError`] wraps all three for callers that only need `?`.

use thiserror::Error;

// ============================================================================
// Configuration Errors
// ============================================================================

/// Invalid analysis configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Band bounds outside `(0, nyquist)` or inverted
    #[error("Invalid band {name}: ({low_hz}, {high_hz}) Hz must satisfy 0 < low < high < {nyquist_hz} Hz")]
    InvalidBand {
        /// Band name
        name: String,
        /// Lower edge in Hz
        low_hz: f64,
        /// Upper edge in Hz
        high_hz: f64,
        /// Nyquist frequency of the configured sample rate
        nyquist_hz: f64,
    },

    /// Duplicate band name in a catalog
    #[error("Band {name} is defined more than once")]
    DuplicateBand {
        /// Band name
        name: String,
    },

    /// Band catalog contains no bands
    #[error("Band catalog is empty")]
    EmptyBandCatalog,

    /// Sample rate not positive or not finite
    #[error("Invalid sample rate: {sample_rate_hz} Hz")]
    InvalidSampleRate {
        /// Requested sample rate
        sample_rate_hz: f64,
    },

    /// Filter order outside the supported range
    #[error("Invalid filter order {order}: must be between 1 and {max}")]
    InvalidFilterOrder {
        /// Requested order
        order: usize,
        /// Largest supported order
        max: usize,
    },

    /// Embedding dimension or delay out of range
    #[error("Invalid embedding: dimension {dimension} (need >= 2), delay {delay} (need >= 1)")]
    InvalidEmbedding {
        /// Embedding dimension m
        dimension: usize,
        /// Time delay tau in samples
        delay: usize,
    },

    /// Window length or overlap out of range
    #[error("Invalid window: length {length} (need >= 1), overlap {overlap} (need 0 <= f < 1)")]
    InvalidWindow {
        /// Window length in samples
        length: usize,
        /// Overlap fraction
        overlap: f64,
    },

    /// Recurrence threshold out of range for its mode
    #[error("Invalid recurrence threshold {threshold}: {reason}")]
    InvalidThreshold {
        /// Requested threshold
        threshold: f64,
        /// Description of the violated constraint
        reason: &'static str,
    },

    /// Reference and target name the same channel
    #[error("Reference and target channel are both {channel}")]
    SameChannel {
        /// Channel name
        channel: String,
    },

    /// Channel name not part of the configured montage
    #[error("Channel {channel} is not in the montage")]
    UnknownChannel {
        /// Channel name
        channel: String,
    },

    /// No target channels selected
    #[error("No target channels selected")]
    NoTargets,
}

// ============================================================================
// Data Errors
// ============================================================================

/// Input data that cannot be analysed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    /// Channel absent from the recording
    #[error("Missing channel {channel}")]
    MissingChannel {
        /// Channel name
        channel: String,
    },

    /// Non-numeric or non-finite sample
    #[error("Malformed sample in channel {channel} at index {index}")]
    MalformedSample {
        /// Channel name
        channel: String,
        /// Sample index
        index: usize,
    },

    /// Channels of a pair have different lengths
    #[error("Sample count mismatch: target has {target} samples, reference has {reference}")]
    LengthMismatch {
        /// Target channel length
        target: usize,
        /// Reference channel length
        reference: usize,
    },
}

// ============================================================================
// Degenerate Computation
// ============================================================================

/// A window that cannot produce a score.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DegenerateError {
    /// Window too short for the requested embedding
    #[error("Window of {window_len} samples too short for embedding (m={dimension}, tau={delay})")]
    EmbeddingTooShort {
        /// Window length
        window_len: usize,
        /// Embedding dimension
        dimension: usize,
        /// Time delay
        delay: usize,
    },

    /// Recurrence structures of different sizes
    #[error("Recurrence size mismatch: {x} vs {y}")]
    SizeMismatch {
        /// Size of the X structure
        x: usize,
        /// Size of the Y structure
        y: usize,
    },
}

// ============================================================================
// Umbrella Error
// ============================================================================

/// Any NLID failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NlidError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Data error
    #[error(transparent)]
    Data(#[from] DataError),
    /// Degenerate computation
    #[error(transparent)]
    Degenerate(#[from] DegenerateError),
}

impl NlidError {
    /// Whether this error must abort the whole batch
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Result alias for NLID operations
pub type NlidResult<T> = Result<T, NlidError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_config_errors_are_fatal() {
        let config: NlidError = ConfigError::EmptyBandCatalog.into();
        let data: NlidError = DataError::MissingChannel { channel: "F3".into() }.into();
        let degenerate: NlidError = DegenerateError::SizeMismatch { x: 1, y: 2 }.into();

        assert!(config.is_fatal());
        assert!(!data.is_fatal());
        assert!(!degenerate.is_fatal());
    }

    #[test]
    fn test_display_carries_context() {
        let err = ConfigError::InvalidBand {
            name: "Gamma".into(),
            low_hz: 0.5,
            high_hz: 80.0,
            nyquist_hz: 64.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("Gamma"));
        assert!(msg.contains("64"));
    }
}

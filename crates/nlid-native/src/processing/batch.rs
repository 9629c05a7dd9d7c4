//! Batch runner over many recordings
//!
//! Every recording is analysed against one reference channel and a list of
//! target channels. Recordings run in parallel; per-item data problems are
//! logged and recorded as skips, configuration problems are rejected before
//! any recording is touched.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use nlid_core::config::AnalysisConfig;
use nlid_core::engine::{InterdependenceEngine, RecurrenceNlid};
use nlid_core::error::{ConfigError, DataError, NlidError};
use nlid_core::types::{BandCatalog, BandResult, ChannelPair, Montage, Signal};

use super::pipeline::BandPipeline;

// ============================================================================
// Recordings
// ============================================================================

/// One multi-channel recording, as loaded from disk.
///
/// Samples are kept raw; malformed values (NaN) are only reported when a
/// channel is actually requested.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Recording {
    name: String,
    channels: BTreeMap<String, Vec<f64>>,
}

impl Recording {
    /// Empty recording named `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), channels: BTreeMap::new() }
    }

    /// Builder-style channel insertion
    #[must_use]
    pub fn with_channel(mut self, channel: impl Into<String>, samples: Vec<f64>) -> Self {
        self.insert_channel(channel, samples);
        self
    }

    /// Add or replace a channel
    pub fn insert_channel(&mut self, channel: impl Into<String>, samples: Vec<f64>) {
        self.channels.insert(channel.into(), samples);
    }

    /// Recording name (usually the file name)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Channel names in sorted order
    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    /// Validated signal for `channel`.
    ///
    /// # Errors
    ///
    /// [`DataError::MissingChannel`] or [`DataError::MalformedSample`].
    pub fn signal(&self, channel: &str) -> Result<Signal, DataError> {
        let samples = self
            .channels
            .get(channel)
            .ok_or_else(|| DataError::MissingChannel { channel: channel.to_string() })?;
        Signal::new(channel, samples.clone())
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Batch parameters: analysis settings plus the channels to pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Per-pair analysis settings
    pub analysis: AnalysisConfig,
    /// Reference channel (Y)
    pub reference: String,
    /// Target channels (X), one pair each
    pub targets: Vec<String>,
    /// Admissible channel names; empty admits any
    pub montage: Montage,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig::default(),
            reference: "Cz".to_string(),
            targets: Vec::new(),
            montage: Montage::standard(),
        }
    }
}

impl BatchConfig {
    /// Batch over the standard montage
    pub fn new<I, S>(analysis: AnalysisConfig, reference: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            analysis,
            reference: reference.into(),
            targets: targets.into_iter().map(Into::into).collect(),
            montage: Montage::standard(),
        }
    }

    /// One channel pair per target, in configured order
    pub fn pairs(&self) -> Vec<ChannelPair> {
        self.targets
            .iter()
            .map(|target| ChannelPair::new(self.reference.clone(), target.clone()))
            .collect()
    }

    /// Check analysis settings and every channel pair.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NoTargets`], [`ConfigError::UnknownChannel`],
    /// [`ConfigError::SameChannel`] or any analysis error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.analysis.validate()?;
        if self.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        self.pairs().iter().try_for_each(|pair| pair.validate(&self.montage))
    }
}

// ============================================================================
// Report
// ============================================================================

/// One output row: (file, pair, band) with its scores.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultRow {
    /// Recording name
    pub file: String,
    /// Reference channel (Y)
    pub reference: String,
    /// Target channel (X)
    pub target: String,
    /// Band scores
    #[serde(flatten)]
    pub result: BandResult,
}

/// A recording or channel left out of the report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SkippedItem {
    /// Recording name
    pub file: String,
    /// Target channel, or `None` when the whole recording was skipped
    pub channel: Option<String>,
    /// Human-readable cause
    pub reason: String,
}

/// Everything a batch run produced.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BatchReport {
    /// Scored rows in (recording, target, band) order
    pub rows: Vec<ResultRow>,
    /// Skipped recordings and channels
    pub skipped: Vec<SkippedItem>,
}

impl BatchReport {
    /// Rows for one band
    pub fn rows_for_band<'a>(&'a self, band: &'a str) -> impl Iterator<Item = &'a ResultRow> + 'a {
        self.rows.iter().filter(move |row| row.result.band == band)
    }

    /// Rows grouped per band, in catalog order
    pub fn by_band<'a>(&'a self, catalog: &'a BandCatalog) -> Vec<(&'a str, Vec<&'a ResultRow>)> {
        catalog
            .iter()
            .map(|band| (band.name.as_str(), self.rows_for_band(&band.name).collect()))
            .collect()
    }

    fn merge(mut self, other: Self) -> Self {
        self.rows.extend(other.rows);
        self.skipped.extend(other.skipped);
        self
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Validated batch ready to run over recordings.
pub struct BatchRunner<E = RecurrenceNlid> {
    pipeline: BandPipeline<E>,
    reference: String,
    pairs: Vec<ChannelPair>,
}

impl BatchRunner<RecurrenceNlid> {
    /// Validate `config` and build the runner.
    ///
    /// # Errors
    ///
    /// The first [`ConfigError`] in `config`; nothing has been processed.
    pub fn new(config: BatchConfig) -> Result<Self, ConfigError> {
        let engine = RecurrenceNlid::from_config(&config.analysis)?;
        Self::with_engine(config, engine)
    }
}

impl<E: InterdependenceEngine> BatchRunner<E> {
    /// Runner with a custom per-window engine.
    ///
    /// # Errors
    ///
    /// See [`BatchRunner::new`].
    pub fn with_engine(config: BatchConfig, engine: E) -> Result<Self, ConfigError> {
        config.validate()?;
        let pairs = config.pairs();
        let BatchConfig { analysis, reference, .. } = config;
        Ok(Self { pipeline: BandPipeline::with_engine(analysis, engine)?, reference, pairs })
    }

    /// Pipeline shared by every pair
    pub fn pipeline(&self) -> &BandPipeline<E> {
        &self.pipeline
    }

    /// Configured channel pairs
    pub fn pairs(&self) -> &[ChannelPair] {
        &self.pairs
    }

    /// Analyse every recording; report order follows input order.
    pub fn run(&self, recordings: &[Recording]) -> BatchReport {
        let report = recordings
            .par_iter()
            .map(|recording| self.run_recording(recording))
            .collect::<Vec<_>>()
            .into_iter()
            .fold(BatchReport::default(), BatchReport::merge);

        info!(
            recordings = recordings.len(),
            rows = report.rows.len(),
            skipped = report.skipped.len(),
            "batch complete"
        );
        report
    }

    /// Analyse one recording against every configured pair.
    pub fn run_recording(&self, recording: &Recording) -> BatchReport {
        let mut report = BatchReport::default();
        let file = recording.name();

        let reference = match recording.signal(&self.reference) {
            Ok(signal) => signal,
            Err(err) => {
                warn!(file, reference = %self.reference, "skipping recording: {err}");
                report.skipped.push(SkippedItem {
                    file: file.to_string(),
                    channel: None,
                    reason: err.to_string(),
                });
                return report;
            }
        };

        for pair in &self.pairs {
            let outcome = recording
                .signal(&pair.target)
                .map_err(NlidError::from)
                .and_then(|target| self.pipeline.run(&target, &reference));

            match outcome {
                Ok(results) => {
                    report.rows.extend(results.into_iter().map(|result| ResultRow {
                        file: file.to_string(),
                        reference: pair.reference.clone(),
                        target: pair.target.clone(),
                        result,
                    }));
                }
                Err(err) => {
                    if err.is_fatal() {
                        error!(file, target = %pair.target, "{err}");
                    } else {
                        warn!(file, target = %pair.target, "skipping channel: {err}");
                    }
                    report.skipped.push(SkippedItem {
                        file: file.to_string(),
                        channel: Some(pair.target.clone()),
                        reason: err.to_string(),
                    });
                }
            }
        }
        report
    }
}

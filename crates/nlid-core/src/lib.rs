//! NLID Core - nonlinear interdependence primitives
//!
//! This crate provides the pure, per-window building blocks for measuring
//! directional nonlinear coupling between two signal channels. Every
//! operation is a stateless transform from its input to a freshly allocated
//! output.
//!
//! # Modules
//!
//! - [`types`]: Signals, bands, channel pairs, score records
//! - [`error`]: Configuration, data and degenerate-computation errors
//! - [`config`]: Explicit run configuration
//! - [`filter`]: Butterworth bandpass design and application
//! - [`window`]: Sliding-window segmentation
//! - [`embedding`]: Delay-embedding phase-space reconstruction
//! - [`recurrence`]: Thresholded recurrence matrices
//! - [`interdependence`]: Directional NLID scores
//! - [`engine`]: Per-window capability trait and reference engine
//!
//! # Features
//!
//! - `parallel` (default): row-parallel recurrence construction with rayon
//!
//! # Example
//!
//! ```rust
//! use nlid_core::engine::{InterdependenceEngine, RecurrenceNlid};
//!
//! let window: Vec<f64> = (0..256).map(|i| (i as f64 * 0.3).sin()).collect();
//! let engine = RecurrenceNlid::default();
//!
//! // A signal coupled with itself scores 1 in both directions
//! let scores = engine.analyze_window(&window, &window).unwrap();
//! assert!((scores.xy.unwrap() - 1.0).abs() < 1e-9);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod filter;
pub mod interdependence;
pub mod recurrence;
pub mod types;
pub mod window;

// Re-export commonly used types at crate root
pub use config::{AnalysisConfig, FilterConfig};
pub use embedding::{EmbeddingParams, Trajectory};
pub use engine::{InterdependenceEngine, RecurrenceNlid};
pub use error::{ConfigError, DataError, DegenerateError, NlidError, NlidResult};
pub use filter::{BandFilter, FilterMode};
pub use recurrence::{DistanceMetric, RecurrenceMatrix, RecurrenceParams, ThresholdMode};
pub use types::{Band, BandCatalog, BandResult, ChannelPair, Montage, ScorePair, Signal};
pub use window::{Window, WindowConfig, WindowPlan};

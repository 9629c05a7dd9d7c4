//! NLID Native - Host-side orchestration of nonlinear interdependence runs
//!
//! This crate drives the per-window primitives of `nlid_core` over whole
//! recordings:
//! - Per-band pipelines (filter, window, embed, recurrence, score)
//! - Parallel window and band execution with rayon
//! - Batch runs over many recordings with per-item skip reporting
//!
//! # Modules
//!
//! - [`processing`]: Band pipeline and batch runner

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]

pub mod processing;

// Re-export key types
pub use processing::batch::{BatchConfig, BatchReport, BatchRunner, Recording, ResultRow, SkippedItem};
pub use processing::pipeline::{BandPipeline, PipelineStage, ScoreAccumulator};

//! Signal processing pipelines
//!
//! - [`pipeline`]: Per-band NLID analysis of one channel pair
//! - [`batch`]: Many recordings, one reference, many targets

pub mod batch;
pub mod pipeline;

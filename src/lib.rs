//! Group brain masks, region-averaged fMRI time series and behavioral similarity matrices
//!
//! Subject brain masks are combined into group masks that restrict an atlas,
//! denoised scans are averaged within the atlas regions, and daily behavioral
//! recordings are aligned with the scan days to build observation-by-observation
//! similarity matrices.

#![forbid(unsafe_code)]

/// Behavioral merging, ROI time series and similarity models
pub mod analysis;
/// File formats, study layout, configuration and error handling
pub mod io;
/// Distances and normalization of dense matrices
pub mod math;
/// Group brain masks and labelled atlases
pub mod spatial;

pub use io::error::{AnalysisError, Result};

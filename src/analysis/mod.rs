//! Analysis steps built on the study's volumes and tables

/// Daily behavioral recordings merged and aligned with scan days
pub mod behavior;
/// Nearest-neighbors and Anna Karenina similarity matrices
pub mod similarity;
/// Region-averaged time series of denoised scans
pub mod timeseries;

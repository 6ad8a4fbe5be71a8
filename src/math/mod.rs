//! Mathematical utilities for the analyses

/// Euclidean norms between observation vectors
pub mod distance;
/// Min-max scaling, z-scoring and rounded column means
pub mod normalization;

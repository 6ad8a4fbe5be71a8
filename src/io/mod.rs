//! Input/output, study layout and ambient services

/// Command-line interface and step orchestration
pub mod cli;
/// Study constants and runtime configuration
pub mod configuration;
/// Recursive discovery of study files
pub mod discovery;
/// Error types and path context
pub mod error;
/// Tracing subscriber setup
pub mod logger;
/// MATLAB Level 5 MAT-file codec
pub mod matfile;
/// Per-file progress display
pub mod progress;
/// NIfTI volume loading and export
pub mod volume;

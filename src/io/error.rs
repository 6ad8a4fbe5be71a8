//! Error types and path context for analysis operations

use std::fmt;
use std::path::{Path, PathBuf};

/// Main error type for all analysis operations
#[derive(Debug)]
pub enum AnalysisError {
    /// Failed to read a NIfTI volume from disk
    VolumeLoad {
        /// Path to the volume file
        path: PathBuf,
        /// Underlying NIfTI error
        source: nifti::NiftiError,
    },

    /// Failed to write a NIfTI volume to disk
    VolumeExport {
        /// Path where the export was attempted
        path: PathBuf,
        /// Underlying NIfTI error
        source: nifti::NiftiError,
    },

    /// Array dimensions do not match what the operation expects
    ShapeMismatch {
        /// File whose data has the unexpected shape
        path: PathBuf,
        /// Shape the operation requires
        expected: Vec<usize>,
        /// Shape actually found
        found: Vec<usize>,
    },

    /// CSV reading or writing failed
    Csv {
        /// Path to the CSV file
        path: PathBuf,
        /// Underlying CSV error
        source: csv::Error,
    },

    /// A required column is absent from a CSV header
    MissingColumn {
        /// Path to the CSV file
        path: PathBuf,
        /// Name of the missing column
        column: String,
    },

    /// A date cell does not follow the expected format
    DateParse {
        /// Path to the CSV file
        path: PathBuf,
        /// Raw cell content
        value: String,
        /// Format that was expected
        format: &'static str,
    },

    /// A MAT-file is malformed or uses an unsupported feature
    MatFile {
        /// Path to the MAT-file
        path: PathBuf,
        /// Description of the problem
        reason: String,
    },

    /// Study configuration file could not be parsed
    Config {
        /// Path to the configuration file
        path: PathBuf,
        /// Underlying TOML error
        source: toml::de::Error,
    },

    /// Source data doesn't meet analysis requirements
    InvalidSourceData {
        /// Description of what's wrong with the source data
        reason: String,
    },

    /// Parameter validation failed
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Numerical computation produced invalid result
    Computation {
        /// Name of the computation that failed
        operation: &'static str,
        /// Description of the failure
        reason: String,
    },
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VolumeLoad { path, source } => {
                write!(f, "Failed to load volume '{}': {source}", path.display())
            }
            Self::VolumeExport { path, source } => {
                write!(
                    f,
                    "Failed to export volume to '{}': {source}",
                    path.display()
                )
            }
            Self::ShapeMismatch {
                path,
                expected,
                found,
            } => {
                write!(
                    f,
                    "Shape mismatch in '{}': expected {}, found {}",
                    path.display(),
                    format_shape(expected),
                    format_shape(found)
                )
            }
            Self::Csv { path, source } => {
                write!(f, "CSV error in '{}': {source}", path.display())
            }
            Self::MissingColumn { path, column } => {
                write!(f, "Column '{column}' not found in '{}'", path.display())
            }
            Self::DateParse {
                path,
                value,
                format,
            } => {
                write!(
                    f,
                    "Cannot parse date '{value}' in '{}' (expected format {format})",
                    path.display()
                )
            }
            Self::MatFile { path, reason } => {
                write!(f, "Invalid MAT-file '{}': {reason}", path.display())
            }
            Self::Config { path, source } => {
                write!(
                    f,
                    "Invalid configuration file '{}': {source}",
                    path.display()
                )
            }
            Self::InvalidSourceData { reason } => {
                write!(f, "Invalid source data: {reason}")
            }
            Self::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
            Self::Computation { operation, reason } => {
                write!(f, "Computation error in {operation}: {reason}")
            }
        }
    }
}

fn format_shape(shape: &[usize]) -> String {
    shape
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("x")
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::VolumeLoad { source, .. } | Self::VolumeExport { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::Config { source, .. } => Some(source),
            Self::FileSystem { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for analysis results
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Attaches the file being processed to errors converted without one
pub trait WithPath<T> {
    /// Replace the placeholder path of a converted error with `path`
    ///
    /// # Errors
    ///
    /// Propagates the original error with the path applied
    fn with_path(self, path: &Path) -> Result<T>;

    /// Like [`WithPath::with_path`], also naming the failed file system operation
    ///
    /// # Errors
    ///
    /// Propagates the original error with path and operation applied
    fn with_operation(self, path: &Path, operation: &'static str) -> Result<T>;
}

impl<T, E> WithPath<T> for std::result::Result<T, E>
where
    E: Into<AnalysisError>,
{
    fn with_path(self, path: &Path) -> Result<T> {
        self.map_err(|e| {
            let mut error = e.into();
            // Only path-carrying variants are rewritten
            match &mut error {
                AnalysisError::FileSystem { path: p, .. }
                | AnalysisError::Csv { path: p, .. }
                | AnalysisError::VolumeLoad { path: p, .. }
                | AnalysisError::MatFile { path: p, .. } => *p = path.to_path_buf(),
                _ => {}
            }
            error
        })
    }

    fn with_operation(self, path: &Path, operation: &'static str) -> Result<T> {
        self.with_path(path).map_err(|mut error| {
            if let AnalysisError::FileSystem { operation: op, .. } = &mut error {
                *op = operation;
            }
            error
        })
    }
}

impl From<std::io::Error> for AnalysisError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

impl From<csv::Error> for AnalysisError {
    fn from(err: csv::Error) -> Self {
        Self::Csv {
            path: PathBuf::from("<unknown>"),
            source: err,
        }
    }
}

impl From<nifti::NiftiError> for AnalysisError {
    fn from(err: nifti::NiftiError) -> Self {
        Self::VolumeLoad {
            path: PathBuf::from("<unknown>"),
            source: err,
        }
    }
}

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> AnalysisError {
    AnalysisError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create a computation error
pub fn computation_error(operation: &'static str, reason: &impl ToString) -> AnalysisError {
    AnalysisError::Computation {
        operation,
        reason: reason.to_string(),
    }
}

/// Create an invalid source data error
pub fn invalid_source(reason: &impl ToString) -> AnalysisError {
    AnalysisError::InvalidSourceData {
        reason: reason.to_string(),
    }
}

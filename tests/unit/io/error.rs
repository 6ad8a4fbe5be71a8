//! Tests for error messages, source chaining and path attachment

#[cfg(test)]
mod tests {
    use neuroconn::AnalysisError;
    use neuroconn::io::error::{WithPath, computation_error, invalid_parameter, invalid_source};
    use std::error::Error;
    use std::path::{Path, PathBuf};

    // Tests error source chaining works correctly
    // Verified by breaking source chain
    #[test]
    fn test_error_source_chain() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = AnalysisError::FileSystem {
            path: "/tmp/mask.nii".into(),
            operation: "read",
            source: io_error,
        };

        assert!(error.source().is_some());
        assert!(invalid_source(&"empty").source().is_none());
    }

    // Tests shapes are printed as AxBxC
    // Verified by printing the debug representation
    #[test]
    fn test_shape_mismatch_error() {
        let error = AnalysisError::ShapeMismatch {
            path: PathBuf::from("/fmriprep/sub-01_mask.nii"),
            expected: vec![91, 109, 91],
            found: vec![91, 109, 90, 1],
        };

        let message = error.to_string();
        assert!(message.contains("sub-01_mask.nii"));
        assert!(message.contains("91x109x91"));
        assert!(message.contains("91x109x90x1"));
    }

    #[test]
    fn test_invalid_parameter_error() {
        let error = invalid_parameter("atlas", &"aal", &"unknown atlas");

        let message = error.to_string();
        assert!(message.contains("atlas"));
        assert!(message.contains("aal"));
        assert!(message.contains("unknown atlas"));
    }

    #[test]
    fn test_csv_cell_errors() {
        let missing = AnalysisError::MissingColumn {
            path: PathBuf::from("oura.csv"),
            column: "Awake Time".to_string(),
        };
        assert!(missing.to_string().contains("'Awake Time'"));

        let date = AnalysisError::DateParse {
            path: PathBuf::from("mri.csv"),
            value: "2023/03/03".to_string(),
            format: "%d/%m/%y",
        };
        let message = date.to_string();
        assert!(message.contains("2023/03/03"));
        assert!(message.contains("%d/%m/%y"));
    }

    #[test]
    fn test_computation_error() {
        let message = computation_error("min-max scaling", &"range is zero").to_string();
        assert_eq!(message, "Computation error in min-max scaling: range is zero");
    }

    // Tests converted errors get the path of the file being processed
    // Verified by leaving the placeholder in place
    #[test]
    fn test_with_path_on_csv_error() {
        let result = csv::Reader::from_path("/nonexistent/behavior.csv")
            .map(|_| ())
            .with_path(Path::new("/nonexistent/behavior.csv"));

        let err = result.unwrap_err();
        assert!(matches!(err, AnalysisError::Csv { .. }));
        assert!(err.to_string().contains("/nonexistent/behavior.csv"));
        assert!(!err.to_string().contains("<unknown>"));
    }

    #[test]
    fn test_io_error_conversion() {
        let error: AnalysisError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(error, AnalysisError::FileSystem { .. }));
        assert!(error.to_string().contains("denied"));
    }
}

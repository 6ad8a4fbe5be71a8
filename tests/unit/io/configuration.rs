//! Tests for study constants and the TOML configuration

#[cfg(test)]
mod tests {
    use neuroconn::AnalysisError;
    use neuroconn::io::configuration::{
        DEFAULT_VOLUME_SHAPE, MASK_SUM_THRESHOLD_RATIO, MOOD_COLUMNS, PHYSIOLOGY_COLUMNS,
        SLEEP_COLUMNS, StudyConfig,
    };
    use std::path::Path;

    #[test]
    fn test_feature_column_counts() {
        assert_eq!(SLEEP_COLUMNS.len(), 5);
        assert_eq!(PHYSIOLOGY_COLUMNS.len(), 10);
        assert_eq!(MOOD_COLUMNS.len(), 20);
    }

    #[test]
    fn test_defaults() {
        let config = StudyConfig::default();
        assert_eq!(config.subject, "sub-01");
        assert_eq!(config.volume_shape, DEFAULT_VOLUME_SHAPE.to_vec());
        assert_eq!(config.mask_threshold_ratio, MASK_SUM_THRESHOLD_RATIO);
        assert!(config.atlases.contains_key("seitzman-set1"));
        assert!(config.atlases.contains_key("seitzman-set2"));
        assert!(config.validate().is_ok());
    }

    // Tests the known mask substitutions and the fallback to the task itself
    // Verified by matching the subject only
    #[test]
    fn test_mask_task_for() {
        let config = StudyConfig::default();
        assert_eq!(config.mask_task_for("sub-09", "resting"), "pvt");
        assert_eq!(config.mask_task_for("sub-25", "nback"), "resting");
        assert_eq!(config.mask_task_for("sub-09", "nback"), "nback");
        assert_eq!(config.mask_task_for("sub-01", "resting"), "resting");
    }

    #[test]
    fn test_atlas_path() {
        let config = StudyConfig::default();
        assert!(
            config
                .atlas_path("seitzman-set1")
                .unwrap()
                .ends_with("seitzman_set1.nii")
        );

        let err = config.atlas_path("aal").unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidParameter { parameter: "atlas", .. }));
        assert!(err.to_string().contains("seitzman-set2"));
    }

    #[test]
    fn test_device_file() {
        let config = StudyConfig {
            subject: "sub-02".to_string(),
            ..StudyConfig::default()
        };
        assert_eq!(config.device_file("oura"), "sub-02_day-all_device-oura.csv");
    }

    // Tests absent keys keep their defaults
    // Verified by removing the serde default attribute
    #[test]
    fn test_partial_toml() {
        let config = StudyConfig::from_toml_str(
            r#"
            volume_shape = [2, 2, 2]

            [atlases]
            local = "/atlases/local.nii"

            [[mask_substitutions]]
            subject = "sub-03"
            task = "movie"
            replacement_task = "resting"
            "#,
        )
        .unwrap();

        assert_eq!(config.subject, "sub-01");
        assert_eq!(config.volume_shape, vec![2, 2, 2]);
        assert_eq!(config.mask_threshold_ratio, MASK_SUM_THRESHOLD_RATIO);
        assert_eq!(config.atlas_path("local").unwrap(), Path::new("/atlases/local.nii"));
        assert!(config.atlas_path("seitzman-set1").is_err());
        assert_eq!(config.mask_task_for("sub-03", "movie"), "resting");
        assert_eq!(config.mask_task_for("sub-09", "resting"), "resting");
    }

    #[test]
    fn test_validate() {
        for ratio in [0.0, -0.5, 1.5, f64::NAN] {
            let config = StudyConfig {
                mask_threshold_ratio: ratio,
                ..StudyConfig::default()
            };
            assert!(config.validate().is_err(), "ratio {ratio} accepted");
        }

        for shape in [vec![], vec![91, 0, 91]] {
            let config = StudyConfig {
                volume_shape: shape,
                ..StudyConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(AnalysisError::InvalidParameter {
                    parameter: "volume_shape",
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("study.toml");

        std::fs::write(&path, "subject = \"sub-04\"\n").unwrap();
        assert_eq!(StudyConfig::from_toml_file(&path).unwrap().subject, "sub-04");

        std::fs::write(&path, "subject = [\n").unwrap();
        assert!(matches!(
            StudyConfig::from_toml_file(&path),
            Err(AnalysisError::Config { .. })
        ));

        std::fs::write(&path, "mask_threshold_ratio = 2.0\n").unwrap();
        assert!(matches!(
            StudyConfig::from_toml_file(&path),
            Err(AnalysisError::InvalidParameter { .. })
        ));

        assert!(matches!(
            StudyConfig::from_toml_file(&dir.path().join("missing.toml")),
            Err(AnalysisError::FileSystem { .. })
        ));
    }
}

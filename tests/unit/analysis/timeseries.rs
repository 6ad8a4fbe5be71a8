//! Tests for region averaging and the time series MAT-file

#[cfg(test)]
mod tests {
    use ndarray::{ArrayD, IxDyn, array};
    use neuroconn::AnalysisError;
    use neuroconn::analysis::timeseries::{
        RoiMasker, compute_averaged_roi_ts, load_averaged_roi_ts, roi_timeseries_path,
    };
    use neuroconn::io::volume::Volume;
    use neuroconn::spatial::atlas::LabelAtlas;
    use nifti::NiftiHeader;
    use std::path::Path;

    fn volume(shape: &[usize], values: Vec<f64>) -> Volume {
        Volume::from_parts(
            ArrayD::from_shape_vec(IxDyn(shape), values).unwrap(),
            NiftiHeader::default(),
        )
    }

    fn atlas() -> Volume {
        volume(&[2, 2, 1], vec![1., 1., 2., 0.])
    }

    // Voxel v at time t holds (v + 1) * 10 + t
    fn scan() -> Volume {
        let values = (0..4)
            .flat_map(|v| (0..3).map(move |t| f64::from((v + 1) * 10 + t)))
            .collect();
        volume(&[2, 2, 1, 3], values)
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    // Tests region means per time point with background ignored
    // Verified by including label 0 as a region
    #[test]
    fn test_transform_raw_means() {
        let masker = RoiMasker::new(LabelAtlas::from_volume(&atlas())).without_standardization();
        assert_eq!(masker.labels(), vec![1, 2]);

        let series = masker.transform(&scan(), Path::new("scan.nii")).unwrap();
        assert_eq!(series, array![[15.0, 30.0], [16.0, 31.0], [17.0, 32.0]]);
    }

    // Tests each region column is z-scored with the population deviation
    // Verified by using the sample deviation
    #[test]
    fn test_transform_standardized() {
        let masker = RoiMasker::new(LabelAtlas::from_volume(&atlas()));
        let series = masker.transform(&scan(), Path::new("scan.nii")).unwrap();

        let expected = 1.5_f64.sqrt();
        for column in 0..2 {
            assert_close(series[[0, column]], -expected);
            assert_close(series[[1, column]], 0.0);
            assert_close(series[[2, column]], expected);
        }
    }

    #[test]
    fn test_transform_single_volume() {
        let masker = RoiMasker::new(LabelAtlas::from_volume(&atlas()));
        let series = masker
            .transform(&volume(&[2, 2, 1], vec![2., 4., 6., 8.]), Path::new("vol.nii"))
            .unwrap();
        assert_eq!(series, array![[3.0, 6.0]]);
    }

    #[test]
    fn test_transform_shape_mismatch() {
        let masker = RoiMasker::new(LabelAtlas::from_volume(&atlas()));
        let err = masker
            .transform(&volume(&[4, 1, 1, 2], vec![0.; 8]), Path::new("bad.nii"))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_empty_atlas_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("group_mask_empty.nii");
        volume(&[2, 2, 1], vec![0.; 4]).save(&path).unwrap();
        assert!(matches!(
            RoiMasker::from_atlas_file(&path),
            Err(AnalysisError::InvalidSourceData { .. })
        ));
    }

    #[test]
    fn test_roi_timeseries_path() {
        let path = roi_timeseries_path(
            Path::new("/conn"),
            "simple",
            Path::new("/conn/group_mask_seitzman-set1.nii"),
        )
        .unwrap();
        assert_eq!(
            path,
            Path::new("/conn/simple/averaged_roits_simple_seitzman-set1.mat")
        );
    }

    // Tests matching scans are processed in path order and saved as a cell array
    // Verified by dropping the task filter
    #[test]
    fn test_compute_averaged_roi_ts() {
        let dir = tempfile::tempdir().unwrap();
        let nii = dir.path().join("denoised");
        let conn = dir.path().join("conn");
        let group_atlas = conn.join("group_mask_test-atlas.nii");
        atlas().save(&group_atlas).unwrap();

        scan()
            .save(nii.join("sub-02").join("sub-02_task-movie_simple.nii"))
            .unwrap();
        volume(&[2, 2, 1, 2], vec![1., 2., 1., 2., 5., 9., 0., 0.])
            .save(nii.join("sub-01").join("sub-01_task-movie_simple.nii"))
            .unwrap();
        scan()
            .save(nii.join("sub-01").join("sub-01_task-resting_simple.nii"))
            .unwrap();

        let output =
            compute_averaged_roi_ts(&nii, &conn, "movie", "simple", &group_atlas, None).unwrap();
        assert_eq!(output, conn.join("simple/averaged_roits_simple_test-atlas.mat"));

        let series = load_averaged_roi_ts(&output).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].dim(), (2, 2));
        assert_eq!(series[1].dim(), (3, 2));
        assert_close(series[0][[0, 1]], -1.0);
        assert_close(series[0][[1, 1]], 1.0);

        // Existing output is kept
        std::fs::remove_dir_all(&nii).unwrap();
        assert_eq!(
            compute_averaged_roi_ts(&nii, &conn, "movie", "simple", &group_atlas, None).unwrap(),
            output
        );
    }

    #[test]
    fn test_load_without_variable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.mat");
        neuroconn::io::matfile::write_mat(
            &path,
            &[("nn", &neuroconn::io::matfile::MatValue::Double(array![[1.0]]))],
        )
        .unwrap();
        assert!(matches!(
            load_averaged_roi_ts(&path),
            Err(AnalysisError::MatFile { .. })
        ));
    }
}

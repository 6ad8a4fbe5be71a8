//! Tests for min-max scaling, z-scoring and rounded means

#[cfg(test)]
mod tests {
    use ndarray::{Array2, array};
    use neuroconn::AnalysisError;
    use neuroconn::math::normalization::{
        fill_missing, min_max_scale, rounded_column_means, zscore_columns,
    };

    // Tests scaling maps min to 0 and max to 1
    // Verified by dividing by max instead of range
    #[test]
    fn test_min_max_scale() {
        let m = array![[-1.0, 0.0], [1.0, 3.0]];
        let scaled = min_max_scale(&m).unwrap();
        assert_eq!(scaled, array![[0.0, 0.25], [0.5, 1.0]]);
    }

    // Tests a zero range is reported instead of producing NaN
    #[test]
    fn test_min_max_scale_constant_matrix() {
        let m = Array2::from_elem((3, 3), 0.5);
        let err = min_max_scale(&m).unwrap_err();
        assert!(matches!(err, AnalysisError::Computation { .. }));
        assert!(err.to_string().contains("range is zero"));
    }

    #[test]
    fn test_min_max_scale_rejects_nan() {
        let m = array![[0.0, f64::NAN], [1.0, 2.0]];
        assert!(min_max_scale(&m).is_err());
    }

    #[test]
    fn test_min_max_scale_rejects_empty() {
        let m = Array2::<f64>::zeros((0, 0));
        assert!(min_max_scale(&m).is_err());
    }

    // Tests columns end with zero mean and unit population deviation
    // Verified by using the sample (n - 1) deviation
    #[test]
    fn test_zscore_columns() {
        let mut m = array![[1.0, 10.0], [2.0, 20.0], [3.0, 60.0]];
        zscore_columns(&mut m);

        for column in m.columns() {
            let mean = column.sum() / 3.0;
            let var = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 3.0;
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-12);
        }
        let expected = -(1.5_f64).sqrt();
        assert!((m[[0, 0]] - expected).abs() < 1e-12);
    }

    // Tests a constant column is centered but not divided by zero
    #[test]
    fn test_zscore_constant_column() {
        let mut m = array![[4.0], [4.0], [4.0]];
        zscore_columns(&mut m);
        assert_eq!(m, array![[0.0], [0.0], [0.0]]);
    }

    #[test]
    fn test_zscore_single_row_untouched() {
        let mut m = array![[4.0, -2.0]];
        zscore_columns(&mut m);
        assert_eq!(m, array![[4.0, -2.0]]);
    }

    // Tests means skip NaN and round half to even
    // Verified by using f64::round (half away from zero)
    #[test]
    fn test_rounded_column_means() {
        let m = array![
            [2.0, 3.0, f64::NAN, 1.0],
            [3.0, 4.0, f64::NAN, f64::NAN],
            [f64::NAN, f64::NAN, f64::NAN, 2.0],
        ];
        let means = rounded_column_means(&m);
        assert_eq!(means[0], 2.0); // 2.5
        assert_eq!(means[1], 4.0); // 3.5
        assert!(means[2].is_nan());
        assert_eq!(means[3], 2.0); // 1.5
    }

    #[test]
    fn test_fill_missing() {
        let mut m = array![[f64::NAN, 1.0], [2.0, f64::NAN]];
        fill_missing(&mut m, &[7.0, 9.0]);
        assert_eq!(m, array![[7.0, 1.0], [2.0, 9.0]]);
    }
}

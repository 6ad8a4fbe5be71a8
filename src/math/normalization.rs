//! Rescaling and standardization of dense matrices

use crate::io::configuration::STANDARDIZE_EPSILON;
use crate::io::error::{Result, computation_error};
use ndarray::{Array2, Axis};

/// Rescale every entry to `[0, 1]` with `(m - min) / (max - min)`
///
/// # Errors
///
/// Returns a computation error if the matrix is empty, holds non-finite
/// values, or all entries are equal (the range would be zero)
pub fn min_max_scale(matrix: &Array2<f64>) -> Result<Array2<f64>> {
    if matrix.is_empty() {
        return Err(computation_error("min-max scaling", &"matrix is empty"));
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(computation_error(
            "min-max scaling",
            &"matrix contains non-finite values",
        ));
    }

    let min = matrix.iter().copied().fold(f64::INFINITY, f64::min);
    let max = matrix.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    if range == 0.0 {
        return Err(computation_error(
            "min-max scaling",
            &format!("all entries equal {min}, range is zero"),
        ));
    }

    Ok(matrix.mapv(|v| (v - min) / range))
}

/// Z-score each column in place using the population standard deviation
///
/// Columns whose deviation is below machine epsilon are only centered.
/// A single-row matrix is left untouched.
pub fn zscore_columns(matrix: &mut Array2<f64>) {
    let rows = matrix.nrows();
    if rows < 2 {
        return;
    }
    let n = rows as f64;

    for mut column in matrix.axis_iter_mut(Axis(1)) {
        let mean = column.sum() / n;
        let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        let scale = if std < STANDARDIZE_EPSILON { 1.0 } else { std };
        column.mapv_inplace(|v| (v - mean) / scale);
    }
}

/// Mean of the non-missing values of each column, rounded half to even
///
/// Columns without any value yield NaN.
pub fn rounded_column_means(matrix: &Array2<f64>) -> Vec<f64> {
    matrix
        .axis_iter(Axis(1))
        .map(|column| {
            let (sum, count) = column
                .iter()
                .filter(|v| !v.is_nan())
                .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            if count == 0 {
                f64::NAN
            } else {
                (sum / count as f64).round_ties_even()
            }
        })
        .collect()
}

/// Replace NaN entries with the value given for their column
pub fn fill_missing(matrix: &mut Array2<f64>, fills: &[f64]) {
    for (mut column, fill) in matrix.axis_iter_mut(Axis(1)).zip(fills.iter()) {
        column.mapv_inplace(|v| if v.is_nan() { *fill } else { v });
    }
}

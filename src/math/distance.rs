//! Euclidean norms between observation vectors

use ndarray::ArrayView1;

/// Euclidean distance between two vectors of equal length
///
/// Extra elements of the longer vector are ignored.
pub fn euclidean(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Euclidean norm of the midpoint `(a + b) / 2`
pub fn midpoint_norm(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| ((x + y) / 2.0).powi(2))
        .sum::<f64>()
        .sqrt()
}

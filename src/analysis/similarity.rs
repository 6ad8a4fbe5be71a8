//! Observation-by-observation similarity models
//!
//! Both models fill the upper triangle with `1 - d(i, j) / n` for a model
//! specific distance `d`, mirror it, and min-max scale the whole matrix.
//!
//! - Nearest neighbors: `d` is the Euclidean distance between the two rows,
//!   so observations are similar when their behavior is alike.
//! - Anna Karenina: `d` is the norm of the rows' midpoint, so observations
//!   are similar when both score low ("all low scorers are alike").

use crate::io::error::{Result, computation_error};
use crate::math::distance::{euclidean, midpoint_norm};
use crate::math::normalization::min_max_scale;
use ndarray::{Array2, ArrayView1};
use std::fmt;
use std::str::FromStr;

/// Available similarity models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimilarityModel {
    /// Euclidean distance between observations
    NearestNeighbors,
    /// Norm of the midpoint of two observations
    AnnaKarenina,
}

impl SimilarityModel {
    /// Short name used in file and variable names
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::NearestNeighbors => "nn",
            Self::AnnaKarenina => "ak",
        }
    }

    /// Compute the scaled similarity matrix of `data` (rows = observations)
    ///
    /// # Errors
    ///
    /// See [`nearest_neighbors`] and [`anna_karenina`]
    pub fn compute(self, data: &Array2<f64>) -> Result<Array2<f64>> {
        match self {
            Self::NearestNeighbors => nearest_neighbors(data),
            Self::AnnaKarenina => anna_karenina(data),
        }
    }
}

impl fmt::Display for SimilarityModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for SimilarityModel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nn" | "nearest-neighbors" | "nearest_neighbors" => Ok(Self::NearestNeighbors),
            "ak" | "anna-karenina" | "anna_karenina" => Ok(Self::AnnaKarenina),
            other => Err(format!(
                "unknown similarity model '{other}' (expected nn or ak)"
            )),
        }
    }
}

/// Unscaled pairwise matrix `1 - distance(i, j) / n` with a zero diagonal
fn pairwise<F>(data: &Array2<f64>, distance: F) -> Array2<f64>
where
    F: Fn(ArrayView1<'_, f64>, ArrayView1<'_, f64>) -> f64,
{
    let n = data.nrows();
    let mut matrix = Array2::zeros((n, n));

    for i in 0..n {
        for j in (i + 1)..n {
            let d = distance(data.row(i), data.row(j));
            let similarity = 1.0 - d.abs() / n as f64;
            for index in [(i, j), (j, i)] {
                if let Some(cell) = matrix.get_mut(index) {
                    *cell = similarity;
                }
            }
        }
    }

    matrix
}

fn check_input(data: &Array2<f64>, operation: &'static str) -> Result<()> {
    if data.nrows() < 2 {
        return Err(computation_error(
            operation,
            &format!("need at least 2 observations, got {}", data.nrows()),
        ));
    }
    Ok(())
}

/// Nearest-neighbors similarity of the rows of `data`
///
/// The diagonal takes part in the scaling, so it ends up at
/// `(0 - min) / (max - min)`.
///
/// # Errors
///
/// Returns a computation error with fewer than two observations, missing
/// values, or when every pair has the same distance
pub fn nearest_neighbors(data: &Array2<f64>) -> Result<Array2<f64>> {
    check_input(data, "nearest neighbors")?;
    min_max_scale(&pairwise(data, euclidean))
}

/// Anna Karenina similarity of the rows of `data`
///
/// The diagonal is set to 1 after scaling.
///
/// # Errors
///
/// Returns a computation error with fewer than two observations, missing
/// values, or when every pair has the same midpoint norm
pub fn anna_karenina(data: &Array2<f64>) -> Result<Array2<f64>> {
    check_input(data, "anna karenina")?;
    let mut scaled = min_max_scale(&pairwise(data, midpoint_norm))?;
    scaled.diag_mut().fill(1.0);
    Ok(scaled)
}

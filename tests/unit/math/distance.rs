//! Tests for Euclidean distance and midpoint norm

#[cfg(test)]
mod tests {
    use ndarray::array;
    use neuroconn::math::distance::{euclidean, midpoint_norm};

    // Tests the 3-4-5 triangle
    // Verified by dropping the square root
    #[test]
    fn test_euclidean_distance() {
        let a = array![0.0, 0.0];
        let b = array![3.0, 4.0];
        assert!((euclidean(a.view(), b.view()) - 5.0).abs() < 1e-12);
        assert!((euclidean(b.view(), a.view()) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_euclidean_identical_vectors() {
        let a = array![1.5, -2.0, 7.25];
        assert_eq!(euclidean(a.view(), a.view()), 0.0);
    }

    // Tests the norm of the halfway point rather than of the sum
    // Verified by removing the division by two
    #[test]
    fn test_midpoint_norm() {
        let a = array![2.0, 0.0];
        let b = array![4.0, 8.0];
        // midpoint (3, 4)
        assert!((midpoint_norm(a.view(), b.view()) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_midpoint_norm_opposite_vectors() {
        let a = array![1.0, -2.0];
        let b = array![-1.0, 2.0];
        assert_eq!(midpoint_norm(a.view(), b.view()), 0.0);
    }
}

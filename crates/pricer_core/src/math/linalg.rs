//! Dense linear algebra helpers on top of `nalgebra`.

use nalgebra::{DMatrix, SVD};

/// Moore-Penrose pseudo-inverse by singular value decomposition.
///
/// Singular values below `max(rows, cols) * eps * sigma_max` are treated
/// as zero. The result is always finite: a matrix with non-finite
/// entries, or one whose decomposition fails, maps to the zero matrix of
/// transposed shape.
///
/// # Examples
///
/// ```
/// use nalgebra::DMatrix;
/// use pricer_core::math::pseudo_inverse;
///
/// let m = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 4.0]);
/// let inv = pseudo_inverse(&m);
/// assert!((inv[(1, 1)] - 0.25).abs() < 1e-12);
/// ```
pub fn pseudo_inverse(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    let (rows, cols) = matrix.shape();
    let zero = DMatrix::zeros(cols, rows);
    if rows == 0 || cols == 0 || matrix.iter().any(|v| !v.is_finite()) {
        return zero;
    }

    let Some(svd) = SVD::try_new(matrix.clone(), true, true, f64::EPSILON, 0) else {
        return zero;
    };
    let sigma_max = svd.singular_values.max();
    if sigma_max <= 0.0 || !sigma_max.is_finite() {
        return zero;
    }
    let tolerance = rows.max(cols) as f64 * f64::EPSILON * sigma_max;

    match svd.pseudo_inverse(tolerance) {
        Ok(inverse) if inverse.iter().all(|v| v.is_finite()) => inverse,
        _ => zero,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_square_inverse() {
        let m = DMatrix::from_row_slice(2, 2, &[4.0, 7.0, 2.0, 6.0]);
        let inv = pseudo_inverse(&m);
        let id = &m * &inv;
        assert_relative_eq!(id[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(id[(0, 1)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(id[(1, 0)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(id[(1, 1)], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rank_deficient() {
        // Rank one: pinv([[1, 1], [1, 1]]) = [[0.25, 0.25], [0.25, 0.25]]
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let inv = pseudo_inverse(&m);
        for v in inv.iter() {
            assert_relative_eq!(*v, 0.25, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_degenerate_inputs_give_zero() {
        let zero = DMatrix::<f64>::zeros(3, 2);
        assert_eq!(pseudo_inverse(&zero), DMatrix::zeros(2, 3));

        let nan = DMatrix::from_row_slice(1, 2, &[f64::NAN, 1.0]);
        assert_eq!(pseudo_inverse(&nan), DMatrix::zeros(2, 1));

        let empty = DMatrix::<f64>::zeros(0, 0);
        assert_eq!(pseudo_inverse(&empty).shape(), (0, 0));
    }

    #[test]
    fn test_rectangular_right_inverse() {
        let m = DMatrix::from_row_slice(2, 3, &[1.0, 0.5, 0.0, 0.0, 1.0, 0.5]);
        let inv = pseudo_inverse(&m);
        assert_eq!(inv.shape(), (3, 2));
        let id = &m * &inv;
        assert_relative_eq!(id[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(id[(1, 0)], 0.0, epsilon = 1e-12);
    }
}

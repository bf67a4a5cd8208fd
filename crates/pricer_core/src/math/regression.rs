//! Least-squares conditional expectation.
//!
//! The estimator projects a scenario value onto the linear span of a set
//! of basis functions evaluated on every path (Longstaff-Schwartz style).
//! The design matrix is decomposed once by SVD, so that many values can
//! be conditioned against the same filtration cheaply. Rank-deficient
//! designs (for instance all-constant regressors at time zero) are
//! handled by the minimum-norm solution, which collapses to the scenario
//! average.

use nalgebra::{DMatrix, DVector, SVD};

use crate::scenario::ScenarioValue;
use crate::types::error::RegressionError;

/// Singular values below this fraction of the largest one are dropped.
///
/// Duplicated constant columns produce singular values at rounding level;
/// they must not enter the projection.
const RELATIVE_RANK_TOLERANCE: f64 = 1e-10;

/// Operator mapping a scenario value to its conditional expectation.
pub trait ConditionalExpectation: Send + Sync {
    /// Conditional expectation of `value`.
    fn expectation(&self, value: &ScenarioValue) -> ScenarioValue;
}

/// Polynomial basis `1, x, x^2, ..., x^order` for every regressor.
///
/// # Examples
///
/// ```
/// use pricer_core::math::polynomial_basis;
/// use pricer_core::scenario::ScenarioValue;
///
/// let x = ScenarioValue::from_paths(vec![1.0, 2.0]);
/// let basis = polynomial_basis(&[x], 2);
/// assert_eq!(basis.len(), 3);
/// assert_eq!(basis[2].get(1), 4.0);
/// ```
pub fn polynomial_basis(regressors: &[ScenarioValue], order: usize) -> Vec<ScenarioValue> {
    let mut basis = Vec::with_capacity(regressors.len() * (order + 1));
    for regressor in regressors {
        let mut power = ScenarioValue::constant(1.0);
        basis.push(power.clone());
        for _ in 0..order {
            power = &power * regressor;
            basis.push(power.clone());
        }
    }
    basis
}

/// Ordinary least-squares regression estimator.
#[derive(Debug)]
pub struct RegressionEstimator {
    n_paths: usize,
    design: DMatrix<f64>,
    svd: SVD<f64, nalgebra::Dyn, nalgebra::Dyn>,
    tolerance: f64,
}

impl RegressionEstimator {
    /// Builds an estimator from basis functions over `n_paths` paths.
    ///
    /// Deterministic basis functions are broadcast. An empty basis
    /// regresses on the constant function only.
    ///
    /// # Errors
    ///
    /// Returns [`RegressionError`] if `n_paths` is zero, if a basis
    /// function has a different path count, or if the decomposition of
    /// the design matrix fails.
    pub fn new(basis: &[ScenarioValue], n_paths: usize) -> Result<Self, RegressionError> {
        if n_paths == 0 {
            return Err(RegressionError::NoPaths);
        }
        if let Some(bad) = basis
            .iter()
            .filter_map(ScenarioValue::n_paths)
            .find(|&n| n != n_paths)
        {
            return Err(RegressionError::DimensionMismatch {
                expected: n_paths,
                got: bad,
            });
        }

        let constant_only = [ScenarioValue::constant(1.0)];
        let basis = if basis.is_empty() {
            &constant_only[..]
        } else {
            basis
        };
        let design = DMatrix::from_fn(n_paths, basis.len(), |p, k| basis[k].get(p));
        if design.iter().any(|v| !v.is_finite()) {
            return Err(RegressionError::NonFiniteBasis);
        }

        let svd = SVD::try_new(design.clone(), true, true, f64::EPSILON, 0)
            .ok_or(RegressionError::DecompositionFailed)?;
        let tolerance = RELATIVE_RANK_TOLERANCE * svd.singular_values.max();

        Ok(Self {
            n_paths,
            design,
            svd,
            tolerance,
        })
    }

    /// Number of paths the estimator was fitted on.
    #[inline]
    pub fn n_paths(&self) -> usize {
        self.n_paths
    }

    /// Regression coefficients for `value`.
    pub fn coefficients(&self, value: &ScenarioValue) -> Option<DVector<f64>> {
        let y = DVector::from_vec(value.to_vec(self.n_paths));
        self.svd.solve(&y, self.tolerance).ok()
    }
}

impl ConditionalExpectation for RegressionEstimator {
    fn expectation(&self, value: &ScenarioValue) -> ScenarioValue {
        if value.is_constant() {
            return value.clone();
        }
        match self.coefficients(value) {
            Some(beta) => {
                let fitted = &self.design * beta;
                ScenarioValue::from_paths(fitted.iter().copied().collect())
            }
            None => ScenarioValue::constant(value.average()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_regressor_gives_average() {
        let basis = polynomial_basis(&[ScenarioValue::constant(0.02)], 2);
        let estimator = RegressionEstimator::new(&basis, 4).unwrap();
        let y = ScenarioValue::from_paths(vec![1.0, 2.0, 3.0, 6.0]);
        let e = estimator.expectation(&y);
        for p in 0..4 {
            assert_relative_eq!(e.get(p), 3.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_measurable_value_is_reproduced() {
        let x = ScenarioValue::from_paths(vec![0.01, 0.02, 0.03, 0.04, 0.05]);
        let basis = polynomial_basis(&[x.clone()], 2);
        let estimator = RegressionEstimator::new(&basis, 5).unwrap();
        let y = &(&x * 3.0) - 0.01;
        let e = estimator.expectation(&y);
        for p in 0..5 {
            assert_relative_eq!(e.get(p), y.get(p), epsilon = 1e-10);
        }
    }

    #[test]
    fn test_deterministic_value_passes_through() {
        let estimator = RegressionEstimator::new(&[], 3).unwrap();
        let e = estimator.expectation(&ScenarioValue::constant(7.0));
        assert_eq!(e.as_constant(), Some(7.0));
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            RegressionEstimator::new(&[], 0).unwrap_err(),
            RegressionError::NoPaths
        );
        let basis = [ScenarioValue::from_paths(vec![1.0, 2.0])];
        assert_eq!(
            RegressionEstimator::new(&basis, 3).unwrap_err(),
            RegressionError::DimensionMismatch {
                expected: 3,
                got: 2
            }
        );
        let nan = [ScenarioValue::from_paths(vec![1.0, f64::NAN])];
        assert_eq!(
            RegressionEstimator::new(&nan, 2).unwrap_err(),
            RegressionError::NonFiniteBasis
        );
    }

    #[test]
    fn test_conditional_expectation_method() {
        let estimator = RegressionEstimator::new(&[], 2).unwrap();
        let y = ScenarioValue::from_paths(vec![1.0, 3.0]);
        let e = y.conditional_expectation(&estimator);
        assert_relative_eq!(e.get(0), 2.0, epsilon = 1e-12);
        assert_relative_eq!(e.get(1), 2.0, epsilon = 1e-12);
    }
}

//! Error types for the foundation layer.
//!
//! This module provides:
//! - [`CurrencyError`]: currency code parsing failures
//! - [`RegressionError`]: conditional-expectation estimator construction failures

use thiserror::Error;

/// Currency-related errors.
///
/// # Examples
/// ```
/// use pricer_core::types::CurrencyError;
///
/// let err = CurrencyError::UnknownCurrency("XYZ".to_string());
/// assert_eq!(format!("{}", err), "Unknown currency: XYZ");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurrencyError {
    /// Unknown currency code.
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),
}

/// Errors raised while building a regression estimator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegressionError {
    /// The estimator needs at least one path.
    #[error("Regression requires at least one path")]
    NoPaths,

    /// A basis function has a different path count than the estimator.
    #[error("Basis function path count mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Path count of the estimator
        expected: usize,
        /// Path count of the offending basis function
        got: usize,
    },

    /// A basis function contains NaN or infinite realisations.
    #[error("Basis function contains non-finite values")]
    NonFiniteBasis,

    /// The singular value decomposition did not converge.
    #[error("Singular value decomposition of the design matrix failed")]
    DecompositionFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_error_display() {
        let err = CurrencyError::UnknownCurrency("ABC".to_string());
        assert_eq!(format!("{}", err), "Unknown currency: ABC");
    }

    #[test]
    fn test_regression_error_display() {
        let err = RegressionError::DimensionMismatch {
            expected: 500,
            got: 499,
        };
        assert_eq!(
            format!("{}", err),
            "Basis function path count mismatch: expected 500, got 499"
        );
        assert!(format!("{}", RegressionError::NoPaths).contains("at least one path"));
    }
}

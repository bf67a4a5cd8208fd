//! Numerical building blocks for scenario-wise computations.
//!
//! - `linalg`: Moore-Penrose pseudo-inverse via SVD
//! - `regression`: Least-squares conditional-expectation estimator

pub mod linalg;
pub mod regression;

pub use linalg::pseudo_inverse;
pub use regression::{polynomial_basis, ConditionalExpectation, RegressionEstimator};

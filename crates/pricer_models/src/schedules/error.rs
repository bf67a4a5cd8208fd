//! Time discretisation error types.

use thiserror::Error;

/// Errors that can occur when building a time discretisation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScheduleError {
    /// A discretisation needs at least one time point.
    #[error("Time discretisation is empty")]
    Empty,

    /// Time points must be strictly increasing.
    #[error("Time points not strictly increasing at index {index}: {previous} >= {current}")]
    NotIncreasing {
        /// Index of the offending point.
        index: usize,
        /// The preceding time.
        previous: f64,
        /// The offending time.
        current: f64,
    },

    /// Time points must be finite.
    #[error("Non-finite time point at index {index}")]
    NonFinite {
        /// Index of the offending point.
        index: usize,
    },

    /// Uniform grids need a positive step.
    #[error("Invalid time step: {step}")]
    InvalidStep {
        /// The rejected step.
        step: f64,
    },
}

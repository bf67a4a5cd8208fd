//! Simulation error types.

use thiserror::Error;

use crate::schedules::ScheduleError;

/// Errors reported by a term-structure simulation.
///
/// Messages name the dependency that could not be resolved, so callers
/// can propagate them unchanged.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimulationError {
    /// Requested time lies outside the simulated horizon.
    #[error("Time {time} outside simulation horizon [0, {horizon}]")]
    TimeOutOfRange {
        /// The requested time.
        time: f64,
        /// Last simulated time.
        horizon: f64,
    },

    /// Requested grid index does not exist.
    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Which grid was indexed.
        what: &'static str,
        /// The requested index.
        index: usize,
        /// Length of the grid.
        len: usize,
    },

    /// Curve data needed for a quantity is not available.
    #[error("Curve {curve} unavailable at time {time}")]
    CurveUnavailable {
        /// Curve name.
        curve: String,
        /// Observation time.
        time: f64,
    },

    /// Accrual interval is empty or reversed.
    #[error("Invalid accrual interval [{start}, {end}]")]
    InvalidInterval {
        /// Period start.
        start: f64,
        /// Period end.
        end: f64,
    },

    /// Model or product parameter rejected.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Time grid construction failed.
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),
}

//! SIMM error types.
//!
//! This module provides structured error types for margin calculations
//! using `thiserror` for derivation.

use pricer_core::types::RegressionError;
use pricer_models::models::SimulationError;
use thiserror::Error;

/// Errors that can occur during margin calculations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimmError {
    /// The simulation could not provide a required quantity.
    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),

    /// The conditional-expectation estimator could not be built.
    #[error("Regression error: {0}")]
    Regression(#[from] RegressionError),

    /// No simulation model has been bound to the portfolio.
    #[error("No simulation model bound to the portfolio")]
    ModelNotBound,

    /// Instrument index outside the portfolio.
    #[error("Instrument not found: index {0}")]
    InstrumentNotFound(usize),

    /// Calibration parameters are inconsistent.
    #[error("Invalid SIMM parameters: {0}")]
    InvalidParameters(String),

    /// Melting and interpolation need a positive reset step.
    #[error("Invalid reset step: {0}")]
    InvalidResetStep(f64),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration loading errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// IO error reading the config file.
    #[error("IO error: {0}")]
    Io(String),

    /// Parse error in the config file.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Validation errors.
    #[error("Validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}

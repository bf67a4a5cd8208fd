//! Core financial types.
//!
//! This module provides:
//! - `currency`: ISO 4217 currency codes used as SIMM bucket keys
//! - `error`: Structured error types for currency parsing and regression
//!
//! # Re-exports
//!
//! - [`Currency`] from `currency`
//! - [`CurrencyError`], [`RegressionError`] from `error`

pub mod currency;
pub mod error;

pub use currency::Currency;
pub use error::{CurrencyError, RegressionError};

//! ISDA SIMM forward initial margin.
//!
//! Sensitivities of every instrument are mapped from forward rates to
//! swap rates, rebucketed onto the SIMM maturity grid, memoised per
//! evaluation time and aggregated with the standard initial margin model.
//!
//! ## Layout
//!
//! - [`types`]: classification enums, curve names, run settings
//! - [`parameters`]: risk weights, thresholds and correlations (TOML)
//! - [`estimator`]: regression estimators for conditional expectations
//! - [`curve_mapping`]: forward-rate to swap-rate sensitivity mapping
//! - [`rebucketing`]: tenor points onto the maturity grid
//! - [`cache`], [`melting`], [`survival`]: per-instrument memoisation
//! - [`instrument`]: classified products and sensitivity queries
//! - [`ir_delta`], [`scheme`]: margin aggregation
//! - [`portfolio`]: the [`SimmPortfolio`] entry point

pub mod cache;
pub mod curve_mapping;
pub mod error;
pub mod estimator;
pub mod instrument;
pub mod ir_delta;
pub mod melting;
pub mod parameters;
pub mod portfolio;
pub mod rebucketing;
pub mod scheme;
pub mod survival;
pub mod types;

pub use curve_mapping::CurveMappingEngine;
pub use error::{ConfigError, SimmError};
pub use instrument::{ClassifiedProduct, Instrument, SensitivityContext, SensitivityQuery};
pub use parameters::{CurrencyTier, SimmParameters, PARAMETERS_PATH_ENV};
pub use portfolio::SimmPortfolio;
pub use scheme::MarginBreakdown;
pub use types::{
    CurveName, MarginSettings, MaturityBucket, ProductClass, RiskClass, RiskType,
    SensitivityMode, WeightMode,
};

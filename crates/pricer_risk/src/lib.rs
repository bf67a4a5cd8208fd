//! # Pricer Risk (L4: Application)
//!
//! Forward initial margin under the ISDA Standard Initial Margin Model.
//!
//! This crate provides:
//! - Classified products and a portfolio bound to a term-structure simulation
//! - Swap-rate sensitivities mapped from AD forward-rate gradients
//! - Rebucketing onto the SIMM maturity grid, with exact, melting and
//!   interpolated sensitivity modes
//! - IR delta aggregation, risk-class and product-class correlation
//! - Rayon-based parallelisation over instruments and currency buckets
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            pricer_risk (L4)             │
//! ├─────────────────────────────────────────┤
//! │  simm/      - sensitivities, caches,   │
//! │               aggregation, portfolio    │
//! │  parallel/  - Rayon utilities          │
//! └─────────────────────────────────────────┘
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │           pricer_models (L2)            │
//! │  Simulation and product interfaces      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use pricer_core::types::Currency;
//! use pricer_models::instruments::rates::{SimpleSwap, SwapDirection};
//! use pricer_models::models::rates::{LognormalForwardModel, LognormalForwardParams};
//! use pricer_models::schedules::TimeDiscretization;
//! use pricer_risk::simm::{
//!     ClassifiedProduct, CurveName, MarginSettings, MaturityBucket, ProductClass,
//!     SensitivityQuery, SimmParameters, SimmPortfolio,
//! };
//!
//! let periods = TimeDiscretization::uniform(0.0, 10, 0.5).unwrap();
//! let times = TimeDiscretization::uniform(0.0, 50, 0.1).unwrap();
//! let params = LognormalForwardParams::new(0.02, 0.2, 64, 42);
//! let model = LognormalForwardModel::new(times, periods, params).unwrap();
//!
//! let swap = SimpleSwap::uniform(0.0, 10, 0.5, 0.02, 1.0e6, SwapDirection::PayFixed).unwrap();
//! let product = ClassifiedProduct::new(Arc::new(swap), ProductClass::RatesFx, Currency::EUR);
//!
//! let mut portfolio =
//!     SimmPortfolio::new(vec![product], Arc::new(SimmParameters::default())).unwrap();
//! portfolio.bind_model(Arc::new(model));
//!
//! let query = SensitivityQuery::ir_delta(CurveName::from("Libor6m"), MaturityBucket::Y2, Currency::EUR);
//! let delta = portfolio.net_sensitivity(&query, 1.0).unwrap();
//! assert!(delta.is_finite());
//!
//! let margin = portfolio.initial_margin(1.0, Currency::EUR, MarginSettings::default()).unwrap();
//! assert!(margin.min() >= 0.0);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod parallel;
pub mod simm;

// Re-export commonly used types
pub use parallel::{ParallelConfig, DEFAULT_BATCH_SIZE};
pub use simm::{
    ClassifiedProduct, MarginSettings, SensitivityQuery, SimmError, SimmParameters, SimmPortfolio,
};

//! # pricer_core: Numerical Foundation for Forward Initial Margin
//!
//! ## Layer 1 (Foundation) Role
//!
//! pricer_core serves as the bottom layer of the workspace, providing:
//! - Scenario-indexed values: `ScenarioValue`, `ScenarioMatrix` (`scenario`)
//! - Per-path Moore-Penrose pseudo-inverse (`math::linalg`)
//! - Least-squares conditional expectation (`math::regression`)
//! - Currency types: `Currency` (`types::currency`)
//! - Error types: `CurrencyError`, `RegressionError` (`types::error`)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            pricer_risk (L4)             │
//! │   SIMM sensitivities and aggregation    │
//! └─────────────────────────────────────────┘
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │           pricer_models (L2)            │
//! │   Simulation and product interfaces     │
//! └─────────────────────────────────────────┘
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │            pricer_core (L1)             │
//! │  scenario/ - ScenarioValue, Matrix      │
//! │  math/     - SVD pinv, regression       │
//! │  types/    - Currency, errors           │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Zero Dependency Principle
//!
//! Layer 1 has no dependencies on other pricer_* crates, with minimal external dependencies:
//! - nalgebra: Singular value decomposition
//! - rayon: Path-parallel matrix operations
//! - thiserror: Error derivation
//! - serde: Serialisation support (optional)
//!
//! ## Usage Examples
//!
//! ```rust
//! use pricer_core::scenario::{ScenarioMatrix, ScenarioValue};
//!
//! let x = ScenarioValue::from_paths(vec![1.0, 4.0, 9.0]);
//! assert_eq!(x.sqrt().get(2), 3.0);
//!
//! let id = ScenarioMatrix::identity(3, 2);
//! let inv = id.pseudo_inverse();
//! assert!((inv.entry(1, 1).get(0) - 1.0).abs() < 1e-12);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialisation for Currency

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod math;
pub mod scenario;
pub mod types;

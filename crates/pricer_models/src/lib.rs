//! # Pricer Models (L2: Business Logic)
//!
//! Simulation and product interfaces consumed by the margin engine.
//!
//! This crate provides:
//! - The term-structure simulation trait and versioned model handles
//! - Time discretisations for simulation and forward-rate period grids
//! - The product trait with value, AD gradient and discount-bond hooks
//! - A one-factor lognormal forward-rate reference model
//! - A fixed-for-floating reference swap
//!
//! ## Design Principles
//!
//! - **Trait objects at the collaborator seam**: the margin engine holds
//!   `Arc<dyn TermStructureSimulation>` and `Arc<dyn SimmProduct>`, so
//!   models and products can be swapped without recompiling the engine
//! - **Scenario values everywhere**: every quantity is a
//!   [`pricer_core::scenario::ScenarioValue`]
//! - **Fallible lookups**: out-of-horizon requests return
//!   [`models::SimulationError`] instead of panicking

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod instruments;
pub mod models;
pub mod schedules;

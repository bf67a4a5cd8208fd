//! Interest rate term-structure simulations.

pub mod lognormal_forward;

pub use lognormal_forward::{LognormalForwardModel, LognormalForwardParams};

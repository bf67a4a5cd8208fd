//! Products valued under a term-structure simulation.
//!
//! This module provides:
//! - [`SimmProduct`]: the interface the margin engine consumes
//! - [`RateGradient`]: AD gradient with respect to simulated forward rates
//! - [`SwapSchedule`]: fixing schedule of plain swaps
//! - [`rates`]: reference interest rate products

mod gradient;
pub mod rates;
mod traits;

pub use gradient::RateGradient;
pub use traits::{SimmProduct, SwapSchedule};

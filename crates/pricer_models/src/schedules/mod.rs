//! Time grids for simulations and forward-rate periods.
//!
//! - [`TimeDiscretization`]: strictly increasing grid with tolerant lookups
//! - [`ScheduleError`]: construction failures

mod discretization;
mod error;

pub use discretization::{TimeDiscretization, TIME_TOLERANCE};
pub use error::ScheduleError;

//! Term-structure simulation interface.
//!
//! The margin engine consumes a Monte Carlo term-structure model through
//! the [`TermStructureSimulation`] trait: numeraire, simulated forward
//! rates on the model's rate-period grid, and forward rates for arbitrary
//! accrual periods. Path generation itself lives behind the trait.
//!
//! Every model instance carries a [`ModelId`]. Consumers that cache
//! model-dependent results compare handles to detect a rebinding.
//!
//! ## Models
//!
//! - [`rates::LognormalForwardModel`]: one-factor lognormal forward-rate
//!   simulation used as a reference collaborator in tests and benchmarks

pub mod error;
pub mod rates;

use std::sync::atomic::{AtomicU64, Ordering};

use pricer_core::scenario::ScenarioValue;

use crate::schedules::TimeDiscretization;

pub use error::SimulationError;

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(1);

/// Versioned handle identifying one simulation model instance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(u64);

impl ModelId {
    /// Allocates a fresh, process-unique handle.
    pub fn next() -> Self {
        Self(NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw handle value.
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Monte Carlo term-structure model as seen by the margin engine.
///
/// Forward rate `L_j(t_i)` is the rate of period `[T_j, T_{j+1})` of the
/// rate-period grid observed at simulation time `t_i`. The numeraire is
/// the simulation measure's numeraire `N(t)`.
pub trait TermStructureSimulation: Send + Sync {
    /// Handle of this model instance.
    fn id(&self) -> ModelId;

    /// Number of simulated paths.
    fn n_paths(&self) -> usize;

    /// Simulation time grid `t_i`.
    fn time_discretization(&self) -> &TimeDiscretization;

    /// Forward-rate period grid `T_j`.
    fn rate_periods(&self) -> &TimeDiscretization;

    /// Number of simulated forward rates, one per rate period.
    fn n_rates(&self) -> usize {
        self.rate_periods().n_steps()
    }

    /// Numeraire `N(t)`.
    fn numeraire(&self, time: f64) -> Result<ScenarioValue, SimulationError>;

    /// Simulated forward rate `L_j(t_i)`.
    fn forward_rate(
        &self,
        time_index: usize,
        rate_index: usize,
    ) -> Result<ScenarioValue, SimulationError>;

    /// Forward rate for the accrual period `[start, end]` observed at `time`.
    fn forward_rate_between(
        &self,
        time: f64,
        start: f64,
        end: f64,
    ) -> Result<ScenarioValue, SimulationError>;
}

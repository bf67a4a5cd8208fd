//! Product interface consumed by the margin engine.
//!
//! A product exposes its scenario-wise value and the derivatives the
//! sensitivity engine needs. All hooks except [`SimmProduct::value`] have
//! defaults meaning "not available", which the engine maps to zero
//! sensitivity.
//!
//! # Layer Boundaries
//!
//! Payoff logic and automatic differentiation happen behind this trait.
//! The trait only fixes the shape of the results.

use std::fmt::Debug;

use pricer_core::scenario::ScenarioValue;

use super::gradient::RateGradient;
use crate::models::{SimulationError, TermStructureSimulation};

/// Fixing schedule of a plain interest rate swap.
///
/// Products that expose a schedule get their forward-rate sensitivities
/// in closed form instead of through an AD gradient.
#[derive(Clone, Debug, PartialEq)]
pub struct SwapSchedule {
    /// Fixing times of the floating periods, increasing
    pub fixing_dates: Vec<f64>,
    /// Signed notional (positive for payer)
    pub notional: f64,
}

/// Product valued under a [`TermStructureSimulation`].
///
/// # Examples
///
/// ```
/// use pricer_core::scenario::ScenarioValue;
/// use pricer_models::instruments::SimmProduct;
/// use pricer_models::models::{SimulationError, TermStructureSimulation};
///
/// #[derive(Debug)]
/// struct Cash(f64);
///
/// impl SimmProduct for Cash {
///     fn value(
///         &self,
///         _evaluation_time: f64,
///         _model: &dyn TermStructureSimulation,
///     ) -> Result<ScenarioValue, SimulationError> {
///         Ok(ScenarioValue::constant(self.0))
///     }
/// }
///
/// assert!(Cash(1.0).swap_schedule().is_none());
/// ```
pub trait SimmProduct: Send + Sync + Debug {
    /// Value at `evaluation_time` in units of the numeraire at that time,
    /// path by path. Future cash flows may be realised pathwise; the
    /// engine applies its own conditional expectation.
    fn value(
        &self,
        evaluation_time: f64,
        model: &dyn TermStructureSimulation,
    ) -> Result<ScenarioValue, SimulationError>;

    /// Derivative of the time-zero value with respect to every simulated
    /// forward rate `L_j(t_i)`.
    fn rate_gradient(
        &self,
        _evaluation_time: f64,
        _model: &dyn TermStructureSimulation,
    ) -> Result<RateGradient, SimulationError> {
        Ok(RateGradient::new())
    }

    /// Version of the gradient valid at `evaluation_time`.
    ///
    /// A product whose cash-flow structure changes over time (a swaption
    /// after physical exercise) returns a new epoch from that time on,
    /// and the cached gradient is recomputed.
    fn gradient_epoch(&self, _evaluation_time: f64) -> u32 {
        0
    }

    /// Fixing schedule, for products that are plain swaps.
    fn swap_schedule(&self) -> Option<SwapSchedule> {
        None
    }

    /// Derivatives `dV(t)/dP(t, t + m)` with respect to discount bonds,
    /// tagged with the residual maturity `m`.
    fn discount_sensitivities(
        &self,
        _evaluation_time: f64,
        _model: &dyn TermStructureSimulation,
    ) -> Result<Vec<(f64, ScenarioValue)>, SimulationError> {
        Ok(Vec::new())
    }

    /// Path-wise exercise indicator at `evaluation_time` (1 when the
    /// product is alive), used to localise the regression.
    fn exercise_indicator(
        &self,
        _evaluation_time: f64,
        _model: &dyn TermStructureSimulation,
    ) -> Result<Option<ScenarioValue>, SimulationError> {
        Ok(None)
    }
}

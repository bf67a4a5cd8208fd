//! Conditional expectation estimators used by the sensitivity engine.
//!
//! Regressors at evaluation time `t` are the simulated rates
//! `L(t; t, t + dT)` and `L(t; t, T_{n-1})`, clamped to the model
//! horizon and, for products that expose one, multiplied by their
//! exercise indicator. The basis is the order-2 polynomial of each
//! regressor. Past the horizon no regressor exists and the estimator
//! falls back to the scenario average.

use pricer_core::math::{polynomial_basis, RegressionEstimator};
use pricer_core::scenario::ScenarioValue;
use pricer_models::instruments::SimmProduct;
use pricer_models::models::{SimulationError, TermStructureSimulation};
use pricer_models::schedules::TIME_TOLERANCE;

use super::error::SimmError;

/// Polynomial order of the regression basis.
pub const REGRESSION_ORDER: usize = 2;

/// Regressors at `evaluation_time`, localised by `indicator` when given.
pub fn regressors(
    model: &dyn TermStructureSimulation,
    evaluation_time: f64,
    indicator: Option<&ScenarioValue>,
) -> Result<Vec<ScenarioValue>, SimmError> {
    let periods = model.rate_periods();
    let horizon = periods.last();
    let period_length = periods.step(0).ok_or(SimulationError::IndexOutOfRange {
        what: "rate period",
        index: 0,
        len: periods.n_steps(),
    })?;

    let short_end = (evaluation_time + period_length).min(horizon);
    if short_end - evaluation_time <= TIME_TOLERANCE {
        return Ok(Vec::new());
    }
    let last_fixing = periods
        .n_steps()
        .checked_sub(1)
        .and_then(|i| periods.time(i))
        .unwrap_or(horizon);
    let long_end = last_fixing.max(evaluation_time + period_length).min(horizon);

    let mut regressors = vec![
        model.forward_rate_between(evaluation_time, evaluation_time, short_end)?,
        model.forward_rate_between(evaluation_time, evaluation_time, long_end)?,
    ];
    if let Some(indicator) = indicator {
        for regressor in &mut regressors {
            *regressor = &*regressor * indicator;
        }
    }
    Ok(regressors)
}

/// Estimator conditioning on the market state at `evaluation_time`.
pub fn market_estimator(
    model: &dyn TermStructureSimulation,
    evaluation_time: f64,
) -> Result<RegressionEstimator, SimmError> {
    let basis = polynomial_basis(&regressors(model, evaluation_time, None)?, REGRESSION_ORDER);
    Ok(RegressionEstimator::new(&basis, model.n_paths())?)
}

/// Estimator localised to the paths on which `product` is still alive.
pub fn product_estimator(
    model: &dyn TermStructureSimulation,
    product: &dyn SimmProduct,
    evaluation_time: f64,
) -> Result<RegressionEstimator, SimmError> {
    let indicator = product.exercise_indicator(evaluation_time, model)?;
    let basis = polynomial_basis(
        &regressors(model, evaluation_time, indicator.as_ref())?,
        REGRESSION_ORDER,
    );
    Ok(RegressionEstimator::new(&basis, model.n_paths())?)
}

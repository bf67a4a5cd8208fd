//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use pricer_core::scenario::ScenarioValue;
use pricer_core::types::Currency;
use pricer_models::instruments::rates::{SimpleSwap, SwapDirection};
use pricer_models::instruments::SimmProduct;
use pricer_models::models::rates::{LognormalForwardModel, LognormalForwardParams};
use pricer_models::models::{SimulationError, TermStructureSimulation};
use pricer_models::schedules::TimeDiscretization;
use pricer_risk::simm::{ClassifiedProduct, ProductClass, SimmParameters, SimmPortfolio};

/// Installs a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Five-year model on a semi-annual rate grid.
pub fn model(n_paths: usize, seed: u64) -> Arc<dyn TermStructureSimulation> {
    let periods = TimeDiscretization::uniform(0.0, 10, 0.5).unwrap();
    let times = TimeDiscretization::uniform(0.0, 50, 0.1).unwrap();
    let params = LognormalForwardParams::new(0.02, 0.2, n_paths, seed);
    Arc::new(LognormalForwardModel::new(times, periods, params).unwrap())
}

/// Deterministic model on a flat forward curve at `rate`.
pub fn flat_model(rate: f64, n_paths: usize) -> Arc<dyn TermStructureSimulation> {
    let periods = TimeDiscretization::uniform(0.0, 10, 0.5).unwrap();
    let times = TimeDiscretization::uniform(0.0, 50, 0.1).unwrap();
    let params = LognormalForwardParams::new(rate, 0.0, n_paths, 1);
    Arc::new(LognormalForwardModel::new(times, periods, params).unwrap())
}

/// Semi-annual swap starting today.
pub fn swap(
    n_periods: usize,
    rate: f64,
    notional: f64,
    direction: SwapDirection,
    currency: Currency,
) -> ClassifiedProduct {
    let swap = SimpleSwap::uniform(0.0, n_periods, 0.5, rate, notional, direction).unwrap();
    ClassifiedProduct::new(Arc::new(swap), ProductClass::RatesFx, currency)
}

/// Portfolio with default parameters and `model` bound.
pub fn portfolio(
    products: Vec<ClassifiedProduct>,
    model: &Arc<dyn TermStructureSimulation>,
) -> SimmPortfolio {
    init_tracing();
    let mut portfolio = SimmPortfolio::new(products, Arc::new(SimmParameters::default())).unwrap();
    portfolio.bind_model(Arc::clone(model));
    portfolio
}

/// Pays the next 6m rate minus a strike; holders walk away once the
/// expected payoff turns negative.
#[derive(Debug)]
pub struct RateCall {
    pub strike: f64,
}

impl SimmProduct for RateCall {
    fn value(
        &self,
        evaluation_time: f64,
        model: &dyn TermStructureSimulation,
    ) -> Result<ScenarioValue, SimulationError> {
        let end = (evaluation_time + 0.5).min(model.rate_periods().last());
        if end - evaluation_time <= 1e-9 {
            return Ok(ScenarioValue::constant(-1.0));
        }
        Ok(model.forward_rate_between(evaluation_time, evaluation_time, end)? - self.strike)
    }
}

/// Cancelable [`RateCall`] in EUR.
pub fn cancelable_call(strike: f64) -> ClassifiedProduct {
    ClassifiedProduct::new(Arc::new(RateCall { strike }), ProductClass::RatesFx, Currency::EUR)
        .cancelable()
}

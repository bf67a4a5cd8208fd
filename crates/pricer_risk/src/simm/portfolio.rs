//! Portfolio-level initial margin.
//!
//! [`SimmPortfolio`] owns its instruments and one bound simulation model.
//! A margin run gathers the net IR delta table of every product class by
//! asking all instruments (in parallel, each task owning one instrument),
//! aggregates each currency bucket and combines the result through the
//! SIMM risk-class and product-class correlations.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use pricer_core::scenario::{ScenarioMatrix, ScenarioValue};
use pricer_core::types::Currency;
use pricer_models::models::TermStructureSimulation;
use tracing::{debug, trace};

use super::curve_mapping::{libor_swap_jacobian, CurveMappingEngine};
use super::error::SimmError;
use super::estimator::market_estimator;
use super::instrument::{ClassifiedProduct, Instrument, SensitivityContext, SensitivityQuery};
use super::ir_delta::{ir_delta_margin, BucketNetSensitivities};
use super::parameters::SimmParameters;
use super::scheme::{risk_class_margin, MarginBreakdown, RiskClassMargins};
use super::types::{MarginSettings, ProductClass, RiskClass, WeightMode};
use crate::parallel::{parallel_map_mut, ParallelConfig};

type Contribution = Vec<(ProductClass, BucketNetSensitivities)>;

/// Portfolio of classified products with forward initial margin.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use pricer_core::types::Currency;
/// use pricer_models::instruments::rates::{SimpleSwap, SwapDirection};
/// use pricer_models::models::rates::{LognormalForwardModel, LognormalForwardParams};
/// use pricer_models::schedules::TimeDiscretization;
/// use pricer_risk::simm::{ClassifiedProduct, MarginSettings, ProductClass, SimmParameters, SimmPortfolio};
///
/// let periods = TimeDiscretization::uniform(0.0, 10, 0.5).unwrap();
/// let times = TimeDiscretization::uniform(0.0, 50, 0.1).unwrap();
/// let model = LognormalForwardModel::new(times, periods, LognormalForwardParams::new(0.02, 0.2, 64, 7)).unwrap();
///
/// let swap = SimpleSwap::uniform(0.0, 10, 0.5, 0.02, 1.0e6, SwapDirection::PayFixed).unwrap();
/// let product = ClassifiedProduct::new(Arc::new(swap), ProductClass::RatesFx, Currency::EUR);
///
/// let mut portfolio = SimmPortfolio::new(vec![product], Arc::new(SimmParameters::default())).unwrap();
/// portfolio.bind_model(Arc::new(model));
/// let margin = portfolio.initial_margin(0.0, Currency::EUR, MarginSettings::default()).unwrap();
/// assert!(margin.average() > 0.0);
/// ```
pub struct SimmPortfolio {
    instruments: Vec<Instrument>,
    parameters: Arc<SimmParameters>,
    model: Option<Arc<dyn TermStructureSimulation>>,
    engine: CurveMappingEngine,
    settings: MarginSettings,
    constant_weights: Option<ScenarioMatrix>,
    parallel: ParallelConfig,
}

impl fmt::Debug for SimmPortfolio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimmPortfolio")
            .field("instruments", &self.instruments.len())
            .field("model", &self.model.as_ref().map(|m| m.id()))
            .field("settings", &self.settings)
            .field("parallel", &self.parallel)
            .finish()
    }
}

impl SimmPortfolio {
    /// Creates a portfolio after validating `parameters`.
    pub fn new(
        products: Vec<ClassifiedProduct>,
        parameters: Arc<SimmParameters>,
    ) -> Result<Self, SimmError> {
        parameters.validate()?;
        Ok(Self {
            instruments: products.into_iter().map(Instrument::new).collect(),
            parameters,
            model: None,
            engine: CurveMappingEngine::new(),
            settings: MarginSettings::default(),
            constant_weights: None,
            parallel: ParallelConfig::default(),
        })
    }

    /// Creates a portfolio with parameters from
    /// [`SimmParameters::load_or_default`].
    pub fn with_configured_parameters(products: Vec<ClassifiedProduct>) -> Result<Self, SimmError> {
        Self::new(products, Arc::new(SimmParameters::load_or_default()))
    }

    /// Replaces the parallel execution settings.
    pub fn with_parallel_config(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    /// Number of instruments.
    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    /// Returns `true` if the portfolio holds no instrument.
    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Instrument at `index`.
    pub fn instrument(&self, index: usize) -> Option<&Instrument> {
        self.instruments.get(index)
    }

    /// Calibration parameters.
    pub fn parameters(&self) -> &SimmParameters {
        &self.parameters
    }

    /// Settings of the latest run.
    pub fn settings(&self) -> MarginSettings {
        self.settings
    }

    /// Curve-mapping engine, exposing how many mappings were performed.
    pub fn engine(&self) -> &CurveMappingEngine {
        &self.engine
    }

    /// Binds a simulation model. Binding a different model clears every
    /// cache; rebinding the same model keeps them.
    pub fn bind_model(&mut self, model: Arc<dyn TermStructureSimulation>) {
        let id = model.id();
        if self.model.as_ref().map(|m| m.id()) == Some(id) {
            trace!(model_id = id.value(), "model already bound");
            return;
        }
        debug!(
            model_id = id.value(),
            n_instruments = self.instruments.len(),
            "binding simulation model"
        );
        self.invalidate();
        self.model = Some(model);
    }

    /// Clears every cache of every instrument.
    pub fn invalidate(&mut self) {
        for instrument in &mut self.instruments {
            instrument.invalidate();
        }
        self.constant_weights = None;
    }

    /// Switches to `settings`. Sensitivities computed under other settings
    /// are dropped.
    pub fn set_settings(&mut self, settings: MarginSettings) -> Result<(), SimmError> {
        settings.validate()?;
        if settings == self.settings {
            return Ok(());
        }
        debug!(?settings, "margin settings changed");
        for instrument in &mut self.instruments {
            instrument.clear_sensitivities();
        }
        self.constant_weights = None;
        self.settings = settings;
        Ok(())
    }

    /// Initial margin at `evaluation_time`, reported in
    /// `calculation_currency`.
    pub fn initial_margin(
        &mut self,
        evaluation_time: f64,
        calculation_currency: Currency,
        settings: MarginSettings,
    ) -> Result<ScenarioValue, SimmError> {
        Ok(self
            .margin_breakdown(evaluation_time, calculation_currency, settings)?
            .total())
    }

    /// Initial margin at `evaluation_time` per product class.
    pub fn margin_breakdown(
        &mut self,
        evaluation_time: f64,
        calculation_currency: Currency,
        settings: MarginSettings,
    ) -> Result<MarginBreakdown, SimmError> {
        self.set_settings(settings)?;
        let model = self.bound_model()?;
        self.ensure_constant_weights(model.as_ref())?;

        let ctx = SensitivityContext {
            model: model.as_ref(),
            engine: &self.engine,
            settings: self.settings,
            constant_weights: self.constant_weights.as_ref(),
        };
        let curve_names = &self.parameters.curve_names;
        let gather = |instrument: &mut Instrument| -> Result<Contribution, SimmError> {
            let mut contribution = Vec::new();
            for product_class in ProductClass::ALL {
                if let Some(net) = instrument.ir_delta_contribution(
                    &ctx,
                    product_class,
                    curve_names,
                    evaluation_time,
                )? {
                    contribution.push((product_class, net));
                }
            }
            Ok(contribution)
        };
        let contributions: Vec<Result<Contribution, SimmError>> =
            if self.parallel.should_parallelize(self.instruments.len()) {
                parallel_map_mut(&mut self.instruments, self.parallel.batch_size, gather)
            } else {
                self.instruments.iter_mut().map(gather).collect()
            };

        let mut tables: BTreeMap<ProductClass, BTreeMap<Currency, BucketNetSensitivities>> =
            BTreeMap::new();
        for contribution in contributions {
            for (product_class, net) in contribution? {
                match tables.entry(product_class).or_default().entry(net.currency()) {
                    Entry::Occupied(mut table) => table.get_mut().merge(&net),
                    Entry::Vacant(slot) => {
                        slot.insert(net);
                    }
                }
            }
        }

        let zero = ScenarioValue::zero();
        let mut breakdown = MarginBreakdown::new(calculation_currency);
        for (product_class, by_currency) in tables {
            let buckets: Vec<BucketNetSensitivities> = by_currency.into_values().collect();
            let delta = ir_delta_margin(&buckets, &self.parameters, &self.parallel);
            let mut risk_classes = RiskClassMargins::new();
            risk_classes.set(RiskClass::InterestRate, risk_class_margin(&delta, &zero, &zero));
            let margin = risk_classes.product_class_margin(&self.parameters);
            debug!(
                ?product_class,
                n_buckets = buckets.len(),
                mean = margin.average(),
                "product class margin"
            );
            breakdown.product_classes.insert(product_class, margin);
        }
        debug!(
            time = evaluation_time,
            currency = calculation_currency.code(),
            mean = breakdown.total().average(),
            "initial margin"
        );
        Ok(breakdown)
    }

    /// Sensitivity of the instrument at `index` to one risk factor.
    pub fn instrument_sensitivity(
        &mut self,
        index: usize,
        query: &SensitivityQuery,
        evaluation_time: f64,
    ) -> Result<ScenarioValue, SimmError> {
        let model = self.bound_model()?;
        self.ensure_constant_weights(model.as_ref())?;
        let ctx = SensitivityContext {
            model: model.as_ref(),
            engine: &self.engine,
            settings: self.settings,
            constant_weights: self.constant_weights.as_ref(),
        };
        let instrument = self
            .instruments
            .get_mut(index)
            .ok_or(SimmError::InstrumentNotFound(index))?;
        instrument.sensitivity(&ctx, query, evaluation_time)
    }

    /// Portfolio net sensitivity to one risk factor.
    pub fn net_sensitivity(
        &mut self,
        query: &SensitivityQuery,
        evaluation_time: f64,
    ) -> Result<ScenarioValue, SimmError> {
        let model = self.bound_model()?;
        self.ensure_constant_weights(model.as_ref())?;
        let ctx = SensitivityContext {
            model: model.as_ref(),
            engine: &self.engine,
            settings: self.settings,
            constant_weights: self.constant_weights.as_ref(),
        };
        let sensitivity = |instrument: &mut Instrument| {
            instrument.sensitivity(&ctx, query, evaluation_time)
        };
        let values: Vec<Result<ScenarioValue, SimmError>> =
            if self.parallel.should_parallelize(self.instruments.len()) {
                parallel_map_mut(&mut self.instruments, self.parallel.batch_size, sensitivity)
            } else {
                self.instruments.iter_mut().map(sensitivity).collect()
            };
        values.into_iter().sum()
    }

    /// Survival probability of the instrument at `index`.
    pub fn survival_probability(
        &mut self,
        index: usize,
        evaluation_time: f64,
    ) -> Result<f64, SimmError> {
        let model = self.bound_model()?;
        let instrument = self
            .instruments
            .get_mut(index)
            .ok_or(SimmError::InstrumentNotFound(index))?;
        instrument.survival_probability(model.as_ref(), evaluation_time)
    }

    fn bound_model(&self) -> Result<Arc<dyn TermStructureSimulation>, SimmError> {
        self.model.clone().ok_or(SimmError::ModelNotBound)
    }

    fn ensure_constant_weights(
        &mut self,
        model: &dyn TermStructureSimulation,
    ) -> Result<(), SimmError> {
        if self.settings.weight_mode != WeightMode::Constant || self.constant_weights.is_some() {
            return Ok(());
        }
        let estimator = market_estimator(model, 0.0)?;
        let weights = libor_swap_jacobian(model, 0.0, &estimator)?;
        debug!(n_rates = weights.rows(), "computed time-zero swap weights");
        self.constant_weights = Some(weights);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricer_models::instruments::rates::{SimpleSwap, SwapDirection};
    use pricer_models::models::rates::{LognormalForwardModel, LognormalForwardParams};
    use pricer_models::schedules::TimeDiscretization;

    fn model(seed: u64) -> Arc<dyn TermStructureSimulation> {
        let periods = TimeDiscretization::uniform(0.0, 10, 0.5).unwrap();
        let times = TimeDiscretization::uniform(0.0, 50, 0.1).unwrap();
        Arc::new(
            LognormalForwardModel::new(times, periods, LognormalForwardParams::new(0.02, 0.2, 32, seed))
                .unwrap(),
        )
    }

    fn swap(currency: Currency) -> ClassifiedProduct {
        let swap = SimpleSwap::uniform(0.0, 10, 0.5, 0.02, 1.0e4, SwapDirection::PayFixed).unwrap();
        ClassifiedProduct::new(Arc::new(swap), ProductClass::RatesFx, currency)
    }

    #[test]
    fn test_margin_requires_model() {
        let mut portfolio =
            SimmPortfolio::new(vec![swap(Currency::EUR)], Arc::new(SimmParameters::default()))
                .unwrap();
        let err = portfolio
            .initial_margin(0.0, Currency::EUR, MarginSettings::default())
            .unwrap_err();
        assert_eq!(err, SimmError::ModelNotBound);
    }

    #[test]
    fn test_invalid_parameters_are_rejected() {
        let mut params = SimmParameters::default();
        params.curve_names.clear();
        let result = SimmPortfolio::new(Vec::new(), Arc::new(params));
        assert!(matches!(result, Err(SimmError::Config(_))));
    }

    #[test]
    fn test_empty_portfolio_has_zero_margin() {
        let mut portfolio = SimmPortfolio::new(Vec::new(), Arc::new(SimmParameters::default())).unwrap();
        portfolio.bind_model(model(1));
        let margin = portfolio
            .initial_margin(0.0, Currency::USD, MarginSettings::default())
            .unwrap();
        assert_eq!(margin.as_constant(), Some(0.0));
    }

    #[test]
    fn test_unknown_instrument_index() {
        let mut portfolio =
            SimmPortfolio::new(vec![swap(Currency::EUR)], Arc::new(SimmParameters::default()))
                .unwrap();
        portfolio.bind_model(model(1));
        assert_eq!(
            portfolio.survival_probability(3, 0.5).unwrap_err(),
            SimmError::InstrumentNotFound(3)
        );
    }

    #[test]
    fn test_invalid_reset_step_is_rejected() {
        let mut portfolio =
            SimmPortfolio::new(vec![swap(Currency::EUR)], Arc::new(SimmParameters::default()))
                .unwrap();
        portfolio.bind_model(model(1));
        let settings = MarginSettings::new(
            crate::simm::types::SensitivityMode::Interpolation,
            WeightMode::Stochastic,
            0.0,
        );
        assert_eq!(
            portfolio.initial_margin(0.5, Currency::EUR, settings).unwrap_err(),
            SimmError::InvalidResetStep(0.0)
        );
    }

    #[test]
    fn test_rebinding_same_model_keeps_cache() {
        let m = model(5);
        let mut portfolio =
            SimmPortfolio::new(vec![swap(Currency::EUR)], Arc::new(SimmParameters::default()))
                .unwrap();
        portfolio.bind_model(Arc::clone(&m));
        portfolio
            .initial_margin(0.0, Currency::EUR, MarginSettings::default())
            .unwrap();
        let computed = portfolio.engine().computations();

        portfolio.bind_model(Arc::clone(&m));
        portfolio
            .initial_margin(0.0, Currency::EUR, MarginSettings::default())
            .unwrap();
        assert_eq!(portfolio.engine().computations(), computed);

        portfolio.bind_model(model(6));
        portfolio
            .initial_margin(0.0, Currency::EUR, MarginSettings::default())
            .unwrap();
        assert!(portfolio.engine().computations() > computed);
    }
}

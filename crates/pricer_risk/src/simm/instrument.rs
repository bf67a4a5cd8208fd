//! Classified products and their per-instrument state.
//!
//! An [`Instrument`] wraps a [`ClassifiedProduct`] together with
//! everything memoised for it: bucketed sensitivities of the current
//! evaluation time, melting anchors, survival indicators, the AD gradient
//! and the regression estimators. Instruments are owned by one portfolio
//! and mutated through `&mut self` only, so a portfolio can hand each of
//! them to a separate rayon task.

use std::sync::Arc;

use pricer_core::math::RegressionEstimator;
use pricer_core::scenario::{ScenarioMatrix, ScenarioValue};
use pricer_core::types::Currency;
use pricer_models::instruments::{RateGradient, SimmProduct};
use pricer_models::models::TermStructureSimulation;
use pricer_models::schedules::TIME_TOLERANCE;
use tracing::trace;

use super::cache::{BucketSensitivities, SensitivityCache, TimeKey};
use super::curve_mapping::{CurveMappingEngine, MappingRequest};
use super::error::SimmError;
use super::estimator::{market_estimator, product_estimator};
use super::ir_delta::BucketNetSensitivities;
use super::melting::{anchor_time, AnchorSensitivities, MeltingAnchors};
use super::rebucketing::{default_tenor_days, rebucket};
use super::survival::SurvivalTracker;
use super::types::{
    CurveName, MarginSettings, MaturityBucket, ProductClass, RiskClass, RiskType,
    SensitivityMode, IR_BUCKET_DAYS,
};

/// A product together with its SIMM classification.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use pricer_core::types::Currency;
/// use pricer_models::instruments::rates::{SimpleSwap, SwapDirection};
/// use pricer_risk::simm::{ClassifiedProduct, CurveName, ProductClass, RiskClass};
///
/// let swap = SimpleSwap::uniform(0.0, 4, 0.5, 0.02, 1.0e6, SwapDirection::PayFixed).unwrap();
/// let product = ClassifiedProduct::new(Arc::new(swap), ProductClass::RatesFx, Currency::EUR);
///
/// assert!(product.has_risk_class(RiskClass::InterestRate));
/// assert!(product.references_curve(&CurveName::from("Libor6m")));
/// assert!(!product.is_cancelable());
/// ```
#[derive(Debug, Clone)]
pub struct ClassifiedProduct {
    product: Arc<dyn SimmProduct>,
    product_class: ProductClass,
    risk_classes: Vec<RiskClass>,
    currency: Currency,
    curve_names: Vec<CurveName>,
    has_optionality: bool,
    is_cancelable: bool,
}

impl ClassifiedProduct {
    /// Interest rate product on the discount curve and the 6m forward
    /// curve, without optionality.
    pub fn new(product: Arc<dyn SimmProduct>, product_class: ProductClass, currency: Currency) -> Self {
        Self {
            product,
            product_class,
            risk_classes: vec![RiskClass::InterestRate],
            currency,
            curve_names: vec![CurveName::ois(), CurveName::from("Libor6m")],
            has_optionality: false,
            is_cancelable: false,
        }
    }

    /// Replaces the risk classes.
    pub fn with_risk_classes(mut self, risk_classes: Vec<RiskClass>) -> Self {
        self.risk_classes = risk_classes;
        self
    }

    /// Replaces the curves the product is sensitive to.
    pub fn with_curve_names(mut self, curve_names: Vec<CurveName>) -> Self {
        self.curve_names = curve_names;
        self
    }

    /// Marks the product as carrying optionality.
    pub fn with_optionality(mut self) -> Self {
        self.has_optionality = true;
        self
    }

    /// Marks the product as cancelable. Cancelable products carry a
    /// survival probability.
    pub fn cancelable(mut self) -> Self {
        self.is_cancelable = true;
        self.has_optionality = true;
        self
    }

    /// Underlying product.
    #[inline]
    pub fn product(&self) -> &Arc<dyn SimmProduct> {
        &self.product
    }

    /// Product class.
    #[inline]
    pub fn product_class(&self) -> ProductClass {
        self.product_class
    }

    /// Risk classes.
    #[inline]
    pub fn risk_classes(&self) -> &[RiskClass] {
        &self.risk_classes
    }

    /// Currency, which is also the IR bucket key.
    #[inline]
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Curves the product is sensitive to.
    #[inline]
    pub fn curve_names(&self) -> &[CurveName] {
        &self.curve_names
    }

    /// Whether the product carries optionality.
    #[inline]
    pub fn has_optionality(&self) -> bool {
        self.has_optionality
    }

    /// Whether the product can be cancelled.
    #[inline]
    pub fn is_cancelable(&self) -> bool {
        self.is_cancelable
    }

    /// Returns `true` if the product is exposed to `risk_class`.
    pub fn has_risk_class(&self, risk_class: RiskClass) -> bool {
        self.risk_classes.contains(&risk_class)
    }

    /// Returns `true` if the product is sensitive to `curve`.
    pub fn references_curve(&self, curve: &CurveName) -> bool {
        self.curve_names.contains(curve)
    }
}

/// One sensitivity requested from an instrument or a portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SensitivityQuery {
    /// Product class
    pub product_class: ProductClass,
    /// Risk class
    pub risk_class: RiskClass,
    /// Maturity bucket
    pub maturity_bucket: MaturityBucket,
    /// Curve
    pub curve: CurveName,
    /// Bucket key
    pub bucket_key: Currency,
    /// Risk type
    pub risk_type: RiskType,
}

impl SensitivityQuery {
    /// Interest rate delta of the rates product class.
    pub fn ir_delta(curve: CurveName, maturity_bucket: MaturityBucket, bucket_key: Currency) -> Self {
        Self {
            product_class: ProductClass::RatesFx,
            risk_class: RiskClass::InterestRate,
            maturity_bucket,
            curve,
            bucket_key,
            risk_type: RiskType::Delta,
        }
    }
}

/// Shared inputs of a sensitivity computation.
#[derive(Clone, Copy)]
pub struct SensitivityContext<'a> {
    /// Bound simulation model
    pub model: &'a dyn TermStructureSimulation,
    /// Curve-mapping engine
    pub engine: &'a CurveMappingEngine,
    /// Settings of the run
    pub settings: MarginSettings,
    /// Time-zero `dL/dS`, present in constant weight mode
    pub constant_weights: Option<&'a ScenarioMatrix>,
}

#[derive(Debug)]
struct Estimators {
    time: TimeKey,
    market: RegressionEstimator,
    product: RegressionEstimator,
}

/// A classified product with its memoised state.
#[derive(Debug)]
pub struct Instrument {
    classified: ClassifiedProduct,
    cache: SensitivityCache,
    survival: SurvivalTracker,
    gradient: Option<(u32, Arc<RateGradient>)>,
    estimators: Option<Arc<Estimators>>,
    anchors: MeltingAnchors,
}

impl Instrument {
    /// Instrument with empty caches.
    pub fn new(classified: ClassifiedProduct) -> Self {
        Self {
            classified,
            cache: SensitivityCache::new(),
            survival: SurvivalTracker::new(),
            gradient: None,
            estimators: None,
            anchors: MeltingAnchors::new(),
        }
    }

    /// Classification of the product.
    #[inline]
    pub fn classified(&self) -> &ClassifiedProduct {
        &self.classified
    }

    /// Drops every memoised value.
    pub fn invalidate(&mut self) {
        self.cache.clear();
        self.survival.clear();
        self.gradient = None;
        self.estimators = None;
        self.anchors.clear();
    }

    /// Drops the sensitivities that depend on the calculation settings.
    pub fn clear_sensitivities(&mut self) {
        self.cache.clear();
        self.anchors.clear();
    }

    /// Whether the instrument contributes to `query`.
    pub fn applies_to(&self, query: &SensitivityQuery) -> bool {
        let classified = &self.classified;
        match query.risk_type {
            RiskType::Delta => {}
            RiskType::Vega | RiskType::Curvature => return false,
        }
        query.product_class == classified.product_class
            && query.risk_class == RiskClass::InterestRate
            && classified.has_risk_class(query.risk_class)
            && query.bucket_key == classified.currency
            && classified.references_curve(&query.curve)
            && !query.curve.is_pseudo_curve()
    }

    /// Sensitivity to one risk factor at `evaluation_time`; zero when the
    /// instrument is not exposed to it.
    pub fn sensitivity(
        &mut self,
        ctx: &SensitivityContext<'_>,
        query: &SensitivityQuery,
        evaluation_time: f64,
    ) -> Result<ScenarioValue, SimmError> {
        if !self.applies_to(query) {
            return Ok(ScenarioValue::zero());
        }
        let buckets =
            self.bucket_sensitivities(ctx, query.risk_class, &query.curve, evaluation_time)?;
        Ok(buckets.get(query.maturity_bucket).clone())
    }

    /// Interest rate delta of the instrument as a bucket table on
    /// `curve_names`, or `None` outside `product_class`.
    pub fn ir_delta_contribution(
        &mut self,
        ctx: &SensitivityContext<'_>,
        product_class: ProductClass,
        curve_names: &[CurveName],
        evaluation_time: f64,
    ) -> Result<Option<BucketNetSensitivities>, SimmError> {
        if product_class != self.classified.product_class
            || !self.classified.has_risk_class(RiskClass::InterestRate)
        {
            return Ok(None);
        }
        let template = SensitivityQuery {
            product_class,
            risk_class: RiskClass::InterestRate,
            maturity_bucket: MaturityBucket::W2,
            curve: CurveName::ois(),
            bucket_key: self.classified.currency,
            risk_type: RiskType::Delta,
        };

        let mut net = BucketNetSensitivities::new(self.classified.currency, curve_names.len());
        for (index, curve) in curve_names.iter().enumerate() {
            let query = SensitivityQuery {
                curve: curve.clone(),
                ..template.clone()
            };
            if !self.applies_to(&query) {
                continue;
            }
            let buckets =
                self.bucket_sensitivities(ctx, RiskClass::InterestRate, curve, evaluation_time)?;
            net.add_curve(index, &buckets);
        }
        Ok(Some(net))
    }

    /// Bucketed sensitivities of `curve`, memoised for the current
    /// evaluation time.
    pub fn bucket_sensitivities(
        &mut self,
        ctx: &SensitivityContext<'_>,
        risk_class: RiskClass,
        curve: &CurveName,
        evaluation_time: f64,
    ) -> Result<BucketSensitivities, SimmError> {
        self.cache.advance_to(evaluation_time);
        if let Some(cached) = self.cache.get(risk_class, curve) {
            trace!(%curve, time = evaluation_time, "sensitivity cache hit");
            return Ok(cached.clone());
        }
        trace!(%curve, time = evaluation_time, "sensitivity cache miss");

        let values = if risk_class != RiskClass::InterestRate || curve.is_pseudo_curve() {
            BucketSensitivities::zeros()
        } else {
            match ctx.settings.sensitivity_mode {
                SensitivityMode::Exact => self.exact_buckets(ctx, curve, evaluation_time)?,
                SensitivityMode::LinearMelting => {
                    self.melted_buckets(ctx, curve, evaluation_time)?
                }
                SensitivityMode::Interpolation => {
                    self.interpolated_buckets(ctx, curve, evaluation_time)?
                }
            }
        };
        self.cache.insert(risk_class, curve.clone(), values.clone());
        Ok(values)
    }

    /// Fraction of paths on which the instrument is still alive at
    /// `evaluation_time`.
    ///
    /// Always 1 at time zero and for products that cannot be cancelled.
    pub fn survival_probability(
        &mut self,
        model: &dyn TermStructureSimulation,
        evaluation_time: f64,
    ) -> Result<f64, SimmError> {
        if evaluation_time.abs() <= TIME_TOLERANCE || !self.classified.is_cancelable {
            return Ok(1.0);
        }
        if let Some(indicator) = self.survival.indicator(evaluation_time) {
            return Ok(indicator.average());
        }
        let estimators = self.estimators(model, evaluation_time)?;
        let value = self.classified.product.value(evaluation_time, model)?;
        let conditional = value.conditional_expectation(&estimators.product);
        let probability = self.survival.record(evaluation_time, &conditional);
        trace!(time = evaluation_time, probability, "survival probability");
        Ok(probability)
    }

    fn exact_buckets(
        &mut self,
        ctx: &SensitivityContext<'_>,
        curve: &CurveName,
        evaluation_time: f64,
    ) -> Result<BucketSensitivities, SimmError> {
        let (values, days) = self.tenor_sensitivities(ctx, curve, evaluation_time)?;
        Ok(BucketSensitivities::from_values(rebucket(
            &values,
            &days,
            &IR_BUCKET_DAYS,
        )))
    }

    fn melted_buckets(
        &mut self,
        ctx: &SensitivityContext<'_>,
        curve: &CurveName,
        evaluation_time: f64,
    ) -> Result<BucketSensitivities, SimmError> {
        let anchor_at = anchor_time(evaluation_time, ctx.settings.reset_step);
        let anchor = self.anchor(ctx, curve, anchor_at)?;
        let melted = anchor.melt(evaluation_time - anchor_at);
        let survival = self.survival_probability(ctx.model, evaluation_time)?;
        Ok(melted.scaled(&ScenarioValue::constant(survival)))
    }

    fn interpolated_buckets(
        &mut self,
        ctx: &SensitivityContext<'_>,
        curve: &CurveName,
        evaluation_time: f64,
    ) -> Result<BucketSensitivities, SimmError> {
        let step = ctx.settings.reset_step;
        let lower_at = anchor_time(evaluation_time, step);
        let weight = (evaluation_time - lower_at) / step;
        let lower = self.anchor(ctx, curve, lower_at)?;
        let buckets = if weight <= TIME_TOLERANCE {
            lower.buckets().clone()
        } else {
            let upper_at = anchor_time(lower_at + step, step);
            let upper = self.anchor(ctx, curve, upper_at)?;
            lower.buckets().interpolate(upper.buckets(), weight)
        };
        let survival = self.survival_probability(ctx.model, evaluation_time)?;
        Ok(buckets.scaled(&ScenarioValue::constant(survival)))
    }

    fn anchor(
        &mut self,
        ctx: &SensitivityContext<'_>,
        curve: &CurveName,
        anchor_at: f64,
    ) -> Result<AnchorSensitivities, SimmError> {
        if let Some(anchor) = self.anchors.get(anchor_at, curve) {
            return Ok(anchor.clone());
        }
        trace!(%curve, anchor = anchor_at, "computing anchor sensitivities");
        let (values, days) = self.tenor_sensitivities(ctx, curve, anchor_at)?;
        let anchor = AnchorSensitivities::new(values, days);
        self.anchors.insert(anchor_at, curve.clone(), anchor.clone());
        Ok(anchor)
    }

    /// Swap-rate sensitivities with their residual maturity in days.
    fn tenor_sensitivities(
        &mut self,
        ctx: &SensitivityContext<'_>,
        curve: &CurveName,
        evaluation_time: f64,
    ) -> Result<(Vec<ScenarioValue>, Vec<i64>), SimmError> {
        let model = ctx.model;
        let estimators = self.estimators(model, evaluation_time)?;
        let needs_gradient =
            !curve.is_discount_curve() && self.classified.product.swap_schedule().is_none();
        let gradient = if needs_gradient {
            self.gradient(model, evaluation_time)?
        } else {
            Arc::new(RateGradient::new())
        };

        let request = MappingRequest {
            model,
            product: self.classified.product.as_ref(),
            curve,
            evaluation_time,
            gradient: &gradient,
            market_estimator: &estimators.market,
            product_estimator: &estimators.product,
            constant_weights: ctx.constant_weights,
        };
        let values = ctx.engine.swap_rate_sensitivities(&request)?;
        let days = default_tenor_days(model.rate_periods(), values.len());
        Ok((values, days))
    }

    fn estimators(
        &mut self,
        model: &dyn TermStructureSimulation,
        evaluation_time: f64,
    ) -> Result<Arc<Estimators>, SimmError> {
        let key = TimeKey::new(evaluation_time);
        if let Some(estimators) = &self.estimators {
            if estimators.time == key {
                return Ok(Arc::clone(estimators));
            }
        }
        let estimators = Arc::new(Estimators {
            time: key,
            market: market_estimator(model, evaluation_time)?,
            product: product_estimator(model, self.classified.product.as_ref(), evaluation_time)?,
        });
        self.estimators = Some(Arc::clone(&estimators));
        Ok(estimators)
    }

    fn gradient(
        &mut self,
        model: &dyn TermStructureSimulation,
        evaluation_time: f64,
    ) -> Result<Arc<RateGradient>, SimmError> {
        let epoch = self.classified.product.gradient_epoch(evaluation_time);
        if let Some((cached_epoch, gradient)) = &self.gradient {
            if *cached_epoch == epoch {
                return Ok(Arc::clone(gradient));
            }
        }
        trace!(epoch, time = evaluation_time, "computing rate gradient");
        let gradient = Arc::new(self.classified.product.rate_gradient(evaluation_time, model)?);
        self.gradient = Some((epoch, Arc::clone(&gradient)));
        Ok(gradient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pricer_models::instruments::rates::{SimpleSwap, SwapDirection};
    use pricer_models::models::rates::{LognormalForwardModel, LognormalForwardParams};
    use pricer_models::models::SimulationError;
    use pricer_models::schedules::TimeDiscretization;

    fn model() -> LognormalForwardModel {
        let periods = TimeDiscretization::uniform(0.0, 10, 0.5).unwrap();
        let times = TimeDiscretization::uniform(0.0, 50, 0.1).unwrap();
        LognormalForwardModel::new(times, periods, LognormalForwardParams::new(0.02, 0.2, 64, 11))
            .unwrap()
    }

    fn swap_instrument() -> Instrument {
        let swap = SimpleSwap::uniform(0.0, 10, 0.5, 0.02, 1.0e4, SwapDirection::PayFixed).unwrap();
        Instrument::new(ClassifiedProduct::new(
            Arc::new(swap),
            ProductClass::RatesFx,
            Currency::EUR,
        ))
    }

    fn context<'a>(
        model: &'a LognormalForwardModel,
        engine: &'a CurveMappingEngine,
        settings: MarginSettings,
    ) -> SensitivityContext<'a> {
        SensitivityContext {
            model,
            engine,
            settings,
            constant_weights: None,
        }
    }

    #[derive(Debug)]
    struct Cancelable;

    impl SimmProduct for Cancelable {
        fn value(
            &self,
            evaluation_time: f64,
            model: &dyn TermStructureSimulation,
        ) -> Result<ScenarioValue, SimulationError> {
            if evaluation_time >= model.rate_periods().last() - TIME_TOLERANCE {
                return Ok(ScenarioValue::constant(-1.0));
            }
            Ok(ScenarioValue::from_fn(model.n_paths(), |p| {
                if p == 0 && evaluation_time > 0.4 {
                    -1.0
                } else {
                    1.0
                }
            }))
        }
    }

    #[test]
    fn test_query_rules() {
        let instrument = swap_instrument();
        let libor = CurveName::from("Libor6m");
        let query = SensitivityQuery::ir_delta(libor.clone(), MaturityBucket::Y2, Currency::EUR);
        assert!(instrument.applies_to(&query));

        let wrong_currency = SensitivityQuery {
            bucket_key: Currency::USD,
            ..query.clone()
        };
        assert!(!instrument.applies_to(&wrong_currency));

        let vega = SensitivityQuery {
            risk_type: RiskType::Vega,
            ..query.clone()
        };
        assert!(!instrument.applies_to(&vega));

        let credit = SensitivityQuery {
            product_class: ProductClass::Credit,
            ..query.clone()
        };
        assert!(!instrument.applies_to(&credit));

        let other_curve = SensitivityQuery {
            curve: CurveName::from("Libor3m"),
            ..query
        };
        assert!(!instrument.applies_to(&other_curve));
    }

    #[test]
    fn test_cache_hit_skips_engine() {
        let m = model();
        let engine = CurveMappingEngine::new();
        let ctx = context(&m, &engine, MarginSettings::default());
        let mut instrument = swap_instrument();
        let query =
            SensitivityQuery::ir_delta(CurveName::from("Libor6m"), MaturityBucket::Y2, Currency::EUR);

        let first = instrument.sensitivity(&ctx, &query, 0.0).unwrap();
        assert_eq!(engine.computations(), 1);
        let again = instrument.sensitivity(&ctx, &query, 0.0).unwrap();
        assert_eq!(engine.computations(), 1);
        assert_eq!(first, again);

        instrument.sensitivity(&ctx, &query, 0.5).unwrap();
        assert_eq!(engine.computations(), 2);
    }

    #[test]
    fn test_melting_matches_exact_at_time_zero() {
        let m = model();
        let engine = CurveMappingEngine::new();
        let curve = CurveName::from("Libor6m");

        let exact_ctx = context(&m, &engine, MarginSettings::default());
        let exact = swap_instrument()
            .bucket_sensitivities(&exact_ctx, RiskClass::InterestRate, &curve, 0.0)
            .unwrap();

        let melting = MarginSettings::new(SensitivityMode::LinearMelting, Default::default(), 1.0);
        let melting_ctx = context(&m, &engine, melting);
        let melted = swap_instrument()
            .bucket_sensitivities(&melting_ctx, RiskClass::InterestRate, &curve, 0.0)
            .unwrap();

        for (a, b) in exact.values().iter().zip(melted.values()) {
            assert_relative_eq!(a.average(), b.average(), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_anchors_are_reused_across_times() {
        let m = model();
        let engine = CurveMappingEngine::new();
        let settings = MarginSettings::new(SensitivityMode::LinearMelting, Default::default(), 1.0);
        let ctx = context(&m, &engine, settings);
        let curve = CurveName::from("Libor6m");
        let mut instrument = swap_instrument();

        instrument
            .bucket_sensitivities(&ctx, RiskClass::InterestRate, &curve, 0.0)
            .unwrap();
        instrument
            .bucket_sensitivities(&ctx, RiskClass::InterestRate, &curve, 0.5)
            .unwrap();
        assert_eq!(engine.computations(), 1);

        instrument
            .bucket_sensitivities(&ctx, RiskClass::InterestRate, &curve, 1.2)
            .unwrap();
        assert_eq!(engine.computations(), 2);
    }

    #[test]
    fn test_survival_probability() {
        let m = model();
        let mut plain = swap_instrument();
        assert_eq!(plain.survival_probability(&m, 1.0).unwrap(), 1.0);

        let classified = ClassifiedProduct::new(
            Arc::new(Cancelable),
            ProductClass::RatesFx,
            Currency::EUR,
        )
        .cancelable();
        let mut instrument = Instrument::new(classified);
        assert_eq!(instrument.survival_probability(&m, 0.0).unwrap(), 1.0);
        let early = instrument.survival_probability(&m, 0.2).unwrap();
        let late = instrument.survival_probability(&m, 0.5).unwrap();
        assert!(early >= late);
        assert!((0.0..=1.0).contains(&late));
        assert_eq!(instrument.survival_probability(&m, 0.5).unwrap(), late);
        assert_eq!(instrument.survival_probability(&m, 5.0).unwrap(), 0.0);
    }

    #[test]
    fn test_non_rates_risk_class_is_zero() {
        let m = model();
        let engine = CurveMappingEngine::new();
        let ctx = context(&m, &engine, MarginSettings::default());
        let mut instrument = swap_instrument();
        let values = instrument
            .bucket_sensitivities(&ctx, RiskClass::Equity, &CurveName::from("Libor6m"), 0.0)
            .unwrap();
        assert!(values.values().iter().all(|v| v.as_constant() == Some(0.0)));
        assert_eq!(engine.computations(), 0);
    }
}

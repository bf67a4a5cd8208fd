//! Interest rate delta margin.
//!
//! Per currency bucket `b`:
//!
//! ```text
//! CR_b = max(sqrt(|sum of net sensitivities incl. inflation| / T_b), 1)
//! WS_k = net_k * RW_k * CR_b          (ccy basis: no CR)
//! K_b  = sqrt(WS' rho WS)
//! S_b  = clip(sum WS, -K_b, K_b)
//! ```
//!
//! and across buckets, with `g_bc = mean(min(CR_b, CR_c) / max(CR_b, CR_c))`:
//!
//! ```text
//! Margin = sqrt(VC(S)^2 - sum S_b^2 + sum K_b^2),  VC(S) = sqrt(sum g_bc gamma S_b S_c)
//! ```
//!
//! All functions are pure; buckets are aggregated in parallel.

use pricer_core::scenario::ScenarioValue;
use pricer_core::types::Currency;

use super::cache::BucketSensitivities;
use super::parameters::SimmParameters;
use crate::parallel::{parallel_map, ParallelConfig};

/// Net sensitivities of one currency bucket.
///
/// Curve rows follow [`SimmParameters::curve_names`].
#[derive(Debug, Clone, PartialEq)]
pub struct BucketNetSensitivities {
    currency: Currency,
    curves: Vec<BucketSensitivities>,
    inflation: ScenarioValue,
    ccy_basis: ScenarioValue,
}

impl BucketNetSensitivities {
    /// All sensitivities zero.
    pub fn new(currency: Currency, n_curves: usize) -> Self {
        Self {
            currency,
            curves: vec![BucketSensitivities::zeros(); n_curves],
            inflation: ScenarioValue::zero(),
            ccy_basis: ScenarioValue::zero(),
        }
    }

    /// Currency of the bucket.
    #[inline]
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Number of tenor curves.
    #[inline]
    pub fn n_curves(&self) -> usize {
        self.curves.len()
    }

    /// Sensitivities of the tenor curve at `index`.
    pub fn curve(&self, index: usize) -> Option<&BucketSensitivities> {
        self.curves.get(index)
    }

    /// Inflation sensitivity.
    #[inline]
    pub fn inflation(&self) -> &ScenarioValue {
        &self.inflation
    }

    /// Cross-currency basis sensitivity.
    #[inline]
    pub fn ccy_basis(&self) -> &ScenarioValue {
        &self.ccy_basis
    }

    /// Adds sensitivities to the tenor curve at `index`. Indices outside
    /// the table are ignored.
    pub fn add_curve(&mut self, index: usize, values: &BucketSensitivities) {
        if let Some(curve) = self.curves.get_mut(index) {
            curve.accumulate(values);
        }
    }

    /// Adds to the inflation sensitivity.
    pub fn add_inflation(&mut self, value: &ScenarioValue) {
        self.inflation = &self.inflation + value;
    }

    /// Adds to the cross-currency basis sensitivity.
    pub fn add_ccy_basis(&mut self, value: &ScenarioValue) {
        self.ccy_basis = &self.ccy_basis + value;
    }

    /// Adds every sensitivity of `other`.
    pub fn merge(&mut self, other: &Self) {
        for (index, curve) in other.curves.iter().enumerate() {
            self.add_curve(index, curve);
        }
        self.add_inflation(&other.inflation);
        self.add_ccy_basis(&other.ccy_basis);
    }
}

/// Aggregated margin components of one bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketMargin {
    /// Bucket currency
    pub currency: Currency,
    /// Concentration risk factor `CR_b`
    pub concentration: ScenarioValue,
    /// Within-bucket margin `K_b`
    pub k: ScenarioValue,
    /// Capped sum of weighted sensitivities `S_b`
    pub s: ScenarioValue,
}

/// Concentration risk factor of a bucket. The cross-currency basis does
/// not count towards the concentration.
pub fn concentration_risk_factor(net: &BucketNetSensitivities, threshold: f64) -> ScenarioValue {
    let total = net
        .curves
        .iter()
        .flat_map(|curve| curve.values())
        .sum::<ScenarioValue>()
        + &net.inflation;
    (total.abs() / threshold).sqrt().floor(1.0)
}

/// Weighted sensitivities in intra-bucket factor order: curve by curve,
/// tenor by tenor, then inflation and cross-currency basis.
pub fn weighted_sensitivities(
    net: &BucketNetSensitivities,
    parameters: &SimmParameters,
    concentration: &ScenarioValue,
) -> Vec<ScenarioValue> {
    let weights = parameters.tenor_risk_weights(net.currency);
    let scaled_weights: Vec<ScenarioValue> = weights.iter().map(|&rw| concentration * rw).collect();

    let mut weighted = Vec::with_capacity(parameters.intra_bucket_dimension());
    for curve in &net.curves {
        for (value, weight) in curve.values().iter().zip(&scaled_weights) {
            weighted.push(value * weight);
        }
    }
    weighted.push(&net.inflation * &(concentration * parameters.inflation_risk_weight));
    weighted.push(&net.ccy_basis * parameters.ccy_basis_risk_weight);
    weighted
}

/// `sqrt(sum_ij rho(i, j) x_i x_j)`, floored at zero before the root.
///
/// Entries that are the constant zero are skipped.
///
/// # Examples
///
/// ```
/// use pricer_core::scenario::ScenarioValue;
/// use pricer_risk::simm::ir_delta::variance_covariance;
///
/// let x = [ScenarioValue::constant(3.0), ScenarioValue::constant(4.0)];
/// let vc = variance_covariance(&x, |i, j| if i == j { 1.0 } else { 0.0 });
/// assert!((vc.get(0) - 5.0).abs() < 1e-12);
/// ```
pub fn variance_covariance(
    values: &[ScenarioValue],
    correlation: impl Fn(usize, usize) -> f64,
) -> ScenarioValue {
    let active: Vec<usize> = (0..values.len())
        .filter(|&i| values[i].as_constant() != Some(0.0))
        .collect();

    let mut total = ScenarioValue::zero();
    for &i in &active {
        let mut row = ScenarioValue::zero();
        for &j in &active {
            let rho = correlation(i, j);
            if rho != 0.0 {
                row = &row + &(&values[j] * rho);
            }
        }
        total = total.add_product(&values[i], &row);
    }
    total.floor(0.0).sqrt()
}

/// Aggregates one bucket with the intra-bucket correlation `intra`.
pub fn aggregate_bucket(
    net: &BucketNetSensitivities,
    parameters: &SimmParameters,
    intra: &[Vec<f64>],
) -> BucketMargin {
    let concentration =
        concentration_risk_factor(net, parameters.concentration_threshold(net.currency));
    let weighted = weighted_sensitivities(net, parameters, &concentration);
    let k = variance_covariance(&weighted, |i, j| {
        intra.get(i).and_then(|row| row.get(j)).copied().unwrap_or(0.0)
    });
    let s = weighted.iter().sum::<ScenarioValue>().clip(&-&k, &k);
    BucketMargin {
        currency: net.currency,
        concentration,
        k,
        s,
    }
}

/// Scenario average of `min(CR_b, CR_c) / max(CR_b, CR_c)`.
pub fn cross_bucket_scale(a: &ScenarioValue, b: &ScenarioValue) -> f64 {
    a.zip_with(b, |x, y| x.min(y) / x.max(y)).average()
}

/// Combines bucket margins with cross-currency correlation `gamma`.
pub fn combine_buckets(margins: &[BucketMargin], gamma: f64) -> ScenarioValue {
    if margins.is_empty() {
        return ScenarioValue::zero();
    }
    let s: Vec<ScenarioValue> = margins.iter().map(|m| m.s.clone()).collect();
    let vc = variance_covariance(&s, |b, c| {
        if b == c {
            1.0
        } else {
            cross_bucket_scale(&margins[b].concentration, &margins[c].concentration) * gamma
        }
    });
    let s_squared: ScenarioValue = margins.iter().map(|m| m.s.squared()).sum();
    let k_squared: ScenarioValue = margins.iter().map(|m| m.k.squared()).sum();
    (vc.squared() - s_squared + k_squared).floor(0.0).sqrt()
}

/// Interest rate delta margin over all currency buckets.
pub fn ir_delta_margin(
    buckets: &[BucketNetSensitivities],
    parameters: &SimmParameters,
    parallel: &ParallelConfig,
) -> ScenarioValue {
    if buckets.is_empty() {
        return ScenarioValue::zero();
    }
    let intra = parameters.intra_bucket_correlation();
    let aggregate = |net: &BucketNetSensitivities| aggregate_bucket(net, parameters, &intra);
    let margins: Vec<BucketMargin> = if parallel.should_parallelize(buckets.len()) {
        parallel_map(buckets, aggregate)
    } else {
        buckets.iter().map(aggregate).collect()
    };
    combine_buckets(&margins, parameters.cross_currency_correlation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simm::types::MaturityBucket;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn single(currency: Currency, curve: usize, bucket: MaturityBucket, value: f64) -> BucketNetSensitivities {
        let mut values = vec![ScenarioValue::zero(); MaturityBucket::COUNT];
        values[bucket.index()] = ScenarioValue::constant(value);
        let mut net = BucketNetSensitivities::new(currency, SimmParameters::default().curve_names.len());
        net.add_curve(curve, &BucketSensitivities::from_values(values));
        net
    }

    #[test]
    fn test_no_buckets_is_zero() {
        let margin = ir_delta_margin(&[], &SimmParameters::default(), &ParallelConfig::default());
        assert_eq!(margin.as_constant(), Some(0.0));
    }

    #[test]
    fn test_single_sensitivity_margin_is_weighted_sensitivity() {
        let params = SimmParameters::default();
        let net = single(Currency::USD, 1, MaturityBucket::Y5, 10.0);
        let margin = ir_delta_margin(&[net], &params, &ParallelConfig::default());
        let rw = params.tenor_risk_weights(Currency::USD)[MaturityBucket::Y5.index()];
        assert_relative_eq!(margin.get(0), 10.0 * rw, epsilon = 1e-9);
    }

    #[test]
    fn test_concentration_ignores_ccy_basis() {
        let mut net = BucketNetSensitivities::new(Currency::USD, 1);
        net.add_ccy_basis(&ScenarioValue::constant(1.0e6));
        let cr = concentration_risk_factor(&net, 1.0);
        assert_eq!(cr.get(0), 1.0);

        net.add_inflation(&ScenarioValue::constant(400.0));
        let cr = concentration_risk_factor(&net, 100.0);
        assert_relative_eq!(cr.get(0), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ccy_basis_weight_has_no_concentration() {
        let params = SimmParameters::default();
        let mut net = BucketNetSensitivities::new(Currency::USD, params.curve_names.len());
        net.add_ccy_basis(&ScenarioValue::constant(5.0));
        let ws = weighted_sensitivities(&net, &params, &ScenarioValue::constant(3.0));
        assert_eq!(ws.len(), params.intra_bucket_dimension());
        assert_relative_eq!(ws.last().unwrap().get(0), 5.0 * params.ccy_basis_risk_weight);
    }

    #[test]
    fn test_offsetting_sensitivities_within_a_curve() {
        let params = SimmParameters::default();
        let mut net = single(Currency::EUR, 1, MaturityBucket::Y10, 10.0);
        net.merge(&single(Currency::EUR, 1, MaturityBucket::Y10, -10.0));
        let margin = ir_delta_margin(&[net], &params, &ParallelConfig::default());
        assert_relative_eq!(margin.get(0), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_two_buckets_match_closed_form() {
        let params = SimmParameters::default();
        let usd = single(Currency::USD, 1, MaturityBucket::Y2, 10.0);
        let eur = single(Currency::EUR, 1, MaturityBucket::Y2, -5.0);
        let margin = ir_delta_margin(&[usd, eur], &params, &ParallelConfig::default());

        let rw = params.tenor_risk_weights(Currency::USD)[MaturityBucket::Y2.index()];
        let (s1, s2) = (10.0 * rw, -5.0 * rw);
        let gamma = params.cross_currency_correlation;
        let expected = (s1 * s1 + s2 * s2 + 2.0 * gamma * s1 * s2).sqrt();
        assert_relative_eq!(margin.get(0), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let params = SimmParameters::default();
        let buckets = vec![
            single(Currency::USD, 0, MaturityBucket::Y1, 3.0),
            single(Currency::EUR, 2, MaturityBucket::Y5, -7.0),
            single(Currency::GBP, 3, MaturityBucket::Y30, 11.0),
        ];
        let sequential = ir_delta_margin(&buckets, &params, &ParallelConfig::default());
        let parallel = ir_delta_margin(&buckets, &params, &ParallelConfig::new(1, 1));
        assert_relative_eq!(sequential.get(0), parallel.get(0), epsilon = 1e-12);
    }

    proptest! {
        #[test]
        fn test_concentration_is_monotone(a in 0.0f64..1.0e5, extra in 0.0f64..1.0e5) {
            let small = single(Currency::USD, 0, MaturityBucket::Y1, a);
            let large = single(Currency::USD, 0, MaturityBucket::Y1, a + extra);
            let cr_small = concentration_risk_factor(&small, 230.0).get(0);
            let cr_large = concentration_risk_factor(&large, 230.0).get(0);
            prop_assert!(cr_small >= 1.0);
            prop_assert!(cr_large >= cr_small);
        }

        #[test]
        fn test_margin_is_bucket_order_invariant(
            a in -1.0e3f64..1.0e3,
            b in -1.0e3f64..1.0e3,
            c in -1.0e3f64..1.0e3,
        ) {
            let params = SimmParameters::default();
            let usd = single(Currency::USD, 1, MaturityBucket::Y2, a);
            let eur = single(Currency::EUR, 3, MaturityBucket::Y10, b);
            let jpy = single(Currency::JPY, 0, MaturityBucket::M6, c);
            let config = ParallelConfig::default();
            let forward = ir_delta_margin(&[usd.clone(), eur.clone(), jpy.clone()], &params, &config);
            let reversed = ir_delta_margin(&[jpy, usd, eur], &params, &config);
            prop_assert!((forward.get(0) - reversed.get(0)).abs() <= 1e-9 * (1.0 + forward.get(0).abs()));
        }
    }
}

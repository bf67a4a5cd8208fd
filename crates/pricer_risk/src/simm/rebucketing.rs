//! Rebucketing of tenor-point sensitivities onto a maturity grid.
//!
//! A sensitivity at residual maturity `d` days is assigned to the grid as
//! follows:
//!
//! - `d` below the first bucket: entirely to the first bucket
//! - `d` at or above the last bucket: entirely to the last bucket
//! - otherwise split linearly between the two bracketing buckets
//!
//! The allocation is linear in the input, so the total is conserved and
//! the order of the input points does not matter.

use pricer_core::scenario::ScenarioValue;
use pricer_models::schedules::TimeDiscretization;

/// Days per year used to convert model times to day counts.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Converts a year fraction to whole days.
#[inline]
pub fn years_to_days(years: f64) -> i64 {
    (DAYS_PER_YEAR * years).round() as i64
}

/// Residual maturity in days of the first `n` swap-rate sensitivities:
/// `round(365 * T_{i+1})` on the rate-period grid.
///
/// Points beyond the end of the grid extrapolate with the last period
/// length.
pub fn default_tenor_days(rate_periods: &TimeDiscretization, n: usize) -> Vec<i64> {
    let last_step = rate_periods
        .n_steps()
        .checked_sub(1)
        .and_then(|i| rate_periods.step(i))
        .unwrap_or(0.0);
    (0..n)
        .map(|i| {
            let time = rate_periods.time(i + 1).unwrap_or_else(|| {
                let overshoot = (i + 1 - rate_periods.n_steps()) as f64;
                rate_periods.last() + overshoot * last_step
            });
            years_to_days(time)
        })
        .collect()
}

/// Distributes `sensitivities[i]`, sitting at `tenor_days[i]`, onto the
/// buckets `bucket_days` (increasing).
///
/// Returns one value per bucket. Extra entries in the longer of the two
/// input slices are ignored.
///
/// # Examples
///
/// ```
/// use pricer_core::scenario::ScenarioValue;
/// use pricer_risk::simm::rebucketing::rebucket;
///
/// let buckets = [30, 90];
/// let out = rebucket(&[ScenarioValue::constant(1.0)], &[60], &buckets);
/// assert_eq!(out[0].get(0), 0.5);
/// assert_eq!(out[1].get(0), 0.5);
/// ```
pub fn rebucket(
    sensitivities: &[ScenarioValue],
    tenor_days: &[i64],
    bucket_days: &[i64],
) -> Vec<ScenarioValue> {
    let mut buckets = vec![ScenarioValue::zero(); bucket_days.len()];
    let (Some(&first), Some(&last)) = (bucket_days.first(), bucket_days.last()) else {
        return buckets;
    };
    let last_index = bucket_days.len() - 1;

    for (sensitivity, &days) in sensitivities.iter().zip(tenor_days) {
        if days < first {
            buckets[0] = &buckets[0] + sensitivity;
        } else if days >= last {
            buckets[last_index] = &buckets[last_index] + sensitivity;
        } else {
            // first <= days < last, so an upper bracket exists and is > 0
            let upper = bucket_days.partition_point(|&b| b <= days);
            let lower = upper - 1;
            let span = (bucket_days[upper] - bucket_days[lower]) as f64;
            let weight_upper = (days - bucket_days[lower]) as f64 / span;
            buckets[lower] = &buckets[lower] + &(sensitivity * (1.0 - weight_upper));
            buckets[upper] = &buckets[upper] + &(sensitivity * weight_upper);
        }
    }
    buckets
}

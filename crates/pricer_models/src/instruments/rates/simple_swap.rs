//! Fixed-for-floating swap on simulated forward rates.

use pricer_core::scenario::ScenarioValue;

use crate::instruments::{SimmProduct, SwapSchedule};
use crate::models::{SimulationError, TermStructureSimulation};
use crate::schedules::TIME_TOLERANCE;

/// Swap direction from the fixed-leg perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapDirection {
    /// Pay fixed rate, receive floating rate.
    PayFixed,
    /// Receive fixed rate, pay floating rate.
    ReceiveFixed,
}

impl SwapDirection {
    /// Multiplier for `floating - fixed` cash flows.
    ///
    /// - PayFixed: +1
    /// - ReceiveFixed: -1
    #[inline]
    pub fn sign(&self) -> f64 {
        match self {
            SwapDirection::PayFixed => 1.0,
            SwapDirection::ReceiveFixed => -1.0,
        }
    }
}

/// Swap exchanging `notional * (t_pay - t_fix) * (L - K)` every period.
///
/// # Examples
///
/// ```
/// use pricer_models::instruments::rates::{SimpleSwap, SwapDirection};
/// use pricer_models::instruments::SimmProduct;
///
/// let swap = SimpleSwap::uniform(0.0, 4, 0.5, 0.02, 100.0, SwapDirection::PayFixed).unwrap();
/// let schedule = swap.swap_schedule().unwrap();
/// assert_eq!(schedule.fixing_dates, vec![0.0, 0.5, 1.0, 1.5]);
/// assert_eq!(schedule.notional, 100.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleSwap {
    fixing_dates: Vec<f64>,
    payment_dates: Vec<f64>,
    swap_rates: Vec<f64>,
    notional: f64,
    direction: SwapDirection,
}

impl SimpleSwap {
    /// Creates a swap from explicit periods.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidParameter`] if the schedules are
    /// empty or of different lengths, or if fixing dates are not
    /// increasing, and [`SimulationError::InvalidInterval`] if a payment
    /// does not follow its fixing.
    pub fn new(
        fixing_dates: Vec<f64>,
        payment_dates: Vec<f64>,
        swap_rates: Vec<f64>,
        notional: f64,
        direction: SwapDirection,
    ) -> Result<Self, SimulationError> {
        if fixing_dates.is_empty()
            || fixing_dates.len() != payment_dates.len()
            || fixing_dates.len() != swap_rates.len()
        {
            return Err(SimulationError::InvalidParameter(format!(
                "swap schedule lengths: {} fixings, {} payments, {} rates",
                fixing_dates.len(),
                payment_dates.len(),
                swap_rates.len()
            )));
        }
        if fixing_dates.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SimulationError::InvalidParameter(
                "fixing dates must be increasing".to_string(),
            ));
        }
        if let Some((&start, &end)) = fixing_dates
            .iter()
            .zip(payment_dates.iter())
            .find(|(f, p)| p <= f)
        {
            return Err(SimulationError::InvalidInterval { start, end });
        }
        Ok(Self {
            fixing_dates,
            payment_dates,
            swap_rates,
            notional,
            direction,
        })
    }

    /// Swap with `n_periods` periods of equal length and a single fixed rate.
    pub fn uniform(
        start: f64,
        n_periods: usize,
        period_length: f64,
        swap_rate: f64,
        notional: f64,
        direction: SwapDirection,
    ) -> Result<Self, SimulationError> {
        let fixing_dates: Vec<f64> = (0..n_periods)
            .map(|i| start + i as f64 * period_length)
            .collect();
        let payment_dates = fixing_dates.iter().map(|f| f + period_length).collect();
        Self::new(
            fixing_dates,
            payment_dates,
            vec![swap_rate; n_periods],
            notional,
            direction,
        )
    }

    /// Fixing dates.
    #[inline]
    pub fn fixing_dates(&self) -> &[f64] {
        &self.fixing_dates
    }

    /// Payment dates.
    #[inline]
    pub fn payment_dates(&self) -> &[f64] {
        &self.payment_dates
    }

    /// Unsigned notional.
    #[inline]
    pub fn notional(&self) -> f64 {
        self.notional
    }

    /// Direction.
    #[inline]
    pub fn direction(&self) -> SwapDirection {
        self.direction
    }

    fn signed_notional(&self) -> f64 {
        self.direction.sign() * self.notional
    }

    /// Periods whose payment is strictly after `t`.
    fn live_periods(&self, t: f64) -> impl Iterator<Item = usize> + '_ {
        (0..self.fixing_dates.len()).filter(move |&i| self.payment_dates[i] > t + TIME_TOLERANCE)
    }
}

impl SimmProduct for SimpleSwap {
    fn value(
        &self,
        evaluation_time: f64,
        model: &dyn TermStructureSimulation,
    ) -> Result<ScenarioValue, SimulationError> {
        let numeraire = model.numeraire(evaluation_time)?;
        let mut value = ScenarioValue::zero();
        for i in self.live_periods(evaluation_time) {
            let (fixing, payment) = (self.fixing_dates[i], self.payment_dates[i]);
            let rate = model.forward_rate_between(fixing, fixing, payment)?;
            let cash_flow = (&rate - self.swap_rates[i]) * ((payment - fixing) * self.signed_notional());
            let discount = &numeraire / &model.numeraire(payment)?;
            value = value.add_product(&cash_flow, &discount);
        }
        Ok(value)
    }

    fn swap_schedule(&self) -> Option<SwapSchedule> {
        Some(SwapSchedule {
            fixing_dates: self.fixing_dates.clone(),
            notional: self.signed_notional(),
        })
    }

    fn discount_sensitivities(
        &self,
        evaluation_time: f64,
        model: &dyn TermStructureSimulation,
    ) -> Result<Vec<(f64, ScenarioValue)>, SimulationError> {
        self.live_periods(evaluation_time)
            .map(|i| {
                let (fixing, payment) = (self.fixing_dates[i], self.payment_dates[i]);
                let observation = fixing.min(evaluation_time);
                let rate = model.forward_rate_between(observation, fixing, payment)?;
                let sensitivity =
                    (&rate - self.swap_rates[i]) * ((payment - fixing) * self.signed_notional());
                Ok((payment - evaluation_time, sensitivity))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rates::{LognormalForwardModel, LognormalForwardParams};
    use crate::schedules::TimeDiscretization;
    use approx::assert_relative_eq;

    fn flat_model(rate: f64) -> LognormalForwardModel {
        let periods = TimeDiscretization::uniform(0.0, 10, 0.5).unwrap();
        let times = TimeDiscretization::uniform(0.0, 50, 0.1).unwrap();
        LognormalForwardModel::new(times, periods, LognormalForwardParams::new(rate, 0.0, 4, 3))
            .unwrap()
    }

    #[test]
    fn test_validation() {
        assert!(SimpleSwap::new(vec![], vec![], vec![], 1.0, SwapDirection::PayFixed).is_err());
        assert!(matches!(
            SimpleSwap::new(vec![1.0], vec![0.5], vec![0.02], 1.0, SwapDirection::PayFixed),
            Err(SimulationError::InvalidInterval { .. })
        ));
        assert!(SimpleSwap::new(
            vec![1.0, 0.5],
            vec![1.5, 1.0],
            vec![0.02, 0.02],
            1.0,
            SwapDirection::PayFixed
        )
        .is_err());
    }

    #[test]
    fn test_at_the_money_value_is_zero() {
        let model = flat_model(0.02);
        let swap = SimpleSwap::uniform(0.0, 6, 0.5, 0.02, 100.0, SwapDirection::PayFixed).unwrap();
        let v = swap.value(0.0, &model).unwrap();
        assert_relative_eq!(v.average(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_payer_value_with_low_fixed_rate() {
        let model = flat_model(0.02);
        let swap = SimpleSwap::uniform(0.0, 2, 0.5, 0.0, 100.0, SwapDirection::PayFixed).unwrap();
        let v = swap.value(0.0, &model).unwrap().average();
        let expected = 100.0 * 0.5 * 0.02 * (1.0 / 1.01 + 1.0 / (1.01 * 1.01));
        assert_relative_eq!(v, expected, epsilon = 1e-12);

        let receiver =
            SimpleSwap::uniform(0.0, 2, 0.5, 0.0, 100.0, SwapDirection::ReceiveFixed).unwrap();
        assert_relative_eq!(receiver.value(0.0, &model).unwrap().average(), -expected, epsilon = 1e-12);
    }

    #[test]
    fn test_expired_periods_drop_out() {
        let model = flat_model(0.02);
        let swap = SimpleSwap::uniform(0.0, 2, 0.5, 0.0, 100.0, SwapDirection::PayFixed).unwrap();
        assert_eq!(swap.value(1.0, &model).unwrap().average(), 0.0);
        assert_eq!(swap.discount_sensitivities(0.7, &model).unwrap().len(), 1);
    }

    #[test]
    fn test_discount_sensitivities_maturities() {
        let model = flat_model(0.03);
        let swap = SimpleSwap::uniform(0.0, 4, 0.5, 0.02, 100.0, SwapDirection::PayFixed).unwrap();
        let sens = swap.discount_sensitivities(0.2, &model).unwrap();
        assert_eq!(sens.len(), 4);
        assert_relative_eq!(sens[0].0, 0.3, epsilon = 1e-12);
        assert_relative_eq!(sens[0].1.get(0), 100.0 * 0.5 * 0.01, epsilon = 1e-12);
    }
}

//! One-factor lognormal forward-rate simulation.
//!
//! Every forward rate of the period grid is driven by the same Brownian
//! motion:
//! ```text
//! L_j(t) = L_0 * exp(sigma * W(t) - sigma^2 * t / 2),   t < T_j
//! L_j(t) = L_j(T_j),                                     t >= T_j
//! ```
//! and the numeraire is the discretely compounded rolling bank account
//! ```text
//! N(T_k) = prod_{j<k} (1 + dT_j * L_j(T_j))
//! ```
//! with linear accrual inside a period. No measure-change drift is
//! applied. The model is a lightweight collaborator for tests and
//! benchmarks of the margin engine, not a calibrated pricing model.
//! With zero volatility every path carries the flat initial curve.
//!
//! ## Usage
//!
//! ```
//! use pricer_models::models::rates::{LognormalForwardModel, LognormalForwardParams};
//! use pricer_models::models::TermStructureSimulation;
//! use pricer_models::schedules::TimeDiscretization;
//!
//! let periods = TimeDiscretization::uniform(0.0, 10, 0.5).unwrap();
//! let times = TimeDiscretization::uniform(0.0, 50, 0.1).unwrap();
//! let params = LognormalForwardParams::new(0.02, 0.0, 100, 42);
//! let model = LognormalForwardModel::new(times, periods, params).unwrap();
//!
//! let n = model.numeraire(1.0).unwrap();
//! assert!((n.get(0) - 1.01 * 1.01).abs() < 1e-12);
//! ```

use pricer_core::scenario::ScenarioValue;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

use crate::models::{ModelId, SimulationError, TermStructureSimulation};
use crate::schedules::{TimeDiscretization, TIME_TOLERANCE};

/// Parameters of [`LognormalForwardModel`].
#[derive(Clone, Debug, PartialEq)]
pub struct LognormalForwardParams {
    /// Flat initial forward rate `L_0`
    pub initial_forward: f64,
    /// Lognormal volatility `sigma`
    pub volatility: f64,
    /// Number of simulated paths
    pub n_paths: usize,
    /// Random seed
    pub seed: u64,
}

impl LognormalForwardParams {
    /// Creates a parameter set.
    pub fn new(initial_forward: f64, volatility: f64, n_paths: usize, seed: u64) -> Self {
        Self {
            initial_forward,
            volatility,
            n_paths,
            seed,
        }
    }
}

/// Simulated forward-rate model. See the module documentation.
#[derive(Debug)]
pub struct LognormalForwardModel {
    id: ModelId,
    n_paths: usize,
    times: TimeDiscretization,
    periods: TimeDiscretization,
    /// `forwards[time_index][rate_index]`
    forwards: Vec<Vec<ScenarioValue>>,
    /// Numeraire on the period grid, `bank_account[k] = N(T_k)`
    bank_account: Vec<ScenarioValue>,
}

impl LognormalForwardModel {
    /// Simulates the model.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidParameter`] when the path count is
    /// zero, the volatility is negative, either grid does not start at
    /// zero, or a fixing time `T_j` of a simulated rate is not a point of
    /// the simulation grid.
    pub fn new(
        times: TimeDiscretization,
        periods: TimeDiscretization,
        params: LognormalForwardParams,
    ) -> Result<Self, SimulationError> {
        if params.n_paths == 0 {
            return Err(SimulationError::InvalidParameter(
                "n_paths must be positive".to_string(),
            ));
        }
        if params.volatility.is_nan()
            || params.volatility < 0.0
            || !params.initial_forward.is_finite()
        {
            return Err(SimulationError::InvalidParameter(format!(
                "volatility {} / initial forward {}",
                params.volatility, params.initial_forward
            )));
        }
        if times.first().abs() > TIME_TOLERANCE || periods.first().abs() > TIME_TOLERANCE {
            return Err(SimulationError::InvalidParameter(
                "time grids must start at zero".to_string(),
            ));
        }

        let n_rates = periods.n_steps();
        let fixing_indices = (0..n_rates)
            .map(|j| {
                let fixing = periods.times()[j];
                times.index_of(fixing).ok_or_else(|| {
                    SimulationError::InvalidParameter(format!(
                        "fixing time {fixing} is not on the simulation grid"
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let brownian = simulate_brownian(&times, params.n_paths, params.seed);
        let sigma = params.volatility;
        let mut forwards: Vec<Vec<ScenarioValue>> = Vec::with_capacity(times.n_times());
        for (i, &t) in times.times().iter().enumerate() {
            let drift = -0.5 * sigma * sigma * t;
            let row = (0..n_rates)
                .map(|j| {
                    if i > fixing_indices[j] {
                        forwards[fixing_indices[j]][j].clone()
                    } else if sigma == 0.0 || i == 0 {
                        ScenarioValue::constant(params.initial_forward)
                    } else {
                        ScenarioValue::from_fn(params.n_paths, |p| {
                            params.initial_forward * (sigma * brownian[i][p] + drift).exp()
                        })
                    }
                })
                .collect();
            forwards.push(row);
        }

        let mut bank_account = Vec::with_capacity(n_rates + 1);
        bank_account.push(ScenarioValue::constant(1.0));
        for j in 0..n_rates {
            let accrual = periods.times()[j + 1] - periods.times()[j];
            let fixed = &forwards[fixing_indices[j]][j];
            let growth = &(fixed * accrual) + 1.0;
            let next = &bank_account[j] * &growth;
            bank_account.push(next);
        }

        Ok(Self {
            id: ModelId::next(),
            n_paths: params.n_paths,
            times,
            periods,
            forwards,
            bank_account,
        })
    }

    fn fixed_rate(&self, rate_index: usize) -> Result<&ScenarioValue, SimulationError> {
        let fixing = self.periods.times()[rate_index];
        let time_index = self
            .times
            .index_of(fixing)
            .ok_or(SimulationError::TimeOutOfRange {
                time: fixing,
                horizon: self.times.last(),
            })?;
        Ok(&self.forwards[time_index][rate_index])
    }
}

fn simulate_brownian(times: &TimeDiscretization, n_paths: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut w = vec![vec![0.0; n_paths]; times.n_times()];
    for i in 1..times.n_times() {
        let sqrt_dt = (times.times()[i] - times.times()[i - 1]).sqrt();
        for p in 0..n_paths {
            let z: f64 = StandardNormal.sample(&mut rng);
            w[i][p] = w[i - 1][p] + sqrt_dt * z;
        }
    }
    w
}

impl TermStructureSimulation for LognormalForwardModel {
    fn id(&self) -> ModelId {
        self.id
    }

    fn n_paths(&self) -> usize {
        self.n_paths
    }

    fn time_discretization(&self) -> &TimeDiscretization {
        &self.times
    }

    fn rate_periods(&self) -> &TimeDiscretization {
        &self.periods
    }

    fn numeraire(&self, time: f64) -> Result<ScenarioValue, SimulationError> {
        let horizon = self.periods.last();
        if time < -TIME_TOLERANCE || time > horizon + TIME_TOLERANCE {
            return Err(SimulationError::TimeOutOfRange { time, horizon });
        }
        let k = self
            .periods
            .index_at_or_before(time)
            .ok_or(SimulationError::TimeOutOfRange { time, horizon })?;
        let period_start = self.periods.times()[k];
        if k == self.periods.n_steps() || time - period_start <= TIME_TOLERANCE {
            return Ok(self.bank_account[k].clone());
        }
        let fixed = self.fixed_rate(k)?;
        let growth = &(fixed * (time - period_start)) + 1.0;
        Ok(&self.bank_account[k] * &growth)
    }

    fn forward_rate(
        &self,
        time_index: usize,
        rate_index: usize,
    ) -> Result<ScenarioValue, SimulationError> {
        let row = self
            .forwards
            .get(time_index)
            .ok_or(SimulationError::IndexOutOfRange {
                what: "simulation time",
                index: time_index,
                len: self.forwards.len(),
            })?;
        row.get(rate_index)
            .cloned()
            .ok_or(SimulationError::IndexOutOfRange {
                what: "rate period",
                index: rate_index,
                len: row.len(),
            })
    }

    fn forward_rate_between(
        &self,
        time: f64,
        start: f64,
        end: f64,
    ) -> Result<ScenarioValue, SimulationError> {
        if end - start <= TIME_TOLERANCE {
            return Err(SimulationError::InvalidInterval { start, end });
        }
        let horizon = self.periods.last();
        if start < -TIME_TOLERANCE || end > horizon + TIME_TOLERANCE {
            return Err(SimulationError::TimeOutOfRange {
                time: if start < 0.0 { start } else { end },
                horizon,
            });
        }
        let time_index =
            self.times
                .index_at_or_before(time)
                .ok_or(SimulationError::TimeOutOfRange {
                    time,
                    horizon: self.times.last(),
                })?;

        let mut log_growth = ScenarioValue::zero();
        for j in 0..self.periods.n_steps() {
            let (t_j, t_next) = (self.periods.times()[j], self.periods.times()[j + 1]);
            let overlap = end.min(t_next) - start.max(t_j);
            if overlap <= TIME_TOLERANCE {
                continue;
            }
            let accrual = t_next - t_j;
            let rate = self.forward_rate(time_index, j)?;
            let period_growth = (&(&rate * accrual) + 1.0).ln();
            log_growth = &log_growth + &(&period_growth * (overlap / accrual));
        }
        Ok((log_growth.exp() - 1.0) / (end - start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat_model() -> LognormalForwardModel {
        let periods = TimeDiscretization::uniform(0.0, 10, 0.5).unwrap();
        let times = TimeDiscretization::uniform(0.0, 50, 0.1).unwrap();
        LognormalForwardModel::new(times, periods, LognormalForwardParams::new(0.02, 0.0, 8, 1))
            .unwrap()
    }

    fn stochastic_model() -> LognormalForwardModel {
        let periods = TimeDiscretization::uniform(0.0, 10, 0.5).unwrap();
        let times = TimeDiscretization::uniform(0.0, 50, 0.1).unwrap();
        LognormalForwardModel::new(times, periods, LognormalForwardParams::new(0.02, 0.2, 64, 7))
            .unwrap()
    }

    #[test]
    fn test_flat_numeraire() {
        let model = flat_model();
        assert_relative_eq!(model.numeraire(0.0).unwrap().get(0), 1.0);
        assert_relative_eq!(model.numeraire(0.5).unwrap().get(3), 1.01, epsilon = 1e-14);
        assert_relative_eq!(
            model.numeraire(0.75).unwrap().get(3),
            1.01 * (1.0 + 0.25 * 0.02),
            epsilon = 1e-14
        );
        assert_relative_eq!(
            model.numeraire(5.0).unwrap().get(0),
            1.01_f64.powi(10),
            epsilon = 1e-12
        );
        assert!(model.numeraire(5.5).is_err());
    }

    #[test]
    fn test_flat_forward_between() {
        let model = flat_model();
        let l = model.forward_rate_between(0.3, 1.0, 1.5).unwrap();
        assert_relative_eq!(l.get(0), 0.02, epsilon = 1e-14);
        // Two full periods compound: ((1.01)^2 - 1) / 1.0
        let l = model.forward_rate_between(0.0, 1.0, 2.0).unwrap();
        assert_relative_eq!(l.get(0), 1.01_f64.powi(2) - 1.0, epsilon = 1e-14);
        assert!(model.forward_rate_between(0.0, 1.0, 1.0).is_err());
        assert!(model.forward_rate_between(0.0, 4.0, 6.0).is_err());
    }

    #[test]
    fn test_forward_rates_freeze_after_fixing() {
        let model = stochastic_model();
        // Rate 2 fixes at T_2 = 1.0, simulation index 10.
        let fixed = model.forward_rate(10, 2).unwrap();
        let later = model.forward_rate(30, 2).unwrap();
        assert_eq!(fixed, later);
        let earlier = model.forward_rate(5, 2).unwrap();
        assert_ne!(earlier, fixed);
    }

    #[test]
    fn test_paths_differ_with_volatility() {
        let model = stochastic_model();
        let l = model.forward_rate(20, 8).unwrap();
        assert!(l.max() > l.min());
        assert!(model.forward_rate(0, 8).unwrap().is_constant());
    }

    #[test]
    fn test_index_errors() {
        let model = flat_model();
        assert!(matches!(
            model.forward_rate(0, 10),
            Err(SimulationError::IndexOutOfRange { what: "rate period", .. })
        ));
        assert!(matches!(
            model.forward_rate(51, 0),
            Err(SimulationError::IndexOutOfRange { what: "simulation time", .. })
        ));
    }

    #[test]
    fn test_invalid_parameters() {
        let periods = TimeDiscretization::uniform(0.0, 4, 0.5).unwrap();
        let coarse = TimeDiscretization::new(vec![0.0, 0.7, 1.4, 2.0]).unwrap();
        let result = LognormalForwardModel::new(
            coarse,
            periods.clone(),
            LognormalForwardParams::new(0.02, 0.1, 10, 1),
        );
        assert!(matches!(result, Err(SimulationError::InvalidParameter(_))));

        let times = TimeDiscretization::uniform(0.0, 20, 0.1).unwrap();
        let result =
            LognormalForwardModel::new(times, periods, LognormalForwardParams::new(0.02, 0.1, 0, 1));
        assert!(result.is_err());
    }
}

//! Curve mapping: value derivatives to swap-rate sensitivities.
//!
//! SIMM interest rate deltas are sensitivities to par swap rates `S` of
//! the curve, observed at the evaluation time `t` and spaced by the
//! model's rate period `dT`. The engine maps derivatives with respect to
//! simulated forward rates `L` through the chain rule
//!
//! ```text
//! dV/dS = dV/dL * dL/dL' * dL'/dS
//! ```
//!
//! where `L'` are the forward rates of the periods `[t + k dT, t + (k+1) dT]`.
//! `dL/dL'` is the pseudo-inverse of the log-linear interpolation between
//! the model grid and the shifted grid (identity when `t` is on the
//! grid). `dL'/dS` is computed from conditioned discount factors.
//!
//! The discount curve is mapped through discount bonds instead:
//! `dV/dS = dV/dP * (dS/dP)^+`.
//!
//! Degenerate Jacobians never fail. Their pseudo-inverse is finite and
//! possibly zero.

use std::sync::atomic::{AtomicUsize, Ordering};

use pricer_core::math::ConditionalExpectation;
use pricer_core::scenario::{ScenarioMatrix, ScenarioValue};
use pricer_models::instruments::{RateGradient, SimmProduct, SwapSchedule};
use pricer_models::models::{SimulationError, TermStructureSimulation};
use pricer_models::schedules::TIME_TOLERANCE;
use tracing::trace;

use super::error::SimmError;
use super::types::CurveName;

/// Position of an evaluation time on the model's rate-period grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatePosition {
    /// Length of a rate period
    pub period_length: f64,
    /// First rate period fixing at or after `t`
    pub next_index: usize,
    /// Last rate period fixing at or before `t`
    pub last_index: usize,
    /// Rate periods fixing at or after `t`
    pub n_remaining: usize,
    /// Whether `t` is a point of the rate-period grid
    pub on_grid: bool,
}

impl RatePosition {
    /// Locates `evaluation_time` on the rate-period grid of `model`.
    pub fn locate(
        model: &dyn TermStructureSimulation,
        evaluation_time: f64,
    ) -> Result<Self, SimmError> {
        let periods = model.rate_periods();
        let n_rates = model.n_rates();
        let period_length = periods.step(0).ok_or(SimulationError::IndexOutOfRange {
            what: "rate period",
            index: 0,
            len: periods.n_steps(),
        })?;
        let last_index =
            periods
                .index_at_or_before(evaluation_time)
                .ok_or(SimulationError::TimeOutOfRange {
                    time: evaluation_time,
                    horizon: periods.last(),
                })?;
        let next_index = periods
            .index_at_or_after(evaluation_time)
            .unwrap_or(n_rates)
            .min(n_rates);
        Ok(Self {
            period_length,
            next_index,
            last_index,
            n_remaining: n_rates - next_index,
            on_grid: periods.contains(evaluation_time),
        })
    }

    /// Number of forward-rate sensitivities before the grid adjustment:
    /// one more than the remaining periods when `t` is off the grid.
    #[inline]
    pub fn n_sensitivities(&self) -> usize {
        if self.on_grid {
            self.n_remaining
        } else {
            self.n_remaining + 1
        }
    }
}

/// Inputs of one curve-mapping computation.
pub struct MappingRequest<'a> {
    /// Bound simulation model
    pub model: &'a dyn TermStructureSimulation,
    /// Product whose sensitivities are mapped
    pub product: &'a dyn SimmProduct,
    /// Curve whose swap rates are the risk factors
    pub curve: &'a CurveName,
    /// Evaluation time
    pub evaluation_time: f64,
    /// Derivatives of the time-zero value with respect to forward rates
    pub gradient: &'a RateGradient,
    /// Estimator conditioning on the market state
    pub market_estimator: &'a dyn ConditionalExpectation,
    /// Estimator localised to the product's live paths
    pub product_estimator: &'a dyn ConditionalExpectation,
    /// Time-zero `dL/dS` reused at every evaluation time, if configured
    pub constant_weights: Option<&'a ScenarioMatrix>,
}

/// Maps value derivatives to swap-rate sensitivities and counts its work.
#[derive(Debug, Default)]
pub struct CurveMappingEngine {
    computations: AtomicUsize,
}

impl CurveMappingEngine {
    /// Creates an engine with a zero computation count.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mappings performed so far.
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::Relaxed)
    }

    /// Sensitivities `dV/dS_k` to the swap rates ending at `t + (k+1) dT`,
    /// one per remaining rate period.
    pub fn swap_rate_sensitivities(
        &self,
        request: &MappingRequest<'_>,
    ) -> Result<Vec<ScenarioValue>, SimmError> {
        self.computations.fetch_add(1, Ordering::Relaxed);
        let position = RatePosition::locate(request.model, request.evaluation_time)?;
        trace!(
            curve = %request.curve,
            time = request.evaluation_time,
            n_remaining = position.n_remaining,
            "mapping sensitivities"
        );
        if position.n_remaining == 0 {
            return Ok(Vec::new());
        }

        if request.curve.is_discount_curve() {
            return discount_curve_sensitivities(request, &position);
        }

        let forward_sensitivities = match request.product.swap_schedule() {
            Some(schedule) => analytic_swap_sensitivities(
                request.model,
                request.evaluation_time,
                &position,
                &schedule,
                request.market_estimator,
            )?,
            None => gradient_sensitivities(
                request.model,
                request.evaluation_time,
                &position,
                request.gradient,
                request.product_estimator,
            )?,
        };
        let adjustment = grid_adjustment(request.model, request.evaluation_time, &position)?;
        let shifted = adjustment.left_multiply(&forward_sensitivities);

        let n = position.n_remaining;
        let weights = match request.constant_weights {
            Some(constant) => constant.leading_block(n, n),
            None => libor_swap_jacobian(
                request.model,
                request.evaluation_time,
                request.market_estimator,
            )?,
        };
        Ok(weights.left_multiply(&shifted))
    }
}

/// Jacobian `dL/dS` of forward rates with respect to swap rates on the
/// grid shifted to `evaluation_time`.
///
/// With conditioned discount factors `df_k = E[1 / N(t + (k+1) dT)]`:
///
/// ```text
/// M[0][0]   = 1
/// M[i][i-1] = -(df_0 + ... + df_{i-1}) / df_i
/// M[i][i]   =  (df_0 + ... + df_i)     / df_i
/// ```
pub fn libor_swap_jacobian(
    model: &dyn TermStructureSimulation,
    evaluation_time: f64,
    estimator: &dyn ConditionalExpectation,
) -> Result<ScenarioMatrix, SimmError> {
    let position = RatePosition::locate(model, evaluation_time)?;
    let n = position.n_remaining;
    let mut jacobian = ScenarioMatrix::zeros(n, n, model.n_paths());
    if n == 0 {
        return Ok(jacobian);
    }
    jacobian.set(0, 0, &ScenarioValue::constant(1.0));

    let dt = position.period_length;
    let mut sum_df = model.numeraire(evaluation_time + dt)?.invert();
    for i in 1..n {
        let df = model
            .numeraire(evaluation_time + (i + 1) as f64 * dt)?
            .invert();
        let denominator = df.conditional_expectation(estimator);
        let below = -(sum_df.conditional_expectation(estimator) / &denominator);
        jacobian.set(i, i - 1, &below);
        sum_df = &sum_df + &df;
        let diagonal = sum_df.conditional_expectation(estimator) / &denominator;
        jacobian.set(i, i, &diagonal);
    }
    Ok(jacobian)
}

fn rate_period_time(model: &dyn TermStructureSimulation, index: usize) -> Result<f64, SimmError> {
    let periods = model.rate_periods();
    periods.time(index).ok_or_else(|| {
        SimulationError::IndexOutOfRange {
            what: "rate period time",
            index,
            len: periods.n_times(),
        }
        .into()
    })
}

/// `dL/dL'` between the model grid and the grid shifted to `t`.
///
/// Identity (`n x n`) on the grid. Off the grid the `n x (n+1)`
/// derivative of the log-linear interpolation is inverted path by path,
/// giving an `(n+1) x n` matrix.
pub fn grid_adjustment(
    model: &dyn TermStructureSimulation,
    evaluation_time: f64,
    position: &RatePosition,
) -> Result<ScenarioMatrix, SimmError> {
    let n = position.n_remaining;
    let n_paths = model.n_paths();
    if position.on_grid {
        return Ok(ScenarioMatrix::identity(n, n_paths));
    }

    let times = model.time_discretization();
    let periods = model.rate_periods();
    let dt = position.period_length;
    let previous_fixing = rate_period_time(model, position.last_index)?;
    let out_of_range = |time: f64| SimulationError::TimeOutOfRange {
        time,
        horizon: times.last(),
    };
    let time_index_at_evaluation = times
        .index_at_or_after(evaluation_time)
        .ok_or_else(|| out_of_range(evaluation_time))?;
    let time_index_at_previous_fixing = times
        .index_at_or_after(previous_fixing)
        .ok_or_else(|| out_of_range(previous_fixing))?;

    let mut derivative = ScenarioMatrix::zeros(n, n + 1, n_paths);
    for j in 0..n {
        let start = evaluation_time + j as f64 * dt;
        let k = periods
            .index_at_or_before(start)
            .ok_or_else(|| out_of_range(start))?;
        let t0 = rate_period_time(model, k)?;
        let t1 = rate_period_time(model, k + 1)?;
        let t2 = rate_period_time(model, k + 2)?;
        let factor1 = (t2 - (start + dt)) / (t2 - t1);
        let factor2 = (start - t0) / (t1 - t0);
        let time_index = if j == 0 {
            time_index_at_previous_fixing
        } else {
            time_index_at_evaluation
        };

        let previous_growth = &(model.forward_rate(time_index, k)? * (t1 - t0)) + 1.0;
        let next_growth = &(model.forward_rate(time_index, k + 1)? * (t2 - t1)) + 1.0;
        let interpolated =
            (&(next_growth.ln() * -factor1) + &(previous_growth.ln() * -factor2)).exp();

        derivative.set(j, j, &(&next_growth * &interpolated * (1.0 - factor2)));
        derivative.set(j, j + 1, &(&previous_growth * &interpolated * (1.0 - factor1)));
    }
    Ok(derivative.pseudo_inverse())
}

/// Closed-form `dV/dL` of a plain swap: `notional * E[N(t) / N(T_pay) * dT]`
/// for every period of the swap, in model-grid order.
pub fn analytic_swap_sensitivities(
    model: &dyn TermStructureSimulation,
    evaluation_time: f64,
    position: &RatePosition,
    schedule: &SwapSchedule,
    estimator: &dyn ConditionalExpectation,
) -> Result<Vec<ScenarioValue>, SimmError> {
    let n_sensitivities = position.n_sensitivities();
    let mut sensitivities = vec![ScenarioValue::zero(); n_sensitivities];
    let fixings = &schedule.fixing_dates;
    let Some(&first_fixing) = fixings.first() else {
        return Ok(sensitivities);
    };

    let periods = model.rate_periods();
    let dt = position.period_length;
    // Swap period running at t (0 before the first fixing)
    let period_index = fixings
        .partition_point(|&f| f <= evaluation_time + TIME_TOLERANCE)
        .saturating_sub(1);
    let current_rate = position.last_index;
    let first_rate = if first_fixing > evaluation_time + TIME_TOLERANCE {
        periods
            .index_at_or_before(first_fixing)
            .unwrap_or(current_rate)
    } else {
        current_rate
    };
    let live_periods = fixings.len() - period_index;
    let numeraire = model.numeraire(evaluation_time)?;

    for (offset, slot) in sensitivities.iter_mut().enumerate() {
        let rate_index = current_rate + offset;
        if rate_index < first_rate {
            continue;
        }
        let i = rate_index - first_rate + 1;
        if i > live_periods {
            continue;
        }
        let payment = fixings[period_index + i - 1] + dt;
        let discount = &numeraire / &model.numeraire(payment)?;
        *slot = (discount * (dt * schedule.notional)).conditional_expectation(estimator);
    }
    Ok(sensitivities)
}

/// `dV/dL` from an AD gradient: `E[dV(0)/dL_j(t) * N(t)]`.
///
/// Off the grid the period already fixed is read at its fixing time and
/// left unconditioned.
pub fn gradient_sensitivities(
    model: &dyn TermStructureSimulation,
    evaluation_time: f64,
    position: &RatePosition,
    gradient: &RateGradient,
    estimator: &dyn ConditionalExpectation,
) -> Result<Vec<ScenarioValue>, SimmError> {
    let times = model.time_discretization();
    let numeraire = model.numeraire(evaluation_time)?;
    let time_index =
        times
            .index_at_or_before(evaluation_time)
            .ok_or(SimulationError::TimeOutOfRange {
                time: evaluation_time,
                horizon: times.last(),
            })?;
    let derivative = |time_index: usize, rate_index: usize| {
        gradient
            .get(time_index, rate_index)
            .cloned()
            .unwrap_or_default()
    };

    let mut sensitivities = Vec::with_capacity(position.n_sensitivities());
    let mut first_open = position.last_index;
    if !position.on_grid {
        let fixing = rate_period_time(model, position.last_index)?;
        let fixing_index = times.index_of(fixing).ok_or(SimulationError::TimeOutOfRange {
            time: fixing,
            horizon: times.last(),
        })?;
        sensitivities.push(derivative(fixing_index, position.last_index) * &numeraire);
        first_open += 1;
    }
    for rate_index in first_open..model.n_rates() {
        let value = derivative(time_index, rate_index) * &numeraire;
        sensitivities.push(value.conditional_expectation(estimator));
    }
    Ok(sensitivities)
}

/// Distributes maturity-tagged values onto the grid `(k+1) * spacing`,
/// `k = 0..n`, by linear interpolation. Values before the first or after
/// the last grid point go to that point. The total is conserved.
pub fn allocate_to_grid(
    points: &[(f64, ScenarioValue)],
    n: usize,
    spacing: f64,
) -> Vec<ScenarioValue> {
    let mut grid = vec![ScenarioValue::zero(); n];
    if n == 0 {
        return grid;
    }
    for (maturity, value) in points {
        let position = maturity / spacing - 1.0;
        if position <= 0.0 {
            grid[0] = &grid[0] + value;
        } else if position >= (n - 1) as f64 {
            grid[n - 1] = &grid[n - 1] + value;
        } else {
            let lower = position.floor() as usize;
            let weight = position - lower as f64;
            grid[lower] = &grid[lower] + &(value * (1.0 - weight));
            grid[lower + 1] = &grid[lower + 1] + &(value * weight);
        }
    }
    grid
}

/// Jacobian `dS/dP` of discount-curve swap rates
/// `S_k = (1 - P_k) / (dT * A_k)`, `A_k = P_0 + ... + P_k`, with respect
/// to the bonds `P_j`.
pub fn swap_bond_jacobian(bonds: &[ScenarioValue], period_length: f64, n_paths: usize) -> ScenarioMatrix {
    let n = bonds.len();
    let mut jacobian = ScenarioMatrix::zeros(n, n, n_paths);
    let mut annuity = ScenarioValue::zero();
    for (k, bond) in bonds.iter().enumerate() {
        annuity = &annuity + bond;
        let through_annuity = -((1.0 - bond) / (annuity.squared() * period_length));
        for j in 0..k {
            jacobian.set(k, j, &through_annuity);
        }
        let diagonal = &through_annuity - &(&annuity * period_length).invert();
        jacobian.set(k, k, &diagonal);
    }
    jacobian
}

fn discount_curve_sensitivities(
    request: &MappingRequest<'_>,
    position: &RatePosition,
) -> Result<Vec<ScenarioValue>, SimmError> {
    let model = request.model;
    let t = request.evaluation_time;
    let n = position.n_remaining;
    let dt = position.period_length;

    let numeraire = model.numeraire(t)?;
    let bonds = (0..n)
        .map(|k| {
            let bond = &numeraire / &model.numeraire(t + (k + 1) as f64 * dt)?;
            Ok(bond.conditional_expectation(request.market_estimator))
        })
        .collect::<Result<Vec<_>, SimmError>>()?;
    let bond_swap = swap_bond_jacobian(&bonds, dt, model.n_paths()).pseudo_inverse();

    let points = request.product.discount_sensitivities(t, model)?;
    let value_bond: Vec<ScenarioValue> = allocate_to_grid(&points, n, dt)
        .iter()
        .map(|v| v.conditional_expectation(request.product_estimator))
        .collect();
    Ok(bond_swap.left_multiply(&value_bond))
}

//! Time discretisations.
//!
//! A [`TimeDiscretization`] is a strictly increasing grid of year
//! fractions. The same type describes the simulation grid of a model and
//! the period grid of its simulated forward rates.
//!
//! Index lookups compare times with an absolute tolerance of
//! [`TIME_TOLERANCE`] so that grids built by repeated addition (such as
//! `0.1 * i`) still match exactly representable evaluation times.

use super::error::ScheduleError;

/// Absolute tolerance used when matching a time against a grid point.
pub const TIME_TOLERANCE: f64 = 1e-9;

/// Strictly increasing grid of times.
///
/// # Examples
///
/// ```
/// use pricer_models::schedules::TimeDiscretization;
///
/// let grid = TimeDiscretization::uniform(0.0, 4, 0.5).unwrap();
/// assert_eq!(grid.n_times(), 5);
/// assert_eq!(grid.index_at_or_before(1.2), Some(2));
/// assert_eq!(grid.index_at_or_after(1.2), Some(3));
/// assert_eq!(grid.index_of(1.5), Some(3));
/// assert!(grid.index_of(1.2).is_none());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct TimeDiscretization {
    times: Vec<f64>,
}

impl TimeDiscretization {
    /// Builds a discretisation from explicit times.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError`] if `times` is empty, contains a non-finite
    /// value, or is not strictly increasing.
    pub fn new(times: Vec<f64>) -> Result<Self, ScheduleError> {
        if times.is_empty() {
            return Err(ScheduleError::Empty);
        }
        for (index, t) in times.iter().enumerate() {
            if !t.is_finite() {
                return Err(ScheduleError::NonFinite { index });
            }
        }
        for index in 1..times.len() {
            if times[index] <= times[index - 1] {
                return Err(ScheduleError::NotIncreasing {
                    index,
                    previous: times[index - 1],
                    current: times[index],
                });
            }
        }
        Ok(Self { times })
    }

    /// Uniform grid `start, start + step, ..., start + n_steps * step`.
    ///
    /// Points are computed as `start + i * step` to avoid drift.
    pub fn uniform(start: f64, n_steps: usize, step: f64) -> Result<Self, ScheduleError> {
        if !(step.is_finite() && step > 0.0) {
            return Err(ScheduleError::InvalidStep { step });
        }
        Self::new((0..=n_steps).map(|i| start + i as f64 * step).collect())
    }

    /// All grid points.
    #[inline]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Number of grid points.
    #[inline]
    pub fn n_times(&self) -> usize {
        self.times.len()
    }

    /// Number of intervals, `n_times() - 1`.
    #[inline]
    pub fn n_steps(&self) -> usize {
        self.times.len() - 1
    }

    /// Grid point `index`, if in range.
    #[inline]
    pub fn time(&self, index: usize) -> Option<f64> {
        self.times.get(index).copied()
    }

    /// Length of interval `index`, `t[index + 1] - t[index]`.
    #[inline]
    pub fn step(&self, index: usize) -> Option<f64> {
        Some(self.time(index + 1)? - self.time(index)?)
    }

    /// First grid point.
    #[inline]
    pub fn first(&self) -> f64 {
        self.times[0]
    }

    /// Last grid point.
    #[inline]
    pub fn last(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    /// Index of the grid point equal to `t`, if any.
    pub fn index_of(&self, t: f64) -> Option<usize> {
        let i = self.index_at_or_before(t)?;
        ((self.times[i] - t).abs() <= TIME_TOLERANCE).then_some(i)
    }

    /// Returns `true` when `t` is a grid point.
    #[inline]
    pub fn contains(&self, t: f64) -> bool {
        self.index_of(t).is_some()
    }

    /// Largest index with `t[i] <= t`, `None` if `t` precedes the grid.
    pub fn index_at_or_before(&self, t: f64) -> Option<usize> {
        let count = self.times.partition_point(|&x| x <= t + TIME_TOLERANCE);
        count.checked_sub(1)
    }

    /// Smallest index with `t[i] >= t`, `None` if `t` is beyond the grid.
    pub fn index_at_or_after(&self, t: f64) -> Option<usize> {
        let index = self.times.partition_point(|&x| x < t - TIME_TOLERANCE);
        (index < self.times.len()).then_some(index)
    }
}

//! Scenario-indexed values.
//!
//! A [`ScenarioValue`] carries one `f64` per Monte Carlo path, or a single
//! deterministic number that stands for the same value on every path.
//! Values are immutable: every operation returns a new value and shares
//! storage through `Arc` when nothing changes.
//!
//! # Examples
//!
//! ```
//! use pricer_core::scenario::ScenarioValue;
//!
//! let x = ScenarioValue::from_paths(vec![1.0, -2.0, 3.0]);
//! let y = &x * 2.0 + 1.0;
//! assert_eq!(y.get(1), -3.0);
//! assert!((x.abs().average() - 2.0).abs() < 1e-12);
//! ```

mod matrix;
mod ops;

use std::fmt;
use std::iter::Sum;
use std::sync::Arc;

use crate::math::regression::ConditionalExpectation;

pub use matrix::ScenarioMatrix;

#[derive(Clone, PartialEq)]
enum Repr {
    Constant(f64),
    Paths(Arc<[f64]>),
}

/// Per-path random variable with deterministic fast path.
///
/// Binary operations between two path-wise values require equal path
/// counts; a constant combines with a value of any path count.
#[derive(Clone, PartialEq)]
pub struct ScenarioValue {
    repr: Repr,
}

impl ScenarioValue {
    /// Creates a deterministic value.
    #[inline]
    pub fn constant(value: f64) -> Self {
        Self {
            repr: Repr::Constant(value),
        }
    }

    /// Deterministic zero.
    #[inline]
    pub fn zero() -> Self {
        Self::constant(0.0)
    }

    /// Creates a value from per-path realisations.
    pub fn from_paths(values: Vec<f64>) -> Self {
        Self {
            repr: Repr::Paths(values.into()),
        }
    }

    /// Creates a value with `n_paths` realisations produced by `f(path)`.
    pub fn from_fn<F>(n_paths: usize, f: F) -> Self
    where
        F: FnMut(usize) -> f64,
    {
        Self::from_paths((0..n_paths).map(f).collect())
    }

    /// Returns `true` if the value is the same on every path.
    #[inline]
    pub fn is_constant(&self) -> bool {
        matches!(self.repr, Repr::Constant(_))
    }

    /// Number of stored realisations, `None` for a deterministic value.
    #[inline]
    pub fn n_paths(&self) -> Option<usize> {
        match &self.repr {
            Repr::Constant(_) => None,
            Repr::Paths(values) => Some(values.len()),
        }
    }

    /// Realisation on `path`. Deterministic values ignore the index.
    ///
    /// # Panics
    ///
    /// Panics if `path` is out of range for a path-wise value.
    #[inline]
    pub fn get(&self, path: usize) -> f64 {
        match &self.repr {
            Repr::Constant(value) => *value,
            Repr::Paths(values) => values[path],
        }
    }

    /// Path-wise storage, `None` for a deterministic value.
    #[inline]
    pub fn as_slice(&self) -> Option<&[f64]> {
        match &self.repr {
            Repr::Constant(_) => None,
            Repr::Paths(values) => Some(values),
        }
    }

    /// The deterministic value, if any.
    #[inline]
    pub fn as_constant(&self) -> Option<f64> {
        match self.repr {
            Repr::Constant(value) => Some(value),
            Repr::Paths(_) => None,
        }
    }

    /// Expands the value into `n_paths` realisations.
    pub fn to_vec(&self, n_paths: usize) -> Vec<f64> {
        match &self.repr {
            Repr::Constant(value) => vec![*value; n_paths],
            Repr::Paths(values) => values.to_vec(),
        }
    }

    /// Scenario average (expectation under the simulation measure).
    pub fn average(&self) -> f64 {
        match &self.repr {
            Repr::Constant(value) => *value,
            Repr::Paths(values) if values.is_empty() => 0.0,
            Repr::Paths(values) => values.iter().sum::<f64>() / values.len() as f64,
        }
    }

    /// Smallest realisation.
    pub fn min(&self) -> f64 {
        match &self.repr {
            Repr::Constant(value) => *value,
            Repr::Paths(values) => values.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }

    /// Largest realisation.
    pub fn max(&self) -> f64 {
        match &self.repr {
            Repr::Constant(value) => *value,
            Repr::Paths(values) => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }

    /// Returns `true` when every realisation is finite.
    pub fn is_finite(&self) -> bool {
        match &self.repr {
            Repr::Constant(value) => value.is_finite(),
            Repr::Paths(values) => values.iter().all(|v| v.is_finite()),
        }
    }

    /// Applies `f` to every realisation.
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64,
    {
        match &self.repr {
            Repr::Constant(value) => Self::constant(f(*value)),
            Repr::Paths(values) => Self::from_paths(values.iter().map(|&v| f(v)).collect()),
        }
    }

    /// Combines two values path by path.
    ///
    /// A constant operand is broadcast to every path of the other.
    ///
    /// # Panics
    ///
    /// Panics if both operands carry paths and their path counts differ.
    pub fn zip_with<F>(&self, other: &Self, f: F) -> Self
    where
        F: Fn(f64, f64) -> f64,
    {
        match (&self.repr, &other.repr) {
            (Repr::Constant(a), Repr::Constant(b)) => Self::constant(f(*a, *b)),
            (Repr::Constant(a), Repr::Paths(b)) => {
                Self::from_paths(b.iter().map(|&y| f(*a, y)).collect())
            }
            (Repr::Paths(a), Repr::Constant(b)) => {
                Self::from_paths(a.iter().map(|&x| f(x, *b)).collect())
            }
            (Repr::Paths(a), Repr::Paths(b)) => {
                assert_eq!(
                    a.len(),
                    b.len(),
                    "scenario values with different path counts"
                );
                Self::from_paths(a.iter().zip(b.iter()).map(|(&x, &y)| f(x, y)).collect())
            }
        }
    }

    /// `x * x`
    pub fn squared(&self) -> Self {
        self.map(|x| x * x)
    }

    /// Square root.
    pub fn sqrt(&self) -> Self {
        self.map(f64::sqrt)
    }

    /// Absolute value.
    pub fn abs(&self) -> Self {
        self.map(f64::abs)
    }

    /// Natural exponential.
    pub fn exp(&self) -> Self {
        self.map(f64::exp)
    }

    /// Natural logarithm.
    pub fn ln(&self) -> Self {
        self.map(f64::ln)
    }

    /// Real power.
    pub fn powf(&self, exponent: f64) -> Self {
        self.map(|x| x.powf(exponent))
    }

    /// `1 / x`
    pub fn invert(&self) -> Self {
        self.map(|x| 1.0 / x)
    }

    /// Path-wise maximum with a floor.
    pub fn floor(&self, floor: f64) -> Self {
        self.map(|x| x.max(floor))
    }

    /// Path-wise minimum with a cap.
    pub fn cap(&self, cap: f64) -> Self {
        self.map(|x| x.min(cap))
    }

    /// Path-wise maximum of two values.
    pub fn max_with(&self, other: &Self) -> Self {
        self.zip_with(other, f64::max)
    }

    /// Path-wise minimum of two values.
    pub fn min_with(&self, other: &Self) -> Self {
        self.zip_with(other, f64::min)
    }

    /// Clips every realisation into `[lower, upper]` path by path.
    ///
    /// Equivalent to `max(min(x, upper), lower)`.
    pub fn clip(&self, lower: &Self, upper: &Self) -> Self {
        self.min_with(upper).max_with(lower)
    }

    /// `self + a * b`
    pub fn add_product(&self, a: &Self, b: &Self) -> Self {
        self + &(a * b)
    }

    /// Threshold select.
    ///
    /// On every path returns `if_non_negative` where `trigger >= 0` and
    /// `if_negative` otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use pricer_core::scenario::ScenarioValue;
    ///
    /// let trigger = ScenarioValue::from_paths(vec![-1.0, 0.0, 2.0]);
    /// let selected = ScenarioValue::barrier(
    ///     &trigger,
    ///     &ScenarioValue::constant(1.0),
    ///     &ScenarioValue::constant(0.0),
    /// );
    /// assert_eq!(selected.to_vec(3), vec![0.0, 1.0, 1.0]);
    /// ```
    pub fn barrier(trigger: &Self, if_non_negative: &Self, if_negative: &Self) -> Self {
        if let Some(t) = trigger.as_constant() {
            return if t >= 0.0 {
                if_non_negative.clone()
            } else {
                if_negative.clone()
            };
        }
        let n = trigger.n_paths().unwrap_or(0);
        Self::from_fn(n, |p| {
            if trigger.get(p) >= 0.0 {
                if_non_negative.get(p)
            } else {
                if_negative.get(p)
            }
        })
    }

    /// Conditional expectation of the value given the estimator's filtration.
    pub fn conditional_expectation(&self, estimator: &dyn ConditionalExpectation) -> Self {
        estimator.expectation(self)
    }
}

impl Default for ScenarioValue {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<f64> for ScenarioValue {
    fn from(value: f64) -> Self {
        Self::constant(value)
    }
}

impl From<Vec<f64>> for ScenarioValue {
    fn from(values: Vec<f64>) -> Self {
        Self::from_paths(values)
    }
}

impl Sum for ScenarioValue {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, x| &acc + &x)
    }
}

impl<'a> Sum<&'a ScenarioValue> for ScenarioValue {
    fn sum<I: Iterator<Item = &'a ScenarioValue>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, x| &acc + x)
    }
}

impl fmt::Debug for ScenarioValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Constant(value) => write!(f, "ScenarioValue::Constant({value})"),
            Repr::Paths(values) => f
                .debug_struct("ScenarioValue")
                .field("n_paths", &values.len())
                .field("average", &self.average())
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_and_paths() {
        let c = ScenarioValue::constant(2.5);
        assert!(c.is_constant());
        assert_eq!(c.n_paths(), None);
        assert_eq!(c.get(42), 2.5);

        let p = ScenarioValue::from_paths(vec![1.0, 2.0, 3.0]);
        assert!(!p.is_constant());
        assert_eq!(p.n_paths(), Some(3));
        assert_relative_eq!(p.average(), 2.0);
        assert_eq!(p.min(), 1.0);
        assert_eq!(p.max(), 3.0);
    }

    #[test]
    fn test_mixed_arithmetic_broadcasts_constant() {
        let p = ScenarioValue::from_paths(vec![1.0, 2.0]);
        let c = ScenarioValue::constant(10.0);
        assert_eq!((&p + &c).to_vec(2), vec![11.0, 12.0]);
        assert_eq!((&c - &p).to_vec(2), vec![9.0, 8.0]);
        assert_eq!((&p * &c).to_vec(2), vec![10.0, 20.0]);
        assert_eq!((&c / &p).to_vec(2), vec![10.0, 5.0]);
    }

    #[test]
    #[should_panic(expected = "different path counts")]
    fn test_mismatched_paths_panics() {
        let a = ScenarioValue::from_paths(vec![1.0, 2.0]);
        let b = ScenarioValue::from_paths(vec![1.0, 2.0, 3.0]);
        let _ = &a + &b;
    }

    #[test]
    fn test_barrier_selects_on_sign() {
        let trigger = ScenarioValue::from_paths(vec![-0.5, 0.0, 0.5]);
        let upper = ScenarioValue::from_paths(vec![1.0, 2.0, 3.0]);
        let lower = ScenarioValue::constant(-1.0);
        let r = ScenarioValue::barrier(&trigger, &upper, &lower);
        assert_eq!(r.to_vec(3), vec![-1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_barrier_constant_trigger_returns_branch() {
        let upper = ScenarioValue::from_paths(vec![1.0, 2.0]);
        let lower = ScenarioValue::constant(0.0);
        let r = ScenarioValue::barrier(&ScenarioValue::constant(-1.0), &upper, &lower);
        assert!(r.is_constant());
        assert_eq!(r.get(0), 0.0);
    }

    #[test]
    fn test_clip() {
        let x = ScenarioValue::from_paths(vec![-5.0, 0.5, 5.0]);
        let k = ScenarioValue::from_paths(vec![1.0, 1.0, 2.0]);
        let clipped = x.clip(&-&k, &k);
        assert_eq!(clipped.to_vec(3), vec![-1.0, 0.5, 2.0]);
    }

    #[test]
    fn test_unary_functions() {
        let x = ScenarioValue::from_paths(vec![4.0, 9.0]);
        assert_eq!(x.sqrt().to_vec(2), vec![2.0, 3.0]);
        assert_eq!(x.squared().to_vec(2), vec![16.0, 81.0]);
        assert_relative_eq!(x.ln().exp().get(1), 9.0, epsilon = 1e-12);
        assert_relative_eq!(x.powf(0.5).get(0), 2.0, epsilon = 1e-12);
        assert_eq!(x.invert().get(0), 0.25);
        assert_eq!((-&x).abs().to_vec(2), vec![4.0, 9.0]);
    }

    #[test]
    fn test_sum_of_values() {
        let values = vec![
            ScenarioValue::from_paths(vec![1.0, 2.0]),
            ScenarioValue::constant(1.0),
            ScenarioValue::from_paths(vec![0.5, 0.5]),
        ];
        let total: ScenarioValue = values.iter().sum();
        assert_eq!(total.to_vec(2), vec![2.5, 3.5]);
    }

    #[test]
    fn test_add_product() {
        let base = ScenarioValue::constant(1.0);
        let a = ScenarioValue::from_paths(vec![2.0, 3.0]);
        let b = ScenarioValue::constant(4.0);
        assert_eq!(base.add_product(&a, &b).to_vec(2), vec![9.0, 13.0]);
    }

    #[test]
    fn test_empty_average_is_zero() {
        assert_eq!(ScenarioValue::from_paths(Vec::new()).average(), 0.0);
    }
}

//! Per-instrument sensitivity cache.
//!
//! Bucketed sensitivities are memoised per `(risk class, curve)` for the
//! current evaluation time only. Moving to another time clears the
//! entries; rebinding the model clears everything.

use std::cmp::Ordering;
use std::collections::HashMap;

use pricer_core::scenario::ScenarioValue;
use tracing::trace;

use super::types::{CurveName, MaturityBucket, RiskClass};

/// Evaluation time usable as an ordered map key.
#[derive(Debug, Clone, Copy)]
pub struct TimeKey(f64);

impl TimeKey {
    /// Wraps a time.
    #[inline]
    pub fn new(time: f64) -> Self {
        Self(time)
    }

    /// The wrapped time.
    #[inline]
    pub fn time(&self) -> f64 {
        self.0
    }
}

impl PartialEq for TimeKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TimeKey {}

impl PartialOrd for TimeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// One sensitivity per canonical [`MaturityBucket`].
#[derive(Debug, Clone, PartialEq)]
pub struct BucketSensitivities {
    values: Vec<ScenarioValue>,
}

impl Default for BucketSensitivities {
    fn default() -> Self {
        Self::zeros()
    }
}

impl BucketSensitivities {
    /// All buckets zero.
    pub fn zeros() -> Self {
        Self {
            values: vec![ScenarioValue::zero(); MaturityBucket::COUNT],
        }
    }

    /// Wraps values in bucket order. Missing buckets are zero, surplus
    /// values are dropped.
    pub fn from_values(mut values: Vec<ScenarioValue>) -> Self {
        values.resize(MaturityBucket::COUNT, ScenarioValue::zero());
        Self { values }
    }

    /// Sensitivity of one bucket.
    #[inline]
    pub fn get(&self, bucket: MaturityBucket) -> &ScenarioValue {
        &self.values[bucket.index()]
    }

    /// All sensitivities in bucket order.
    #[inline]
    pub fn values(&self) -> &[ScenarioValue] {
        &self.values
    }

    /// Every bucket multiplied by `factor`.
    pub fn scaled(&self, factor: &ScenarioValue) -> Self {
        Self {
            values: self.values.iter().map(|v| v * factor).collect(),
        }
    }

    /// Adds `other` bucket by bucket.
    pub fn accumulate(&mut self, other: &Self) {
        for (value, add) in self.values.iter_mut().zip(&other.values) {
            *value = &*value + add;
        }
    }

    /// `(1 - weight) * self + weight * other`, bucket by bucket.
    pub fn interpolate(&self, other: &Self, weight: f64) -> Self {
        Self {
            values: self
                .values
                .iter()
                .zip(&other.values)
                .map(|(a, b)| &(a * (1.0 - weight)) + &(b * weight))
                .collect(),
        }
    }
}

/// Memoised bucketed sensitivities for one evaluation time.
#[derive(Debug, Default)]
pub struct SensitivityCache {
    evaluation_time: Option<TimeKey>,
    entries: HashMap<(RiskClass, CurveName), BucketSensitivities>,
}

impl SensitivityCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Time the entries belong to.
    pub fn evaluation_time(&self) -> Option<f64> {
        self.evaluation_time.map(|k| k.time())
    }

    /// Moves the cache to `time`, dropping entries of any other time.
    /// Returns `true` when entries were dropped.
    pub fn advance_to(&mut self, time: f64) -> bool {
        let key = TimeKey::new(time);
        if self.evaluation_time == Some(key) {
            return false;
        }
        trace!(from = ?self.evaluation_time(), to = time, "advancing sensitivity cache");
        self.evaluation_time = Some(key);
        let dropped = !self.entries.is_empty();
        self.entries.clear();
        dropped
    }

    /// Cached sensitivities, if present.
    pub fn get(&self, risk_class: RiskClass, curve: &CurveName) -> Option<&BucketSensitivities> {
        self.entries.get(&(risk_class, curve.clone()))
    }

    /// Stores sensitivities for the current time.
    pub fn insert(&mut self, risk_class: RiskClass, curve: CurveName, values: BucketSensitivities) {
        self.entries.insert((risk_class, curve), values);
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops all entries and forgets the evaluation time.
    pub fn clear(&mut self) {
        self.evaluation_time = None;
        self.entries.clear();
    }
}

//! Approximate sensitivities from reset anchors.
//!
//! Instead of mapping sensitivities at every evaluation time, exact
//! sensitivities are computed on a coarse anchor grid
//! `a = floor(t / step) * step` and carried to `t`:
//!
//! - linear melting shifts the tenor points of the anchor by the elapsed
//!   time, drops matured points and rebuckets the rest;
//! - interpolation blends the bucketed sensitivities of the anchors
//!   `a` and `a + step` linearly in time.
//!
//! Both are scaled by the survival probability at `t` by the caller.

use std::collections::BTreeMap;

use pricer_core::scenario::ScenarioValue;

use super::cache::{BucketSensitivities, TimeKey};
use super::rebucketing::{rebucket, years_to_days};
use super::types::{CurveName, IR_BUCKET_DAYS};

const ANCHOR_TOLERANCE: f64 = 1e-9;

/// Anchor at or before `time` on the grid spaced by `reset_step`.
///
/// # Examples
///
/// ```
/// use pricer_risk::simm::melting::anchor_time;
///
/// assert_eq!(anchor_time(1.3, 0.5), 1.0);
/// assert!((anchor_time(0.3, 0.1) - 0.3).abs() < 1e-12);
/// ```
pub fn anchor_time(time: f64, reset_step: f64) -> f64 {
    (time / reset_step + ANCHOR_TOLERANCE).floor() * reset_step
}

/// Exact sensitivities of one curve at an anchor time.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorSensitivities {
    tenor_sensitivities: Vec<ScenarioValue>,
    tenor_days: Vec<i64>,
    buckets: BucketSensitivities,
}

impl AnchorSensitivities {
    /// Tenor-point sensitivities with their residual maturity in days.
    pub fn new(tenor_sensitivities: Vec<ScenarioValue>, tenor_days: Vec<i64>) -> Self {
        let buckets = BucketSensitivities::from_values(rebucket(
            &tenor_sensitivities,
            &tenor_days,
            &IR_BUCKET_DAYS,
        ));
        Self {
            tenor_sensitivities,
            tenor_days,
            buckets,
        }
    }

    /// Bucketed sensitivities at the anchor.
    #[inline]
    pub fn buckets(&self) -> &BucketSensitivities {
        &self.buckets
    }

    /// Sensitivities `elapsed` years after the anchor: every tenor point
    /// moves `round(365 * elapsed)` days closer, points with no residual
    /// maturity are dropped and the rest is rebucketed.
    pub fn melt(&self, elapsed: f64) -> BucketSensitivities {
        let elapsed_days = years_to_days(elapsed);
        let (values, days): (Vec<ScenarioValue>, Vec<i64>) = self
            .tenor_sensitivities
            .iter()
            .zip(&self.tenor_days)
            .filter_map(|(value, &d)| {
                let residual = d - elapsed_days;
                (residual > 0).then(|| (value.clone(), residual))
            })
            .unzip();
        BucketSensitivities::from_values(rebucket(&values, &days, &IR_BUCKET_DAYS))
    }
}

/// Anchor sensitivities per `(anchor time, curve)`.
#[derive(Debug, Default)]
pub struct MeltingAnchors {
    anchors: BTreeMap<(TimeKey, CurveName), AnchorSensitivities>,
}

impl MeltingAnchors {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sensitivities stored for `curve` at `anchor`.
    pub fn get(&self, anchor: f64, curve: &CurveName) -> Option<&AnchorSensitivities> {
        self.anchors.get(&(TimeKey::new(anchor), curve.clone()))
    }

    /// Stores sensitivities for `curve` at `anchor`.
    pub fn insert(&mut self, anchor: f64, curve: CurveName, values: AnchorSensitivities) {
        self.anchors.insert((TimeKey::new(anchor), curve), values);
    }

    /// Number of stored anchors.
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Drops every anchor.
    pub fn clear(&mut self) {
        self.anchors.clear();
    }
}

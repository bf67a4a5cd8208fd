//! Survival of cancelable instruments.
//!
//! A cancelable instrument is treated as terminated on a path from the
//! first evaluation time at which its conditional value is no longer
//! positive. Life indicators are kept per evaluation time so that a
//! terminated path stays terminated at later times.

use std::collections::BTreeMap;

use pricer_core::scenario::ScenarioValue;

use super::cache::TimeKey;

/// Life indicators (1 alive, 0 terminated) per evaluation time.
#[derive(Debug, Default)]
pub struct SurvivalTracker {
    indicators: BTreeMap<TimeKey, ScenarioValue>,
}

impl SurvivalTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Indicator recorded for `time`, if any.
    pub fn indicator(&self, time: f64) -> Option<&ScenarioValue> {
        self.indicators.get(&TimeKey::new(time))
    }

    /// Indicator of the latest recorded time strictly before `time`.
    pub fn previous_indicator(&self, time: f64) -> Option<&ScenarioValue> {
        self.indicators
            .range(..TimeKey::new(time))
            .next_back()
            .map(|(_, indicator)| indicator)
    }

    /// Records the indicator at `time` from the conditional value of the
    /// instrument and returns the fraction of surviving paths.
    ///
    /// Paths terminated at an earlier recorded time stay terminated.
    /// A path survives when its conditional value is strictly positive.
    pub fn record(&mut self, time: f64, conditional_value: &ScenarioValue) -> f64 {
        let one = ScenarioValue::constant(1.0);
        let previous = self.previous_indicator(time).unwrap_or(&one);
        let value = ScenarioValue::barrier(
            &-previous,
            &(conditional_value * previous),
            conditional_value,
        );
        let alive = ScenarioValue::barrier(
            &-&value,
            &ScenarioValue::constant(0.0),
            &ScenarioValue::constant(1.0),
        );
        let probability = alive.average();
        self.indicators.insert(TimeKey::new(time), alive);
        probability
    }

    /// Number of recorded times.
    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    /// Returns `true` if nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    /// Forgets every indicator.
    pub fn clear(&mut self) {
        self.indicators.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_value_survives() {
        let mut tracker = SurvivalTracker::new();
        let v = ScenarioValue::from_paths(vec![1.0, -1.0, 0.0, 2.0]);
        assert_eq!(tracker.record(0.5, &v), 0.5);
        assert_eq!(tracker.indicator(0.5).unwrap().to_vec(4), vec![1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_terminated_paths_stay_terminated() {
        let mut tracker = SurvivalTracker::new();
        tracker.record(0.5, &ScenarioValue::from_paths(vec![1.0, -1.0]));
        let p = tracker.record(1.0, &ScenarioValue::from_paths(vec![1.0, 5.0]));
        assert_eq!(p, 0.5);
        assert_eq!(tracker.indicator(1.0).unwrap().to_vec(2), vec![1.0, 0.0]);
    }

    #[test]
    fn test_previous_indicator_is_latest_earlier_time() {
        let mut tracker = SurvivalTracker::new();
        tracker.record(0.5, &ScenarioValue::from_paths(vec![1.0, -1.0]));
        tracker.record(1.5, &ScenarioValue::from_paths(vec![-1.0, -1.0]));
        let previous = tracker.previous_indicator(1.0).unwrap();
        assert_eq!(previous.to_vec(2), vec![1.0, 0.0]);
        assert!(tracker.previous_indicator(0.5).is_none());
        assert_eq!(tracker.len(), 2);
        tracker.clear();
        assert!(tracker.is_empty());
    }
}

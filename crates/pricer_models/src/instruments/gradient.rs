//! Sparse gradient of a product value with respect to simulated forward rates.

use std::collections::HashMap;

use pricer_core::scenario::ScenarioValue;

/// Map `(time_index, rate_index) -> dV(0)/dL_j(t_i)`.
///
/// Entries that are absent are zero.
#[derive(Clone, Debug, Default)]
pub struct RateGradient {
    entries: HashMap<(usize, usize), ScenarioValue>,
}

impl RateGradient {
    /// Empty gradient.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` to the derivative with respect to `L_rate_index(t_time_index)`.
    pub fn accumulate(&mut self, time_index: usize, rate_index: usize, value: ScenarioValue) {
        self.entries
            .entry((time_index, rate_index))
            .and_modify(|existing| *existing = &*existing + &value)
            .or_insert(value);
    }

    /// Derivative with respect to `L_rate_index(t_time_index)`, if non-zero.
    pub fn get(&self, time_index: usize, rate_index: usize) -> Option<&ScenarioValue> {
        self.entries.get(&(time_index, rate_index))
    }

    /// Number of stored entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no derivative is stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulate_sums_entries() {
        let mut g = RateGradient::new();
        assert!(g.is_empty());
        g.accumulate(3, 1, ScenarioValue::constant(1.0));
        g.accumulate(3, 1, ScenarioValue::from_paths(vec![0.5, 1.5]));
        assert_eq!(g.len(), 1);
        assert_eq!(g.get(3, 1).unwrap().to_vec(2), vec![1.5, 2.5]);
        assert!(g.get(1, 3).is_none());
    }
}

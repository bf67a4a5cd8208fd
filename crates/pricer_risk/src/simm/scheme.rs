//! SIMM aggregation above the risk-class level.
//!
//! The margin of a risk class is the sum of its delta, vega and curvature
//! margins. Risk classes of one product class are combined with the
//! risk-class correlation `psi`, and the total margin is the sum over
//! product classes.

use std::collections::BTreeMap;

use pricer_core::scenario::ScenarioValue;
use pricer_core::types::Currency;

use super::ir_delta::variance_covariance;
use super::parameters::SimmParameters;
use super::types::{ProductClass, RiskClass};

/// Margin of a risk class from its delta, vega and curvature margins.
pub fn risk_class_margin(
    delta: &ScenarioValue,
    vega: &ScenarioValue,
    curvature: &ScenarioValue,
) -> ScenarioValue {
    &(delta + vega) + curvature
}

/// Margins of the six risk classes of one product class.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskClassMargins {
    margins: [ScenarioValue; 6],
}

impl Default for RiskClassMargins {
    fn default() -> Self {
        Self {
            margins: std::array::from_fn(|_| ScenarioValue::zero()),
        }
    }
}

impl RiskClassMargins {
    /// All margins zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Margin of `risk_class`.
    #[inline]
    pub fn get(&self, risk_class: RiskClass) -> &ScenarioValue {
        &self.margins[risk_class.index()]
    }

    /// Sets the margin of `risk_class`.
    pub fn set(&mut self, risk_class: RiskClass, margin: ScenarioValue) {
        self.margins[risk_class.index()] = margin;
    }

    /// `sqrt(sum_rs psi_rs IM_r IM_s)`.
    pub fn product_class_margin(&self, parameters: &SimmParameters) -> ScenarioValue {
        variance_covariance(&self.margins, |r, s| {
            parameters.risk_class_correlation(RiskClass::ALL[r], RiskClass::ALL[s])
        })
    }
}

/// Result of a margin run.
#[derive(Debug, Clone, PartialEq)]
pub struct MarginBreakdown {
    /// Currency the margin is reported in
    pub calculation_currency: Currency,
    /// Margin per product class
    pub product_classes: BTreeMap<ProductClass, ScenarioValue>,
}

impl MarginBreakdown {
    /// Empty breakdown.
    pub fn new(calculation_currency: Currency) -> Self {
        Self {
            calculation_currency,
            product_classes: BTreeMap::new(),
        }
    }

    /// Margin of `product_class`, zero when absent.
    pub fn product_class(&self, product_class: ProductClass) -> ScenarioValue {
        self.product_classes
            .get(&product_class)
            .cloned()
            .unwrap_or_default()
    }

    /// Sum of the product-class margins.
    pub fn total(&self) -> ScenarioValue {
        self.product_classes.values().sum()
    }
}

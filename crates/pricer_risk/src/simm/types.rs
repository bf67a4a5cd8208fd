//! SIMM classification types.
//!
//! Product classes, risk classes, risk types, curve names, the canonical
//! maturity grid and the calculation modes of the sensitivity engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::SimmError;

/// SIMM product class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize)]
pub enum ProductClass {
    /// Interest rates and foreign exchange
    RatesFx,
    /// Credit
    Credit,
    /// Equity
    Equity,
    /// Commodity
    Commodity,
}

impl ProductClass {
    /// All product classes in aggregation order.
    pub const ALL: [ProductClass; 4] = [
        ProductClass::RatesFx,
        ProductClass::Credit,
        ProductClass::Equity,
        ProductClass::Commodity,
    ];
}

/// SIMM risk class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize)]
pub enum RiskClass {
    /// Interest rate
    InterestRate,
    /// Qualifying credit
    CreditQualifying,
    /// Non-qualifying credit
    CreditNonQualifying,
    /// Equity
    Equity,
    /// Commodity
    Commodity,
    /// Foreign exchange
    Fx,
}

impl RiskClass {
    /// All risk classes, in the row order of the risk-class correlation matrix.
    pub const ALL: [RiskClass; 6] = [
        RiskClass::InterestRate,
        RiskClass::CreditQualifying,
        RiskClass::CreditNonQualifying,
        RiskClass::Equity,
        RiskClass::Commodity,
        RiskClass::Fx,
    ];

    /// Row of this class in the risk-class correlation matrix.
    #[inline]
    pub fn index(&self) -> usize {
        match self {
            RiskClass::InterestRate => 0,
            RiskClass::CreditQualifying => 1,
            RiskClass::CreditNonQualifying => 2,
            RiskClass::Equity => 3,
            RiskClass::Commodity => 4,
            RiskClass::Fx => 5,
        }
    }
}

/// SIMM risk type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize)]
pub enum RiskType {
    /// First-order sensitivity
    Delta,
    /// Volatility sensitivity
    Vega,
    /// Curvature
    Curvature,
}

/// Name of an interest rate curve, e.g. `"OIS"` or `"Libor6m"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize)]
pub struct CurveName(String);

impl CurveName {
    /// Discount curve key.
    pub const OIS: &'static str = "OIS";
    /// Pseudo-curve carrying inflation sensitivities.
    pub const INFLATION: &'static str = "inflation";
    /// Pseudo-curve carrying cross-currency basis sensitivities.
    pub const CCY_BASIS: &'static str = "ccybasis";

    /// Creates a curve name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The discount curve.
    pub fn ois() -> Self {
        Self::new(Self::OIS)
    }

    /// The inflation pseudo-curve.
    pub fn inflation() -> Self {
        Self::new(Self::INFLATION)
    }

    /// The cross-currency basis pseudo-curve.
    pub fn ccy_basis() -> Self {
        Self::new(Self::CCY_BASIS)
    }

    /// Curve name as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the inflation and cross-currency basis
    /// pseudo-curves.
    #[inline]
    pub fn is_pseudo_curve(&self) -> bool {
        self.0 == Self::INFLATION || self.0 == Self::CCY_BASIS
    }

    /// Returns `true` for the discount curve.
    #[inline]
    pub fn is_discount_curve(&self) -> bool {
        self.0 == Self::OIS
    }
}

impl fmt::Display for CurveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CurveName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Canonical SIMM interest rate maturity bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize)]
pub enum MaturityBucket {
    /// 2 weeks
    W2,
    /// 1 month
    M1,
    /// 3 months
    M3,
    /// 6 months
    M6,
    /// 1 year
    Y1,
    /// 2 years
    Y2,
    /// 3 years
    Y3,
    /// 5 years
    Y5,
    /// 10 years
    Y10,
    /// 15 years
    Y15,
    /// 20 years
    Y20,
    /// 30 years
    Y30,
}

/// Day counts of the interest rate buckets, in bucket order.
pub const IR_BUCKET_DAYS: [i64; 12] = [14, 30, 90, 180, 365, 730, 1095, 1825, 3650, 5475, 7300, 10950];

/// Day counts of the credit buckets (1y, 2y, 3y, 5y, 10y).
pub const CREDIT_BUCKET_DAYS: [i64; 5] = [365, 730, 1095, 1825, 3650];

impl MaturityBucket {
    /// All buckets in increasing maturity.
    pub const ALL: [MaturityBucket; 12] = [
        MaturityBucket::W2,
        MaturityBucket::M1,
        MaturityBucket::M3,
        MaturityBucket::M6,
        MaturityBucket::Y1,
        MaturityBucket::Y2,
        MaturityBucket::Y3,
        MaturityBucket::Y5,
        MaturityBucket::Y10,
        MaturityBucket::Y15,
        MaturityBucket::Y20,
        MaturityBucket::Y30,
    ];

    /// Number of buckets.
    pub const COUNT: usize = 12;

    /// Position in [`MaturityBucket::ALL`].
    #[inline]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Bucket at position `index`.
    #[inline]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Maturity in days.
    #[inline]
    pub fn days(&self) -> i64 {
        IR_BUCKET_DAYS[self.index()]
    }

    /// Regulatory label, e.g. `"2w"` or `"10y"`.
    pub fn label(&self) -> &'static str {
        match self {
            MaturityBucket::W2 => "2w",
            MaturityBucket::M1 => "1m",
            MaturityBucket::M3 => "3m",
            MaturityBucket::M6 => "6m",
            MaturityBucket::Y1 => "1y",
            MaturityBucket::Y2 => "2y",
            MaturityBucket::Y3 => "3y",
            MaturityBucket::Y5 => "5y",
            MaturityBucket::Y10 => "10y",
            MaturityBucket::Y15 => "15y",
            MaturityBucket::Y20 => "20y",
            MaturityBucket::Y30 => "30y",
        }
    }
}

impl fmt::Display for MaturityBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MaturityBucket {
    type Err = SimmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|b| b.label() == lower)
            .ok_or_else(|| SimmError::InvalidParameters(format!("unknown maturity bucket '{s}'")))
    }
}

/// How instrument sensitivities are produced at an evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(Serialize, Deserialize)]
pub enum SensitivityMode {
    /// Recompute through the curve-mapping engine at every evaluation time.
    #[default]
    Exact,
    /// Shift sensitivities computed at the last reset time by the elapsed
    /// time and scale them by the survival probability.
    LinearMelting,
    /// Interpolate sensitivities computed at the surrounding reset times
    /// and scale them by the survival probability.
    Interpolation,
}

/// How the forward-to-swap-rate Jacobian is weighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(Serialize, Deserialize)]
pub enum WeightMode {
    /// Jacobian computed once at time zero and reused.
    Constant,
    /// Jacobian recomputed at every evaluation time.
    #[default]
    Stochastic,
}

/// Calculation settings of a margin run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct MarginSettings {
    /// Sensitivity production mode
    pub sensitivity_mode: SensitivityMode,
    /// Jacobian weighting
    pub weight_mode: WeightMode,
    /// Spacing of the anchor grid used by melting and interpolation
    pub reset_step: f64,
}

impl Default for MarginSettings {
    fn default() -> Self {
        Self {
            sensitivity_mode: SensitivityMode::Exact,
            weight_mode: WeightMode::Stochastic,
            reset_step: 1.0,
        }
    }
}

impl MarginSettings {
    /// Creates settings.
    pub fn new(sensitivity_mode: SensitivityMode, weight_mode: WeightMode, reset_step: f64) -> Self {
        Self {
            sensitivity_mode,
            weight_mode,
            reset_step,
        }
    }

    /// Checks the reset step when a mode needs one.
    pub fn validate(&self) -> Result<(), SimmError> {
        let needs_step = self.sensitivity_mode != SensitivityMode::Exact;
        if needs_step && !(self.reset_step.is_finite() && self.reset_step > 0.0) {
            return Err(SimmError::InvalidResetStep(self.reset_step));
        }
        Ok(())
    }
}

//! SIMM calibration parameters.
//!
//! Risk weights, concentration thresholds, currency volatility tiers and
//! correlations. Defaults follow the ISDA SIMM v2.0 interest rate tables;
//! every field can be overridden from TOML, missing fields keep their
//! defaults.
//!
//! # Examples
//!
//! ```
//! use pricer_risk::simm::SimmParameters;
//!
//! let params = SimmParameters::from_toml_str(
//!     r#"
//!     cross_currency_correlation = 0.27
//!     curve_names = ["OIS", "Libor6m"]
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(params.curve_names.len(), 2);
//! assert_eq!(params.intra_bucket_dimension(), 2 * 12 + 2);
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use pricer_core::types::Currency;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::ConfigError;
use super::types::{CurveName, MaturityBucket, RiskClass};

/// Environment variable naming a parameter file for [`SimmParameters::load_or_default`].
pub const PARAMETERS_PATH_ENV: &str = "SIMM_PARAMETERS_PATH";

/// Interest rate volatility group of a currency (risk-weight table key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolatilityGroup {
    /// Regular volatility
    Regular,
    /// Low volatility
    Low,
    /// High volatility
    High,
}

/// Currency tier, which also decides the concentration threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrencyTier {
    /// High volatility currencies
    HighVolatility,
    /// Regular volatility, well traded
    RegularWellTraded,
    /// Regular volatility, less well traded
    RegularLessTraded,
    /// Low volatility currencies
    LowVolatility,
}

impl CurrencyTier {
    /// Risk-weight table used for this tier.
    pub fn volatility_group(&self) -> VolatilityGroup {
        match self {
            CurrencyTier::HighVolatility => VolatilityGroup::High,
            CurrencyTier::RegularWellTraded | CurrencyTier::RegularLessTraded => {
                VolatilityGroup::Regular
            }
            CurrencyTier::LowVolatility => VolatilityGroup::Low,
        }
    }
}

/// Tenor risk weights per volatility group, in [`MaturityBucket`] order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    /// Regular volatility currencies
    pub regular: Vec<f64>,
    /// Low volatility currencies
    pub low: Vec<f64>,
    /// High volatility currencies
    pub high: Vec<f64>,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            regular: vec![
                113.0, 113.0, 98.0, 69.0, 56.0, 52.0, 51.0, 51.0, 51.0, 53.0, 56.0, 64.0,
            ],
            low: vec![
                21.0, 21.0, 10.0, 11.0, 15.0, 20.0, 22.0, 21.0, 19.0, 20.0, 23.0, 27.0,
            ],
            high: vec![
                93.0, 93.0, 90.0, 94.0, 97.0, 103.0, 101.0, 103.0, 102.0, 101.0, 102.0, 101.0,
            ],
        }
    }
}

impl RiskWeights {
    /// Weights of one volatility group.
    pub fn for_group(&self, group: VolatilityGroup) -> &[f64] {
        match group {
            VolatilityGroup::Regular => &self.regular,
            VolatilityGroup::Low => &self.low,
            VolatilityGroup::High => &self.high,
        }
    }
}

/// Delta concentration thresholds per currency tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcentrationThresholds {
    /// High volatility currencies
    pub high_volatility: f64,
    /// Regular volatility, well traded
    pub regular_well_traded: f64,
    /// Regular volatility, less well traded
    pub regular_less_traded: f64,
    /// Low volatility currencies
    pub low_volatility: f64,
}

impl Default for ConcentrationThresholds {
    fn default() -> Self {
        Self {
            high_volatility: 8.0,
            regular_well_traded: 230.0,
            regular_less_traded: 28.0,
            low_volatility: 82.0,
        }
    }
}

impl ConcentrationThresholds {
    /// Threshold of a tier.
    pub fn for_tier(&self, tier: CurrencyTier) -> f64 {
        match tier {
            CurrencyTier::HighVolatility => self.high_volatility,
            CurrencyTier::RegularWellTraded => self.regular_well_traded,
            CurrencyTier::RegularLessTraded => self.regular_less_traded,
            CurrencyTier::LowVolatility => self.low_volatility,
        }
    }
}

/// Complete SIMM parameter set. Immutable once built; share it via `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimmParameters {
    /// Interest rate curves, in the order used by the intra-bucket matrix
    pub curve_names: Vec<CurveName>,
    /// Tenor risk weights
    pub risk_weights: RiskWeights,
    /// Risk weight of the inflation factor
    pub inflation_risk_weight: f64,
    /// Risk weight of the cross-currency basis factor
    pub ccy_basis_risk_weight: f64,
    /// Delta concentration thresholds
    pub concentration_thresholds: ConcentrationThresholds,
    /// Currency code to tier; unlisted currencies are high volatility
    pub currency_tiers: BTreeMap<String, CurrencyTier>,
    /// Correlation between tenors of the same curve (12 x 12)
    pub tenor_correlation: Vec<Vec<f64>>,
    /// Correlation between different curves of the same currency
    pub sub_curve_correlation: f64,
    /// Correlation between inflation and any tenor factor
    pub inflation_correlation: f64,
    /// Correlation between cross-currency basis and any other factor
    pub ccy_basis_correlation: f64,
    /// Base correlation between currency buckets
    pub cross_currency_correlation: f64,
    /// Correlation between risk classes (6 x 6, [`RiskClass::ALL`] order)
    pub risk_class_correlation: Vec<Vec<f64>>,
}

fn default_curve_names() -> Vec<CurveName> {
    ["OIS", "Libor1m", "Libor3m", "Libor6m", "Libor12m"]
        .into_iter()
        .map(CurveName::from)
        .collect()
}

fn default_currency_tiers() -> BTreeMap<String, CurrencyTier> {
    let mut tiers = BTreeMap::new();
    for code in ["USD", "EUR", "GBP"] {
        tiers.insert(code.to_string(), CurrencyTier::RegularWellTraded);
    }
    for code in [
        "CHF", "AUD", "NZD", "CAD", "SEK", "NOK", "DKK", "HKD", "KRW", "SGD", "TWD",
    ] {
        tiers.insert(code.to_string(), CurrencyTier::RegularLessTraded);
    }
    tiers.insert("JPY".to_string(), CurrencyTier::LowVolatility);
    tiers
}

fn default_tenor_correlation() -> Vec<Vec<f64>> {
    vec![
        vec![1.00, 1.00, 0.79, 0.67, 0.53, 0.42, 0.37, 0.30, 0.22, 0.18, 0.16, 0.12],
        vec![1.00, 1.00, 0.79, 0.67, 0.53, 0.42, 0.37, 0.30, 0.22, 0.18, 0.16, 0.12],
        vec![0.79, 0.79, 1.00, 0.85, 0.69, 0.57, 0.50, 0.42, 0.32, 0.25, 0.23, 0.20],
        vec![0.67, 0.67, 0.85, 1.00, 0.86, 0.76, 0.69, 0.59, 0.47, 0.40, 0.37, 0.32],
        vec![0.53, 0.53, 0.69, 0.86, 1.00, 0.93, 0.87, 0.77, 0.63, 0.57, 0.54, 0.50],
        vec![0.42, 0.42, 0.57, 0.76, 0.93, 1.00, 0.98, 0.90, 0.77, 0.70, 0.67, 0.63],
        vec![0.37, 0.37, 0.50, 0.69, 0.87, 0.98, 1.00, 0.96, 0.84, 0.78, 0.75, 0.71],
        vec![0.30, 0.30, 0.42, 0.59, 0.77, 0.90, 0.96, 1.00, 0.93, 0.89, 0.86, 0.82],
        vec![0.22, 0.22, 0.32, 0.47, 0.63, 0.77, 0.84, 0.93, 1.00, 0.98, 0.96, 0.94],
        vec![0.18, 0.18, 0.25, 0.40, 0.57, 0.70, 0.78, 0.89, 0.98, 1.00, 0.99, 0.98],
        vec![0.16, 0.16, 0.23, 0.37, 0.54, 0.67, 0.75, 0.86, 0.96, 0.99, 1.00, 0.99],
        vec![0.12, 0.12, 0.20, 0.32, 0.50, 0.63, 0.71, 0.82, 0.94, 0.98, 0.99, 1.00],
    ]
}

fn default_risk_class_correlation() -> Vec<Vec<f64>> {
    vec![
        vec![1.00, 0.28, 0.18, 0.18, 0.30, 0.22],
        vec![0.28, 1.00, 0.30, 0.66, 0.46, 0.27],
        vec![0.18, 0.30, 1.00, 0.23, 0.25, 0.18],
        vec![0.18, 0.66, 0.23, 1.00, 0.39, 0.24],
        vec![0.30, 0.46, 0.25, 0.39, 1.00, 0.32],
        vec![0.22, 0.27, 0.18, 0.24, 0.32, 1.00],
    ]
}

impl Default for SimmParameters {
    fn default() -> Self {
        Self {
            curve_names: default_curve_names(),
            risk_weights: RiskWeights::default(),
            inflation_risk_weight: 46.0,
            ccy_basis_risk_weight: 20.0,
            concentration_thresholds: ConcentrationThresholds::default(),
            currency_tiers: default_currency_tiers(),
            tenor_correlation: default_tenor_correlation(),
            sub_curve_correlation: 0.98,
            inflation_correlation: 0.29,
            ccy_basis_correlation: 0.20,
            cross_currency_correlation: 0.23,
            risk_class_correlation: default_risk_class_correlation(),
        }
    }
}

impl SimmParameters {
    /// Parses parameters from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Loads parameters from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Loads and validates parameters from a TOML file.
    pub fn load_and_validate(path: &Path) -> Result<Self, ConfigError> {
        let params = Self::load(path)?;
        params.validate()?;
        Ok(params)
    }

    /// Loads the file named by `SIMM_PARAMETERS_PATH`, or returns the defaults.
    pub fn load_or_default() -> Self {
        let Ok(path) = std::env::var(PARAMETERS_PATH_ENV) else {
            return Self::default();
        };
        match Self::load_and_validate(&PathBuf::from(&path)) {
            Ok(params) => params,
            Err(error) => {
                warn!(%path, %error, "falling back to default SIMM parameters");
                Self::default()
            }
        }
    }

    /// Serialises the parameters to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Tier of `currency`. Currencies without an entry are high volatility.
    pub fn currency_tier(&self, currency: Currency) -> CurrencyTier {
        self.currency_tiers
            .get(currency.code())
            .copied()
            .unwrap_or(CurrencyTier::HighVolatility)
    }

    /// Tenor risk weights applying to `currency`.
    pub fn tenor_risk_weights(&self, currency: Currency) -> &[f64] {
        self.risk_weights
            .for_group(self.currency_tier(currency).volatility_group())
    }

    /// Delta concentration threshold of `currency`.
    pub fn concentration_threshold(&self, currency: Currency) -> f64 {
        self.concentration_thresholds
            .for_tier(self.currency_tier(currency))
    }

    /// Position of `curve` in [`SimmParameters::curve_names`].
    pub fn curve_index(&self, curve: &CurveName) -> Option<usize> {
        self.curve_names.iter().position(|c| c == curve)
    }

    /// Number of factors in a currency bucket: curves x tenors, inflation
    /// and cross-currency basis.
    pub fn intra_bucket_dimension(&self) -> usize {
        self.curve_names.len() * MaturityBucket::COUNT + 2
    }

    /// Correlation between two risk classes.
    pub fn risk_class_correlation(&self, a: RiskClass, b: RiskClass) -> f64 {
        if a == b {
            return 1.0;
        }
        self.risk_class_correlation
            .get(a.index())
            .and_then(|row| row.get(b.index()))
            .copied()
            .unwrap_or(0.0)
    }

    /// Intra-bucket correlation matrix.
    ///
    /// Factor `curve * 12 + tenor` for the curve/tenor grid, followed by
    /// the inflation and the cross-currency basis factors.
    pub fn intra_bucket_correlation(&self) -> Vec<Vec<f64>> {
        let n_tenors = MaturityBucket::COUNT;
        let n_curve_factors = self.curve_names.len() * n_tenors;
        let inflation = n_curve_factors;
        let ccy_basis = n_curve_factors + 1;
        let dim = self.intra_bucket_dimension();

        let mut rho = vec![vec![0.0; dim]; dim];
        for (i, row) in rho.iter_mut().enumerate() {
            for (j, entry) in row.iter_mut().enumerate() {
                *entry = if i == j {
                    1.0
                } else if i == ccy_basis || j == ccy_basis {
                    self.ccy_basis_correlation
                } else if i == inflation || j == inflation {
                    self.inflation_correlation
                } else {
                    let tenor = self.tenor_correlation[i % n_tenors][j % n_tenors];
                    if i / n_tenors == j / n_tenors {
                        tenor
                    } else {
                        tenor * self.sub_curve_correlation
                    }
                };
            }
        }
        rho
    }

    /// Validates dimensions and ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        let n_tenors = MaturityBucket::COUNT;

        if self.curve_names.is_empty() {
            errors.push("curve_names cannot be empty".to_string());
        }
        for (i, curve) in self.curve_names.iter().enumerate() {
            if self.curve_names[..i].contains(curve) {
                errors.push(format!("duplicate curve name '{curve}'"));
            }
        }

        for (label, weights) in [
            ("regular", &self.risk_weights.regular),
            ("low", &self.risk_weights.low),
            ("high", &self.risk_weights.high),
        ] {
            if weights.len() != n_tenors {
                errors.push(format!(
                    "risk_weights.{label} has {} entries, expected {n_tenors}",
                    weights.len()
                ));
            }
            if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                errors.push(format!("risk_weights.{label} must be non-negative"));
            }
        }
        for (label, w) in [
            ("inflation_risk_weight", self.inflation_risk_weight),
            ("ccy_basis_risk_weight", self.ccy_basis_risk_weight),
        ] {
            if !w.is_finite() || w < 0.0 {
                errors.push(format!("{label} must be non-negative, got {w}"));
            }
        }

        let t = &self.concentration_thresholds;
        for (label, value) in [
            ("high_volatility", t.high_volatility),
            ("regular_well_traded", t.regular_well_traded),
            ("regular_less_traded", t.regular_less_traded),
            ("low_volatility", t.low_volatility),
        ] {
            if !(value.is_finite() && value > 0.0) {
                errors.push(format!(
                    "concentration_thresholds.{label} must be positive, got {value}"
                ));
            }
        }

        check_correlation_matrix("tenor_correlation", &self.tenor_correlation, n_tenors, &mut errors);
        check_correlation_matrix(
            "risk_class_correlation",
            &self.risk_class_correlation,
            RiskClass::ALL.len(),
            &mut errors,
        );
        for (label, value) in [
            ("sub_curve_correlation", self.sub_curve_correlation),
            ("inflation_correlation", self.inflation_correlation),
            ("ccy_basis_correlation", self.ccy_basis_correlation),
            ("cross_currency_correlation", self.cross_currency_correlation),
        ] {
            if !(-1.0..=1.0).contains(&value) {
                errors.push(format!("{label} must lie in [-1, 1], got {value}"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

fn check_correlation_matrix(label: &str, m: &[Vec<f64>], n: usize, errors: &mut Vec<String>) {
    if m.len() != n || m.iter().any(|row| row.len() != n) {
        errors.push(format!("{label} must be {n} x {n}"));
        return;
    }
    for i in 0..n {
        if (m[i][i] - 1.0).abs() > 1e-12 {
            errors.push(format!("{label} diagonal entry {i} is not 1"));
        }
        for j in 0..n {
            if !(-1.0..=1.0).contains(&m[i][j]) {
                errors.push(format!("{label}[{i}][{j}] outside [-1, 1]"));
            }
            if (m[i][j] - m[j][i]).abs() > 1e-12 {
                errors.push(format!("{label} is not symmetric at ({i}, {j})"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_are_valid() {
        let params = SimmParameters::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.intra_bucket_dimension(), 5 * 12 + 2);
    }

    #[test]
    fn test_currency_tiers() {
        let params = SimmParameters::default();
        assert_eq!(params.currency_tier(Currency::EUR), CurrencyTier::RegularWellTraded);
        assert_eq!(params.currency_tier(Currency::JPY), CurrencyTier::LowVolatility);
        assert_eq!(params.currency_tier(Currency::BRL), CurrencyTier::HighVolatility);
        assert_eq!(params.tenor_risk_weights(Currency::JPY)[0], 21.0);
        assert_eq!(params.concentration_threshold(Currency::CHF), 28.0);
        assert_eq!(params.concentration_threshold(Currency::BRL), 8.0);
    }

    #[test]
    fn test_intra_bucket_correlation_structure() {
        let params = SimmParameters::default();
        let rho = params.intra_bucket_correlation();
        let dim = params.intra_bucket_dimension();
        assert_eq!(rho.len(), dim);
        // Same curve, 1y vs 2y
        assert_relative_eq!(rho[4][5], 0.93);
        // OIS 1y vs Libor1m 2y
        assert_relative_eq!(rho[4][12 + 5], 0.93 * 0.98);
        // Inflation and ccy basis rows
        assert_relative_eq!(rho[dim - 2][3], 0.29);
        assert_relative_eq!(rho[dim - 1][dim - 2], 0.20);
        for i in 0..dim {
            assert_eq!(rho[i][i], 1.0);
            for j in 0..dim {
                assert_eq!(rho[i][j], rho[j][i]);
            }
        }
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let params = SimmParameters::from_toml_str(
            r#"
            sub_curve_correlation = 0.9

            [concentration_thresholds]
            high_volatility = 10.0

            [currency_tiers]
            BRL = "regular_less_traded"
            "#,
        )
        .unwrap();
        assert_eq!(params.sub_curve_correlation, 0.9);
        assert_eq!(params.concentration_thresholds.high_volatility, 10.0);
        assert_eq!(params.concentration_thresholds.low_volatility, 82.0);
        assert_eq!(params.currency_tier(Currency::BRL), CurrencyTier::RegularLessTraded);
        assert_eq!(params.currency_tiers.len(), 1);
        assert_eq!(params.risk_weights, RiskWeights::default());
    }

    #[test]
    fn test_toml_round_trip() {
        let params = SimmParameters::default();
        let text = params.to_toml_string().unwrap();
        let parsed = SimmParameters::from_toml_str(&text).unwrap();
        assert_eq!(parsed, params);
    }

    #[test]
    fn test_validation_collects_errors() {
        let mut params = SimmParameters::default();
        params.risk_weights.low.pop();
        params.concentration_thresholds.low_volatility = 0.0;
        params.tenor_correlation[0][1] = 0.5;
        params.cross_currency_correlation = 1.5;
        params.curve_names.push(CurveName::ois());
        match params.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert!(errors.iter().any(|e| e.contains("risk_weights.low")));
                assert!(errors.iter().any(|e| e.contains("low_volatility")));
                assert!(errors.iter().any(|e| e.contains("not symmetric")));
                assert!(errors.iter().any(|e| e.contains("cross_currency_correlation")));
                assert!(errors.iter().any(|e| e.contains("duplicate curve")));
            }
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            SimmParameters::from_toml_str("sub_curve_correlation = \"high\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = SimmParameters::load(Path::new("/nonexistent/simm.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_risk_class_correlation_lookup() {
        let params = SimmParameters::default();
        assert_eq!(
            params.risk_class_correlation(RiskClass::InterestRate, RiskClass::Fx),
            0.22
        );
        assert_eq!(
            params.risk_class_correlation(RiskClass::Equity, RiskClass::Equity),
            1.0
        );
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Attractiveness-index scoring types.
//!
//! The index combines four district metrics: population density and income
//! pull the score up, competitor presence and own-brand saturation pull it
//! down. Weights are validated at construction; the scoring formula itself
//! never has to re-check them.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// The four metrics scored per district, raw or normalized depending on
/// context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricVector {
    /// Inhabitants per km².
    pub density: f64,
    /// Median income in thousands of CHF.
    pub income: f64,
    /// Summed weight of competitor stores.
    pub competition: f64,
    /// Summed weight of own-brand stores.
    pub migros_density: f64,
}

/// One district's scoring result: raw metrics, normalized metrics, and the
/// combined attractiveness index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    /// Quartier name.
    pub quartier: String,
    /// Metrics before normalization.
    pub raw: MetricVector,
    /// Min-max normalized metrics in `[0, 1]`.
    pub norm: MetricVector,
    /// Weighted attractiveness index.
    pub ai: f64,
}

/// How the weight vector was constructed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WeightMode {
    /// Two inputs; the paired weights are derived so each signed pair sums
    /// to its configured total.
    Constrained,
    /// All four weights supplied independently.
    Independent,
}

/// How a constant metric column (max == min) is handled during
/// normalization.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DegeneratePolicy {
    /// The metric normalizes to `0.0` everywhere (contributing nothing to
    /// relative ranking) and a warning names it.
    #[default]
    Exclude,
    /// Abort scoring with a typed error.
    Reject,
}

/// Bounds for weight construction, from the city config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightConfig {
    /// `w1 + w2` in constrained mode; also the upper bound for `w1`.
    pub positive_total: f64,
    /// `w3 + w4` in constrained mode; also the upper bound for `w3`.
    pub negative_total: f64,
    /// Per-weight upper bound in independent mode.
    pub independent_max: f64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            positive_total: 1.0,
            negative_total: 1.0,
            independent_max: 1.0,
        }
    }
}

/// Validated weights for the attractiveness formula
/// `ai = w1·density + w2·income − w3·competition − w4·migros_density`
/// (over normalized metrics).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightVector {
    /// Density weight.
    pub w1: f64,
    /// Income weight.
    pub w2: f64,
    /// Competition penalty weight.
    pub w3: f64,
    /// Own-brand saturation penalty weight.
    pub w4: f64,
    /// Construction mode, recorded for artifact metadata.
    pub mode: WeightMode,
}

impl WeightVector {
    /// Builds weights from the two slider inputs: `w2` and `w4` are derived
    /// so each signed pair sums to its configured total.
    ///
    /// # Errors
    ///
    /// Returns [`WeightError`] if `w1` or `w3` is non-finite, negative, or
    /// exceeds its pair total.
    pub fn constrained(w1: f64, w3: f64, config: &WeightConfig) -> Result<Self, WeightError> {
        let w1 = check("w1", w1, config.positive_total)?;
        let w3 = check("w3", w3, config.negative_total)?;
        Ok(Self {
            w1,
            w2: config.positive_total - w1,
            w3,
            w4: config.negative_total - w3,
            mode: WeightMode::Constrained,
        })
    }

    /// Builds weights from four independent inputs.
    ///
    /// # Errors
    ///
    /// Returns [`WeightError`] if any weight is non-finite, negative, or
    /// exceeds `independent_max`.
    pub fn independent(
        w1: f64,
        w2: f64,
        w3: f64,
        w4: f64,
        config: &WeightConfig,
    ) -> Result<Self, WeightError> {
        Ok(Self {
            w1: check("w1", w1, config.independent_max)?,
            w2: check("w2", w2, config.independent_max)?,
            w3: check("w3", w3, config.independent_max)?,
            w4: check("w4", w4, config.independent_max)?,
            mode: WeightMode::Independent,
        })
    }
}

fn check(name: &'static str, value: f64, max: f64) -> Result<f64, WeightError> {
    if value.is_finite() && (0.0..=max).contains(&value) {
        Ok(value)
    } else {
        Err(WeightError { name, value, max })
    }
}

/// Error returned when a weight input is outside its valid range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightError {
    /// Which weight was rejected.
    pub name: &'static str,
    /// The rejected value.
    pub value: f64,
    /// The inclusive upper bound that applied.
    pub max: f64,
}

impl std::fmt::Display for WeightError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid weight {}={}: expected a finite value in 0..={}",
            self.name, self.value, self.max
        )
    }
}

impl std::error::Error for WeightError {}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Attractiveness-index computation.
//!
//! Three stages over the loaded base table, in order:
//! [`aggregate`] sums store weights into per-district competitive metrics,
//! [`normalize`] rescales every metric column to `[0, 1]`, and [`rank`]
//! applies the weighted formula and sorts. Aggregation runs once per data
//! snapshot; normalization and ranking re-run on every weight change.

pub mod aggregate;
pub mod normalize;
pub mod rank;

pub use aggregate::raw_metrics;
pub use normalize::{Normalized, normalize};
pub use rank::{rank, top_n};
pub use site_index_score_models::{
    DegeneratePolicy, MetricVector, ScoreRecord, WeightConfig, WeightError, WeightMode,
    WeightVector,
};

/// Errors produced while scoring.
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    /// A metric column is constant across all districts and the policy is
    /// [`DegeneratePolicy::Reject`].
    #[error("metric '{metric}' is constant ({value}) across all districts")]
    ConstantMetric {
        /// Name of the degenerate metric column.
        metric: &'static str,
        /// The constant value.
        value: f64,
    },
    /// A weight input failed validation.
    #[error(transparent)]
    Weight(#[from] WeightError),
}

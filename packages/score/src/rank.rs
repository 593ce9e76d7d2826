//! Weighted scoring and ranking.

use std::cmp::Ordering;

use site_index_score_models::{MetricVector, ScoreRecord, WeightVector};

/// Scores every district and sorts by attractiveness index, descending.
///
/// `raw` and `norm` are parallel to `names`. The sort is stable, so equal
/// scores keep their input (boundary file) order.
#[must_use]
#[allow(clippy::suboptimal_flops)] // keep the formula readable
pub fn rank(
    names: &[String],
    raw: &[MetricVector],
    norm: &[MetricVector],
    weights: &WeightVector,
) -> Vec<ScoreRecord> {
    debug_assert_eq!(names.len(), raw.len());
    debug_assert_eq!(names.len(), norm.len());

    let mut records: Vec<ScoreRecord> = names
        .iter()
        .zip(raw.iter().zip(norm))
        .map(|(name, (raw, norm))| ScoreRecord {
            quartier: name.clone(),
            raw: *raw,
            norm: *norm,
            ai: weights.w1 * norm.density + weights.w2 * norm.income
                - weights.w3 * norm.competition
                - weights.w4 * norm.migros_density,
        })
        .collect();

    records.sort_by(|a, b| b.ai.partial_cmp(&a.ai).unwrap_or(Ordering::Equal));
    records
}

/// Returns the first `n` ranked records (or all of them if fewer).
#[must_use]
pub fn top_n(records: &[ScoreRecord], n: usize) -> &[ScoreRecord] {
    &records[..records.len().min(n)]
}

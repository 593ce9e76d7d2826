//! Min-max normalization of metric columns.

use site_index_score_models::{DegeneratePolicy, MetricVector};

use crate::ScoreError;

type Getter = fn(&MetricVector) -> f64;
type Setter = fn(&mut MetricVector, f64);

/// Result of normalizing the metric table.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// Normalized vectors, parallel to the input.
    pub metrics: Vec<MetricVector>,
    /// Metric columns that were constant and excluded (empty under
    /// [`DegeneratePolicy::Reject`], which errors instead).
    pub degenerate: Vec<&'static str>,
}

/// Rescales each metric column to `[0, 1]` via `(x − min) / (max − min)`.
///
/// The raw minimum maps to `0.0` and the raw maximum to `1.0`. A constant
/// column has no range to rescale over; `policy` decides whether it is
/// excluded (zeroed with a warning) or rejected.
///
/// # Errors
///
/// Returns [`ScoreError::ConstantMetric`] for a constant column under
/// [`DegeneratePolicy::Reject`].
pub fn normalize(
    raw: &[MetricVector],
    policy: DegeneratePolicy,
) -> Result<Normalized, ScoreError> {
    let columns: [(&'static str, Getter, Setter); 4] = [
        ("density", |m| m.density, |m, v| m.density = v),
        ("income", |m| m.income, |m, v| m.income = v),
        ("competition", |m| m.competition, |m, v| m.competition = v),
        (
            "migros_density",
            |m| m.migros_density,
            |m, v| m.migros_density = v,
        ),
    ];

    let mut metrics = raw.to_vec();
    let mut degenerate = Vec::new();

    if raw.is_empty() {
        return Ok(Normalized { metrics, degenerate });
    }

    for (name, get, set) in columns {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for vector in raw {
            let value = get(vector);
            min = min.min(value);
            max = max.max(value);
        }

        let range = max - min;
        if range > 0.0 {
            for (normalized, original) in metrics.iter_mut().zip(raw) {
                set(normalized, (get(original) - min) / range);
            }
        } else {
            match policy {
                DegeneratePolicy::Exclude => {
                    log::warn!(
                        "Metric '{name}' is constant ({min}) across all districts; \
                         excluded from ranking"
                    );
                    for normalized in &mut metrics {
                        set(normalized, 0.0);
                    }
                    degenerate.push(name);
                }
                DegeneratePolicy::Reject => {
                    return Err(ScoreError::ConstantMetric {
                        metric: name,
                        value: min,
                    });
                }
            }
        }
    }

    Ok(Normalized { metrics, degenerate })
}

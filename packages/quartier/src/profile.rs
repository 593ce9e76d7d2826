//! Joins boundaries with demographics and derives area and density.
//!
//! Inner-join semantics on Quartier name: entries present in only one of
//! boundary/population are dropped with a warning. A loaded Quartier with
//! no income figure is an integrity error — the original pipeline would
//! have carried NaN into normalization, which is exactly the failure mode
//! this stage exists to rule out.

use std::collections::{BTreeMap, BTreeSet};

use geo::MultiPolygon;
use site_index_quartier_models::{CrsConfig, LoadStats, QuartierProfile};

use crate::demographics::{IncomeRow, PopulationRow};
use crate::{QuartierBoundary, QuartierError, project};

/// A fully loaded Quartier: demographic profile plus lon/lat geometry.
#[derive(Debug, Clone)]
pub struct Quartier {
    /// Derived demographic profile.
    pub profile: QuartierProfile,
    /// Boundary polygon in the geodetic CRS (matches store coordinates).
    pub geometry: MultiPolygon<f64>,
}

/// Joins boundaries, population, and income into the canonical Quartier
/// set, computing area (in the projected CRS) and density per district.
///
/// Output preserves boundary (feature) order.
///
/// # Errors
///
/// Returns [`QuartierError`] if the join is empty, a Quartier lacks an
/// income figure, a polygon degenerates under reprojection, or a CRS
/// definition is invalid.
pub fn build_quartiers(
    boundaries: Vec<QuartierBoundary>,
    population: &[PopulationRow],
    income: &[IncomeRow],
    crs: &CrsConfig,
) -> Result<(Vec<Quartier>, LoadStats), QuartierError> {
    let population_by_name: BTreeMap<&str, u32> = population
        .iter()
        .map(|row| (row.name.as_str(), row.inhabitants))
        .collect();
    let income_by_name: BTreeMap<&str, f64> = income
        .iter()
        .map(|row| (row.name.as_str(), row.income_1k_chf))
        .collect();

    let mut stats = LoadStats {
        boundaries: boundaries.len() as u64,
        ..LoadStats::default()
    };

    let mut matched_names: BTreeSet<String> = BTreeSet::new();
    let mut quartiers = Vec::with_capacity(boundaries.len());

    for boundary in boundaries {
        let Some(&inhabitants) = population_by_name.get(boundary.qname.as_str()) else {
            log::warn!(
                "Dropping Quartier '{}': no population row",
                boundary.qname
            );
            stats.unmatched_boundaries += 1;
            continue;
        };

        let Some(&income_1k_chf) = income_by_name.get(boundary.qname.as_str()) else {
            return Err(QuartierError::MissingIncome {
                name: boundary.qname,
            });
        };

        let projected = project::to_metric(&boundary.geometry, crs)?;
        let area_km2 = project::area_km2(&projected);
        if area_km2 <= 0.0 {
            return Err(QuartierError::NonPositiveArea {
                name: boundary.qname,
                area_km2,
            });
        }

        matched_names.insert(boundary.qname.clone());
        quartiers.push(Quartier {
            profile: QuartierProfile {
                qname: boundary.qname,
                qnr: boundary.qnr,
                kname: boundary.kname,
                knr: boundary.knr,
                inhabitants,
                area_km2,
                density_inh_per_km2: f64::from(inhabitants) / area_km2,
                income_1k_chf,
            },
            geometry: boundary.geometry,
        });
    }

    if quartiers.is_empty() {
        return Err(QuartierError::EmptyJoin);
    }

    for row in population {
        if !matched_names.contains(&row.name) {
            log::warn!("Population row '{}' matches no boundary", row.name);
            stats.unmatched_population += 1;
        }
    }
    for row in income {
        if !matched_names.contains(&row.name) {
            stats.unmatched_income += 1;
        }
    }
    stats.matched = quartiers.len() as u64;

    log::info!(
        "Built {} Quartier profiles ({} boundaries without population, {} stray population rows)",
        stats.matched,
        stats.unmatched_boundaries,
        stats.unmatched_population
    );

    Ok((quartiers, stats))
}

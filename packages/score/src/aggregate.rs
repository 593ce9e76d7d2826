//! Per-district metric aggregation.

use std::collections::BTreeMap;

use site_index_quartier_models::QuartierProfile;
use site_index_score_models::MetricVector;
use site_index_store_models::{Store, StoreCategory};

/// Builds the raw metric vector for every district.
///
/// Density and income come straight from the profiles; competition and
/// own-brand saturation are the summed weights of the joined stores per
/// category. Districts without stores of a category get an explicit `0.0`,
/// never a gap. Output is parallel to `profiles`.
///
/// `assignments` is parallel to `stores` (the spatial join result);
/// unassigned stores contribute to nothing.
#[must_use]
pub fn raw_metrics(
    profiles: &[QuartierProfile],
    stores: &[Store],
    assignments: &[Option<String>],
) -> Vec<MetricVector> {
    debug_assert_eq!(stores.len(), assignments.len());

    let index_by_name: BTreeMap<&str, usize> = profiles
        .iter()
        .enumerate()
        .map(|(index, profile)| (profile.qname.as_str(), index))
        .collect();

    let mut metrics: Vec<MetricVector> = profiles
        .iter()
        .map(|profile| MetricVector {
            density: profile.density_inh_per_km2,
            income: profile.income_1k_chf,
            competition: 0.0,
            migros_density: 0.0,
        })
        .collect();

    for (store, assignment) in stores.iter().zip(assignments) {
        let Some(quartier) = assignment.as_deref() else {
            continue;
        };
        let Some(&index) = index_by_name.get(quartier) else {
            log::warn!(
                "Store '{}' assigned to unknown Quartier '{quartier}'",
                store.name
            );
            continue;
        };
        match store.category {
            StoreCategory::Competitors => metrics[index].competition += store.weight,
            StoreCategory::MigrosGroup => metrics[index].migros_density += store.weight,
        }
    }

    metrics
}

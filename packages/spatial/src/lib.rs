#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial index for Quartier attribution.
//!
//! Builds an R-tree over the Quartier polygons and attributes each store
//! to the district containing its coordinates. Candidate polygons come
//! from an envelope query; the exact test is `geo::Contains`, which treats
//! polygon boundaries as exterior, so a point exactly on a shared edge
//! belongs to no district.
//!
//! Quartier polygons should partition the city, but the index does not
//! assume they do: when more than one polygon contains a point, the
//! smallest area wins, with the lexicographically smaller name breaking
//! exact area ties. The resolution is deterministic and independent of
//! insertion order.

use std::cmp::Ordering;

use geo::{Contains, MultiPolygon};
use rstar::{AABB, RTree, RTreeObject};
use site_index_quartier::Quartier;
use site_index_store_models::Store;

/// A Quartier polygon stored in the R-tree with its lookup metadata.
struct QuartierEntry {
    qname: String,
    area_km2: f64,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for QuartierEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Counters describing one spatial join pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinStats {
    /// Stores assigned to exactly one containing district.
    pub assigned: u64,
    /// Stores contained by no district polygon.
    pub outside: u64,
    /// Stores contained by more than one polygon (resolved by tie-break).
    pub ambiguous: u64,
}

/// Pre-built spatial index over the Quartier polygons.
///
/// Constructed once per snapshot and shared across all join passes.
pub struct SpatialIndex {
    quartiers: RTree<QuartierEntry>,
}

impl SpatialIndex {
    /// Builds the R-tree from loaded Quartier boundaries.
    #[must_use]
    pub fn build(quartiers: &[Quartier]) -> Self {
        let entries: Vec<QuartierEntry> = quartiers
            .iter()
            .map(|quartier| QuartierEntry {
                qname: quartier.profile.qname.clone(),
                area_km2: quartier.profile.area_km2,
                envelope: compute_envelope(&quartier.geometry),
                polygon: quartier.geometry.clone(),
            })
            .collect();

        log::info!("Built spatial index over {} Quartier polygons", entries.len());
        Self {
            quartiers: RTree::bulk_load(entries),
        }
    }

    /// Looks up the Quartier containing a point, if any.
    ///
    /// Overlap resolution is smallest area first, then name.
    #[must_use]
    pub fn lookup(&self, lon: f64, lat: f64) -> Option<&str> {
        self.winner(lon, lat).map(|(entry, _)| entry.qname.as_str())
    }

    /// Attributes every store to its containing Quartier.
    ///
    /// Returns assignments parallel to `stores` (index `i` holds the
    /// Quartier name for `stores[i]`, or `None` when the point falls
    /// outside every polygon) together with join counters.
    #[must_use]
    pub fn join(&self, stores: &[Store]) -> (Vec<Option<String>>, JoinStats) {
        let mut stats = JoinStats::default();
        let mut assignments = Vec::with_capacity(stores.len());

        for store in stores {
            match self.winner(store.lon, store.lat) {
                Some((entry, containing)) => {
                    if containing > 1 {
                        log::warn!(
                            "Store '{}' at ({}, {}) inside {containing} polygons; assigned '{}'",
                            store.name,
                            store.lon,
                            store.lat,
                            entry.qname
                        );
                        stats.ambiguous += 1;
                    }
                    stats.assigned += 1;
                    assignments.push(Some(entry.qname.clone()));
                }
                None => {
                    log::debug!(
                        "Store '{}' at ({}, {}) outside every Quartier",
                        store.name,
                        store.lon,
                        store.lat
                    );
                    stats.outside += 1;
                    assignments.push(None);
                }
            }
        }

        log::info!(
            "Spatial join: {} assigned, {} outside, {} ambiguous",
            stats.assigned,
            stats.outside,
            stats.ambiguous
        );
        (assignments, stats)
    }

    /// Returns the winning entry for a point plus the number of polygons
    /// that contained it.
    fn winner(&self, lon: f64, lat: f64) -> Option<(&QuartierEntry, usize)> {
        let point = geo::Point::new(lon, lat);
        let query_env = AABB::from_point([lon, lat]);

        let mut best: Option<&QuartierEntry> = None;
        let mut containing = 0_usize;

        for entry in self.quartiers.locate_in_envelope_intersecting(&query_env) {
            if entry.polygon.contains(&point) {
                containing += 1;
                match best {
                    None => best = Some(entry),
                    Some(current) if beats(entry, current) => best = Some(entry),
                    _ => {}
                }
            }
        }

        best.map(|entry| (entry, containing))
    }
}

/// Tie-break ordering between two containing entries: smaller area wins,
/// then the lexicographically smaller name.
fn beats(candidate: &QuartierEntry, current: &QuartierEntry) -> bool {
    match candidate.area_km2.partial_cmp(&current.area_km2) {
        Some(Ordering::Less) => true,
        Some(Ordering::Equal) => candidate.qname < current.qname,
        _ => false,
    }
}

/// Computes the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    use geo::BoundingRect;

    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Staged attractiveness pipeline.
//!
//! [`Pipeline::load`] runs the expensive snapshot stages once — boundary
//! and demographic loading, store loading, the spatial join, and metric
//! aggregation — and keeps the result in memory. [`Pipeline::score`]
//! re-runs only normalization and ranking, so weight changes never touch
//! the disk or the spatial index. A load failure aborts the whole
//! snapshot; no partial district set ever reaches a scoring pass.

pub mod cache;
pub mod config;
pub mod fingerprint;

use std::path::Path;

use site_index_quartier::{LoadStats, Quartier, QuartierError, boundary, demographics};
use site_index_score::{
    DegeneratePolicy, MetricVector, ScoreError, ScoreRecord, WeightVector,
};
use site_index_spatial::{JoinStats, SpatialIndex};
use site_index_store::{Store, StoreError, StoreLoadStats};
use thiserror::Error;

pub use config::{CityConfig, InputFiles, MapView, all_cities, find_city};

/// Errors spanning the staged pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No configured city carries the requested id.
    #[error("unknown city '{id}'")]
    UnknownCity {
        /// The id that matched no registry entry.
        id: String,
    },

    /// Reading a snapshot file or writing an artifact failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing the density cache CSV failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Boundary or demographic loading failed.
    #[error(transparent)]
    Quartier(#[from] QuartierError),

    /// Store table loading failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Normalization or weight validation failed.
    #[error(transparent)]
    Score(#[from] ScoreError),
}

/// One scoring pass over a loaded snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreOutcome {
    /// Ranked records, most attractive first.
    pub records: Vec<ScoreRecord>,
    /// The weights the records were scored with.
    pub weights: WeightVector,
    /// Metric columns excluded as degenerate. Empty unless the policy was
    /// [`DegeneratePolicy::Exclude`] and a column was constant.
    pub degenerate: Vec<&'static str>,
}

/// A loaded data snapshot: everything the per-weight scoring stage needs,
/// computed once.
pub struct Pipeline {
    city: CityConfig,
    fingerprint: String,
    quartiers: Vec<Quartier>,
    names: Vec<String>,
    load_stats: LoadStats,
    stores: Vec<Store>,
    store_stats: StoreLoadStats,
    assignments: Vec<Option<String>>,
    join_stats: JoinStats,
    raw: Vec<MetricVector>,
}

impl Pipeline {
    /// Loads a city's snapshot from `data_dir`: parses all four inputs,
    /// joins boundaries with demographics, attributes stores spatially,
    /// and aggregates the raw metric table.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any input is missing or malformed, the
    /// name join degenerates, or reprojection fails. Nothing is cached on
    /// failure.
    pub fn load(city: CityConfig, data_dir: &Path) -> Result<Self, PipelineError> {
        let paths = city.input_paths(data_dir);
        let fingerprint = fingerprint::snapshot_fingerprint(&paths)?;
        log::info!(
            "Loading snapshot for {} (fingerprint {})",
            city.name,
            &fingerprint[..12]
        );

        let boundaries = boundary::read_boundaries(&paths[0], &city.boundary_fields)?;
        let population = demographics::read_population(&paths[1], &city.population_fields)?;
        let income = demographics::read_income(&paths[2], &city.income_fields)?;
        let (quartiers, load_stats) =
            site_index_quartier::build_quartiers(boundaries, &population, &income, &city.crs)?;

        let (stores, store_stats) = site_index_store::read_stores(&paths[3], &city.store_fields)?;

        let index = SpatialIndex::build(&quartiers);
        let (assignments, join_stats) = index.join(&stores);
        check_district_labels(&stores, &assignments);

        let profiles: Vec<_> = quartiers.iter().map(|q| q.profile.clone()).collect();
        let raw = site_index_score::raw_metrics(&profiles, &stores, &assignments);
        let names = profiles.into_iter().map(|profile| profile.qname).collect();

        Ok(Self {
            city,
            fingerprint,
            quartiers,
            names,
            load_stats,
            stores,
            store_stats,
            assignments,
            join_stats,
            raw,
        })
    }

    /// Normalizes the cached raw metrics and ranks all districts under the
    /// given weights. Pure and synchronous; safe to call once per slider
    /// movement.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Score`] if a metric column is constant and
    /// `policy` is [`DegeneratePolicy::Reject`].
    pub fn score(
        &self,
        weights: &WeightVector,
        policy: DegeneratePolicy,
    ) -> Result<ScoreOutcome, PipelineError> {
        let normalized = site_index_score::normalize(&self.raw, policy)?;
        let records = site_index_score::rank(&self.names, &self.raw, &normalized.metrics, weights);
        Ok(ScoreOutcome {
            records,
            weights: *weights,
            degenerate: normalized.degenerate,
        })
    }

    /// Writes the density cache artifact for this snapshot under `dir`.
    ///
    /// Returns the artifact path and whether it was (re)written.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the artifact cannot be written.
    pub fn write_density_cache(
        &self,
        dir: &Path,
    ) -> Result<(std::path::PathBuf, bool), PipelineError> {
        cache::write_density_cache(dir, &self.quartiers, &self.fingerprint)
    }

    /// The city configuration this snapshot was loaded with.
    #[must_use]
    pub const fn city(&self) -> &CityConfig {
        &self.city
    }

    /// Hex-encoded SHA-256 over the snapshot input files.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// The loaded Quartiere, in boundary file order.
    #[must_use]
    pub fn quartiers(&self) -> &[Quartier] {
        &self.quartiers
    }

    /// The loaded stores, in store table order.
    #[must_use]
    pub fn stores(&self) -> &[Store] {
        &self.stores
    }

    /// Spatial join assignments, parallel to [`Self::stores`].
    #[must_use]
    pub fn assignments(&self) -> &[Option<String>] {
        &self.assignments
    }

    /// Raw (pre-normalization) metric vectors, parallel to
    /// [`Self::quartiers`].
    #[must_use]
    pub fn raw_metrics(&self) -> &[MetricVector] {
        &self.raw
    }

    /// Counters from the boundary/demographic join.
    #[must_use]
    pub const fn load_stats(&self) -> LoadStats {
        self.load_stats
    }

    /// Counters from the store table load.
    #[must_use]
    pub const fn store_stats(&self) -> StoreLoadStats {
        self.store_stats
    }

    /// Counters from the spatial join.
    #[must_use]
    pub const fn join_stats(&self) -> JoinStats {
        self.join_stats
    }
}

/// Compares the source's own district labels with the spatial join result
/// and returns the number of disagreements.
///
/// The join is authoritative; a mismatch only indicates drift between the
/// portal's labels and the boundary snapshot, so it is logged, never acted
/// on.
fn check_district_labels(stores: &[Store], assignments: &[Option<String>]) -> u64 {
    let mut mismatches = 0_u64;

    for (store, assignment) in stores.iter().zip(assignments) {
        let (Some(label), Some(assigned)) = (store.district_label.as_deref(), assignment.as_deref())
        else {
            continue;
        };
        if label != assigned {
            log::debug!(
                "Store '{}': source labels it '{label}', spatial join says '{assigned}'",
                store.name
            );
            mismatches += 1;
        }
    }

    if mismatches > 0 {
        log::warn!("{mismatches} store district labels disagree with the spatial join");
    }
    mismatches
}

#[cfg(test)]
mod tests {
    use site_index_quartier::{
        BoundaryFieldMapping, CrsConfig, IncomeFieldMapping, PopulationFieldMapping,
    };
    use site_index_score::WeightConfig;
    use site_index_store::{StoreCategory, StoreFieldMapping};

    use super::*;

    /// Two adjacent ~0.02° squares over Zürich: "West" and "East".
    const BOUNDARIES: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{"qname":"West","qnr":11,"kname":"Kreis 1","knr":1},
         "geometry":{"type":"Polygon","coordinates":[[[8.50,47.35],[8.52,47.35],[8.52,47.37],[8.50,47.37],[8.50,47.35]]]}},
        {"type":"Feature","properties":{"qname":"East","qnr":12,"kname":"Kreis 1","knr":1},
         "geometry":{"type":"Polygon","coordinates":[[[8.52,47.35],[8.54,47.35],[8.54,47.37],[8.52,47.37],[8.52,47.35]]]}}
    ]}"#;

    const POPULATION: &str = "Quartier,Inhabitants\nWest,4000\nEast,1000\n";
    const INCOME: &str = "Quartier,Income_1kCHF\nWest,100.0\nEast,50.0\n";

    /// Four stores inside the squares, one outside, one exact duplicate.
    /// "Denner East" carries a stale source label on purpose.
    const STORES: &str = "lat,lng,group,district,name\n\
        47.36,8.51,migros_group,West,Migros West\n\
        47.36,8.515,competitors,West,Coop West\n\
        47.36,8.515,competitors,West,Coop West\n\
        47.36,8.53,competitors,East,Coop East\n\
        47.355,8.535,competitors,West,Denner East\n\
        47.36,8.70,competitors,,Outside\n";

    fn mini_city() -> CityConfig {
        CityConfig {
            id: "mini".to_string(),
            name: "Mini".to_string(),
            inputs: InputFiles {
                boundaries: "boundaries.json".to_string(),
                population: "population.csv".to_string(),
                income: "income.csv".to_string(),
                stores: "stores.csv".to_string(),
            },
            boundary_fields: BoundaryFieldMapping {
                name: "qname".to_string(),
                number: "qnr".to_string(),
                kreis_name: "kname".to_string(),
                kreis_number: "knr".to_string(),
            },
            population_fields: PopulationFieldMapping {
                name: "Quartier".to_string(),
                inhabitants: "Inhabitants".to_string(),
            },
            income_fields: IncomeFieldMapping {
                name: "Quartier".to_string(),
                income: "Income_1kCHF".to_string(),
            },
            store_fields: StoreFieldMapping {
                name: "name".to_string(),
                category: "group".to_string(),
                lat: "lat".to_string(),
                lon: "lng".to_string(),
                size: None,
                district: Some("district".to_string()),
            },
            crs: CrsConfig {
                geographic: "+proj=longlat +datum=WGS84 +no_defs +type=crs".to_string(),
                projected: "+proj=somerc +lat_0=46.9524055555556 +lon_0=7.43958333333333 \
                            +k_0=1 +x_0=2600000 +y_0=1200000 +ellps=bessel \
                            +towgs84=674.374,15.056,405.346,0,0,0,0 +units=m +no_defs +type=crs"
                    .to_string(),
            },
            weights: WeightConfig::default(),
            view: MapView {
                center_lat: 47.36,
                center_lon: 8.52,
                zoom: 11.0,
                colorscale: "RdYlGn".to_string(),
            },
        }
    }

    fn write_snapshot(dir: &Path) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join("boundaries.json"), BOUNDARIES).unwrap();
        std::fs::write(dir.join("population.csv"), POPULATION).unwrap();
        std::fs::write(dir.join("income.csv"), INCOME).unwrap();
        std::fs::write(dir.join("stores.csv"), STORES).unwrap();
    }

    #[test]
    fn loads_joins_and_aggregates() {
        let tmp = std::env::temp_dir().join("site_index_pipeline_load");
        let _ = std::fs::remove_dir_all(&tmp);
        write_snapshot(&tmp);

        let pipeline = Pipeline::load(mini_city(), &tmp).unwrap();

        assert_eq!(pipeline.quartiers().len(), 2);
        assert_eq!(pipeline.load_stats().matched, 2);
        assert_eq!(pipeline.store_stats().rows, 6);
        assert_eq!(pipeline.store_stats().duplicates, 1);
        assert_eq!(pipeline.store_stats().loaded, 5);
        assert_eq!(pipeline.join_stats().assigned, 4);
        assert_eq!(pipeline.join_stats().outside, 1);
        assert_eq!(pipeline.fingerprint().len(), 64);

        // West: 1 competitor + 1 Migros; East: 2 competitors.
        let raw = pipeline.raw_metrics();
        assert!((raw[0].competition - 1.0).abs() < f64::EPSILON);
        assert!((raw[0].migros_density - 1.0).abs() < f64::EPSILON);
        assert!((raw[1].competition - 2.0).abs() < f64::EPSILON);
        assert!(raw[1].migros_density.abs() < f64::EPSILON);
        assert!(raw[0].density > raw[1].density);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn scores_without_reloading() {
        let tmp = std::env::temp_dir().join("site_index_pipeline_score");
        let _ = std::fs::remove_dir_all(&tmp);
        write_snapshot(&tmp);

        let pipeline = Pipeline::load(mini_city(), &tmp).unwrap();
        let config = WeightConfig::default();

        let weights = WeightVector::constrained(0.5, 0.5, &config).unwrap();
        let outcome = pipeline
            .score(&weights, DegeneratePolicy::Exclude)
            .unwrap();

        assert_eq!(outcome.records.len(), 2);
        assert!(outcome.degenerate.is_empty());
        // West leads on density and income, East is pure competition.
        assert_eq!(outcome.records[0].quartier, "West");
        assert!((outcome.records[0].ai - 0.5).abs() < 1e-12);
        assert!((outcome.records[1].ai + 0.5).abs() < 1e-12);

        // A second pass with different weights changes the scores but
        // never the cached base table.
        let raw_before = pipeline.raw_metrics().to_vec();
        let penalties = WeightVector::constrained(0.0, 0.0, &config).unwrap();
        let second = pipeline
            .score(&penalties, DegeneratePolicy::Exclude)
            .unwrap();
        assert_eq!(pipeline.raw_metrics(), raw_before.as_slice());
        assert_ne!(second.records[0].ai, outcome.records[0].ai);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn identical_snapshots_load_identically() {
        let tmp = std::env::temp_dir().join("site_index_pipeline_idempotent");
        let _ = std::fs::remove_dir_all(&tmp);
        write_snapshot(&tmp);

        let first = Pipeline::load(mini_city(), &tmp).unwrap();
        let second = Pipeline::load(mini_city(), &tmp).unwrap();

        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_eq!(first.raw_metrics(), second.raw_metrics());
        assert_eq!(first.assignments(), second.assignments());

        let config = WeightConfig::default();
        let weights = WeightVector::constrained(0.3, 0.7, &config).unwrap();
        let outcome_a = first.score(&weights, DegeneratePolicy::Exclude).unwrap();
        let outcome_b = second.score(&weights, DegeneratePolicy::Exclude).unwrap();
        assert_eq!(outcome_a.records, outcome_b.records);

        let cache_a = tmp.join("gen_a");
        let cache_b = tmp.join("gen_b");
        let (path_a, _) = first.write_density_cache(&cache_a).unwrap();
        let (path_b, _) = second.write_density_cache(&cache_b).unwrap();
        assert_eq!(
            std::fs::read(path_a).unwrap(),
            std::fs::read(path_b).unwrap()
        );

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_input_aborts_the_load() {
        let tmp = std::env::temp_dir().join("site_index_pipeline_missing");
        let _ = std::fs::remove_dir_all(&tmp);
        write_snapshot(&tmp);
        std::fs::remove_file(tmp.join("income.csv")).unwrap();

        assert!(matches!(
            Pipeline::load(mini_city(), &tmp),
            Err(PipelineError::Io(_))
        ));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn label_mismatches_are_counted_not_acted_on() {
        let stores = vec![
            Store {
                name: "Denner East".to_string(),
                category: StoreCategory::Competitors,
                lon: 8.535,
                lat: 47.355,
                weight: 1.0,
                district_label: Some("West".to_string()),
            },
            Store {
                name: "Coop East".to_string(),
                category: StoreCategory::Competitors,
                lon: 8.53,
                lat: 47.36,
                weight: 1.0,
                district_label: Some("East".to_string()),
            },
            Store {
                name: "Unlabeled".to_string(),
                category: StoreCategory::MigrosGroup,
                lon: 8.51,
                lat: 47.36,
                weight: 1.0,
                district_label: None,
            },
        ];
        let assignments = vec![
            Some("East".to_string()),
            Some("East".to_string()),
            Some("West".to_string()),
        ];

        assert_eq!(check_district_labels(&stores, &assignments), 1);
    }
}

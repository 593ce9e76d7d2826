//! City registry — loads per-city configs from embedded TOML.
//!
//! Each `.toml` file in `packages/pipeline/cities/` is baked into the
//! binary at compile time via [`include_str!`]. A city config names the
//! snapshot input files, the dataset's property/column mappings, the CRS
//! pair, weight bounds, and the frontend map view.

use serde::{Deserialize, Serialize};
use site_index_quartier::{
    BoundaryFieldMapping, CrsConfig, IncomeFieldMapping, PopulationFieldMapping,
};
use site_index_score::WeightConfig;
use site_index_store::StoreFieldMapping;

use crate::PipelineError;

/// TOML configs embedded at compile time.
const CITY_TOMLS: &[(&str, &str)] = &[("zurich", include_str!("../cities/zurich.toml"))];

/// Total number of configured cities (used in tests).
#[cfg(test)]
const EXPECTED_CITY_COUNT: usize = 1;

/// A complete per-city pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CityConfig {
    /// Unique identifier (e.g. `"zurich"`).
    pub id: String,
    /// Human-readable city name.
    pub name: String,
    /// Snapshot input file names, resolved relative to the data directory.
    pub inputs: InputFiles,
    /// GeoJSON property keys on the boundary features.
    pub boundary_fields: BoundaryFieldMapping,
    /// Population CSV column names.
    pub population_fields: PopulationFieldMapping,
    /// Income CSV column names.
    pub income_fields: IncomeFieldMapping,
    /// Store CSV column names.
    pub store_fields: StoreFieldMapping,
    /// Geodetic and metric CRS definitions (PROJ.4 strings).
    pub crs: CrsConfig,
    /// Weight construction bounds.
    #[serde(default)]
    pub weights: WeightConfig,
    /// Frontend map view defaults.
    pub view: MapView,
}

impl CityConfig {
    /// Resolves the four snapshot input paths against `data_dir`, in the
    /// fingerprinting order (boundaries, population, income, stores).
    #[must_use]
    pub fn input_paths(&self, data_dir: &std::path::Path) -> [std::path::PathBuf; 4] {
        [
            data_dir.join(&self.inputs.boundaries),
            data_dir.join(&self.inputs.population),
            data_dir.join(&self.inputs.income),
            data_dir.join(&self.inputs.stores),
        ]
    }
}

/// The four snapshot input files of a city.
#[derive(Debug, Clone, Deserialize)]
pub struct InputFiles {
    /// Boundary `FeatureCollection` (GeoJSON).
    pub boundaries: String,
    /// Population table (CSV).
    pub population: String,
    /// Income table (CSV).
    pub income: String,
    /// Store location table (CSV).
    pub stores: String,
}

/// Map view defaults shipped to the frontend with every payload.
///
/// Deserialized from snake_case TOML config keys; serialized into the
/// camelCase JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct MapView {
    /// Initial map center latitude.
    pub center_lat: f64,
    /// Initial map center longitude.
    pub center_lon: f64,
    /// Initial zoom level.
    pub zoom: f64,
    /// Choropleth colorscale name.
    pub colorscale: String,
}

/// Parses a [`CityConfig`] from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or missing required fields.
pub fn parse_city_toml(toml_str: &str) -> Result<CityConfig, String> {
    toml::de::from_str(toml_str).map_err(|e| e.to_string())
}

/// Returns all configured city pipelines, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if any embedded TOML config is malformed (caught by the registry
/// tests, never at a user's runtime).
#[must_use]
pub fn all_cities() -> Vec<CityConfig> {
    CITY_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_city_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Looks up a city config by its identifier.
///
/// # Errors
///
/// Returns [`PipelineError::UnknownCity`] if no config carries the id.
pub fn find_city(id: &str) -> Result<CityConfig, PipelineError> {
    all_cities()
        .into_iter()
        .find(|city| city.id == id)
        .ok_or_else(|| PipelineError::UnknownCity { id: id.to_string() })
}

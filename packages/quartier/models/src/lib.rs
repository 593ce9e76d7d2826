#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Quartier (statistical district) profile types and the field mappings
//! that describe how to read them from a city's open-data files.
//!
//! The geometry-carrying type lives in `site_index_quartier`; this crate
//! holds the plain serde structs shared across the pipeline.

use serde::{Deserialize, Serialize};

/// Demographic and geometric profile of one Quartier, derived at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuartierProfile {
    /// Quartier name, the unique join key across all inputs (e.g. "Seefeld").
    pub qname: String,
    /// Statistical Quartier number (e.g. 52).
    pub qnr: u32,
    /// Name of the Kreis (city district group) this Quartier belongs to.
    pub kname: String,
    /// Kreis number.
    pub knr: u32,
    /// Inhabitant count from the population table.
    pub inhabitants: u32,
    /// Polygon area in km², computed in the projected (metric) CRS.
    pub area_km2: f64,
    /// Population density, `inhabitants / area_km2`.
    pub density_inh_per_km2: f64,
    /// Average income in thousands of CHF from the income table.
    pub income_1k_chf: f64,
}

/// One row of the derived density cache CSV.
///
/// Column names match the artifact the original pipeline wrote
/// (`qname,qnr,kname,knr,Quartier,Inhabitants,area_km2,density_inh_per_km2`);
/// `Quartier` duplicates `qname` because the upstream join carried both key
/// columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityRow {
    /// Quartier name from the boundary source.
    pub qname: String,
    /// Quartier number.
    pub qnr: u32,
    /// Kreis name.
    pub kname: String,
    /// Kreis number.
    pub knr: u32,
    /// Quartier name from the population source (equal to `qname` post-join).
    #[serde(rename = "Quartier")]
    pub quartier: String,
    /// Inhabitant count.
    #[serde(rename = "Inhabitants")]
    pub inhabitants: u32,
    /// Area in km².
    pub area_km2: f64,
    /// Inhabitants per km².
    pub density_inh_per_km2: f64,
}

impl DensityRow {
    /// Builds a cache row from a loaded profile.
    #[must_use]
    pub fn from_profile(profile: &QuartierProfile) -> Self {
        Self {
            qname: profile.qname.clone(),
            qnr: profile.qnr,
            kname: profile.kname.clone(),
            knr: profile.knr,
            quartier: profile.qname.clone(),
            inhabitants: profile.inhabitants,
            area_km2: profile.area_km2,
            density_inh_per_km2: profile.density_inh_per_km2,
        }
    }
}

/// GeoJSON property keys for extracting Quartier attributes from boundary
/// features, so the loader works against any portal's field naming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryFieldMapping {
    /// Property holding the Quartier name (e.g. `"qname"`).
    pub name: String,
    /// Property holding the Quartier number.
    pub number: String,
    /// Property holding the Kreis name.
    pub kreis_name: String,
    /// Property holding the Kreis number.
    pub kreis_number: String,
}

/// Column names for the population CSV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationFieldMapping {
    /// Column holding the Quartier name (e.g. `"Quartier"`).
    pub name: String,
    /// Column holding the inhabitant count (e.g. `"Inhabitants"`).
    pub inhabitants: String,
}

/// Column names for the income CSV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeFieldMapping {
    /// Column holding the Quartier name.
    pub name: String,
    /// Column holding the income figure in thousands (e.g. `"Income_1kCHF"`).
    pub income: String,
}

/// PROJ.4 definitions for the two coordinate reference systems the loader
/// works in: the geodetic CRS of the input data and the metric CRS used for
/// area computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrsConfig {
    /// Geodetic lon/lat CRS of boundary and store coordinates
    /// (WGS84 for the Zürich open-data extracts).
    pub geographic: String,
    /// Projected metric CRS for areas (EPSG:2056, Swiss LV95, for Zürich).
    pub projected: String,
}

/// Counters from the boundary/demographic join, for logging and sanity
/// checks. Dropped rows are inner-join semantics, not errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadStats {
    /// Boundary features parsed from the GeoJSON.
    pub boundaries: u64,
    /// Quartiers present in boundaries, population, and income.
    pub matched: u64,
    /// Boundary features with no population row (dropped).
    pub unmatched_boundaries: u64,
    /// Population rows with no boundary feature (dropped).
    pub unmatched_population: u64,
    /// Income rows naming no loaded Quartier (dropped).
    pub unmatched_income: u64,
}

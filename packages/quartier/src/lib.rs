#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Quartier boundary and demographic loading.
//!
//! Parses the district boundary `GeoJSON` and the population/income CSVs,
//! inner-joins them on Quartier name, reprojects the polygons to a metric
//! CRS, and derives per-Quartier area and population density. All schema
//! and integrity problems abort the load — downstream stages never see a
//! partial district set.

pub mod boundary;
pub mod demographics;
pub mod profile;
pub mod project;

use thiserror::Error;

pub use boundary::QuartierBoundary;
pub use profile::{Quartier, build_quartiers};
pub use site_index_quartier_models::{
    BoundaryFieldMapping, CrsConfig, DensityRow, IncomeFieldMapping, LoadStats,
    PopulationFieldMapping, QuartierProfile,
};

/// Errors that can occur while loading Quartier data.
#[derive(Debug, Error)]
pub enum QuartierError {
    /// Reading an input file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A CSV input could not be parsed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The boundary file is not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The boundary file parsed, but is not a `FeatureCollection`.
    #[error("boundary file is not a GeoJSON FeatureCollection")]
    NotFeatureCollection,

    /// A boundary feature lacks a configured property.
    #[error("boundary feature {index} is missing property '{property}'")]
    MissingProperty {
        /// Zero-based feature index in the collection.
        index: usize,
        /// The property key that was absent.
        property: String,
    },

    /// A boundary feature carries a property that cannot be interpreted.
    #[error("boundary feature {index} has an unusable '{property}' value")]
    InvalidProperty {
        /// Zero-based feature index in the collection.
        index: usize,
        /// The property key with the bad value.
        property: String,
    },

    /// A boundary feature has no polygonal geometry.
    #[error("boundary feature {index} has no usable polygon geometry")]
    Geometry {
        /// Zero-based feature index in the collection.
        index: usize,
    },

    /// A required column is absent from a CSV input.
    #[error("column '{column}' not found in {table} table")]
    MissingColumn {
        /// Which input table was being read.
        table: &'static str,
        /// The configured column name that was absent.
        column: String,
    },

    /// The same Quartier name appears twice in one input.
    #[error("duplicate Quartier name '{name}' in {input} input")]
    DuplicateQuartier {
        /// The offending name.
        name: String,
        /// Which input contained the duplicate.
        input: &'static str,
    },

    /// A joined Quartier has no income figure.
    #[error("no income figure for Quartier '{name}'")]
    MissingIncome {
        /// The Quartier missing an income row.
        name: String,
    },

    /// Boundary and population inputs share no Quartier names.
    #[error("boundary and population inputs share no Quartier names")]
    EmptyJoin,

    /// A reprojected polygon collapsed to a non-positive area.
    #[error("computed area for Quartier '{name}' is not positive ({area_km2} km2)")]
    NonPositiveArea {
        /// The Quartier whose geometry degenerated.
        name: String,
        /// The computed (bad) area.
        area_km2: f64,
    },

    /// A CRS definition or coordinate transform failed.
    #[error("CRS transform failed: {message}")]
    Projection {
        /// Description of what went wrong.
        message: String,
    },
}

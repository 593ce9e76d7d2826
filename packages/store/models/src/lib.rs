#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Store location and category types.
//!
//! A store is a competitive signal: either a competitor outlet or an
//! own-brand (Migros group) outlet. Both categories feed the scorer with
//! opposite-signed metrics.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Competitive category of a store.
///
/// The string forms match the labels used in the store dataset
/// (`competitors`, `migros_group`).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StoreCategory {
    /// Outlet operated by a competing retailer.
    Competitors,
    /// Outlet operated by the Migros group itself.
    MigrosGroup,
}

impl StoreCategory {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Competitors, Self::MigrosGroup]
    }
}

/// A single store location in geodetic lon/lat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    /// Store name as published in the dataset.
    pub name: String,
    /// Competitive category.
    pub category: StoreCategory,
    /// Longitude in degrees (WGS84).
    pub lon: f64,
    /// Latitude in degrees (WGS84).
    pub lat: f64,
    /// Aggregation weight. `1.0` unless the dataset carries a size column,
    /// so that summing weights reproduces a plain store count.
    pub weight: f64,
    /// District attribution as published by the data source. Diagnostic
    /// only; the spatial join decides the actual assignment.
    pub district_label: Option<String>,
}

/// Column names for the store CSV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreFieldMapping {
    /// Store name column.
    pub name: String,
    /// Category column (values must parse as [`StoreCategory`]).
    pub category: String,
    /// Latitude column.
    pub lat: String,
    /// Longitude column.
    pub lon: String,
    /// Optional size/weight column. `None` means every store weighs `1.0`.
    pub size: Option<String>,
    /// Optional source-provided district column.
    pub district: Option<String>,
}

/// Counters describing one store table load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreLoadStats {
    /// Rows in the input table.
    pub rows: u64,
    /// Stores that survived validation and deduplication.
    pub loaded: u64,
    /// Rows skipped for missing, zero, or out-of-range coordinates.
    pub skipped_coordinates: u64,
    /// Exact duplicates (name + coordinates) dropped.
    pub duplicates: u64,
}

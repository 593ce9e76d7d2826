//! Boundary `GeoJSON` parsing.
//!
//! Extracts one [`QuartierBoundary`] per feature using the configured
//! property keys, so the loader works against any portal's field naming.
//! Unlike the skip-and-warn fetchers for remote data, boundary parsing is
//! strict: the district set is the backbone of every later stage, so a
//! malformed feature aborts the load.

use std::collections::BTreeSet;
use std::path::Path;

use geo::MultiPolygon;
use geojson::{GeoJson, JsonObject, JsonValue};
use site_index_quartier_models::BoundaryFieldMapping;

use crate::QuartierError;

/// A named Quartier polygon as read from the boundary file, before any
/// demographic join. Geometry is in the source (geodetic) CRS.
#[derive(Debug, Clone)]
pub struct QuartierBoundary {
    /// Quartier name (unique join key).
    pub qname: String,
    /// Quartier number.
    pub qnr: u32,
    /// Kreis name.
    pub kname: String,
    /// Kreis number.
    pub knr: u32,
    /// Polygon geometry in lon/lat.
    pub geometry: MultiPolygon<f64>,
}

/// Reads and parses the boundary file at `path`.
///
/// # Errors
///
/// Returns [`QuartierError`] if the file cannot be read or parsed.
pub fn read_boundaries(
    path: &Path,
    fields: &BoundaryFieldMapping,
) -> Result<Vec<QuartierBoundary>, QuartierError> {
    let raw = std::fs::read_to_string(path)?;
    parse_boundaries(&raw, fields)
}

/// Parses a `GeoJSON` `FeatureCollection` into Quartier boundaries.
///
/// Feature order is preserved; it defines the canonical Quartier order for
/// the rest of the pipeline (including ranking tie-breaks).
///
/// # Errors
///
/// Returns [`QuartierError`] if the input is not a `FeatureCollection`, a
/// feature lacks a configured property, a geometry is not polygonal, or a
/// Quartier name repeats.
pub fn parse_boundaries(
    raw: &str,
    fields: &BoundaryFieldMapping,
) -> Result<Vec<QuartierBoundary>, QuartierError> {
    let geojson: GeoJson = raw.parse()?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(QuartierError::NotFeatureCollection);
    };

    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut boundaries = Vec::with_capacity(collection.features.len());

    for (index, feature) in collection.features.into_iter().enumerate() {
        let props = feature.properties.as_ref();

        let qname = string_property(props, &fields.name, index)?;
        let qnr = numeric_property(props, &fields.number, index)?;
        let kname = string_property(props, &fields.kreis_name, index)?;
        let knr = numeric_property(props, &fields.kreis_number, index)?;

        let geometry = feature
            .geometry
            .and_then(to_multi_polygon)
            .ok_or(QuartierError::Geometry { index })?;

        if !seen.insert(qname.clone()) {
            return Err(QuartierError::DuplicateQuartier {
                name: qname,
                input: "boundary",
            });
        }

        boundaries.push(QuartierBoundary {
            qname,
            qnr,
            kname,
            knr,
            geometry,
        });
    }

    log::info!("Parsed {} Quartier boundaries", boundaries.len());
    Ok(boundaries)
}

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`], accepting both
/// `Polygon` and `MultiPolygon` types.
fn to_multi_polygon(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

fn string_property(
    props: Option<&JsonObject>,
    key: &str,
    index: usize,
) -> Result<String, QuartierError> {
    let value = props
        .and_then(|p| p.get(key))
        .ok_or_else(|| QuartierError::MissingProperty {
            index,
            property: key.to_string(),
        })?;

    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| QuartierError::InvalidProperty {
            index,
            property: key.to_string(),
        })
}

/// Reads a numeric property, tolerating portals that encode numbers as
/// strings (e.g. `"052"`).
fn numeric_property(
    props: Option<&JsonObject>,
    key: &str,
    index: usize,
) -> Result<u32, QuartierError> {
    let value = props
        .and_then(|p| p.get(key))
        .ok_or_else(|| QuartierError::MissingProperty {
            index,
            property: key.to_string(),
        })?;

    let parsed = match value {
        JsonValue::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        JsonValue::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };

    parsed.ok_or_else(|| QuartierError::InvalidProperty {
        index,
        property: key.to_string(),
    })
}

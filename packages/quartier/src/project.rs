//! CRS reprojection and area computation.
//!
//! Areas in geodetic degrees are meaningless, so polygons are transformed
//! into the city's projected metric CRS (EPSG:2056 Swiss LV95 for Zürich)
//! before measuring. PROJ.4 strings come from the city config; geographic
//! input is converted degrees → radians before the transform, output is in
//! meters.

use geo::{Area, Coord, MapCoords, MultiPolygon};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;
use site_index_quartier_models::CrsConfig;

use crate::QuartierError;

/// Square meters per km².
const M2_PER_KM2: f64 = 1_000_000.0;

/// Reprojects a lon/lat polygon into the configured metric CRS.
///
/// # Errors
///
/// Returns [`QuartierError::Projection`] if a PROJ.4 string is invalid or
/// a coordinate cannot be transformed.
pub fn to_metric(
    geometry: &MultiPolygon<f64>,
    crs: &CrsConfig,
) -> Result<MultiPolygon<f64>, QuartierError> {
    let from = parse_proj(&crs.geographic)?;
    let to = parse_proj(&crs.projected)?;

    geometry.try_map_coords(|coord: Coord<f64>| {
        let mut point = (coord.x.to_radians(), coord.y.to_radians(), 0.0);
        transform(&from, &to, &mut point).map_err(|e| QuartierError::Projection {
            message: format!("({}, {}): {e}", coord.x, coord.y),
        })?;
        Ok(Coord {
            x: point.0,
            y: point.1,
        })
    })
}

/// Planar area of an already-projected polygon, in km².
#[must_use]
pub fn area_km2(projected: &MultiPolygon<f64>) -> f64 {
    projected.unsigned_area() / M2_PER_KM2
}

fn parse_proj(definition: &str) -> Result<Proj, QuartierError> {
    Proj::from_proj_string(definition).map_err(|e| QuartierError::Projection {
        message: format!("bad PROJ.4 string '{definition}': {e}"),
    })
}

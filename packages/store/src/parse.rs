//! Store CSV parsing and validation.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use site_index_store_models::{Store, StoreCategory, StoreFieldMapping, StoreLoadStats};

use crate::StoreError;

/// Reads the store CSV at `path`.
///
/// # Errors
///
/// Returns [`StoreError`] if the file cannot be read or parsed.
pub fn read_stores(
    path: &Path,
    fields: &StoreFieldMapping,
) -> Result<(Vec<Store>, StoreLoadStats), StoreError> {
    parse_stores(std::fs::File::open(path)?, fields)
}

/// Parses store rows from a CSV reader.
///
/// Rows with missing, zero, non-finite, or out-of-range coordinates are
/// skipped with a warning. Exact duplicates (same name and coordinates)
/// after the first occurrence are dropped. Input order is preserved.
///
/// # Errors
///
/// Returns [`StoreError::MissingColumn`] if a configured column is absent,
/// [`StoreError::UnknownCategory`] for an unrecognized category label, and
/// [`StoreError::InvalidWeight`] for an unusable size value.
pub fn parse_stores(
    reader: impl Read,
    fields: &StoreFieldMapping,
) -> Result<(Vec<Store>, StoreLoadStats), StoreError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let name_idx = column_index(&headers, &fields.name)?;
    let category_idx = column_index(&headers, &fields.category)?;
    let lat_idx = column_index(&headers, &fields.lat)?;
    let lon_idx = column_index(&headers, &fields.lon)?;
    let size_idx = fields
        .size
        .as_deref()
        .map(|column| column_index(&headers, column))
        .transpose()?;
    let district_idx = fields
        .district
        .as_deref()
        .map(|column| column_index(&headers, column))
        .transpose()?;

    let mut stats = StoreLoadStats::default();
    let mut seen: BTreeSet<(String, u64, u64)> = BTreeSet::new();
    let mut stores = Vec::new();

    for (index, record) in rdr.records().enumerate() {
        let record = record?;
        stats.rows += 1;

        let name = cell(&record, name_idx).unwrap_or_default();

        let raw_category = cell(&record, category_idx).unwrap_or_default();
        let Ok(category) = raw_category.parse::<StoreCategory>() else {
            return Err(StoreError::UnknownCategory {
                index,
                value: raw_category,
            });
        };

        let Some((lon, lat)) = parse_lon_lat(cell(&record, lon_idx), cell(&record, lat_idx))
        else {
            log::warn!("Skipping store row {index} ('{name}'): unusable coordinates");
            stats.skipped_coordinates += 1;
            continue;
        };

        let weight = match size_idx.and_then(|idx| cell(&record, idx)) {
            None => 1.0,
            Some(raw) => match raw.parse::<f64>() {
                Ok(value) if value.is_finite() && value >= 0.0 => value,
                _ => {
                    return Err(StoreError::InvalidWeight { index, value: raw });
                }
            },
        };

        if !seen.insert((name.clone(), lon.to_bits(), lat.to_bits())) {
            log::debug!("Dropping duplicate store row {index} ('{name}')");
            stats.duplicates += 1;
            continue;
        }

        stores.push(Store {
            name,
            category,
            lon,
            lat,
            weight,
            district_label: district_idx.and_then(|idx| cell(&record, idx)),
        });
    }

    stats.loaded = stores.len() as u64;
    log::info!(
        "Loaded {} of {} store rows ({} bad coordinates, {} duplicates)",
        stats.loaded,
        stats.rows,
        stats.skipped_coordinates,
        stats.duplicates
    );

    Ok((stores, stats))
}

/// Parses lon/lat from optional cells. Returns `None` if either is
/// missing, unparseable, zero, non-finite, or outside valid ranges.
fn parse_lon_lat(lon: Option<String>, lat: Option<String>) -> Option<(f64, f64)> {
    let longitude = lon?.parse::<f64>().ok()?;
    let latitude = lat?.parse::<f64>().ok()?;
    if longitude == 0.0 || latitude == 0.0 {
        return None;
    }
    if !longitude.is_finite() || !latitude.is_finite() {
        return None;
    }
    if !(-180.0..=180.0).contains(&longitude) || !(-90.0..=90.0).contains(&latitude) {
        return None;
    }
    Some((longitude, latitude))
}

/// Resolves a configured column name to its index in the header record.
fn column_index(headers: &StringRecord, column: &str) -> Result<usize, StoreError> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| StoreError::MissingColumn {
            column: column.to_string(),
        })
}

/// Returns the trimmed, non-empty cell at `idx`, if any.
fn cell(record: &StringRecord, idx: usize) -> Option<String> {
    record
        .get(idx)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

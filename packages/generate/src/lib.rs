#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Map payload artifact generation.
//!
//! Bundles one scored snapshot into the JSON artifact the map frontend
//! renders from: a choropleth `FeatureCollection` keyed by Quartier name,
//! the store marker list, the ranked district table, and the city's view
//! defaults. The payload is built from a single [`Pipeline`] snapshot and
//! one [`ScoreOutcome`], so geometry, markers, and scores can never drift
//! apart within an artifact.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};
use serde::Serialize;
use site_index_pipeline::{MapView, Pipeline, ScoreOutcome};
use site_index_quartier::Quartier;
use site_index_score::{ScoreRecord, WeightVector};
use site_index_store_models::{Store, StoreCategory};

/// Errors produced while writing the payload artifact.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// Creating the output directory or writing the file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The payload could not be serialized.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Artifact metadata stamped into every payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadMeta {
    /// City id the payload was generated for.
    pub city: String,
    /// Generation timestamp (RFC 3339).
    pub generated_at: DateTime<Utc>,
    /// Snapshot fingerprint, so the frontend can detect stale payloads.
    pub fingerprint: String,
    /// The weights the table was ranked with.
    pub weights: WeightVector,
    /// Metric columns excluded as degenerate, if any.
    pub degenerate_metrics: Vec<String>,
}

/// One store marker for the scatter overlay.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreMarker {
    /// Store display name.
    pub name: String,
    /// Competitive category (drives marker color).
    pub category: StoreCategory,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Quartier the spatial join assigned, `null` for stores outside every
    /// district (still drawn, just unattributed).
    pub quartier: Option<String>,
}

/// One row of the ranked district table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    /// 1-based rank, best district first.
    pub rank: usize,
    /// Quartier name.
    pub quartier: String,
    /// Attractiveness index.
    pub ai: f64,
    /// Raw population density (inhabitants/km²).
    pub density: f64,
    /// Raw income (thousands of CHF).
    pub income: f64,
    /// Summed competitor store weight.
    pub competition: f64,
    /// Summed own-brand store weight.
    pub migros_density: f64,
}

/// The complete frontend artifact.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapPayload {
    /// Generation metadata.
    pub meta: PayloadMeta,
    /// One feature per Quartier with score properties and a hover string.
    pub choropleth: FeatureCollection,
    /// Store markers with their joined Quartier.
    pub stores: Vec<StoreMarker>,
    /// Ranked district table, best first.
    pub table: Vec<TableRow>,
    /// Map center/zoom/colorscale defaults from the city config.
    pub view: MapView,
}

/// Assembles the payload for one scored snapshot.
#[must_use]
pub fn build_payload(
    pipeline: &Pipeline,
    outcome: &ScoreOutcome,
    generated_at: DateTime<Utc>,
) -> MapPayload {
    let meta = PayloadMeta {
        city: pipeline.city().id.clone(),
        generated_at,
        fingerprint: pipeline.fingerprint().to_string(),
        weights: outcome.weights,
        degenerate_metrics: outcome.degenerate.iter().map(ToString::to_string).collect(),
    };

    let payload = MapPayload {
        meta,
        choropleth: choropleth(pipeline.quartiers(), &outcome.records),
        stores: store_markers(pipeline.stores(), pipeline.assignments()),
        table: ranked_table(&outcome.records),
        view: pipeline.city().view.clone(),
    };

    log::info!(
        "Built map payload: {} districts, {} store markers",
        payload.table.len(),
        payload.stores.len()
    );
    payload
}

/// Serializes the payload as pretty-printed JSON at `path`, creating
/// parent directories as needed.
///
/// # Errors
///
/// Returns [`GenerateError`] if serialization or the write fails.
pub fn write_payload(path: &Path, payload: &MapPayload) -> Result<(), GenerateError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec_pretty(payload)?;
    std::fs::write(path, json)?;

    log::info!("Wrote map payload: {}", path.display());
    Ok(())
}

/// Default artifact path for a city: `<data_dir>/generated/<city>_map.json`,
/// next to the density cache.
#[must_use]
pub fn default_payload_path(data_dir: &Path, city_id: &str) -> PathBuf {
    data_dir.join("generated").join(format!("{city_id}_map.json"))
}

/// Builds the choropleth collection: one feature per Quartier in boundary
/// order, carrying the score, the raw metrics for tooltips, and a
/// preformatted hover string.
fn choropleth(quartiers: &[Quartier], records: &[ScoreRecord]) -> FeatureCollection {
    let by_name: BTreeMap<&str, &ScoreRecord> = records
        .iter()
        .map(|record| (record.quartier.as_str(), record))
        .collect();

    let mut features = Vec::with_capacity(quartiers.len());
    for quartier in quartiers {
        let Some(record) = by_name.get(quartier.profile.qname.as_str()) else {
            log::warn!("No score record for Quartier '{}'", quartier.profile.qname);
            continue;
        };

        let mut properties = JsonObject::new();
        properties.insert(
            "qname".to_string(),
            JsonValue::from(record.quartier.as_str()),
        );
        properties.insert("ai".to_string(), JsonValue::from(record.ai));
        properties.insert("density".to_string(), JsonValue::from(record.raw.density));
        properties.insert("income".to_string(), JsonValue::from(record.raw.income));
        properties.insert(
            "competition".to_string(),
            JsonValue::from(record.raw.competition),
        );
        properties.insert(
            "migrosDensity".to_string(),
            JsonValue::from(record.raw.migros_density),
        );
        properties.insert("hover".to_string(), JsonValue::from(hover_text(record)));

        features.push(Feature {
            bbox: None,
            geometry: Some(Geometry::new(geojson::Value::from(&quartier.geometry))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        });
    }

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Pairs every store with its spatial join assignment.
fn store_markers(stores: &[Store], assignments: &[Option<String>]) -> Vec<StoreMarker> {
    stores
        .iter()
        .zip(assignments)
        .map(|(store, assignment)| StoreMarker {
            name: store.name.clone(),
            category: store.category,
            lat: store.lat,
            lon: store.lon,
            quartier: assignment.clone(),
        })
        .collect()
}

/// Numbers the ranked records from 1.
fn ranked_table(records: &[ScoreRecord]) -> Vec<TableRow> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| TableRow {
            rank: index + 1,
            quartier: record.quartier.clone(),
            ai: record.ai,
            density: record.raw.density,
            income: record.raw.income,
            competition: record.raw.competition,
            migros_density: record.raw.migros_density,
        })
        .collect()
}

/// Tooltip text for one district: name in bold, AI to three decimals,
/// density as a grouped whole number, income to one decimal, store sums as
/// whole counts.
fn hover_text(record: &ScoreRecord) -> String {
    format!(
        "<b>{}</b><br>AI: {:.3}<br>Density: {}/km²<br>Income: {:.1}k CHF<br>\
         Competitors: {:.0}<br>Migros: {:.0}",
        record.quartier,
        record.ai,
        group_thousands(record.raw.density),
        record.raw.income,
        record.raw.competition.trunc(),
        record.raw.migros_density.trunc(),
    )
}

/// Formats a value as a whole number with `,` thousands separators
/// (`12345.6` → `"12,346"`).
fn group_thousands(value: f64) -> String {
    let formatted = format!("{value:.0}");
    let (sign, digits) = formatted
        .strip_prefix('-')
        .map_or(("", formatted.as_str()), |rest| ("-", rest));

    let mut grouped = String::with_capacity(sign.len() + digits.len() + digits.len() / 3);
    grouped.push_str(sign);
    for (index, c) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use geo::{MultiPolygon, polygon};
    use site_index_quartier::QuartierProfile;
    use site_index_score::{MetricVector, WeightConfig};

    use super::*;

    fn record(quartier: &str, ai: f64, raw: MetricVector) -> ScoreRecord {
        ScoreRecord {
            quartier: quartier.to_string(),
            raw,
            norm: MetricVector::default(),
            ai,
        }
    }

    fn quartier(qname: &str) -> Quartier {
        Quartier {
            profile: QuartierProfile {
                qname: qname.to_string(),
                qnr: 52,
                kname: "Kreis 8".to_string(),
                knr: 8,
                inhabitants: 3540,
                area_km2: 1.2,
                density_inh_per_km2: 2950.0,
                income_1k_chf: 102.3,
            },
            geometry: MultiPolygon(vec![polygon![
                (x: 8.53, y: 47.37),
                (x: 8.54, y: 47.37),
                (x: 8.54, y: 47.38),
                (x: 8.53, y: 47.38),
                (x: 8.53, y: 47.37),
            ]]),
        }
    }

    #[test]
    fn groups_thousands() {
        assert_eq!(group_thousands(0.0), "0");
        assert_eq!(group_thousands(999.0), "999");
        assert_eq!(group_thousands(1000.0), "1,000");
        assert_eq!(group_thousands(12345.6), "12,346");
        assert_eq!(group_thousands(1_234_567.0), "1,234,567");
    }

    #[test]
    fn payload_path_sits_next_to_the_density_cache() {
        assert_eq!(
            default_payload_path(Path::new("data"), "zurich"),
            Path::new("data/generated/zurich_map.json")
        );
    }

    #[test]
    fn hover_matches_the_tooltip_template() {
        let rec = record(
            "Seefeld",
            0.4128,
            MetricVector {
                density: 2950.4,
                income: 102.34,
                competition: 3.0,
                migros_density: 2.0,
            },
        );

        assert_eq!(
            hover_text(&rec),
            "<b>Seefeld</b><br>AI: 0.413<br>Density: 2,950/km²<br>\
             Income: 102.3k CHF<br>Competitors: 3<br>Migros: 2"
        );
    }

    #[test]
    fn choropleth_carries_score_properties_and_geometry() {
        let quartiers = vec![quartier("Seefeld")];
        let records = vec![record(
            "Seefeld",
            0.5,
            MetricVector {
                density: 2950.0,
                income: 102.3,
                competition: 3.0,
                migros_density: 2.0,
            },
        )];

        let collection = choropleth(&quartiers, &records);
        assert_eq!(collection.features.len(), 1);

        let feature = &collection.features[0];
        let properties = feature.properties.as_ref().unwrap();
        assert_eq!(properties["qname"], JsonValue::from("Seefeld"));
        assert_eq!(properties["ai"], JsonValue::from(0.5));
        assert!(properties["hover"].as_str().unwrap().contains("<b>Seefeld</b>"));
        assert!(matches!(
            feature.geometry.as_ref().unwrap().value,
            geojson::Value::MultiPolygon(_)
        ));
    }

    #[test]
    fn choropleth_keeps_boundary_order_not_rank_order() {
        let quartiers = vec![quartier("Seefeld"), quartier("Rathaus")];
        // Ranked the other way around.
        let records = vec![
            record("Rathaus", 0.9, MetricVector::default()),
            record("Seefeld", 0.1, MetricVector::default()),
        ];

        let collection = choropleth(&quartiers, &records);
        let names: Vec<&str> = collection
            .features
            .iter()
            .map(|f| f.properties.as_ref().unwrap()["qname"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Seefeld", "Rathaus"]);
    }

    #[test]
    fn markers_keep_unassigned_stores() {
        let stores = vec![
            Store {
                name: "Migros Seefeld".to_string(),
                category: StoreCategory::MigrosGroup,
                lon: 8.55,
                lat: 47.3668,
                weight: 1.0,
                district_label: None,
            },
            Store {
                name: "Coop Airport".to_string(),
                category: StoreCategory::Competitors,
                lon: 8.56,
                lat: 47.45,
                weight: 1.0,
                district_label: None,
            },
        ];
        let assignments = vec![Some("Seefeld".to_string()), None];

        let markers = store_markers(&stores, &assignments);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].quartier.as_deref(), Some("Seefeld"));
        assert_eq!(markers[1].quartier, None);

        let json = serde_json::to_value(&markers).unwrap();
        assert_eq!(json[0]["category"], "migros_group");
        assert_eq!(json[1]["quartier"], JsonValue::Null);
    }

    #[test]
    fn table_ranks_from_one() {
        let records = vec![
            record("First", 0.8, MetricVector::default()),
            record("Second", 0.3, MetricVector::default()),
        ];

        let table = ranked_table(&records);
        assert_eq!(table[0].rank, 1);
        assert_eq!(table[0].quartier, "First");
        assert_eq!(table[1].rank, 2);
    }

    #[test]
    fn payload_serializes_with_camel_case_keys() {
        let config = WeightConfig::default();
        let payload = MapPayload {
            meta: PayloadMeta {
                city: "zurich".to_string(),
                generated_at: DateTime::from_timestamp(1_755_000_000, 0).unwrap(),
                fingerprint: "abc123".to_string(),
                weights: WeightVector::constrained(0.5, 0.5, &config).unwrap(),
                degenerate_metrics: vec![],
            },
            choropleth: choropleth(
                &[quartier("Seefeld")],
                &[record("Seefeld", 0.5, MetricVector::default())],
            ),
            stores: vec![],
            table: ranked_table(&[record("Seefeld", 0.5, MetricVector::default())]),
            view: MapView {
                center_lat: 47.373,
                center_lon: 8.539,
                zoom: 11.25,
                colorscale: "RdYlGn".to_string(),
            },
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["meta"]["city"], "zurich");
        assert_eq!(json["meta"]["generatedAt"], "2025-08-12T12:00:00Z");
        assert_eq!(json["meta"]["weights"]["w1"], 0.5);
        assert_eq!(json["meta"]["weights"]["mode"], "constrained");
        assert_eq!(json["choropleth"]["type"], "FeatureCollection");
        assert_eq!(json["table"][0]["rank"], 1);
        assert_eq!(json["view"]["centerLat"], 47.373);
        assert_eq!(json["view"]["colorscale"], "RdYlGn");

        // Determinism: the same payload always serializes identically.
        assert_eq!(
            serde_json::to_string(&payload).unwrap(),
            serde_json::to_string(&payload).unwrap()
        );
    }
}

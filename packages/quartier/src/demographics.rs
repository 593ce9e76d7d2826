//! Population and income CSV parsing.
//!
//! Column names come from the city config rather than struct-level serde
//! renames, so the same reader handles any portal's header naming. Rows
//! with unparseable values are skipped with a warning; a missing column or
//! a duplicated Quartier name aborts the load.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use site_index_quartier_models::{IncomeFieldMapping, PopulationFieldMapping};

use crate::QuartierError;

/// One row of the population table.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationRow {
    /// Quartier name (join key).
    pub name: String,
    /// Inhabitant count.
    pub inhabitants: u32,
}

/// One row of the income table.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomeRow {
    /// Quartier name (join key).
    pub name: String,
    /// Income figure in thousands of CHF.
    pub income_1k_chf: f64,
}

/// Reads the population CSV at `path`.
///
/// # Errors
///
/// Returns [`QuartierError`] if the file cannot be read or parsed.
pub fn read_population(
    path: &Path,
    fields: &PopulationFieldMapping,
) -> Result<Vec<PopulationRow>, QuartierError> {
    parse_population(std::fs::File::open(path)?, fields)
}

/// Parses population rows from a CSV reader.
///
/// # Errors
///
/// Returns [`QuartierError::MissingColumn`] if a configured column is
/// absent and [`QuartierError::DuplicateQuartier`] if a name repeats.
pub fn parse_population(
    reader: impl Read,
    fields: &PopulationFieldMapping,
) -> Result<Vec<PopulationRow>, QuartierError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let name_idx = column_index(&headers, &fields.name, "population")?;
    let count_idx = column_index(&headers, &fields.inhabitants, "population")?;

    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut rows = Vec::new();

    for record in rdr.records() {
        let record = record?;
        let Some(name) = cell(&record, name_idx) else {
            continue;
        };
        let Some(inhabitants) = cell(&record, count_idx).and_then(|v| v.parse::<u32>().ok())
        else {
            log::warn!("Skipping population row for '{name}': unparseable count");
            continue;
        };

        if !seen.insert(name.clone()) {
            return Err(QuartierError::DuplicateQuartier {
                name,
                input: "population",
            });
        }
        rows.push(PopulationRow { name, inhabitants });
    }

    log::info!("Parsed {} population rows", rows.len());
    Ok(rows)
}

/// Reads the income CSV at `path`.
///
/// # Errors
///
/// Returns [`QuartierError`] if the file cannot be read or parsed.
pub fn read_income(
    path: &Path,
    fields: &IncomeFieldMapping,
) -> Result<Vec<IncomeRow>, QuartierError> {
    parse_income(std::fs::File::open(path)?, fields)
}

/// Parses income rows from a CSV reader.
///
/// # Errors
///
/// Returns [`QuartierError::MissingColumn`] if a configured column is
/// absent and [`QuartierError::DuplicateQuartier`] if a name repeats.
pub fn parse_income(
    reader: impl Read,
    fields: &IncomeFieldMapping,
) -> Result<Vec<IncomeRow>, QuartierError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let name_idx = column_index(&headers, &fields.name, "income")?;
    let income_idx = column_index(&headers, &fields.income, "income")?;

    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut rows = Vec::new();

    for record in rdr.records() {
        let record = record?;
        let Some(name) = cell(&record, name_idx) else {
            continue;
        };
        let Some(income_1k_chf) = cell(&record, income_idx)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
        else {
            log::warn!("Skipping income row for '{name}': unparseable figure");
            continue;
        };

        if !seen.insert(name.clone()) {
            return Err(QuartierError::DuplicateQuartier {
                name,
                input: "income",
            });
        }
        rows.push(IncomeRow {
            name,
            income_1k_chf,
        });
    }

    log::info!("Parsed {} income rows", rows.len());
    Ok(rows)
}

/// Resolves a configured column name to its index in the header record.
fn column_index(
    headers: &StringRecord,
    column: &str,
    table: &'static str,
) -> Result<usize, QuartierError> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| QuartierError::MissingColumn {
            table,
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

#[cfg(test)]
mod tests {
    use super::*;

    fn population_fields() -> PopulationFieldMapping {
        PopulationFieldMapping {
            name: "Quartier".to_string(),
            inhabitants: "Inhabitants".to_string(),
        }
    }

    fn income_fields() -> IncomeFieldMapping {
        IncomeFieldMapping {
            name: "Quartier".to_string(),
            income: "Income_1kCHF".to_string(),
        }
    }

    #[test]
    fn parses_population_rows() {
        let csv = "Quartier,Inhabitants\nRathaus,3218\nLindenhof,985\n";
        let rows = parse_population(csv.as_bytes(), &population_fields()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Rathaus");
        assert_eq!(rows[0].inhabitants, 3218);
    }

    #[test]
    fn population_missing_column_is_fatal() {
        let csv = "Name,Count\nRathaus,3218\n";
        let err = parse_population(csv.as_bytes(), &population_fields()).unwrap_err();
        assert!(matches!(
            err,
            QuartierError::MissingColumn { table: "population", ref column } if column == "Quartier"
        ));
    }

    #[test]
    fn population_duplicate_name_is_fatal() {
        let csv = "Quartier,Inhabitants\nRathaus,3218\nRathaus,12\n";
        let err = parse_population(csv.as_bytes(), &population_fields()).unwrap_err();
        assert!(matches!(err, QuartierError::DuplicateQuartier { input: "population", .. }));
    }

    #[test]
    fn unparseable_count_is_skipped() {
        let csv = "Quartier,Inhabitants\nRathaus,n/a\nLindenhof,985\n";
        let rows = parse_population(csv.as_bytes(), &population_fields()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Lindenhof");
    }

    #[test]
    fn parses_income_with_extra_columns() {
        let csv = "Quartier,Year,Income_1kCHF\nRathaus,2024,85.5\n";
        let rows = parse_income(csv.as_bytes(), &income_fields()).unwrap();
        assert_eq!(rows.len(), 1);
        assert!((rows[0].income_1k_chf - 85.5).abs() < f64::EPSILON);
    }

    #[test]
    fn non_finite_income_is_skipped() {
        let csv = "Quartier,Income_1kCHF\nRathaus,NaN\nLindenhof,92.1\n";
        let rows = parse_income(csv.as_bytes(), &income_fields()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Lindenhof");
    }
}

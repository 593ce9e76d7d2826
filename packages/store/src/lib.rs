#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Store table loading.
//!
//! Reads the store location CSV, validates coordinates, parses the
//! competitive category, and drops exact duplicates. Rows with unusable
//! coordinates are skipped with a warning; an unknown category value or a
//! missing configured column aborts the load, since either means the
//! column mapping no longer matches the dataset.

pub mod parse;

pub use parse::{parse_stores, read_stores};
pub use site_index_store_models::{Store, StoreCategory, StoreFieldMapping, StoreLoadStats};

/// Errors produced while loading the store table.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An underlying I/O operation failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The CSV could not be parsed.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// A configured column is absent from the header row.
    #[error("store table is missing column '{column}'")]
    MissingColumn {
        /// The configured column name.
        column: String,
    },
    /// A category cell does not match any known [`StoreCategory`] label.
    #[error("store row {index} has unknown category '{value}'")]
    UnknownCategory {
        /// Zero-based record index.
        index: usize,
        /// The offending cell value.
        value: String,
    },
    /// A size cell is not a finite, non-negative number.
    #[error("store row {index} has invalid size '{value}'")]
    InvalidWeight {
        /// Zero-based record index.
        index: usize,
        /// The offending cell value.
        value: String,
    },
}

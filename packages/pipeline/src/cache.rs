//! Density cache artifact.
//!
//! The per-Quartier area/density table is the hand-off between the load
//! stage and everything downstream, written as CSV so inspection and
//! diffing stay trivial. A fingerprint sidecar records which snapshot the
//! cache was derived from; a matching sidecar skips the rewrite. The CSV
//! bytes are a pure function of the loaded Quartier set, so identical
//! snapshots produce identical artifacts.

use std::path::{Path, PathBuf};

use site_index_quartier::{DensityRow, Quartier};

use crate::PipelineError;

/// File name of the density cache artifact.
pub const DENSITY_CACHE_FILE: &str = "quartier_density.csv";

/// File name of the fingerprint sidecar guarding the cache.
const FINGERPRINT_FILE: &str = "quartier_density.fingerprint";

/// Writes the density cache CSV under `dir` unless an up-to-date one is
/// already present.
///
/// Returns the artifact path and whether it was (re)written.
///
/// # Errors
///
/// Returns [`PipelineError`] if the directory cannot be created or a file
/// cannot be written.
pub fn write_density_cache(
    dir: &Path,
    quartiers: &[Quartier],
    fingerprint: &str,
) -> Result<(PathBuf, bool), PipelineError> {
    std::fs::create_dir_all(dir)?;
    let csv_path = dir.join(DENSITY_CACHE_FILE);
    let sidecar_path = dir.join(FINGERPRINT_FILE);

    if csv_path.is_file()
        && std::fs::read_to_string(&sidecar_path).is_ok_and(|cached| cached.trim() == fingerprint)
    {
        log::info!("Density cache up to date: {}", csv_path.display());
        return Ok((csv_path, false));
    }

    let mut bytes = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut bytes);
        for quartier in quartiers {
            writer.serialize(DensityRow::from_profile(&quartier.profile))?;
        }
        writer.flush()?;
    }

    std::fs::write(&csv_path, &bytes)?;
    std::fs::write(&sidecar_path, fingerprint)?;

    log::info!(
        "Wrote density cache for {} Quartiere: {}",
        quartiers.len(),
        csv_path.display()
    );
    Ok((csv_path, true))
}

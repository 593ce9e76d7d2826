#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the district attractiveness pipeline.
//!
//! Provides subcommands for loading a snapshot and writing the density
//! cache (`pipeline`), scoring a snapshot under chosen weights and printing
//! the ranked district table (`score`), and writing the frontend map
//! payload (`generate`).

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use site_index_pipeline::{CityConfig, Pipeline, ScoreOutcome};
use site_index_score::{DegeneratePolicy, WeightMode, WeightVector};

// ---------------------------------------------------------------------------
// CLI definitions
// ---------------------------------------------------------------------------

/// Score retail site attractiveness across city districts.
#[derive(Parser)]
#[command(name = "site_index_cli")]
#[command(about = "Retail site attractiveness scoring for city districts")]
struct Cli {
    /// Directory holding the snapshot input files.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// City to load from the embedded registry.
    #[arg(long, default_value = "zurich")]
    city: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Load the snapshot, join stores to districts, and write the density
    /// cache.
    Pipeline,

    /// Score the snapshot and print the ranked district table.
    Score {
        #[command(flatten)]
        weights: WeightArgs,

        /// Number of districts to print (0 prints all).
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Score the snapshot and write the map payload artifact.
    Generate {
        #[command(flatten)]
        weights: WeightArgs,

        /// Output path (default: `<data-dir>/generated/<city>_map.json`).
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Weight inputs shared by `score` and `generate`.
#[derive(Args)]
struct WeightArgs {
    /// Density weight.
    #[arg(long, default_value = "0.5")]
    w1: f64,

    /// Income weight (independent mode; derived in constrained mode).
    #[arg(long)]
    w2: Option<f64>,

    /// Competition penalty weight.
    #[arg(long, default_value = "0.5")]
    w3: f64,

    /// Own-brand saturation penalty weight (independent mode; derived in
    /// constrained mode).
    #[arg(long)]
    w4: Option<f64>,

    /// Weight construction mode ("constrained" or "independent").
    #[arg(long, default_value = "constrained")]
    mode: WeightMode,

    /// Abort instead of excluding the metric when a column is constant.
    #[arg(long)]
    strict_normalize: bool,
}

impl WeightArgs {
    /// Builds the validated weight vector against the city's configured
    /// bounds.
    fn build(&self, city: &CityConfig) -> Result<WeightVector, Box<dyn std::error::Error>> {
        match self.mode {
            WeightMode::Constrained => {
                if self.w2.is_some() || self.w4.is_some() {
                    log::warn!("--w2/--w4 are derived in constrained mode; ignoring them");
                }
                Ok(WeightVector::constrained(self.w1, self.w3, &city.weights)?)
            }
            WeightMode::Independent => {
                let w2 = self.w2.ok_or("--w2 is required in independent mode")?;
                let w4 = self.w4.ok_or("--w4 is required in independent mode")?;
                Ok(WeightVector::independent(
                    self.w1,
                    w2,
                    self.w3,
                    w4,
                    &city.weights,
                )?)
            }
        }
    }

    const fn policy(&self) -> DegeneratePolicy {
        if self.strict_normalize {
            DegeneratePolicy::Reject
        } else {
            DegeneratePolicy::Exclude
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let city = site_index_pipeline::find_city(&cli.city)?;

    match cli.command {
        Commands::Pipeline => cmd_pipeline(city, &cli.data_dir),
        Commands::Score { weights, top } => cmd_score(city, &cli.data_dir, &weights, top),
        Commands::Generate { weights, out } => cmd_generate(city, &cli.data_dir, &weights, out),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Loads the snapshot, prints the load/join counters, and writes the
/// density cache.
fn cmd_pipeline(city: CityConfig, data_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = Pipeline::load(city, data_dir)?;
    let (cache_path, written) = pipeline.write_density_cache(&data_dir.join("generated"))?;

    let load = pipeline.load_stats();
    let stores = pipeline.store_stats();
    let join = pipeline.join_stats();

    println!("=== {} snapshot ===", pipeline.city().name);
    println!();
    println!("Fingerprint: {}", pipeline.fingerprint());
    println!();
    println!(
        "Districts: {} matched of {} boundary features",
        load.matched, load.boundaries
    );
    println!("  unmatched boundaries: {}", load.unmatched_boundaries);
    println!("  unmatched population: {}", load.unmatched_population);
    println!("  unmatched income:     {}", load.unmatched_income);
    println!();
    println!("Stores:    {} loaded of {} rows", stores.loaded, stores.rows);
    println!("  skipped coordinates:  {}", stores.skipped_coordinates);
    println!("  duplicates dropped:   {}", stores.duplicates);
    println!("  assigned to district: {}", join.assigned);
    println!("  outside all:          {}", join.outside);
    println!("  overlap tie-breaks:   {}", join.ambiguous);
    println!();
    if written {
        println!("Density cache written: {}", cache_path.display());
    } else {
        println!("Density cache current: {}", cache_path.display());
    }

    Ok(())
}

/// Scores the snapshot and prints the ranked table.
fn cmd_score(
    city: CityConfig,
    data_dir: &Path,
    args: &WeightArgs,
    top: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let weights = args.build(&city)?;
    let pipeline = Pipeline::load(city, data_dir)?;
    let outcome = pipeline.score(&weights, args.policy())?;

    print_ranked_table(&outcome, top);
    Ok(())
}

/// Scores the snapshot and writes the map payload artifact.
fn cmd_generate(
    city: CityConfig,
    data_dir: &Path,
    args: &WeightArgs,
    out: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let weights = args.build(&city)?;
    let pipeline = Pipeline::load(city, data_dir)?;
    let outcome = pipeline.score(&weights, args.policy())?;

    let payload = site_index_generate::build_payload(&pipeline, &outcome, chrono::Utc::now());
    let path = out.unwrap_or_else(|| {
        site_index_generate::default_payload_path(data_dir, &pipeline.city().id)
    });
    site_index_generate::write_payload(&path, &payload)?;

    println!("Map payload written: {}", path.display());
    println!("  districts: {}", payload.table.len());
    println!("  stores:    {}", payload.stores.len());

    Ok(())
}

// ---------------------------------------------------------------------------
// Output formatting
// ---------------------------------------------------------------------------

/// Prints the ranked district table, best first.
fn print_ranked_table(outcome: &ScoreOutcome, top: usize) {
    let rows = if top == 0 {
        &outcome.records[..]
    } else {
        site_index_score::top_n(&outcome.records, top)
    };

    println!(
        "{:<5} {:<22} {:>8} {:>10} {:>8} {:>6} {:>7}",
        "RANK", "QUARTIER", "AI", "DENSITY", "INCOME", "COMP", "MIGROS"
    );
    println!("{}", "-".repeat(72));

    for (index, record) in rows.iter().enumerate() {
        println!(
            "{:<5} {:<22} {:>8.3} {:>10.0} {:>8.1} {:>6.0} {:>7.0}",
            index + 1,
            truncate(&record.quartier, 21),
            record.ai,
            record.raw.density,
            record.raw.income,
            record.raw.competition,
            record.raw.migros_density,
        );
    }

    println!();
    println!("{} of {} district(s)", rows.len(), outcome.records.len());
    if !outcome.degenerate.is_empty() {
        println!(
            "Degenerate metrics excluded: {}",
            outcome.degenerate.join(", ")
        );
    }
}

/// Truncates a name to `max_len` characters, appending `…` when shortened.
/// Counts characters, not bytes (Quartier names carry umlauts).
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_owned()
    } else {
        let mut result: String = s.chars().take(max_len.saturating_sub(1)).collect();
        result.push('…');
        result
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    fn city() -> CityConfig {
        site_index_pipeline::find_city("zurich").unwrap()
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_parse_to_constrained_weights() {
        let cli = Cli::parse_from(["site_index_cli", "score"]);
        let Commands::Score { weights, top } = cli.command else {
            panic!("expected score subcommand");
        };

        assert_eq!(top, 10);
        assert_eq!(weights.mode, WeightMode::Constrained);
        assert_eq!(weights.policy(), DegeneratePolicy::Exclude);

        let vector = weights.build(&city()).unwrap();
        assert!((vector.w1 - 0.5).abs() < 1e-12);
        assert!((vector.w2 - 0.5).abs() < 1e-12);
    }

    #[test]
    fn independent_mode_requires_all_four_weights() {
        let cli = Cli::parse_from(["site_index_cli", "score", "--mode", "independent"]);
        let Commands::Score { weights, .. } = cli.command else {
            panic!("expected score subcommand");
        };

        let err = weights.build(&city()).unwrap_err();
        assert!(err.to_string().contains("--w2"));
    }

    #[test]
    fn independent_mode_takes_all_four_weights() {
        let cli = Cli::parse_from([
            "site_index_cli",
            "generate",
            "--mode",
            "independent",
            "--w1",
            "0.4",
            "--w2",
            "0.3",
            "--w3",
            "0.2",
            "--w4",
            "0.1",
        ]);
        let Commands::Generate { weights, .. } = cli.command else {
            panic!("expected generate subcommand");
        };

        let vector = weights.build(&city()).unwrap();
        assert_eq!(vector.mode, WeightMode::Independent);
        assert!((vector.w4 - 0.1).abs() < 1e-12);
    }

    #[test]
    fn strict_normalize_selects_reject() {
        let cli = Cli::parse_from(["site_index_cli", "score", "--strict-normalize"]);
        let Commands::Score { weights, .. } = cli.command else {
            panic!("expected score subcommand");
        };
        assert_eq!(weights.policy(), DegeneratePolicy::Reject);
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate("Seefeld", 21), "Seefeld");
        assert_eq!(truncate("Mühlebach", 5), "Mühl…");
        assert_eq!(truncate("Schwamendingen-Mitte", 10), "Schwamend…");
    }
}

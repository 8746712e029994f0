//! Generate a synthetic training dataset priced by the actuarial engine

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use borrower_premium::ml::{generate_synthetic, SyntheticConfig, DEFAULT_SEED};
use borrower_premium::mortality::{load_table, MortalityTable, Sex};

#[derive(Parser)]
#[command(name = "generate_dataset", about = "Generate a synthetic premium dataset")]
struct Cli {
    /// Number of loans to sample
    #[arg(long, default_value_t = 40_000)]
    rows: usize,
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
    /// Output CSV
    #[arg(long, default_value = "data/synthetic_dataset.csv")]
    out: PathBuf,
    /// Mortality table CSV (built-in IAM 2012 Basic otherwise)
    #[arg(long)]
    table: Option<PathBuf>,
    #[arg(long, default_value = "male")]
    sex: Sex,
    /// qx reduction applied before pricing
    #[arg(long, default_value_t = 0.35)]
    abattement: f64,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let base = match &cli.table {
        Some(path) => load_table(path)
            .with_context(|| format!("Failed to load mortality table {}", path.display()))?,
        None => MortalityTable::iam_2012_basic(cli.sex),
    };
    let table = base
        .with_abattement(cli.abattement)
        .context("Invalid abattement")?;

    let config = SyntheticConfig {
        rows: cli.rows,
        seed: cli.seed,
        ..Default::default()
    };

    let start = Instant::now();
    println!("Pricing {} synthetic loans (seed {})...", config.rows, config.seed);
    let dataset = generate_synthetic(&table, &config)?;
    println!("Priced in {:?}", start.elapsed());

    dataset
        .write_csv(&cli.out)
        .with_context(|| format!("Failed to write {}", cli.out.display()))?;
    println!("Dataset written to: {} ({} rows)", cli.out.display(), dataset.len());
    Ok(())
}

//! Train the premium regression model on a CSV dataset and save the model pack

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use borrower_premium::ml::{
    fit_and_eval, Dataset, ForestParams, ModelPack, ModelSpec, Regressor, DEFAULT_SEED, DEFAULT_TEST_SIZE,
    FEATURE_NAMES,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModelKind {
    /// Bagged regression trees (production model)
    RandomForest,
    /// Ordinary least squares baseline
    Linear,
}

#[derive(Parser)]
#[command(name = "train_model", about = "Fit the premium regression model")]
struct Cli {
    /// Training CSV with the five feature columns and `target`
    #[arg(long)]
    csv: PathBuf,
    /// Model pack JSON to write
    #[arg(long, default_value = "models/premium_model.json")]
    out: PathBuf,
    #[arg(long, value_enum, default_value = "random-forest")]
    model: ModelKind,
    /// Share of rows held out for testing
    #[arg(long, default_value_t = DEFAULT_TEST_SIZE)]
    test_size: f64,
    /// Seed of the train/test split
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
    #[arg(long, default_value_t = 500)]
    n_estimators: usize,
    #[arg(long, default_value_t = 2)]
    min_samples_leaf: usize,
    /// Unlimited when absent
    #[arg(long)]
    max_depth: Option<usize>,
    /// Seed of the forest's bootstrap samples
    #[arg(long, default_value_t = 42)]
    random_state: u64,
}

impl Cli {
    fn spec(&self) -> ModelSpec {
        match self.model {
            ModelKind::Linear => ModelSpec::Linear,
            ModelKind::RandomForest => ModelSpec::RandomForest(ForestParams {
                n_estimators: self.n_estimators,
                max_depth: self.max_depth,
                min_samples_leaf: self.min_samples_leaf,
                max_features: None,
                random_state: self.random_state,
            }),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let dataset = Dataset::load_csv(&cli.csv)
        .with_context(|| format!("Failed to load dataset {}", cli.csv.display()))?;
    let (model, metrics) = fit_and_eval(&dataset, &cli.spec(), cli.test_size, cli.seed)?;

    println!("Model: {}", metrics.model);
    match &model {
        Regressor::Linear(linear) => {
            println!("  Intercept: {:.6}", linear.intercept);
            for (name, coef) in FEATURE_NAMES.iter().zip(&linear.coefficients) {
                println!("  {:<24} {:>14.6}", name, coef);
            }
        }
        Regressor::RandomForest(forest) => {
            println!("  Trees: {}", forest.trees.len());
            println!("  Feature importances:");
            for (name, importance) in FEATURE_NAMES.iter().zip(&forest.feature_importances) {
                println!("  {:<24} {:>10.4}", name, importance);
            }
        }
    }
    println!();
    println!("{:<8} {:>12} {:>12} {:>10} {:>8}", "Split", "MAE", "RMSE", "R2", "Rows");
    println!("{}", "-".repeat(54));
    println!(
        "{:<8} {:>12.4} {:>12.4} {:>10.4} {:>8}",
        "train", metrics.train_mae, metrics.train_rmse, metrics.train_r2, metrics.n_train
    );
    println!(
        "{:<8} {:>12.4} {:>12.4} {:>10.4} {:>8}",
        "test", metrics.test_mae, metrics.test_rmse, metrics.test_r2, metrics.n_test
    );

    ModelPack::new(model, Some(metrics))
        .save(&cli.out)
        .with_context(|| format!("Failed to save model {}", cli.out.display()))?;
    println!("\nModel pack written to: {}", cli.out.display());
    Ok(())
}

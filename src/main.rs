//! Borrower premium CLI
//!
//! Prices a borrower policy with the actuarial engine, a saved regression model, or both.
//!
//! ```bash
//! borrower_premium price --capital 150000 --duration 15 --age 48 --output schedule.csv
//! borrower_premium predict --model models/premium.json --age 48 --output model_schedule.csv
//! borrower_premium compare --model models/premium.json --request request.json --model-output model_schedule.csv
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use borrower_premium::ml::{compare, load_model, ModelPack, ModelQuote};
use borrower_premium::mortality::{load_table, MortalityTable, Sex};
use borrower_premium::{PricingRequest, PricingResult};

#[derive(Parser)]
#[command(name = "borrower_premium")]
#[command(author, version, about = "Borrower death/disability premium pricing", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Price with the actuarial engine
    Price {
        #[command(flatten)]
        table: TableArgs,
        #[command(flatten)]
        request: RequestArgs,
        /// Write the enriched amortization schedule to this CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Price with a saved regression model
    Predict {
        /// Model pack JSON
        #[arg(short, long)]
        model: PathBuf,
        #[command(flatten)]
        request: RequestArgs,
        /// Write the schedule priced with the predicted premium to this CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Price with both engines and show the gap
    Compare {
        #[arg(short, long)]
        model: PathBuf,
        #[command(flatten)]
        table: TableArgs,
        #[command(flatten)]
        request: RequestArgs,
        /// Write the actuarial schedule to this CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write the model-priced schedule to this CSV
        #[arg(long)]
        model_output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct TableArgs {
    /// Mortality table CSV with Age, qx and lx columns (built-in IAM 2012 Basic otherwise)
    #[arg(long)]
    table: Option<PathBuf>,
    /// Column of the built-in table
    #[arg(long, default_value = "male")]
    sex: Sex,
}

impl TableArgs {
    fn load(&self) -> Result<MortalityTable> {
        match &self.table {
            Some(path) => load_table(path)
                .with_context(|| format!("Failed to load mortality table {}", path.display())),
            None => Ok(MortalityTable::iam_2012_basic(self.sex)),
        }
    }
}

/// Pricing inputs; flags override the request file, which overrides the defaults
#[derive(Args)]
struct RequestArgs {
    /// JSON request file
    #[arg(long)]
    request: Option<PathBuf>,
    /// Borrowed principal
    #[arg(long)]
    capital: Option<f64>,
    /// Loan term in years
    #[arg(long)]
    duration: Option<u32>,
    /// Annual loan rate, e.g. 0.035
    #[arg(long)]
    loan_rate: Option<f64>,
    /// Age at subscription
    #[arg(long)]
    age: Option<u32>,
    /// Annual technical rate, e.g. 0.02
    #[arg(long)]
    technical_rate: Option<f64>,
    /// qx reduction, e.g. 0.35
    #[arg(long)]
    abattement: Option<f64>,
}

impl RequestArgs {
    fn resolve(&self) -> Result<PricingRequest> {
        let mut request = match &self.request {
            Some(path) => PricingRequest::from_json_file(path)
                .with_context(|| format!("Failed to read request {}", path.display()))?,
            None => PricingRequest::default(),
        };
        if let Some(v) = self.capital {
            request.capital = v;
        }
        if let Some(v) = self.duration {
            request.duration_years = v;
        }
        if let Some(v) = self.loan_rate {
            request.loan_rate = v;
        }
        if let Some(v) = self.age {
            request.age = v;
        }
        if let Some(v) = self.technical_rate {
            request.technical_rate = v;
        }
        if let Some(v) = self.abattement {
            request.abattement = v;
        }
        request.validate().context("Invalid pricing request")?;
        Ok(request)
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Price { table, request, output } => run_price(&table, &request, output),
        Commands::Predict { model, request, output } => run_predict(&model, &request, output),
        Commands::Compare {
            model,
            table,
            request,
            output,
            model_output,
        } => run_compare(&model, &table, &request, output, model_output),
    }
}

fn print_request(request: &PricingRequest) {
    println!("Loan:");
    println!("  Capital: {:.2}", request.capital);
    println!("  Duration: {} years", request.duration_years);
    println!("  Loan rate: {:.4}%", request.loan_rate * 100.0);
    println!("  Age at subscription: {}", request.age);
    println!("  Technical rate: {:.4}%", request.technical_rate * 100.0);
    println!("  Abattement: {:.2}%", request.abattement * 100.0);
    println!();
}

fn actuarial_price(table: &TableArgs, request: &PricingRequest) -> Result<PricingResult> {
    let table = table.load()?;
    request.price(&table).context("Actuarial pricing failed")
}

fn load_pack(path: &Path) -> Result<ModelPack> {
    load_model(path).with_context(|| format!("Failed to load model {}", path.display()))
}

fn run_price(table: &TableArgs, request: &RequestArgs, output: Option<PathBuf>) -> Result<()> {
    let request = request.resolve()?;
    print_request(&request);

    let result = actuarial_price(table, &request)?;

    println!("Actuarial pricing:");
    println!("  Monthly premium: {:.2}", result.monthly_premium);
    println!("  Loan payment: {:.2}", result.loan_payment);
    println!("  Total first installment: {:.2}", result.first_total_payment());
    println!("  Single premium: {:.2}", result.single_premium);
    println!("  Annuity factor: {:.6}", result.annuity_factor);

    if let Some(path) = output {
        result
            .write_csv(&path)
            .with_context(|| format!("Failed to write schedule {}", path.display()))?;
        println!("\nSchedule written to: {}", path.display());
    }
    Ok(())
}

fn write_model_schedule(quote: &ModelQuote, path: &Path) -> Result<()> {
    quote
        .write_csv(path)
        .with_context(|| format!("Failed to write schedule {}", path.display()))?;
    println!("\nModel schedule written to: {}", path.display());
    Ok(())
}

fn run_predict(model: &Path, request: &RequestArgs, output: Option<PathBuf>) -> Result<()> {
    let request = request.resolve()?;
    print_request(&request);

    let pack = load_pack(model)?;
    let quote = pack.quote(&request)?;

    println!("{} pricing:", pack.model_name);
    println!("  Monthly premium: {:.2}", quote.monthly_premium);
    println!("  Loan payment: {:.2}", quote.loan_payment);
    println!("  Total first installment: {:.2}", quote.first_total_payment());
    if let Some(metrics) = &pack.metrics {
        println!("  Test MAE: {:.4}", metrics.test_mae);
        println!("  Test RMSE: {:.4}", metrics.test_rmse);
        println!("  Test R2: {:.4}", metrics.test_r2);
        println!("  Trained on: {} ({} rows)", metrics.dataset, metrics.n_train);
    }

    if let Some(path) = output {
        write_model_schedule(&quote, &path)?;
    }
    Ok(())
}

fn run_compare(
    model: &Path,
    table: &TableArgs,
    request: &RequestArgs,
    output: Option<PathBuf>,
    model_output: Option<PathBuf>,
) -> Result<()> {
    let request = request.resolve()?;
    print_request(&request);

    let result = actuarial_price(table, &request)?;
    let pack = load_pack(model)?;
    let quote = pack.quote(&request)?;
    let gap = compare(result.monthly_premium, quote.monthly_premium);

    println!("{:<14} {:>14}", "Engine", "Premium");
    println!("{}", "-".repeat(29));
    println!("{:<14} {:>14.2}", "Actuarial", gap.actuarial);
    println!("{:<14} {:>14.2}", pack.model_name, gap.model);
    println!();
    println!("Delta: {:+.2} ({:+.2}%)", gap.delta, gap.delta_pct);

    if let Some(path) = output {
        result
            .write_csv(&path)
            .with_context(|| format!("Failed to write schedule {}", path.display()))?;
        println!("\nActuarial schedule written to: {}", path.display());
    }
    if let Some(path) = model_output {
        write_model_schedule(&quote, &path)?;
    }
    Ok(())
}

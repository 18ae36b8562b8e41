mod commands;
mod input;
mod logging;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::cashflow::CashflowArgs;
use commands::curve::CurveArgs;
use commands::monte_carlo::MonteCarloArgs;
use commands::presets::PresetsArgs;
use commands::sensitivity::SensitivityArgs;

/// Cash-flow and risk projections for real-estate developments
#[derive(Parser)]
#[command(
    name = "devflow",
    version,
    about = "Cash-flow and risk projections for real-estate developments",
    long_about = "A CLI for projecting the monthly cash flow of a real-estate development \
                  from skew-normal sales and construction curves, with decimal precision. \
                  Supports deterministic ledgers, Monte Carlo risk runs and \
                  price x cost sensitivity grids."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log level for stderr diagnostics (overridden by RUST_LOG)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a cumulative or incremental timing curve
    Curve(CurveArgs),
    /// Project the monthly ledger and financial metrics of a project
    Cashflow(CashflowArgs),
    /// Run a Monte Carlo risk simulation over perturbed inputs
    MonteCarlo(MonteCarloArgs),
    /// NPV and IRR over a grid of sale price and construction cost changes
    Sensitivity(SensitivityArgs),
    /// List the built-in sales, construction and land presets
    Presets(PresetsArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Curve(args) => commands::curve::run_curve(args),
        Commands::Cashflow(args) => commands::cashflow::run_cashflow(args),
        Commands::MonteCarlo(args) => commands::monte_carlo::run_monte_carlo(args),
        Commands::Sensitivity(args) => commands::sensitivity::run_sensitivity(args),
        Commands::Presets(args) => commands::presets::run_presets(args),
        Commands::Version => {
            println!("devflow {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}

use clap::Args;
use serde_json::Value;

use devflow_core::project::{self, MonteCarloRequest};

use crate::input;

/// Arguments for the Monte Carlo risk run
#[derive(Args)]
pub struct MonteCarloArgs {
    /// Path to a JSON request (project, iterations, seed, perturbation)
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long)]
    pub iterations: Option<u32>,

    /// Seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Confidence level for VaR and expected shortfall
    #[arg(long)]
    pub confidence: Option<f64>,

    /// Include the inputs and metrics of every draw
    #[arg(long)]
    pub draws: bool,
}

pub fn run_monte_carlo(args: MonteCarloArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: MonteCarloRequest = input::read_or_default(args.input.as_deref())?;
    if let Some(n) = args.iterations {
        request.iterations = n;
    }
    if args.seed.is_some() {
        request.seed = args.seed;
    }
    if let Some(c) = args.confidence {
        request.confidence = c;
    }
    request.include_draws |= args.draws;

    let result = project::run_monte_carlo(&request)?;
    Ok(serde_json::to_value(result)?)
}

use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use devflow_core::scenarios::{self, SensitivityRequest};

use crate::input;

/// Arguments for the sale price x construction cost grid
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to a JSON request (project, range, steps)
    #[arg(long)]
    pub input: Option<String>,

    /// Largest relative change in each direction (e.g. 0.2)
    #[arg(long)]
    pub range: Option<Decimal>,

    /// Points per axis
    #[arg(long)]
    pub steps: Option<usize>,
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: SensitivityRequest = input::read_or_default(args.input.as_deref())?;
    if let Some(range) = args.range {
        request.range = range;
    }
    if let Some(steps) = args.steps {
        request.steps = steps;
    }
    let result = scenarios::run_price_cost_sensitivity(&request)?;
    Ok(serde_json::to_value(result)?)
}

use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use devflow_core::curves::LandPreset;
use devflow_core::project::{self, LandPlanChoice, ProjectConfig};

use crate::input;

/// Arguments for the deterministic cash-flow projection
#[derive(Args)]
pub struct CashflowArgs {
    /// Path to a JSON project file (defaults apply to missing fields)
    #[arg(long)]
    pub input: Option<String>,

    /// Override the land payment with a preset (cash, installments, swap_30)
    #[arg(long)]
    pub land_plan: Option<LandPreset>,

    /// Override the annual discount rate (e.g. 0.12)
    #[arg(long)]
    pub rate: Option<Decimal>,
}

pub fn run_cashflow(args: CashflowArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut config: ProjectConfig = input::read_or_default(args.input.as_deref())?;
    if let Some(preset) = args.land_plan {
        config.land_plan = LandPlanChoice::Preset(preset);
    }
    if let Some(rate) = args.rate {
        config.annual_rate = rate;
    }
    let result = project::run_deterministic(&config)?;
    Ok(serde_json::to_value(result)?)
}

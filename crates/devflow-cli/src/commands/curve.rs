use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::info;

use devflow_core::curves::{
    generate_cumulative, generate_incremental, CostProfile, CurveParams, SalesProfile, ShapePreset,
};

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CurveForm {
    Cumulative,
    Incremental,
}

/// Arguments for generating a single timing curve
#[derive(Args)]
pub struct CurveArgs {
    /// Path to a JSON file with full curve parameters
    #[arg(long)]
    pub input: Option<String>,

    /// Sales preset (strong_pre_sale, classic, post_construction)
    #[arg(long, conflicts_with = "cost_profile")]
    pub sales_profile: Option<SalesProfile>,

    /// Construction preset (standard_s, heavy_front, long_tail)
    #[arg(long)]
    pub cost_profile: Option<CostProfile>,

    /// Total amount distributed by a preset curve
    #[arg(long, default_value = "1000000")]
    pub total: Decimal,

    /// Horizon in months for a preset curve
    #[arg(long, default_value_t = 36)]
    pub horizon: u32,

    #[arg(long, value_enum, default_value = "cumulative")]
    pub form: CurveForm,
}

pub fn run_curve(args: CurveArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let params: CurveParams = if let Some(p) = args.sales_profile {
        p.curve_params(args.total, args.horizon)
    } else if let Some(p) = args.cost_profile {
        p.curve_params(args.total, args.horizon)
    } else if let Some(params) = input::read_request(args.input.as_deref())? {
        params
    } else {
        return Err(
            "--input <file.json>, stdin, --sales-profile or --cost-profile required for a curve"
                .into(),
        );
    };

    info!(
        mode = params.mode_month,
        alpha = params.shape_alpha,
        scale = params.scale,
        horizon = params.horizon_months,
        "generating curve"
    );
    let curve = match args.form {
        CurveForm::Cumulative => generate_cumulative(&params)?,
        CurveForm::Incremental => generate_incremental(&params)?,
    };
    Ok(serde_json::to_value(curve)?)
}

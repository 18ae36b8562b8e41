use clap::{Args, ValueEnum};
use serde_json::Value;

use devflow_core::curves::catalog;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PresetCategory {
    Sales,
    Cost,
    Land,
}

impl PresetCategory {
    fn key(self) -> &'static str {
        match self {
            PresetCategory::Sales => "sales",
            PresetCategory::Cost => "cost",
            PresetCategory::Land => "land",
        }
    }
}

/// Arguments for listing the built-in presets
#[derive(Args)]
pub struct PresetsArgs {
    #[arg(long, value_enum)]
    pub category: Option<PresetCategory>,
}

pub fn run_presets(args: PresetsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let entries: Vec<_> = catalog()
        .into_iter()
        .filter(|e| args.category.map_or(true, |c| e.category == c.key()))
        .collect();
    Ok(serde_json::to_value(entries)?)
}

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::DevFlowError;
use crate::metrics::{irr, npv};
use crate::project::ProjectConfig;
use crate::types::*;
use crate::DevFlowResult;

fn default_range() -> Rate {
    dec!(0.20)
}

fn default_steps() -> usize {
    5
}

/// Input for the sale price × construction cost grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityRequest {
    #[serde(default)]
    pub project: ProjectConfig,
    /// Largest relative change applied in each direction (0.20 = ±20%)
    #[serde(default = "default_range")]
    pub range: Rate,
    /// Points per axis, including both ends
    #[serde(default = "default_steps")]
    pub steps: usize,
}

impl Default for SensitivityRequest {
    fn default() -> Self {
        Self {
            project: ProjectConfig::default(),
            range: default_range(),
            steps: default_steps(),
        }
    }
}

/// Output of the price × cost grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityOutput {
    /// Relative changes applied to the sale price (rows)
    pub price_changes: Vec<Rate>,
    /// Relative changes applied to the construction cost (columns)
    pub cost_changes: Vec<Rate>,
    /// npv_matrix[i][j] = NPV at price_changes[i], cost_changes[j]
    pub npv_matrix: Vec<Vec<Money>>,
    pub irr_matrix: Vec<Vec<Option<Rate>>>,
    pub base_case_npv: Money,
    pub base_case_irr: Option<Rate>,
    /// Grid cell closest to the unchanged project (row, col)
    pub base_case_position: (usize, usize),
}

/// Evenly spaced relative changes from `-range` to `+range`.
fn generate_sweep_values(range: Rate, steps: usize) -> DevFlowResult<Vec<Rate>> {
    if steps < 2 {
        return Err(DevFlowError::invalid("steps", "Must be at least 2"));
    }
    if range < Decimal::ZERO || range >= Decimal::ONE {
        return Err(DevFlowError::invalid("range", "Must be in [0, 1)"));
    }
    let step = dec!(2) * range / Decimal::from(steps - 1);
    let mut values: Vec<Rate> = (0..steps)
        .map(|i| -range + step * Decimal::from(i))
        .collect();
    // Pin the last point against division residue.
    if let Some(last) = values.last_mut() {
        *last = range;
    }
    Ok(values)
}

/// Find the closest index to a target value in a sorted list.
fn closest_index(values: &[Decimal], target: Decimal) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| (**v - target).abs())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// NPV and IRR of the project over a grid of sale price and construction
/// cost changes.
pub fn run_price_cost_sensitivity(
    request: &SensitivityRequest,
) -> DevFlowResult<ComputationOutput<SensitivityOutput>> {
    let start = Instant::now();
    let mut warnings = request.project.warnings();

    let changes = generate_sweep_values(request.range, request.steps)?;
    let base = request.project.scenario_inputs()?;
    base.validate()?;

    let (_, base_metrics) = base.evaluate()?;

    let mut npv_matrix = Vec::with_capacity(changes.len());
    let mut irr_matrix = Vec::with_capacity(changes.len());
    let mut undefined_irr = 0usize;
    for price in &changes {
        let mut npv_row = Vec::with_capacity(changes.len());
        let mut irr_row = Vec::with_capacity(changes.len());
        for cost in &changes {
            let inputs = base.with_scaled_totals(
                (Decimal::ONE + price).normalize(),
                (Decimal::ONE + cost).normalize(),
            );
            let (ledger, _) = inputs.evaluate()?;
            npv_row.push(npv(&ledger, inputs.annual_rate)?);
            let rate = irr(&ledger);
            if rate.is_none() {
                undefined_irr += 1;
            }
            irr_row.push(rate);
        }
        npv_matrix.push(npv_row);
        irr_matrix.push(irr_row);
    }

    if undefined_irr > 0 {
        warnings.push(format!(
            "IRR undefined in {undefined_irr} of {} grid cells",
            changes.len() * changes.len()
        ));
    }

    let base_index = closest_index(&changes, Decimal::ZERO);
    let output = SensitivityOutput {
        price_changes: changes.clone(),
        cost_changes: changes,
        npv_matrix,
        irr_matrix,
        base_case_npv: base_metrics.npv,
        base_case_irr: base_metrics.irr,
        base_case_position: (base_index, base_index),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Sale price x construction cost sensitivity",
        &serde_json::json!({
            "range": request.range,
            "steps": request.steps,
            "annual_rate": request.project.annual_rate,
        }),
        warnings,
        elapsed,
        output,
    ))
}

//! Business-level facade: turns a [`ProjectConfig`] into curve parameters and
//! runs the deterministic or Monte Carlo pipeline, wrapping results in the
//! [`ComputationOutput`] envelope.

pub mod config;
pub mod inputs;

pub use config::{AreaBreakdown, CurveShape, LandPlanChoice, ProjectConfig};
pub use inputs::ScenarioInputs;

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::cashflow::CashflowLedger;
use crate::metrics::FinancialMetrics;
use crate::types::{with_metadata, ComputationOutput};
use crate::DevFlowResult;

#[cfg(feature = "monte_carlo")]
use crate::monte_carlo::{
    fan_chart, summarize, DiscardedDraw, DrawInputs, FanChartBand, MonteCarloEngine,
    PerturbationConfig, SimulationSummary,
};

// ---------------------------------------------------------------------------
// Deterministic run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeterministicOutput {
    pub areas: AreaBreakdown,
    pub inputs: ScenarioInputs,
    pub metrics: FinancialMetrics,
    pub ledger: CashflowLedger,
}

/// Build the ledger of a project and compute its metrics.
pub fn run_deterministic(
    config: &ProjectConfig,
) -> DevFlowResult<ComputationOutput<DeterministicOutput>> {
    let start = Instant::now();
    let inputs = config.scenario_inputs()?;
    inputs.validate()?;
    let (ledger, metrics) = inputs.evaluate()?;

    let mut warnings = config.warnings();
    metric_warnings(&metrics, config.horizon_months, &mut warnings);

    let output = DeterministicOutput {
        areas: config.areas(),
        inputs,
        metrics,
        ledger,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Deterministic development cash flow (skew-normal S-curves)",
        config,
        warnings,
        elapsed,
        output,
    ))
}

fn metric_warnings(metrics: &FinancialMetrics, horizon: u32, warnings: &mut Vec<String>) {
    if metrics.irr.is_none() {
        warnings.push("IRR is undefined for these cash flows".into());
    }
    if metrics.break_even_month.is_none() {
        warnings.push(format!(
            "Cumulative cash does not return to zero within {horizon} months"
        ));
    }
}

// ---------------------------------------------------------------------------
// Monte Carlo run
// ---------------------------------------------------------------------------

#[cfg(feature = "monte_carlo")]
fn default_iterations() -> u32 {
    500
}

#[cfg(feature = "monte_carlo")]
fn default_confidence() -> f64 {
    0.95
}

#[cfg(feature = "monte_carlo")]
fn default_perturbation() -> PerturbationConfig {
    PerturbationConfig {
        retain_ledgers: 200,
        ..PerturbationConfig::amounts(0.15, 0.10)
    }
}

#[cfg(feature = "monte_carlo")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloRequest {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Omit for an entropy seed; the seed used is reported back.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_perturbation")]
    pub perturbation: PerturbationConfig,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Return the sampled inputs and metrics of every valid draw.
    #[serde(default)]
    pub include_draws: bool,
}

#[cfg(feature = "monte_carlo")]
impl Default for MonteCarloRequest {
    fn default() -> Self {
        Self {
            project: ProjectConfig::default(),
            iterations: default_iterations(),
            seed: None,
            perturbation: default_perturbation(),
            confidence: default_confidence(),
            include_draws: false,
        }
    }
}

#[cfg(feature = "monte_carlo")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawOutcome {
    pub inputs: DrawInputs,
    pub metrics: FinancialMetrics,
}

#[cfg(feature = "monte_carlo")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloOutput {
    pub seed: u64,
    /// Metrics of the unperturbed project.
    pub base_metrics: FinancialMetrics,
    pub summary: SimulationSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fan_chart: Option<Vec<FanChartBand>>,
    pub discarded: Vec<DiscardedDraw>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draws: Option<Vec<DrawOutcome>>,
}

/// Run the Monte Carlo pipeline for a project.
#[cfg(feature = "monte_carlo")]
pub fn run_monte_carlo(
    request: &MonteCarloRequest,
) -> DevFlowResult<ComputationOutput<MonteCarloOutput>> {
    let start = Instant::now();
    let base = request.project.scenario_inputs()?;
    base.validate()?;
    let (_, base_metrics) = base.evaluate()?;

    let result = MonteCarloEngine::run(
        &base,
        &request.perturbation,
        request.iterations,
        request.seed,
    )?;
    let summary = summarize(&result, request.confidence)?;
    let fan_chart = match result.ledgers.as_deref() {
        Some(ledgers) if !ledgers.is_empty() => Some(fan_chart(ledgers)?),
        _ => None,
    };

    let mut warnings = request.project.warnings();
    if !result.discarded.is_empty() {
        warnings.push(format!(
            "{} of {} draws discarded (invalid perturbed inputs)",
            result.discarded.len(),
            result.attempted()
        ));
    }
    if summary.irr_undefined > 0 {
        warnings.push(format!(
            "IRR undefined in {} of {} draws",
            summary.irr_undefined, summary.valid
        ));
    }

    let draws = request.include_draws.then(|| {
        result
            .inputs
            .iter()
            .cloned()
            .zip(result.metrics.iter().cloned())
            .map(|(inputs, metrics)| DrawOutcome { inputs, metrics })
            .collect()
    });

    let output = MonteCarloOutput {
        seed: result.seed,
        base_metrics,
        summary,
        fan_chart,
        discarded: result.discarded,
        draws,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monte Carlo development cash flow (perturbed S-curves)",
        &serde_json::json!({
            "project": request.project,
            "iterations": request.iterations,
            "seed": output.seed,
            "perturbation": request.perturbation,
            "confidence": request.confidence,
        }),
        warnings,
        elapsed,
        output,
    ))
}

use std::ops::ControlFlow;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::perturbation::Perturbation;
use crate::cashflow::CashflowLedger;
use crate::error::DevFlowError;
use crate::metrics::FinancialMetrics;
use crate::project::ScenarioInputs;
use crate::types::Money;
use crate::DevFlowResult;

/// Decimal places kept on perturbed money amounts.
const AMOUNT_DP: u32 = 2;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

fn default_max_failure_rate() -> f64 {
    0.10
}

/// Which inputs are shocked on every draw, and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerturbationConfig {
    #[serde(default)]
    pub sales_amount: Option<Perturbation>,
    #[serde(default)]
    pub cost_amount: Option<Perturbation>,
    #[serde(default)]
    pub land_value: Option<Perturbation>,
    #[serde(default)]
    pub sales_mode: Option<Perturbation>,
    #[serde(default)]
    pub sales_alpha: Option<Perturbation>,
    #[serde(default)]
    pub sales_scale: Option<Perturbation>,
    #[serde(default)]
    pub cost_mode: Option<Perturbation>,
    #[serde(default)]
    pub cost_alpha: Option<Perturbation>,
    #[serde(default)]
    pub cost_scale: Option<Perturbation>,
    /// Ledgers kept for fan charts (the first valid draws).
    #[serde(default)]
    pub retain_ledgers: usize,
    /// Largest tolerated share of discarded draws.
    #[serde(default = "default_max_failure_rate")]
    pub max_failure_rate: f64,
}

impl Default for PerturbationConfig {
    fn default() -> Self {
        Self {
            sales_amount: None,
            cost_amount: None,
            land_value: None,
            sales_mode: None,
            sales_alpha: None,
            sales_scale: None,
            cost_mode: None,
            cost_alpha: None,
            cost_scale: None,
            retain_ledgers: 0,
            max_failure_rate: default_max_failure_rate(),
        }
    }
}

impl PerturbationConfig {
    /// Normal shocks on the sales and cost totals, the classic setup.
    pub fn amounts(sales_std_dev: f64, cost_std_dev: f64) -> Self {
        Self {
            sales_amount: Some(Perturbation::RelativeNormal {
                std_dev: sales_std_dev,
            }),
            cost_amount: Some(Perturbation::RelativeNormal {
                std_dev: cost_std_dev,
            }),
            ..Self::default()
        }
    }

    fn fields(&self) -> [(&'static str, Option<&Perturbation>); 9] {
        [
            ("sales_amount", self.sales_amount.as_ref()),
            ("cost_amount", self.cost_amount.as_ref()),
            ("land_value", self.land_value.as_ref()),
            ("sales_mode", self.sales_mode.as_ref()),
            ("sales_alpha", self.sales_alpha.as_ref()),
            ("sales_scale", self.sales_scale.as_ref()),
            ("cost_mode", self.cost_mode.as_ref()),
            ("cost_alpha", self.cost_alpha.as_ref()),
            ("cost_scale", self.cost_scale.as_ref()),
        ]
    }

    pub fn validate(&self) -> DevFlowResult<()> {
        for (field, p) in self.fields() {
            if let Some(p) = p {
                p.validate(field)?;
            }
        }
        if !(0.0..=1.0).contains(&self.max_failure_rate) {
            return Err(DevFlowError::invalid(
                "max_failure_rate",
                "Must be between 0 and 1",
            ));
        }
        Ok(())
    }
}

/// The sampled values of one draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawInputs {
    pub index: u32,
    pub sales_amount: Money,
    pub cost_amount: Money,
    pub land_value: Money,
    pub sales_mode: f64,
    pub sales_alpha: f64,
    pub sales_scale: f64,
    pub cost_mode: f64,
    pub cost_alpha: f64,
    pub cost_scale: f64,
}

impl DrawInputs {
    fn of(index: u32, inputs: &ScenarioInputs) -> Self {
        Self {
            index,
            sales_amount: inputs.sales.total_amount,
            cost_amount: inputs.cost.total_amount,
            land_value: inputs.land_value,
            sales_mode: inputs.sales.mode_month,
            sales_alpha: inputs.sales.shape_alpha,
            sales_scale: inputs.sales.scale,
            cost_mode: inputs.cost.mode_month,
            cost_alpha: inputs.cost.shape_alpha,
            cost_scale: inputs.cost.scale,
        }
    }
}

/// One evaluated draw. Lives only for the duration of the loop body.
#[derive(Debug, Clone)]
pub struct ScenarioDraw {
    pub index: u32,
    pub inputs: ScenarioInputs,
    pub metrics: FinancialMetrics,
    pub ledger: Option<CashflowLedger>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscardedDraw {
    pub index: u32,
    pub reason: String,
}

/// Outcome of a Monte Carlo run. `metrics[i]` and `inputs[i]` describe the
/// same draw.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Base seed; replaying with it reproduces every draw.
    pub seed: u64,
    pub requested: u32,
    pub metrics: Vec<FinancialMetrics>,
    pub inputs: Vec<DrawInputs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledgers: Option<Vec<CashflowLedger>>,
    pub discarded: Vec<DiscardedDraw>,
    /// True when the control callback stopped the run early.
    pub aborted: bool,
}

impl SimulationResult {
    pub fn attempted(&self) -> usize {
        self.metrics.len() + self.discarded.len()
    }

    pub fn valid(&self) -> usize {
        self.metrics.len()
    }
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Independent generator for draw `index`, so a draw's values depend only on
/// the base seed and its own index.
fn draw_rng(seed: u64, index: u32) -> StdRng {
    StdRng::seed_from_u64(splitmix64(seed ^ u64::from(index)))
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct MonteCarloEngine;

impl MonteCarloEngine {
    /// Run `n` perturbed draws of the pipeline.
    pub fn run(
        base: &ScenarioInputs,
        config: &PerturbationConfig,
        n: u32,
        seed: Option<u64>,
    ) -> DevFlowResult<SimulationResult> {
        Self::run_with_control(base, config, n, seed, |_, _| ControlFlow::Continue(()))
    }

    /// Like [`MonteCarloEngine::run`], calling `control(completed, n)` after
    /// every draw. Returning `ControlFlow::Break` stops the run; the draws
    /// completed so far are kept and the result is flagged `aborted`.
    pub fn run_with_control<F>(
        base: &ScenarioInputs,
        config: &PerturbationConfig,
        n: u32,
        seed: Option<u64>,
        mut control: F,
    ) -> DevFlowResult<SimulationResult>
    where
        F: FnMut(u32, u32) -> ControlFlow<()>,
    {
        if n == 0 {
            return Err(DevFlowError::invalid("iterations", "Must be at least 1"));
        }
        base.validate()?;
        config.validate()?;

        let seed = seed.unwrap_or_else(|| StdRng::from_entropy().gen());
        info!(iterations = n, seed, "starting Monte Carlo run");

        let mut metrics = Vec::with_capacity(n as usize);
        let mut inputs = Vec::with_capacity(n as usize);
        let mut ledgers = Vec::with_capacity(config.retain_ledgers.min(n as usize));
        let mut discarded = Vec::new();
        let mut aborted = false;

        for index in 0..n {
            let keep_ledger = ledgers.len() < config.retain_ledgers;
            match Self::draw(base, config, seed, index, keep_ledger) {
                Ok(draw) => {
                    inputs.push(DrawInputs::of(draw.index, &draw.inputs));
                    metrics.push(draw.metrics);
                    if let Some(ledger) = draw.ledger {
                        ledgers.push(ledger);
                    }
                }
                Err(e) => {
                    debug!(index, error = %e, "discarding draw");
                    discarded.push(DiscardedDraw {
                        index,
                        reason: e.to_string(),
                    });
                }
            }

            if control(index + 1, n).is_break() {
                aborted = true;
                warn!(completed = index + 1, iterations = n, "Monte Carlo run aborted");
                break;
            }
        }

        let attempted = metrics.len() + discarded.len();
        if !discarded.is_empty() {
            let rate = discarded.len() as f64 / attempted as f64;
            warn!(
                discarded = discarded.len(),
                attempted,
                rate,
                "Monte Carlo draws discarded"
            );
            if rate > config.max_failure_rate {
                return Err(DevFlowError::SimulationFailure {
                    discarded: discarded.len(),
                    attempted,
                    max_failure_rate: config.max_failure_rate,
                });
            }
        }

        info!(
            valid = metrics.len(),
            discarded = discarded.len(),
            aborted,
            "Monte Carlo run finished"
        );

        Ok(SimulationResult {
            seed,
            requested: n,
            metrics,
            inputs,
            ledgers: (config.retain_ledgers > 0).then_some(ledgers),
            discarded,
            aborted,
        })
    }

    /// Sample and evaluate draw `index`.
    pub fn draw(
        base: &ScenarioInputs,
        config: &PerturbationConfig,
        seed: u64,
        index: u32,
        keep_ledger: bool,
    ) -> DevFlowResult<ScenarioDraw> {
        let mut rng = draw_rng(seed, index);
        let inputs = perturb(base, config, &mut rng)?;
        inputs.validate()?;
        let (ledger, metrics) = inputs.evaluate()?;
        Ok(ScenarioDraw {
            index,
            inputs,
            metrics,
            ledger: keep_ledger.then_some(ledger),
        })
    }
}

/// Apply every configured shock to a copy of `base`, in a fixed order.
fn perturb(
    base: &ScenarioInputs,
    config: &PerturbationConfig,
    rng: &mut StdRng,
) -> DevFlowResult<ScenarioInputs> {
    let mut out = base.clone();

    out.sales.total_amount = perturb_amount(config.sales_amount.as_ref(), rng, out.sales.total_amount)?;
    out.cost.total_amount = perturb_amount(config.cost_amount.as_ref(), rng, out.cost.total_amount)?;
    out.land_value = perturb_amount(config.land_value.as_ref(), rng, out.land_value)?;

    out.sales.mode_month = perturb_value(config.sales_mode.as_ref(), rng, out.sales.mode_month)?;
    out.sales.shape_alpha = perturb_value(config.sales_alpha.as_ref(), rng, out.sales.shape_alpha)?;
    out.sales.scale = perturb_value(config.sales_scale.as_ref(), rng, out.sales.scale)?;
    out.cost.mode_month = perturb_value(config.cost_mode.as_ref(), rng, out.cost.mode_month)?;
    out.cost.shape_alpha = perturb_value(config.cost_alpha.as_ref(), rng, out.cost.shape_alpha)?;
    out.cost.scale = perturb_value(config.cost_scale.as_ref(), rng, out.cost.scale)?;

    Ok(out)
}

fn perturb_value(p: Option<&Perturbation>, rng: &mut StdRng, base: f64) -> DevFlowResult<f64> {
    match p {
        Some(p) => p.apply(rng, base),
        None => Ok(base),
    }
}

/// Shocked money amount, floored at zero.
fn perturb_amount(p: Option<&Perturbation>, rng: &mut StdRng, base: Money) -> DevFlowResult<Money> {
    let Some(p) = p else {
        return Ok(base);
    };
    let base_f = base
        .to_f64()
        .ok_or_else(|| DevFlowError::invalid("amount", format!("{base} is not representable")))?;
    let value = p.apply(rng, base_f)?.max(0.0);
    Decimal::from_f64(value)
        .map(|d| d.round_dp(AMOUNT_DP))
        .ok_or_else(|| DevFlowError::invalid("amount", format!("Perturbed value {value} is not finite")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cashflow::LandPaymentPlan;
    use crate::curves::CurveParams;
    use rust_decimal_macros::dec;

    const SEED: u64 = 42;

    fn base_inputs() -> ScenarioInputs {
        ScenarioInputs {
            sales: CurveParams {
                mode_month: 18.0,
                shape_alpha: 0.0,
                scale: 8.0,
                total_amount: dec!(1_000_000),
                horizon_months: 36,
                start_month: 0,
            },
            cost: CurveParams {
                mode_month: 15.0,
                shape_alpha: 0.0,
                scale: 10.0,
                total_amount: dec!(600_000),
                horizon_months: 36,
                start_month: 0,
            },
            land_plan: LandPaymentPlan::CashUpfront,
            land_value: dec!(100_000),
            horizon_months: 36,
            annual_rate: dec!(0.12),
        }
    }

    #[test]
    fn test_seeded_runs_are_identical() {
        let config = PerturbationConfig::amounts(0.15, 0.10);
        let a = MonteCarloEngine::run(&base_inputs(), &config, 200, Some(SEED)).unwrap();
        let b = MonteCarloEngine::run(&base_inputs(), &config, 200, Some(SEED)).unwrap();
        assert_eq!(a.seed, SEED);
        assert_eq!(a.metrics, b.metrics);
        assert_eq!(a.inputs, b.inputs);
    }

    #[test]
    fn test_different_seeds_differ() {
        let config = PerturbationConfig::amounts(0.15, 0.10);
        let a = MonteCarloEngine::run(&base_inputs(), &config, 50, Some(1)).unwrap();
        let b = MonteCarloEngine::run(&base_inputs(), &config, 50, Some(2)).unwrap();
        assert_ne!(a.inputs, b.inputs);
    }

    #[test]
    fn test_draw_depends_only_on_seed_and_index() {
        let config = PerturbationConfig::amounts(0.15, 0.10);
        let full = MonteCarloEngine::run(&base_inputs(), &config, 20, Some(SEED)).unwrap();
        let single = MonteCarloEngine::draw(&base_inputs(), &config, SEED, 7, false).unwrap();
        assert_eq!(full.metrics[7], single.metrics);
    }

    #[test]
    fn test_entropy_seed_is_reported_and_replayable() {
        let config = PerturbationConfig::amounts(0.1, 0.1);
        let first = MonteCarloEngine::run(&base_inputs(), &config, 10, None).unwrap();
        let replay = MonteCarloEngine::run(&base_inputs(), &config, 10, Some(first.seed)).unwrap();
        assert_eq!(first.metrics, replay.metrics);
    }

    #[test]
    fn test_without_perturbation_every_draw_matches_base() {
        let (_, base_metrics) = base_inputs().evaluate().unwrap();
        let result =
            MonteCarloEngine::run(&base_inputs(), &PerturbationConfig::default(), 5, Some(SEED))
                .unwrap();
        assert!(result.metrics.iter().all(|m| *m == base_metrics));
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let err = MonteCarloEngine::run(&base_inputs(), &PerturbationConfig::default(), 0, Some(SEED));
        assert!(matches!(err, Err(DevFlowError::InvalidParameter { .. })));
    }

    #[test]
    fn test_invalid_base_rejected() {
        let mut base = base_inputs();
        base.sales.scale = -1.0;
        assert!(MonteCarloEngine::run(&base, &PerturbationConfig::default(), 10, Some(SEED)).is_err());
    }

    #[test]
    fn test_ledgers_retained_up_to_limit() {
        let config = PerturbationConfig {
            retain_ledgers: 3,
            ..PerturbationConfig::amounts(0.1, 0.1)
        };
        let result = MonteCarloEngine::run(&base_inputs(), &config, 10, Some(SEED)).unwrap();
        let ledgers = result.ledgers.unwrap();
        assert_eq!(ledgers.len(), 3);
        assert!(ledgers.iter().all(|l| l.len() == 37));

        let none = MonteCarloEngine::run(
            &base_inputs(),
            &PerturbationConfig::amounts(0.1, 0.1),
            10,
            Some(SEED),
        )
        .unwrap();
        assert!(none.ledgers.is_none());
    }

    #[test]
    fn test_invalid_draws_are_discarded() {
        // Scale shocks wide enough that some draws go non-positive.
        let config = PerturbationConfig {
            sales_scale: Some(Perturbation::AbsoluteNormal { std_dev: 8.0 }),
            max_failure_rate: 1.0,
            ..PerturbationConfig::default()
        };
        let result = MonteCarloEngine::run(&base_inputs(), &config, 200, Some(SEED)).unwrap();
        assert!(!result.discarded.is_empty());
        assert_eq!(result.attempted(), 200);
        assert_eq!(result.valid() + result.discarded.len(), 200);
        assert!(result.discarded.iter().all(|d| d.reason.contains("scale")));
    }

    #[test]
    fn test_failure_threshold_enforced() {
        let config = PerturbationConfig {
            sales_scale: Some(Perturbation::AbsoluteNormal { std_dev: 8.0 }),
            max_failure_rate: 0.0,
            ..PerturbationConfig::default()
        };
        let err = MonteCarloEngine::run(&base_inputs(), &config, 200, Some(SEED));
        assert!(matches!(err, Err(DevFlowError::SimulationFailure { attempted: 200, .. })));
    }

    #[test]
    fn test_abort_keeps_completed_draws() {
        let config = PerturbationConfig::amounts(0.1, 0.1);
        let result = MonteCarloEngine::run_with_control(&base_inputs(), &config, 100, Some(SEED), |done, _| {
            if done >= 25 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();
        assert!(result.aborted);
        assert_eq!(result.attempted(), 25);
        assert_eq!(result.requested, 100);

        let full = MonteCarloEngine::run(&base_inputs(), &config, 100, Some(SEED)).unwrap();
        assert_eq!(result.metrics[..], full.metrics[..25]);
    }

    #[test]
    fn test_amounts_never_negative() {
        let config = PerturbationConfig::amounts(2.0, 2.0);
        let result = MonteCarloEngine::run(&base_inputs(), &config, 100, Some(SEED)).unwrap();
        assert!(result
            .inputs
            .iter()
            .all(|i| i.sales_amount >= Decimal::ZERO && i.cost_amount >= Decimal::ZERO));
    }
}

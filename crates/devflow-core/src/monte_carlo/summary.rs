//! Aggregation of a Monte Carlo run into distribution statistics, tail risk
//! and per-month fan-chart bands.

use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use super::simulation::SimulationResult;
use crate::cashflow::CashflowLedger;
use crate::error::DevFlowError;
use crate::types::Month;
use crate::DevFlowResult;

const HISTOGRAM_BINS: usize = 20;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    pub p5: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: u32,
    pub frequency: f64,
}

/// Descriptive statistics of one simulated metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub percentiles: Percentiles,
    pub skewness: f64,
    pub kurtosis: f64,
    pub histogram: Vec<HistogramBin>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub seed: u64,
    pub requested: u32,
    pub valid: usize,
    pub discarded: usize,
    pub aborted: bool,
    pub npv: DistributionStats,
    /// Statistics over the draws with a defined IRR; `None` when no draw has one.
    pub irr: Option<DistributionStats>,
    pub irr_undefined: usize,
    pub max_drawdown: DistributionStats,
    /// Draws whose cumulative cash never returns to zero.
    pub never_breaks_even: usize,
    /// Share of draws with NPV below zero.
    pub probability_of_loss: f64,
    pub confidence: f64,
    /// NPV at the `1 - confidence` quantile.
    pub value_at_risk: f64,
    /// Mean NPV of the draws at or below `value_at_risk`.
    pub expected_shortfall: f64,
}

/// Spread of cumulative cash across draws at one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanChartBand {
    pub month: Month,
    pub p5: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
}

// ---------------------------------------------------------------------------
// Statistics helpers
// ---------------------------------------------------------------------------

/// Percentile of a **sorted** slice using linear interpolation. NaN when empty.
fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    match sorted {
        [] => return f64::NAN,
        [only] => return *only,
        _ => {}
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

fn build_histogram(sorted: &[f64], num_bins: usize) -> Vec<HistogramBin> {
    let (Some(&min_val), Some(&max_val)) = (sorted.first(), sorted.last()) else {
        return Vec::new();
    };

    if (max_val - min_val).abs() < f64::EPSILON {
        return vec![HistogramBin {
            lower: min_val,
            upper: max_val,
            count: sorted.len() as u32,
            frequency: 1.0,
        }];
    }

    let bin_width = (max_val - min_val) / num_bins as f64;
    let n = sorted.len() as f64;

    let mut bins: Vec<HistogramBin> = (0..num_bins)
        .map(|i| HistogramBin {
            lower: min_val + i as f64 * bin_width,
            upper: if i == num_bins - 1 {
                max_val
            } else {
                min_val + (i + 1) as f64 * bin_width
            },
            count: 0,
            frequency: 0.0,
        })
        .collect();

    for &val in sorted {
        let idx = (((val - min_val) / bin_width).floor() as usize).min(num_bins - 1);
        bins[idx].count += 1;
    }
    for bin in &mut bins {
        bin.frequency = bin.count as f64 / n;
    }
    bins
}

fn sort_values(values: &mut [f64]) {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
}

/// Population statistics of `values` (sorted in place).
pub fn distribution_stats(values: &mut [f64], name: &str) -> DevFlowResult<DistributionStats> {
    if values.is_empty() {
        return Err(DevFlowError::InsufficientData(format!(
            "No samples to summarise for {name}"
        )));
    }
    sort_values(values);
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let median = percentile_sorted(values, 50.0);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    let (skewness, kurtosis) = if std_dev > f64::EPSILON {
        let moment = |k: i32| values.iter().map(|v| ((v - mean) / std_dev).powi(k)).sum::<f64>() / n;
        (moment(3), moment(4) - 3.0)
    } else {
        (0.0, 0.0)
    };

    Ok(DistributionStats {
        count: values.len(),
        mean,
        median,
        std_dev,
        min: values[0],
        max: values[values.len() - 1],
        percentiles: Percentiles {
            p5: percentile_sorted(values, 5.0),
            p10: percentile_sorted(values, 10.0),
            p25: percentile_sorted(values, 25.0),
            p50: percentile_sorted(values, 50.0),
            p75: percentile_sorted(values, 75.0),
            p90: percentile_sorted(values, 90.0),
            p95: percentile_sorted(values, 95.0),
        },
        skewness,
        kurtosis,
        histogram: build_histogram(values, HISTOGRAM_BINS),
    })
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Summarise the valid draws of a run. `confidence` (e.g. 0.95) sets the
/// tail used for value at risk and expected shortfall.
pub fn summarize(result: &SimulationResult, confidence: f64) -> DevFlowResult<SimulationSummary> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(DevFlowError::invalid(
            "confidence",
            "Must be strictly between 0 and 1",
        ));
    }
    if result.metrics.is_empty() {
        return Err(DevFlowError::InsufficientData(
            "Simulation produced no valid draws".into(),
        ));
    }

    let mut npvs: Vec<f64> = result
        .metrics
        .iter()
        .filter_map(|m| m.npv.to_f64())
        .collect();
    let mut irrs: Vec<f64> = result
        .metrics
        .iter()
        .filter_map(|m| m.irr.and_then(|r| r.to_f64()))
        .collect();
    let mut drawdowns: Vec<f64> = result
        .metrics
        .iter()
        .filter_map(|m| m.max_drawdown.to_f64())
        .collect();

    let npv = distribution_stats(&mut npvs, "npv")?;
    let irr_undefined = result.metrics.iter().filter(|m| m.irr.is_none()).count();
    let irr = if irrs.is_empty() {
        None
    } else {
        Some(distribution_stats(&mut irrs, "irr")?)
    };
    let max_drawdown = distribution_stats(&mut drawdowns, "max_drawdown")?;

    // npvs is sorted by distribution_stats.
    let losses = npvs.iter().filter(|v| **v < 0.0).count();
    let value_at_risk = percentile_sorted(&npvs, (1.0 - confidence) * 100.0);
    let tail: Vec<f64> = npvs.iter().copied().filter(|v| *v <= value_at_risk).collect();
    let expected_shortfall = if tail.is_empty() {
        value_at_risk
    } else {
        tail.iter().sum::<f64>() / tail.len() as f64
    };

    Ok(SimulationSummary {
        seed: result.seed,
        requested: result.requested,
        valid: result.valid(),
        discarded: result.discarded.len(),
        aborted: result.aborted,
        npv,
        irr,
        irr_undefined,
        max_drawdown,
        never_breaks_even: result
            .metrics
            .iter()
            .filter(|m| m.break_even_month.is_none())
            .count(),
        probability_of_loss: losses as f64 / npvs.len() as f64,
        confidence,
        value_at_risk,
        expected_shortfall,
    })
}

/// Per-month percentile bands of cumulative cash across `ledgers`.
pub fn fan_chart(ledgers: &[CashflowLedger]) -> DevFlowResult<Vec<FanChartBand>> {
    let Some(first) = ledgers.first() else {
        return Err(DevFlowError::InsufficientData(
            "Fan chart needs at least one ledger".into(),
        ));
    };
    let months = first.len();
    if ledgers.iter().any(|l| l.len() != months) {
        return Err(DevFlowError::invalid(
            "ledgers",
            "All ledgers must cover the same months",
        ));
    }

    let mut bands = Vec::with_capacity(months);
    let mut column = Vec::with_capacity(ledgers.len());
    for m in 0..months {
        column.clear();
        for ledger in ledgers {
            let cash = ledger.rows[m].cumulative_cash;
            column.push(cash.to_f64().ok_or_else(|| {
                DevFlowError::InsufficientData(format!("Cumulative cash {cash} has no f64 value"))
            })?);
        }
        sort_values(&mut column);
        bands.push(FanChartBand {
            month: first.rows[m].month,
            p5: percentile_sorted(&column, 5.0),
            p25: percentile_sorted(&column, 25.0),
            p50: percentile_sorted(&column, 50.0),
            p75: percentile_sorted(&column, 75.0),
            p95: percentile_sorted(&column, 95.0),
        });
    }
    Ok(bands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cashflow::LandPaymentPlan;
    use crate::curves::CurveParams;
    use crate::monte_carlo::simulation::{MonteCarloEngine, PerturbationConfig};
    use crate::project::ScenarioInputs;
    use rust_decimal_macros::dec;

    fn base_inputs() -> ScenarioInputs {
        let sales = CurveParams {
            mode_month: 18.0,
            shape_alpha: 0.0,
            scale: 8.0,
            total_amount: dec!(1_000_000),
            horizon_months: 36,
            start_month: 0,
        };
        ScenarioInputs {
            cost: CurveParams {
                mode_month: 15.0,
                scale: 10.0,
                total_amount: dec!(600_000),
                ..sales.clone()
            },
            sales,
            land_plan: LandPaymentPlan::CashUpfront,
            land_value: dec!(100_000),
            horizon_months: 36,
            annual_rate: dec!(0.12),
        }
    }

    fn run(n: u32, retain: usize) -> SimulationResult {
        let config = PerturbationConfig {
            retain_ledgers: retain,
            ..PerturbationConfig::amounts(0.25, 0.15)
        };
        MonteCarloEngine::run(&base_inputs(), &config, n, Some(42)).unwrap()
    }

    #[test]
    fn test_percentile_sorted_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile_sorted(&v, 50.0), 3.0);
        assert_eq!(percentile_sorted(&v, 0.0), 1.0);
        assert_eq!(percentile_sorted(&v, 100.0), 5.0);
        assert!((percentile_sorted(&v, 10.0) - 1.4).abs() < 1e-12);
    }

    #[test]
    fn test_histogram_counts_every_sample() {
        let mut values: Vec<f64> = (0..1_000).map(|i| (i as f64).sin()).collect();
        let stats = distribution_stats(&mut values, "x").unwrap();
        assert_eq!(stats.histogram.len(), HISTOGRAM_BINS);
        assert_eq!(stats.histogram.iter().map(|b| b.count).sum::<u32>(), 1_000);
        let freq: f64 = stats.histogram.iter().map(|b| b.frequency).sum();
        assert!((freq - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_constant_sample_single_bin() {
        let mut values = vec![7.0; 10];
        let stats = distribution_stats(&mut values, "x").unwrap();
        assert_eq!(stats.histogram.len(), 1);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.skewness, 0.0);
    }

    #[test]
    fn test_empty_sample_is_insufficient() {
        let err = distribution_stats(&mut [], "npv").unwrap_err();
        assert!(matches!(err, DevFlowError::InsufficientData(_)));
    }

    #[test]
    fn test_summary_percentiles_ordered() {
        let summary = summarize(&run(500, 0), 0.95).unwrap();
        let p = &summary.npv.percentiles;
        assert!(p.p5 <= p.p10 && p.p10 <= p.p25 && p.p25 <= p.p50);
        assert!(p.p50 <= p.p75 && p.p75 <= p.p90 && p.p90 <= p.p95);
        assert_eq!(summary.valid, 500);
        assert_eq!(summary.npv.count, 500);
    }

    #[test]
    fn test_tail_risk_consistent() {
        let summary = summarize(&run(1_000, 0), 0.95).unwrap();
        assert!(summary.expected_shortfall <= summary.value_at_risk);
        assert!((summary.value_at_risk - summary.npv.percentiles.p5).abs() < 1e-6);
        assert!((0.0..=1.0).contains(&summary.probability_of_loss));
        // 25% sales volatility makes some losses likely.
        assert!(summary.probability_of_loss > 0.0);
    }

    #[test]
    fn test_irr_counts_add_up() {
        let summary = summarize(&run(300, 0), 0.9).unwrap();
        let defined = summary.irr.as_ref().map(|s| s.count).unwrap_or(0);
        assert_eq!(defined + summary.irr_undefined, 300);
    }

    #[test]
    fn test_invalid_confidence_rejected() {
        let result = run(10, 0);
        assert!(summarize(&result, 1.0).is_err());
        assert!(summarize(&result, 0.0).is_err());
    }

    #[test]
    fn test_fan_chart_bands_ordered() {
        let result = run(200, 200);
        let bands = fan_chart(result.ledgers.as_deref().unwrap()).unwrap();
        assert_eq!(bands.len(), 37);
        for b in &bands {
            assert!(b.p5 <= b.p25 && b.p25 <= b.p50 && b.p50 <= b.p75 && b.p75 <= b.p95);
        }
        // Month 0 only carries the unperturbed land payment.
        assert_eq!(bands[0].p5, -100_000.0);
        assert_eq!(bands[0].p95, -100_000.0);
    }

    #[test]
    fn test_fan_chart_rejects_empty_and_ragged() {
        assert!(fan_chart(&[]).is_err());
        let short = CashflowLedger {
            rows: run(1, 1).ledgers.unwrap()[0].rows[..10].to_vec(),
        };
        let full = run(1, 1).ledgers.unwrap().remove(0);
        assert!(fan_chart(&[full, short]).is_err());
    }

    #[test]
    fn test_empty_inputs_do_not_index() {
        assert!(percentile_sorted(&[], 50.0).is_nan());
        assert_eq!(percentile_sorted(&[3.0], 95.0), 3.0);
        assert!(build_histogram(&[], 10).is_empty());
        let bare = CashflowLedger { rows: Vec::new() };
        assert!(fan_chart(&[bare.clone(), bare]).unwrap().is_empty());
    }
}

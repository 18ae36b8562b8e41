use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::skew_normal::SkewNormal;
use crate::error::DevFlowError;
use crate::types::{Money, Month};
use crate::DevFlowResult;

/// Decimal places kept on interior curve points.
const CURVE_DP: u32 = 6;
/// Decimal places kept on the normalised CDF fraction before scaling.
const FRACTION_DP: u32 = 15;
/// Below this much probability mass inside the horizon the curve is rejected.
const MIN_MASS_IN_HORIZON: f64 = 1e-12;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Shape and size of a timing curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveParams {
    /// Month at which the density peaks (curve-local).
    pub mode_month: f64,
    /// Skew: positive back-loads the ramp, negative front-loads it.
    pub shape_alpha: f64,
    /// Spread of the bell; larger values stretch the cycle.
    pub scale: f64,
    /// Amount the cumulative curve reaches at `horizon_months`.
    pub total_amount: Money,
    /// Last month of the curve; points cover `0..=horizon_months`.
    pub horizon_months: Month,
    /// Project month at which the curve's month 0 sits.
    #[serde(default)]
    pub start_month: Month,
}

impl CurveParams {
    pub fn validate(&self) -> DevFlowResult<()> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(DevFlowError::invalid("scale", "Must be positive"));
        }
        if !self.mode_month.is_finite() {
            return Err(DevFlowError::invalid("mode_month", "Must be finite"));
        }
        if !self.shape_alpha.is_finite() {
            return Err(DevFlowError::invalid("shape_alpha", "Must be finite"));
        }
        if self.total_amount.is_sign_negative() && !self.total_amount.is_zero() {
            return Err(DevFlowError::invalid("total_amount", "Must be non-negative"));
        }
        if self.horizon_months == 0 {
            return Err(DevFlowError::invalid("horizon_months", "Must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurveKind {
    Cumulative,
    Incremental,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub month: Month,
    pub value: Money,
}

/// A timing curve at unit-month resolution over its own horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub kind: CurveKind,
    pub start_month: Month,
    pub points: Vec<CurvePoint>,
}

impl Curve {
    pub fn horizon_months(&self) -> Month {
        self.points.last().map(|p| p.month).unwrap_or(0)
    }

    pub fn values(&self) -> Vec<Money> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Total amount carried by the curve.
    pub fn total(&self) -> Money {
        match self.kind {
            CurveKind::Cumulative => self.points.last().map(|p| p.value).unwrap_or_default(),
            CurveKind::Incremental => self.points.iter().map(|p| p.value).sum(),
        }
    }

    /// Per-month increments; month 0 carries the curve's opening value.
    pub fn incremental(&self) -> Curve {
        if self.kind == CurveKind::Incremental {
            return self.clone();
        }
        let mut prev = Decimal::ZERO;
        let points = self
            .points
            .iter()
            .map(|p| {
                let inc = p.value - prev;
                prev = p.value;
                CurvePoint {
                    month: p.month,
                    value: inc,
                }
            })
            .collect();
        Curve {
            kind: CurveKind::Incremental,
            start_month: self.start_month,
            points,
        }
    }

    pub fn cumulative(&self) -> Curve {
        if self.kind == CurveKind::Cumulative {
            return self.clone();
        }
        let mut running = Decimal::ZERO;
        let points = self
            .points
            .iter()
            .map(|p| {
                running += p.value;
                CurvePoint {
                    month: p.month,
                    value: running,
                }
            })
            .collect();
        Curve {
            kind: CurveKind::Cumulative,
            start_month: self.start_month,
            points,
        }
    }

    /// Cumulative value at curve-local time `t`, linearly interpolated and
    /// clamped to the first and last points.
    pub fn value_at(&self, t: f64) -> Money {
        let cumulative;
        let curve = if self.kind == CurveKind::Cumulative {
            self
        } else {
            cumulative = self.cumulative();
            &cumulative
        };

        let (first, last) = match (curve.points.first(), curve.points.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Decimal::ZERO,
        };
        if t <= first.month as f64 {
            return first.value;
        }
        if t >= last.month as f64 {
            return last.value;
        }

        // First point strictly after t; both neighbours exist after the clamps.
        let upper = curve.points.partition_point(|p| p.month as f64 <= t);
        let below = upper.checked_sub(1).and_then(|i| curve.points.get(i));
        let (lo, hi) = match (below, curve.points.get(upper)) {
            (Some(lo), Some(hi)) => (lo, hi),
            _ => return last.value,
        };
        let span = hi.month as f64 - lo.month as f64;
        let frac = (t - lo.month as f64) / span;
        if span <= 0.0 || frac <= 0.0 {
            return lo.value;
        }
        let weight = Decimal::from_f64(frac).unwrap_or_default().round_dp(FRACTION_DP);
        lo.value + (hi.value - lo.value) * weight
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the cumulative S-curve for the given parameters.
///
/// The skew-normal CDF is sampled at every integer month and rescaled so the
/// curve starts at exactly 0 and ends at exactly `total_amount`, whatever
/// tail mass falls outside the horizon.
pub fn generate_cumulative(params: &CurveParams) -> DevFlowResult<Curve> {
    params.validate()?;

    let dist = SkewNormal::with_mode(params.mode_month, params.scale, params.shape_alpha)?;
    let horizon = params.horizon_months;
    let raw: Vec<f64> = (0..=horizon).map(|m| dist.cdf(m as f64)).collect();

    let base = raw[0];
    let span = raw[horizon as usize] - base;
    if !(span > MIN_MASS_IN_HORIZON) {
        return Err(DevFlowError::invalid(
            "mode_month",
            format!(
                "Curve has no mass inside months 0..={horizon} (mode {}, scale {})",
                params.mode_month, params.scale
            ),
        ));
    }

    let total = params.total_amount;
    let mut points = Vec::with_capacity(raw.len());
    let mut prev = Decimal::ZERO;
    for (m, r) in raw.iter().enumerate() {
        let month = m as Month;
        let value = if month == 0 {
            Decimal::ZERO
        } else if month == horizon {
            total
        } else {
            let fraction = ((r - base) / span).clamp(0.0, 1.0);
            let fraction = Decimal::from_f64(fraction)
                .unwrap_or_default()
                .round_dp(FRACTION_DP);
            (total * fraction).round_dp(CURVE_DP).clamp(prev, total)
        };
        prev = value;
        points.push(CurvePoint { month, value });
    }

    tracing::trace!(
        location = dist.location(),
        horizon,
        %total,
        "generated cumulative curve"
    );

    Ok(Curve {
        kind: CurveKind::Cumulative,
        start_month: params.start_month,
        points,
    })
}

/// Per-month amounts of the S-curve; they sum to exactly `total_amount`.
pub fn generate_incremental(params: &CurveParams) -> DevFlowResult<Curve> {
    Ok(generate_cumulative(params)?.incremental())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn params(mode: f64, alpha: f64, scale: f64, total: Money, horizon: Month) -> CurveParams {
        CurveParams {
            mode_month: mode,
            shape_alpha: alpha,
            scale,
            total_amount: total,
            horizon_months: horizon,
            start_month: 0,
        }
    }

    #[test]
    fn test_cumulative_endpoints_exact() {
        let curve = generate_cumulative(&params(18.0, 0.0, 8.0, dec!(1_000_000), 36)).unwrap();
        assert_eq!(curve.points.len(), 37);
        assert_eq!(curve.points[0].value, Decimal::ZERO);
        assert_eq!(curve.points[36].value, dec!(1_000_000));
        assert_eq!(curve.total(), dec!(1_000_000));
    }

    #[test]
    fn test_incremental_sums_to_total() {
        for (mode, alpha, scale) in [(10.0, 1.2, 6.0), (18.0, 2.5, 8.0), (16.0, -2.0, 8.0)] {
            let inc = generate_incremental(&params(mode, alpha, scale, dec!(734_512.33), 36)).unwrap();
            let sum: Money = inc.values().iter().copied().sum();
            assert_eq!(sum, dec!(734_512.33));
            assert!(inc.values().iter().all(|v| !v.is_sign_negative() || v.is_zero()));
        }
    }

    #[test]
    fn test_cumulative_is_non_decreasing() {
        let curve = generate_cumulative(&params(26.0, 3.5, 10.0, dec!(5_000_000), 36)).unwrap();
        for w in curve.points.windows(2) {
            assert!(w[1].value >= w[0].value);
        }
    }

    #[test]
    fn test_symmetric_curve_half_mass_at_mode() {
        // Mode centred in the horizon with no skew: half the amount by the mode.
        let curve = generate_cumulative(&params(18.0, 0.0, 8.0, dec!(1000), 36)).unwrap();
        assert!((curve.points[18].value - dec!(500)).abs() < dec!(0.001));
    }

    #[test]
    fn test_skew_shifts_timing() {
        let front = generate_cumulative(&params(18.0, -3.0, 8.0, dec!(1000), 36)).unwrap();
        let back = generate_cumulative(&params(18.0, 3.0, 8.0, dec!(1000), 36)).unwrap();
        assert!(front.points[18].value > back.points[18].value);
    }

    #[test]
    fn test_zero_total_gives_flat_curve() {
        let curve = generate_cumulative(&params(18.0, 0.0, 8.0, Decimal::ZERO, 36)).unwrap();
        assert!(curve.values().iter().all(|v| v.is_zero()));
    }

    #[test]
    fn test_rejects_invalid_params() {
        assert!(generate_cumulative(&params(18.0, 0.0, 0.0, dec!(1), 36)).is_err());
        assert!(generate_cumulative(&params(18.0, 0.0, 8.0, dec!(-1), 36)).is_err());
        assert!(generate_cumulative(&params(18.0, 0.0, 8.0, dec!(1), 0)).is_err());
    }

    #[test]
    fn test_rejects_curve_without_mass_in_horizon() {
        // Peak far beyond the horizon with a tiny spread.
        let result = generate_cumulative(&params(500.0, 0.0, 1.0, dec!(1), 36));
        assert!(matches!(result, Err(DevFlowError::InvalidParameter { .. })));
    }

    #[test]
    fn test_value_at_interpolates_and_clamps() {
        let curve = generate_cumulative(&params(10.0, 0.0, 4.0, dec!(1000), 20)).unwrap();
        let mid = curve.value_at(9.5);
        assert!(mid >= curve.points[9].value && mid <= curve.points[10].value);
        assert_eq!(curve.value_at(-3.0), Decimal::ZERO);
        assert_eq!(curve.value_at(45.0), dec!(1000));
        assert_eq!(curve.value_at(7.0), curve.points[7].value);
    }

    #[test]
    fn test_value_at_uses_point_months_on_sparse_curve() {
        let curve = Curve {
            kind: CurveKind::Cumulative,
            start_month: 0,
            points: vec![
                CurvePoint { month: 0, value: Decimal::ZERO },
                CurvePoint { month: 10, value: dec!(100) },
            ],
        };
        assert_eq!(curve.value_at(5.0), dec!(50));
        assert_eq!(curve.value_at(2.5), dec!(25));
        assert_eq!(curve.value_at(10.0), dec!(100));
    }

    #[test]
    fn test_incremental_round_trips_to_cumulative() {
        let cum = generate_cumulative(&params(12.0, 1.0, 5.0, dec!(250_000), 24)).unwrap();
        assert_eq!(cum.incremental().cumulative(), cum);
    }
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::land::LandPaymentPlan;
use crate::curves::{generate_cumulative, Curve, CurveParams};
use crate::error::DevFlowError;
use crate::types::{Money, Month};
use crate::DevFlowResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One month of the project cash flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub month: Month,
    pub sales: Money,
    pub cost_construction: Money,
    pub cost_land: Money,
    /// sales - cost_construction - cost_land
    pub net_flow: Money,
    /// Running sum of net_flow up to and including this month.
    pub cumulative_cash: Money,
}

/// Monthly cash-flow ledger over `0..=horizon_months`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowLedger {
    pub rows: Vec<LedgerRow>,
}

impl CashflowLedger {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn horizon_months(&self) -> Month {
        self.rows.last().map(|r| r.month).unwrap_or(0)
    }

    pub fn net_flows(&self) -> Vec<Money> {
        self.rows.iter().map(|r| r.net_flow).collect()
    }

    pub fn cumulative_cash(&self) -> Vec<Money> {
        self.rows.iter().map(|r| r.cumulative_cash).collect()
    }

    pub fn total_sales(&self) -> Money {
        self.rows.iter().map(|r| r.sales).sum()
    }

    pub fn total_construction_cost(&self) -> Money {
        self.rows.iter().map(|r| r.cost_construction).sum()
    }

    pub fn total_land_cost(&self) -> Money {
        self.rows.iter().map(|r| r.cost_land).sum()
    }

    pub fn final_cash(&self) -> Money {
        self.rows.last().map(|r| r.cumulative_cash).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Merge a sales curve, a construction cost curve and a land plan into the
/// monthly ledger.
///
/// Both curves are aligned on the project months `0..=horizon_months` by
/// linear interpolation at `month - curve.start_month`. A curve reaching
/// past the horizon books its remaining amount at the final month, so ledger
/// totals always equal curve totals.
pub fn build_monthly_cashflow(
    sales_curve: &Curve,
    cost_curve: &Curve,
    land_plan: &LandPaymentPlan,
    total_land_value: Money,
    horizon_months: Month,
) -> DevFlowResult<CashflowLedger> {
    if horizon_months == 0 {
        return Err(DevFlowError::invalid("horizon_months", "Must be at least 1"));
    }

    let sales = monthly_amounts(sales_curve, horizon_months, "sales_curve")?;
    let construction = monthly_amounts(cost_curve, horizon_months, "cost_curve")?;
    let land = land_plan.monthly_costs(total_land_value, horizon_months)?;
    let sales_factor = land_plan.sales_factor();

    let mut rows = Vec::with_capacity(horizon_months as usize + 1);
    let mut cumulative = Decimal::ZERO;
    for (m, ((sale, cost), land_cost)) in sales
        .into_iter()
        .zip(construction)
        .zip(land)
        .enumerate()
    {
        let sale = sale * sales_factor;
        let net_flow = sale - cost - land_cost;
        cumulative += net_flow;
        rows.push(LedgerRow {
            month: m as Month,
            sales: sale,
            cost_construction: cost,
            cost_land: land_cost,
            net_flow,
            cumulative_cash: cumulative,
        });
    }

    let ledger = CashflowLedger { rows };
    tracing::debug!(
        horizon_months,
        total_sales = %ledger.total_sales(),
        total_construction = %ledger.total_construction_cost(),
        total_land = %ledger.total_land_cost(),
        final_cash = %ledger.final_cash(),
        "built monthly cash-flow ledger"
    );
    Ok(ledger)
}

/// Generate both curves from their parameters and build the ledger.
pub fn build_from_params(
    sales: &CurveParams,
    cost: &CurveParams,
    land_plan: &LandPaymentPlan,
    total_land_value: Money,
    horizon_months: Month,
) -> DevFlowResult<CashflowLedger> {
    let sales_curve = generate_cumulative(sales)?;
    let cost_curve = generate_cumulative(cost)?;
    build_monthly_cashflow(
        &sales_curve,
        &cost_curve,
        land_plan,
        total_land_value,
        horizon_months,
    )
}

/// Per-month amounts of `curve` resampled onto `0..=horizon_months`.
fn monthly_amounts(curve: &Curve, horizon_months: Month, field: &str) -> DevFlowResult<Vec<Money>> {
    if curve.points.is_empty() {
        return Err(DevFlowError::invalid(field, "Curve has no points"));
    }
    if curve.points.windows(2).any(|w| w[1].month <= w[0].month) {
        return Err(DevFlowError::invalid(
            field,
            "Curve point months must be strictly increasing",
        ));
    }
    let cumulative = curve.cumulative();
    let total = cumulative.total();
    if total.is_sign_negative() && !total.is_zero() {
        return Err(DevFlowError::invalid(field, format!("Curve total {total} is negative")));
    }

    let offset = curve.start_month as f64;
    let mut aligned: Vec<Money> = (0..=horizon_months)
        .map(|m| cumulative.value_at(m as f64 - offset))
        .collect();
    if let Some(last) = aligned.last_mut() {
        *last = total;
    }

    let mut prev = Decimal::ZERO;
    Ok(aligned
        .into_iter()
        .map(|v| {
            let inc = v - prev;
            prev = v;
            inc
        })
        .collect())
}

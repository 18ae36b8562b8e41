use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cashflow::CashflowLedger;
use crate::time_value::{self, annualize, has_sign_change, irr_monthly};
use crate::types::{Money, Month, Rate};
use crate::DevFlowResult;

/// Scalar indicators derived from a ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetrics {
    /// Net present value at the requested annual rate.
    pub npv: Money,
    /// Annualised IRR, `None` when the flows admit no root.
    pub irr: Option<Rate>,
    /// Maximum equity injected before the project self-funds (positive).
    pub max_drawdown: Money,
    /// Month where the cumulative cash bottoms out, if it ever goes negative.
    pub drawdown_month: Option<Month>,
    /// First month at or after the trough with non-negative cumulative cash.
    pub break_even_month: Option<Month>,
}

/// NPV of the ledger's net flows at an annual rate, converted to its
/// effective monthly equivalent; month 0 is undiscounted.
pub fn npv(ledger: &CashflowLedger, annual_rate: Rate) -> DevFlowResult<Money> {
    let monthly = time_value::monthly_rate(annual_rate)?;
    time_value::npv(monthly, &ledger.net_flows())
}

/// Annualised IRR of the ledger's net flows.
///
/// Returns `None` when the flows never change sign or the root finder
/// cannot bracket a root. An undefined IRR is a legitimate outcome, not an
/// error.
pub fn irr(ledger: &CashflowLedger) -> Option<Rate> {
    let flows = ledger.net_flows();
    if !has_sign_change(&flows) {
        tracing::trace!("IRR undefined: net flows never change sign");
        return None;
    }
    match irr_monthly(&flows) {
        Ok(monthly) => Decimal::from_f64(annualize(monthly)),
        Err(e) => {
            tracing::debug!(error = %e, "IRR undefined");
            None
        }
    }
}

/// Deepest cumulative cash deficit as a positive amount (0 when the project
/// never goes negative).
pub fn max_drawdown(ledger: &CashflowLedger) -> Money {
    ledger
        .rows
        .iter()
        .map(|r| r.cumulative_cash)
        .min()
        .map(|min| (-min).max(Decimal::ZERO))
        .unwrap_or_default()
}

/// First month where the cumulative cash reaches its minimum, when negative.
pub fn drawdown_month(ledger: &CashflowLedger) -> Option<Month> {
    let min = ledger.rows.iter().map(|r| r.cumulative_cash).min()?;
    if min >= Decimal::ZERO {
        return None;
    }
    ledger
        .rows
        .iter()
        .find(|r| r.cumulative_cash == min)
        .map(|r| r.month)
}

/// First month from the trough onwards where cumulative cash is back to
/// zero or above. `Some(0)` for projects that never need funding, `None`
/// for projects that never recover.
pub fn break_even_month(ledger: &CashflowLedger) -> Option<Month> {
    if ledger.is_empty() {
        return None;
    }
    let Some(trough) = drawdown_month(ledger) else {
        return Some(0);
    };
    ledger
        .rows
        .iter()
        .skip(trough as usize)
        .find(|r| r.cumulative_cash >= Decimal::ZERO)
        .map(|r| r.month)
}

pub fn compute_metrics(ledger: &CashflowLedger, annual_rate: Rate) -> DevFlowResult<FinancialMetrics> {
    Ok(FinancialMetrics {
        npv: npv(ledger, annual_rate)?,
        irr: irr(ledger),
        max_drawdown: max_drawdown(ledger),
        drawdown_month: drawdown_month(ledger),
        break_even_month: break_even_month(ledger),
    })
}

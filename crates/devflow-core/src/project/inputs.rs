use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cashflow::{build_from_params, CashflowLedger, LandPaymentPlan};
use crate::curves::CurveParams;
use crate::error::DevFlowError;
use crate::metrics::{compute_metrics, FinancialMetrics};
use crate::types::{Money, Month, Rate};
use crate::DevFlowResult;

/// Everything one deterministic pipeline run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioInputs {
    pub sales: CurveParams,
    pub cost: CurveParams,
    #[serde(default)]
    pub land_plan: LandPaymentPlan,
    pub land_value: Money,
    pub horizon_months: Month,
    pub annual_rate: Rate,
}

impl ScenarioInputs {
    pub fn validate(&self) -> DevFlowResult<()> {
        self.sales.validate()?;
        self.cost.validate()?;
        if self.horizon_months == 0 {
            return Err(DevFlowError::invalid("horizon_months", "Must be at least 1"));
        }
        if self.land_value < Decimal::ZERO {
            return Err(DevFlowError::invalid("land_value", "Must be non-negative"));
        }
        if self.annual_rate <= -Decimal::ONE {
            return Err(DevFlowError::invalid(
                "annual_rate",
                "Discount rate must be greater than -100%",
            ));
        }
        self.land_plan.validate(self.horizon_months)
    }

    /// Curves, ledger and metrics for these inputs.
    pub fn evaluate(&self) -> DevFlowResult<(CashflowLedger, FinancialMetrics)> {
        let ledger = build_from_params(
            &self.sales,
            &self.cost,
            &self.land_plan,
            self.land_value,
            self.horizon_months,
        )?;
        let metrics = compute_metrics(&ledger, self.annual_rate)?;
        Ok((ledger, metrics))
    }

    /// Copy with the sales and construction totals scaled by the given factors.
    pub fn with_scaled_totals(&self, sales_factor: Decimal, cost_factor: Decimal) -> Self {
        let mut out = self.clone();
        out.sales.total_amount *= sales_factor;
        out.cost.total_amount *= cost_factor;
        out
    }
}

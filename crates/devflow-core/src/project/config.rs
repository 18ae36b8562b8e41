use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::inputs::ScenarioInputs;
use crate::cashflow::LandPaymentPlan;
use crate::curves::{CostProfile, LandPreset, SalesProfile, ShapeParams, ShapePreset};
use crate::error::DevFlowError;
use crate::types::{Money, Month, Rate};
use crate::DevFlowResult;

/// Timing curve chosen either by preset name or by explicit shape values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CurveShape<P> {
    Preset {
        profile: P,
    },
    Custom {
        mode_month: f64,
        shape_alpha: f64,
        scale: f64,
    },
}

impl<P: ShapePreset> CurveShape<P> {
    pub fn shape(&self) -> ShapeParams {
        match self {
            CurveShape::Preset { profile } => profile.shape(),
            CurveShape::Custom {
                mode_month,
                shape_alpha,
                scale,
            } => ShapeParams {
                mode_month: *mode_month,
                shape_alpha: *shape_alpha,
                scale: *scale,
            },
        }
    }
}

/// Land payment given as a preset name (`"installments"`) or a full plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LandPlanChoice {
    Preset(LandPreset),
    Plan(LandPaymentPlan),
}

impl Default for LandPlanChoice {
    fn default() -> Self {
        LandPlanChoice::Preset(LandPreset::Cash)
    }
}

impl LandPlanChoice {
    pub fn resolve(&self) -> LandPaymentPlan {
        match self {
            LandPlanChoice::Preset(p) => p.plan(),
            LandPlanChoice::Plan(plan) => plan.clone(),
        }
    }
}

/// Business description of a development project.
///
/// Areas are in m², prices and costs per m². Every field has a default so a
/// partial JSON document is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub land_area_m2: Decimal,
    /// Floor-area ratio (FOT): buildable m² per m² of land.
    pub buildable_ratio: Decimal,
    /// Sellable share of the buildable area.
    pub efficiency: Decimal,
    pub horizon_months: Month,
    pub construction_start: Month,
    pub construction_months: Month,
    pub sale_price_per_m2: Money,
    pub sales_curve: CurveShape<SalesProfile>,
    pub construction_cost_per_m2: Money,
    /// Construction curve; its mode is counted from `construction_start`.
    pub cost_curve: CurveShape<CostProfile>,
    pub land_plan: LandPlanChoice,
    pub land_value: Money,
    pub annual_rate: Rate,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            land_area_m2: dec!(350),
            buildable_ratio: dec!(3.5),
            efficiency: dec!(0.80),
            horizon_months: 36,
            construction_start: 0,
            construction_months: 30,
            sale_price_per_m2: dec!(1800),
            sales_curve: CurveShape::Preset {
                profile: SalesProfile::Classic,
            },
            construction_cost_per_m2: dec!(950),
            cost_curve: CurveShape::Preset {
                profile: CostProfile::StandardS,
            },
            land_plan: LandPlanChoice::default(),
            land_value: dec!(350_000),
            annual_rate: dec!(0.10),
        }
    }
}

/// Areas and totals derived from a [`ProjectConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaBreakdown {
    pub buildable_area_m2: Decimal,
    pub sellable_area_m2: Decimal,
    pub gross_sales: Money,
    pub construction_total: Money,
}

impl ProjectConfig {
    pub fn validate(&self) -> DevFlowResult<()> {
        if self.land_area_m2 <= Decimal::ZERO {
            return Err(DevFlowError::invalid("land_area_m2", "Must be positive"));
        }
        if self.buildable_ratio <= Decimal::ZERO {
            return Err(DevFlowError::invalid("buildable_ratio", "Must be positive"));
        }
        if self.efficiency <= Decimal::ZERO || self.efficiency > Decimal::ONE {
            return Err(DevFlowError::invalid("efficiency", "Must be in (0, 1]"));
        }
        if self.horizon_months == 0 {
            return Err(DevFlowError::invalid("horizon_months", "Must be at least 1"));
        }
        if self.construction_months == 0 {
            return Err(DevFlowError::invalid(
                "construction_months",
                "Must be at least 1",
            ));
        }
        if self.construction_start > self.horizon_months {
            return Err(DevFlowError::invalid(
                "construction_start",
                format!(
                    "Month {} is after the end of the project ({})",
                    self.construction_start, self.horizon_months
                ),
            ));
        }
        if self.sale_price_per_m2 < Decimal::ZERO {
            return Err(DevFlowError::invalid("sale_price_per_m2", "Must be non-negative"));
        }
        if self.construction_cost_per_m2 < Decimal::ZERO {
            return Err(DevFlowError::invalid(
                "construction_cost_per_m2",
                "Must be non-negative",
            ));
        }
        Ok(())
    }

    pub fn areas(&self) -> AreaBreakdown {
        let buildable = self.land_area_m2 * self.buildable_ratio;
        let sellable = buildable * self.efficiency;
        AreaBreakdown {
            buildable_area_m2: buildable,
            sellable_area_m2: sellable,
            gross_sales: sellable * self.sale_price_per_m2,
            construction_total: buildable * self.construction_cost_per_m2,
        }
    }

    /// Last project month of the construction window.
    pub fn construction_end(&self) -> Month {
        self.construction_start + self.construction_months
    }

    /// Curve parameters and land terms for the cash-flow pipeline. Sales run
    /// over the whole project, construction over its own window.
    pub fn scenario_inputs(&self) -> DevFlowResult<ScenarioInputs> {
        self.validate()?;
        let areas = self.areas();

        let sales = self
            .sales_curve
            .shape()
            .params(areas.gross_sales, self.horizon_months);
        let mut cost = self
            .cost_curve
            .shape()
            .params(areas.construction_total, self.construction_months);
        cost.start_month = self.construction_start;

        Ok(ScenarioInputs {
            sales,
            cost,
            land_plan: self.land_plan.resolve(),
            land_value: self.land_value,
            horizon_months: self.horizon_months,
            annual_rate: self.annual_rate,
        })
    }

    /// Non-fatal remarks about the configuration.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.construction_end() > self.horizon_months {
            warnings.push(format!(
                "Construction ends at month {} after the project horizon ({}); remaining cost is booked at month {}",
                self.construction_end(),
                self.horizon_months,
                self.horizon_months
            ));
        }
        if let LandPaymentPlan::Swap { .. } = self.land_plan.resolve() {
            if !self.land_value.is_zero() {
                warnings.push(
                    "Land is paid by swap; land_value is not charged as cash".to_string(),
                );
            }
        }
        warnings
    }
}

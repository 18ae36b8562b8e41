//! Named parameter bundles for common sales, construction and land profiles.
//!
//! Presets are data only. Each one resolves to a plain [`CurveParams`] or
//! [`LandPaymentPlan`] that callers are free to tweak afterwards.

use std::fmt;
use std::str::FromStr;

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::factory::CurveParams;
use crate::cashflow::land::{LandInstallment, LandPaymentPlan};
use crate::error::DevFlowError;
use crate::types::{Money, Month};

/// Shape constants of a curve preset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeParams {
    pub mode_month: f64,
    pub shape_alpha: f64,
    pub scale: f64,
}

impl ShapeParams {
    pub fn params(&self, total_amount: Money, horizon_months: Month) -> CurveParams {
        CurveParams {
            mode_month: self.mode_month,
            shape_alpha: self.shape_alpha,
            scale: self.scale,
            total_amount,
            horizon_months,
            start_month: 0,
        }
    }
}

/// A named curve shape.
pub trait ShapePreset {
    fn shape(&self) -> ShapeParams;

    fn curve_params(&self, total_amount: Money, horizon_months: Month) -> CurveParams {
        self.shape().params(total_amount, horizon_months)
    }
}

// ---------------------------------------------------------------------------
// Sales absorption
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalesProfile {
    /// High early absorption while the project is still off-plan.
    StrongPreSale,
    /// Slow start that accelerates towards handover.
    Classic,
    /// Most units sold once construction is finished.
    PostConstruction,
}

impl SalesProfile {
    pub const ALL: [SalesProfile; 3] = [
        SalesProfile::StrongPreSale,
        SalesProfile::Classic,
        SalesProfile::PostConstruction,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SalesProfile::StrongPreSale => "strong_pre_sale",
            SalesProfile::Classic => "classic",
            SalesProfile::PostConstruction => "post_construction",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SalesProfile::StrongPreSale => "High early absorption (mode 10, alpha 1.2)",
            SalesProfile::Classic => "Slow start, accelerating towards handover (mode 18, alpha 2.5)",
            SalesProfile::PostConstruction => "Sales mostly after completion (mode 26, alpha 3.5)",
        }
    }
}

impl ShapePreset for SalesProfile {
    fn shape(&self) -> ShapeParams {
        match self {
            SalesProfile::StrongPreSale => ShapeParams {
                mode_month: 10.0,
                shape_alpha: 1.2,
                scale: 6.0,
            },
            SalesProfile::Classic => ShapeParams {
                mode_month: 18.0,
                shape_alpha: 2.5,
                scale: 8.0,
            },
            SalesProfile::PostConstruction => ShapeParams {
                mode_month: 26.0,
                shape_alpha: 3.5,
                scale: 10.0,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Construction spend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostProfile {
    /// Balanced execution.
    StandardS,
    /// Structure and material stockpiling up front.
    HeavyFront,
    /// Slow close-out with long finishing works.
    LongTail,
}

impl CostProfile {
    pub const ALL: [CostProfile; 3] = [
        CostProfile::StandardS,
        CostProfile::HeavyFront,
        CostProfile::LongTail,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CostProfile::StandardS => "standard_s",
            CostProfile::HeavyFront => "heavy_front",
            CostProfile::LongTail => "long_tail",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CostProfile::StandardS => "Standard S-curve, balanced execution (mode 20)",
            CostProfile::HeavyFront => "Heavy early spend on structure and stockpiles (mode 16)",
            CostProfile::LongTail => "Slow close-out and long finishing works (mode 24)",
        }
    }
}

impl ShapePreset for CostProfile {
    fn shape(&self) -> ShapeParams {
        match self {
            CostProfile::StandardS => ShapeParams {
                mode_month: 20.0,
                shape_alpha: -0.5,
                scale: 9.0,
            },
            CostProfile::HeavyFront => ShapeParams {
                mode_month: 16.0,
                shape_alpha: -2.0,
                scale: 8.0,
            },
            CostProfile::LongTail => ShapeParams {
                mode_month: 24.0,
                shape_alpha: 1.5,
                scale: 11.0,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Land payment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandPreset {
    /// 100% paid at month 0.
    Cash,
    /// 30% down, 30% at month 12, 40% at month 24.
    Installments,
    /// 30% of the built area handed over instead of cash.
    #[serde(rename = "swap_30")]
    Swap30,
}

impl LandPreset {
    pub const ALL: [LandPreset; 3] = [LandPreset::Cash, LandPreset::Installments, LandPreset::Swap30];

    pub fn name(&self) -> &'static str {
        match self {
            LandPreset::Cash => "cash",
            LandPreset::Installments => "installments",
            LandPreset::Swap30 => "swap_30",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            LandPreset::Cash => "Full payment up front (month 0)",
            LandPreset::Installments => "30% down + 30% at month 12 + 40% at month 24",
            LandPreset::Swap30 => "Swap of 30% of the project area (no cash outflow)",
        }
    }

    pub fn plan(&self) -> LandPaymentPlan {
        match self {
            LandPreset::Cash => LandPaymentPlan::CashUpfront,
            LandPreset::Installments => LandPaymentPlan::Installments {
                schedule: vec![
                    LandInstallment {
                        month: 0,
                        fraction: dec!(0.30),
                    },
                    LandInstallment {
                        month: 12,
                        fraction: dec!(0.30),
                    },
                    LandInstallment {
                        month: 24,
                        fraction: dec!(0.40),
                    },
                ],
            },
            LandPreset::Swap30 => LandPaymentPlan::Swap {
                area_fraction: dec!(0.30),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Lookup by name
// ---------------------------------------------------------------------------

fn unknown_preset(kind: &str, name: &str, known: &[&str]) -> DevFlowError {
    DevFlowError::invalid(
        kind,
        format!("Unknown preset '{name}' (expected one of: {})", known.join(", ")),
    )
}

macro_rules! preset_name_impls {
    ($ty:ty, $kind:literal) => {
        impl FromStr for $ty {
            type Err = DevFlowError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_lowercase().replace('-', "_");
                <$ty>::ALL
                    .into_iter()
                    .find(|p| p.name() == wanted)
                    .ok_or_else(|| {
                        let known: Vec<&str> = <$ty>::ALL.iter().map(|p| p.name()).collect();
                        unknown_preset($kind, s, &known)
                    })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

preset_name_impls!(SalesProfile, "sales_profile");
preset_name_impls!(CostProfile, "cost_profile");
preset_name_impls!(LandPreset, "land_preset");

/// Catalog entry listing a preset and its constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetEntry {
    pub category: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<ShapeParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub land_plan: Option<LandPaymentPlan>,
}

/// Every preset in a flat list, for listing in front ends.
pub fn catalog() -> Vec<PresetEntry> {
    let sales = SalesProfile::ALL.iter().map(|p| PresetEntry {
        category: "sales".into(),
        name: p.name().into(),
        description: p.description().into(),
        shape: Some(p.shape()),
        land_plan: None,
    });
    let cost = CostProfile::ALL.iter().map(|p| PresetEntry {
        category: "cost".into(),
        name: p.name().into(),
        description: p.description().into(),
        shape: Some(p.shape()),
        land_plan: None,
    });
    let land = LandPreset::ALL.iter().map(|p| PresetEntry {
        category: "land".into(),
        name: p.name().into(),
        description: p.description().into(),
        shape: None,
        land_plan: Some(p.plan()),
    });
    sales.chain(cost).chain(land).collect()
}

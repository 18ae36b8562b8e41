use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::DevFlowError;
use crate::types::{Money, Month, Rate};
use crate::DevFlowResult;

/// Allowed gap between the installment fractions' sum and 1.
const FRACTION_SUM_TOLERANCE: Decimal = dec!(0.000000001);

/// A single scheduled land payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandInstallment {
    pub month: Month,
    /// Share of the land value paid at `month` (0.30 = 30%).
    pub fraction: Rate,
}

/// How the land is paid for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LandPaymentPlan {
    /// Whole land value charged at month 0.
    #[default]
    CashUpfront,
    /// Land value split over scheduled months; fractions sum to 1.
    Installments { schedule: Vec<LandInstallment> },
    /// Land paid with a share of the built area. No cash cost; every month's
    /// sales are reduced by `area_fraction`.
    Swap { area_fraction: Rate },
}

impl LandPaymentPlan {
    /// Down payment at month 0 and the remainder in `count` equal monthly
    /// installments starting at `first_month`.
    pub fn down_payment_with_installments(
        down_payment: Rate,
        count: u32,
        first_month: Month,
    ) -> DevFlowResult<Self> {
        if down_payment < Decimal::ZERO || down_payment > Decimal::ONE {
            return Err(DevFlowError::invalid("down_payment", "Must be between 0 and 1"));
        }
        let remainder = Decimal::ONE - down_payment;
        if count == 0 && !remainder.is_zero() {
            return Err(DevFlowError::invalid(
                "count",
                "At least one installment is needed for the remaining balance",
            ));
        }

        let mut schedule = Vec::with_capacity(count as usize + 1);
        if !down_payment.is_zero() {
            schedule.push(LandInstallment {
                month: 0,
                fraction: down_payment,
            });
        }
        if !remainder.is_zero() {
            let each = remainder / Decimal::from(count);
            let mut allocated = Decimal::ZERO;
            for i in 0..count {
                // Last installment takes the rounding residue.
                let fraction = if i + 1 == count {
                    remainder - allocated
                } else {
                    each
                };
                allocated += fraction;
                schedule.push(LandInstallment {
                    month: first_month + i,
                    fraction,
                });
            }
        }

        Ok(LandPaymentPlan::Installments { schedule })
    }

    pub fn validate(&self, horizon_months: Month) -> DevFlowResult<()> {
        match self {
            LandPaymentPlan::CashUpfront => Ok(()),
            LandPaymentPlan::Installments { schedule } => {
                if schedule.is_empty() {
                    return Err(DevFlowError::invalid(
                        "land_plan.schedule",
                        "Installment schedule is empty",
                    ));
                }
                let mut sum = Decimal::ZERO;
                for (i, inst) in schedule.iter().enumerate() {
                    if inst.month > horizon_months {
                        return Err(DevFlowError::invalid(
                            format!("land_plan.schedule[{i}].month"),
                            format!(
                                "Month {} is outside the project timeline 0..={horizon_months}",
                                inst.month
                            ),
                        ));
                    }
                    if inst.fraction <= Decimal::ZERO || inst.fraction > Decimal::ONE {
                        return Err(DevFlowError::invalid(
                            format!("land_plan.schedule[{i}].fraction"),
                            "Must be in (0, 1]",
                        ));
                    }
                    sum += inst.fraction;
                }
                if (sum - Decimal::ONE).abs() > FRACTION_SUM_TOLERANCE {
                    return Err(DevFlowError::invalid(
                        "land_plan.schedule",
                        format!("Fractions sum to {sum}, expected 1"),
                    ));
                }
                Ok(())
            }
            LandPaymentPlan::Swap { area_fraction } => {
                if *area_fraction < Decimal::ZERO || *area_fraction >= Decimal::ONE {
                    return Err(DevFlowError::invalid(
                        "land_plan.area_fraction",
                        "Must be in [0, 1)",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Multiplier applied to every month's sales.
    pub fn sales_factor(&self) -> Rate {
        match self {
            LandPaymentPlan::Swap { area_fraction } => Decimal::ONE - area_fraction,
            _ => Decimal::ONE,
        }
    }

    /// Cash land cost per month over `0..=horizon_months`.
    pub fn monthly_costs(
        &self,
        total_land_value: Money,
        horizon_months: Month,
    ) -> DevFlowResult<Vec<Money>> {
        self.validate(horizon_months)?;
        if total_land_value < Decimal::ZERO {
            return Err(DevFlowError::invalid("total_land_value", "Must be non-negative"));
        }

        let mut costs = vec![Decimal::ZERO; horizon_months as usize + 1];
        match self {
            LandPaymentPlan::CashUpfront => costs[0] = total_land_value,
            LandPaymentPlan::Installments { schedule } => {
                for inst in schedule {
                    costs[inst.month as usize] += total_land_value * inst.fraction;
                }
            }
            LandPaymentPlan::Swap { .. } => {}
        }
        Ok(costs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_cash_upfront_charges_month_zero() {
        let costs = LandPaymentPlan::CashUpfront
            .monthly_costs(dec!(100_000), 12)
            .unwrap();
        assert_eq!(costs.len(), 13);
        assert_eq!(costs[0], dec!(100_000));
        assert!(costs[1..].iter().all(|c| c.is_zero()));
    }

    #[test]
    fn test_installments_distribute_value() {
        let plan = LandPaymentPlan::Installments {
            schedule: vec![
                LandInstallment { month: 0, fraction: dec!(0.3) },
                LandInstallment { month: 12, fraction: dec!(0.3) },
                LandInstallment { month: 24, fraction: dec!(0.4) },
            ],
        };
        let costs = plan.monthly_costs(dec!(350_000), 36).unwrap();
        assert_eq!(costs[0], dec!(105_000));
        assert_eq!(costs[12], dec!(105_000));
        assert_eq!(costs[24], dec!(140_000));
        assert_eq!(costs.iter().copied().sum::<Money>(), dec!(350_000));
    }

    #[test]
    fn test_installment_month_out_of_range() {
        let plan = LandPaymentPlan::Installments {
            schedule: vec![LandInstallment { month: 40, fraction: dec!(1) }],
        };
        let err = plan.monthly_costs(dec!(1), 36).unwrap_err();
        assert!(err.to_string().contains("outside the project timeline"));
    }

    #[test]
    fn test_fractions_must_sum_to_one() {
        let plan = LandPaymentPlan::Installments {
            schedule: vec![
                LandInstallment { month: 0, fraction: dec!(0.5) },
                LandInstallment { month: 6, fraction: dec!(0.4) },
            ],
        };
        assert!(plan.validate(12).is_err());
    }

    #[test]
    fn test_swap_has_no_cash_cost() {
        let plan = LandPaymentPlan::Swap { area_fraction: dec!(0.3) };
        let costs = plan.monthly_costs(dec!(500_000), 24).unwrap();
        assert!(costs.iter().all(|c| c.is_zero()));
        assert_eq!(plan.sales_factor(), dec!(0.7));
    }

    #[test]
    fn test_swap_fraction_bounds() {
        assert!(LandPaymentPlan::Swap { area_fraction: dec!(1) }.validate(12).is_err());
        assert!(LandPaymentPlan::Swap { area_fraction: dec!(-0.1) }.validate(12).is_err());
        assert!(LandPaymentPlan::Swap { area_fraction: dec!(0) }.validate(12).is_ok());
    }

    #[test]
    fn test_down_payment_with_installments_sums_exactly() {
        let plan = LandPaymentPlan::down_payment_with_installments(dec!(0.3), 7, 1).unwrap();
        plan.validate(12).unwrap();
        let LandPaymentPlan::Installments { schedule } = &plan else {
            panic!("expected installments");
        };
        assert_eq!(schedule.len(), 8);
        assert_eq!(schedule[0].month, 0);
        assert_eq!(schedule[7].month, 7);
        let sum: Decimal = schedule.iter().map(|i| i.fraction).sum();
        assert_eq!(sum, Decimal::ONE);
    }

    #[test]
    fn test_down_payment_needs_installments_for_balance() {
        assert!(LandPaymentPlan::down_payment_with_installments(dec!(0.5), 0, 1).is_err());
        assert!(LandPaymentPlan::down_payment_with_installments(dec!(1), 0, 1).is_ok());
    }

    #[test]
    fn test_serde_tagged_form() {
        let json = r#"{"type":"swap","area_fraction":"0.25"}"#;
        let plan: LandPaymentPlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan, LandPaymentPlan::Swap { area_fraction: dec!(0.25) });
    }
}

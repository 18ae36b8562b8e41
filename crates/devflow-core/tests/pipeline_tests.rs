use devflow_core::cashflow::{
    build_from_params, build_monthly_cashflow, CashflowLedger, LandInstallment, LandPaymentPlan,
};
use devflow_core::curves::{generate_cumulative, generate_incremental, CurveParams, SalesProfile, ShapePreset};
use devflow_core::metrics::{compute_metrics, irr, npv};
use devflow_core::{DevFlowError, Money};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn sales_params() -> CurveParams {
    CurveParams {
        mode_month: 18.0,
        shape_alpha: 0.0,
        scale: 8.0,
        total_amount: dec!(1_000_000),
        horizon_months: 36,
        start_month: 0,
    }
}

fn cost_params() -> CurveParams {
    CurveParams {
        mode_month: 15.0,
        shape_alpha: 0.0,
        scale: 10.0,
        total_amount: dec!(600_000),
        horizon_months: 36,
        start_month: 0,
    }
}

// ===========================================================================
// Curves
// ===========================================================================

#[test]
fn test_mass_conservation_across_shapes() {
    let shapes = [
        (4.0, -3.0, 2.0),
        (18.0, 0.0, 8.0),
        (30.0, 4.0, 12.0),
        (-5.0, 1.0, 6.0),
        (40.0, -1.0, 9.0),
    ];
    for (mode, alpha, scale) in shapes {
        let params = CurveParams {
            mode_month: mode,
            shape_alpha: alpha,
            scale,
            total_amount: dec!(987_654.321),
            ..sales_params()
        };
        let cumulative = generate_cumulative(&params).unwrap();
        assert_eq!(cumulative.points[0].value, Decimal::ZERO);
        assert_eq!(cumulative.total(), dec!(987_654.321));
        for w in cumulative.points.windows(2) {
            assert!(w[1].value >= w[0].value, "not monotone for {mode}/{alpha}/{scale}");
        }
        let incremental = generate_incremental(&params).unwrap();
        let sum: Money = incremental.values().iter().copied().sum();
        assert_eq!(sum, dec!(987_654.321));
    }
}

// ===========================================================================
// Ledger
// ===========================================================================

#[test]
fn test_example_scenario() {
    let ledger =
        build_from_params(&sales_params(), &cost_params(), &LandPaymentPlan::CashUpfront, dec!(100_000), 36)
            .unwrap();
    assert_eq!(ledger.len(), 37);
    assert_eq!(ledger.rows[0].cumulative_cash, dec!(-100_000));
    assert_eq!(ledger.final_cash(), dec!(300_000));

    let metrics = compute_metrics(&ledger, dec!(0.12)).unwrap();
    assert!(metrics.max_drawdown >= dec!(100_000));
    assert!(metrics.npv > Decimal::ZERO);
    assert!(metrics.npv < dec!(300_000));
    let rate = metrics.irr.expect("sign change present");
    assert!(rate > dec!(0.12), "irr={rate}");
}

#[test]
fn test_ledger_conservation_under_swap() {
    let plan = LandPaymentPlan::Swap {
        area_fraction: dec!(0.25),
    };
    let ledger = build_from_params(&sales_params(), &cost_params(), &plan, dec!(100_000), 36).unwrap();
    assert_eq!(ledger.total_sales(), dec!(750_000));
    assert_eq!(ledger.total_construction_cost(), dec!(600_000));
    assert_eq!(ledger.final_cash(), dec!(150_000));
}

#[test]
fn test_single_installment_at_month_zero_equals_cash() {
    let cash =
        build_from_params(&sales_params(), &cost_params(), &LandPaymentPlan::CashUpfront, dec!(250_000), 36)
            .unwrap();
    let installments = LandPaymentPlan::Installments {
        schedule: vec![LandInstallment {
            month: 0,
            fraction: dec!(1),
        }],
    };
    let scheduled = build_from_params(&sales_params(), &cost_params(), &installments, dec!(250_000), 36).unwrap();
    assert_eq!(cash, scheduled);
    assert_eq!(
        compute_metrics(&cash, dec!(0.1)).unwrap(),
        compute_metrics(&scheduled, dec!(0.1)).unwrap()
    );
}

#[test]
fn test_later_land_payments_raise_npv() {
    let cash =
        build_from_params(&sales_params(), &cost_params(), &LandPaymentPlan::CashUpfront, dec!(250_000), 36)
            .unwrap();
    let deferred = LandPaymentPlan::down_payment_with_installments(dec!(0.3), 7, 6).unwrap();
    let spread = build_from_params(&sales_params(), &cost_params(), &deferred, dec!(250_000), 36).unwrap();
    assert_eq!(spread.total_land_cost(), dec!(250_000));
    assert!(npv(&spread, dec!(0.1)).unwrap() > npv(&cash, dec!(0.1)).unwrap());
}

#[test]
fn test_construction_window_inside_project() {
    let sales = generate_cumulative(&SalesProfile::Classic.curve_params(dec!(2_000_000), 36)).unwrap();
    let cost = generate_cumulative(&CurveParams {
        mode_month: 12.0,
        shape_alpha: -0.5,
        scale: 6.0,
        total_amount: dec!(1_200_000),
        horizon_months: 24,
        start_month: 6,
    })
    .unwrap();
    let ledger = build_monthly_cashflow(&sales, &cost, &LandPaymentPlan::CashUpfront, dec!(0), 36).unwrap();
    assert_eq!(ledger.total_construction_cost(), dec!(1_200_000));
    assert!(ledger.rows[..=6].iter().all(|r| r.cost_construction.is_zero()));
    assert!(ledger.rows[31..].iter().all(|r| r.cost_construction.is_zero()));
}

// ===========================================================================
// Metrics
// ===========================================================================

#[test]
fn test_npv_strictly_decreasing_in_rate() {
    let ledger =
        build_from_params(&sales_params(), &cost_params(), &LandPaymentPlan::CashUpfront, dec!(100_000), 36)
            .unwrap();
    let rates = [dec!(0), dec!(0.05), dec!(0.10), dec!(0.20), dec!(0.40)];
    let values: Vec<Money> = rates.iter().map(|r| npv(&ledger, *r).unwrap()).collect();
    for w in values.windows(2) {
        assert!(w[0] > w[1], "{} !> {}", w[0], w[1]);
    }
    assert_eq!(values[0], ledger.final_cash());
}

#[test]
fn test_irr_zeroes_npv() {
    let plan = LandPaymentPlan::Installments {
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
    };
    let ledger = build_from_params(&sales_params(), &cost_params(), &plan, dec!(150_000), 36).unwrap();
    let rate = irr(&ledger).unwrap();
    assert!(npv(&ledger, rate).unwrap().abs() < dec!(0.01));
}

fn long_ledger(horizon: u32) -> CashflowLedger {
    let h = horizon as f64;
    let sales = CurveParams {
        mode_month: 0.55 * h,
        scale: h / 5.0,
        horizon_months: horizon,
        ..sales_params()
    };
    let cost = CurveParams {
        mode_month: 0.40 * h,
        scale: h / 5.0,
        horizon_months: horizon,
        ..cost_params()
    };
    build_from_params(&sales, &cost, &LandPaymentPlan::CashUpfront, dec!(100_000), horizon).unwrap()
}

#[test]
fn test_irr_defined_over_long_horizons() {
    for horizon in [120, 240, 300] {
        let ledger = long_ledger(horizon);
        let rate = irr(&ledger).unwrap_or_else(|| panic!("no IRR at horizon {horizon}"));
        let residual = npv(&ledger, rate).unwrap();
        assert!(residual.abs() < dec!(10), "horizon={horizon} residual={residual}");
    }
}

#[test]
fn test_npv_at_extreme_rate_over_600_months() {
    let ledger = long_ledger(600);
    let value = npv(&ledger, dec!(5)).unwrap();
    assert!(value < Decimal::ZERO && value > dec!(-700_000), "value={value}");
    assert!(compute_metrics(&ledger, dec!(5)).is_ok());
}

#[test]
fn test_npv_near_minus_one_is_a_numerical_failure() {
    let ledger = long_ledger(360);
    let err = npv(&ledger, dec!(-0.9)).unwrap_err();
    assert!(matches!(err, DevFlowError::NumericalFailure { .. }));
    assert!(compute_metrics(&ledger, dec!(-0.9)).is_err());
}

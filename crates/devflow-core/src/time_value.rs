use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::DevFlowError;
use crate::types::{Money, Rate};
use crate::DevFlowResult;

const ROOT_TOLERANCE: f64 = 1e-12;
const MAX_BRENT_ITERATIONS: u32 = 200;

/// Monthly rates probed for an NPV sign change, in ascending order.
const IRR_GRID: [f64; 11] = [-0.95, -0.5, -0.2, -0.05, 0.0, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0];

/// Effective monthly rate equivalent to an annual rate: (1 + r)^(1/12) - 1
pub fn monthly_rate(annual_rate: Rate) -> DevFlowResult<Rate> {
    if annual_rate <= dec!(-1) {
        return Err(DevFlowError::invalid(
            "annual_rate",
            "Discount rate must be greater than -100%",
        ));
    }
    if annual_rate.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let one_plus = Decimal::ONE + annual_rate;
    Ok(one_plus.powd(Decimal::ONE / dec!(12)) - Decimal::ONE)
}

/// Annual rate equivalent to a monthly rate: (1 + r)^12 - 1
pub fn annualize(monthly: f64) -> f64 {
    (1.0 + monthly).powi(12) - 1.0
}

/// Net Present Value of monthly cash flows, month 0 undiscounted.
pub fn npv(monthly_rate: Rate, cash_flows: &[Money]) -> DevFlowResult<Money> {
    if monthly_rate <= dec!(-1) {
        return Err(DevFlowError::invalid(
            "monthly_rate",
            "Discount rate must be greater than -100%",
        ));
    }

    let failure = |t: usize| DevFlowError::NumericalFailure {
        function: "NPV".into(),
        iterations: t as u32,
        last_delta: 0.0,
    };

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + monthly_rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            match discount.checked_mul(one_plus_r) {
                Some(next) => discount = next,
                // Past Decimal::MAX every remaining term rounds below a cent.
                None if one_plus_r > Decimal::ONE => break,
                None => return Err(failure(t)),
            }
        }
        if discount.is_zero() {
            return Err(failure(t));
        }
        let term = cf.checked_div(discount).ok_or_else(|| failure(t))?;
        result = result.checked_add(term).ok_or_else(|| failure(t))?;
    }

    Ok(result)
}

/// Floating-point NPV used inside the root finder.
pub fn npv_f64(monthly_rate: f64, cash_flows: &[f64]) -> f64 {
    let one_plus_r = 1.0 + monthly_rate;
    let mut discount = 1.0_f64;
    let mut total = 0.0_f64;
    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount *= one_plus_r;
        }
        total += cf / discount;
    }
    total
}

/// True when the series holds at least one strictly positive and one strictly
/// negative flow.
pub fn has_sign_change(cash_flows: &[Money]) -> bool {
    let positive = cash_flows.iter().any(|cf| cf.is_sign_positive() && !cf.is_zero());
    let negative = cash_flows.iter().any(|cf| cf.is_sign_negative() && !cf.is_zero());
    positive && negative
}

/// Monthly Internal Rate of Return using Brent's method on a bounded bracket.
///
/// The NPV is evaluated at each rate of `IRR_GRID`, skipping rates where it
/// overflows, and Brent runs between the first neighbouring pair whose values
/// differ in sign. Fails with `NumericalFailure` when no pair brackets a root
/// or the iteration does not converge.
pub fn irr_monthly(cash_flows: &[Money]) -> DevFlowResult<f64> {
    if cash_flows.len() < 2 {
        return Err(DevFlowError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }

    let flows: Vec<f64> = cash_flows
        .iter()
        .map(|cf| cf.to_f64().unwrap_or(0.0))
        .collect();
    let objective = |r: f64| npv_f64(r, &flows);

    let mut previous: Option<(f64, f64)> = None;
    for rate in IRR_GRID {
        let value = objective(rate);
        if !value.is_finite() {
            continue;
        }
        if let Some((low, f_low)) = previous {
            if f_low * value <= 0.0 && f_low != value {
                return brent_root(objective, low, rate);
            }
        }
        previous = Some((rate, value));
    }

    Err(DevFlowError::NumericalFailure {
        function: "IRR bracket".into(),
        iterations: IRR_GRID.len() as u32,
        last_delta: previous.map_or(f64::NAN, |(_, f)| f),
    })
}

/// Brent's method: bisection, secant and inverse quadratic interpolation
/// combined. `f(lower)` and `f(upper)` must bracket a root.
pub fn brent_root<F: Fn(f64) -> f64>(f: F, lower: f64, upper: f64) -> DevFlowResult<f64> {
    let (mut a, mut b) = (lower, upper);
    let (mut fa, mut fb) = (f(a), f(b));

    if fa * fb > 0.0 {
        return Err(DevFlowError::NumericalFailure {
            function: "Brent".into(),
            iterations: 0,
            last_delta: fb,
        });
    }
    if fa == 0.0 {
        return Ok(a);
    }
    if fb == 0.0 {
        return Ok(b);
    }

    let (mut c, mut fc) = (b, fb);
    let mut d = b - a;
    let mut e = d;

    for _ in 0..MAX_BRENT_ITERATIONS {
        if (fb > 0.0 && fc > 0.0) || (fb < 0.0 && fc < 0.0) {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol = 2.0 * f64::EPSILON * b.abs() + 0.5 * ROOT_TOLERANCE;
        let xm = 0.5 * (c - b);
        if xm.abs() <= tol || fb == 0.0 {
            return Ok(b);
        }

        if e.abs() >= tol && fa.abs() > fb.abs() {
            let s = fb / fa;
            let (mut p, mut q) = if a == c {
                (2.0 * xm * s, 1.0 - s)
            } else {
                let q = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * xm * q * (q - r) - (b - a) * (r - 1.0)),
                    (q - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            }
            p = p.abs();
            let min1 = 3.0 * xm * q - (tol * q).abs();
            let min2 = (e * q).abs();
            if 2.0 * p < min1.min(min2) {
                e = d;
                d = p / q;
            } else {
                d = xm;
                e = d;
            }
        } else {
            d = xm;
            e = d;
        }

        a = b;
        fa = fb;
        b += if d.abs() > tol { d } else { tol.copysign(xm) };
        fb = f(b);
    }

    Err(DevFlowError::NumericalFailure {
        function: "Brent".into(),
        iterations: MAX_BRENT_ITERATIONS,
        last_delta: fb,
    })
}

use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use crate::error::DevFlowError;
use crate::DevFlowResult;

/// Quadrature intervals per unit of |shape| when integrating Owen's T.
const OWENS_T_INTERVALS_PER_UNIT: f64 = 128.0;
const OWENS_T_MIN_INTERVALS: usize = 8;
const OWENS_T_MAX_INTERVALS: usize = 8192;

const MODE_SEARCH_BOUND: f64 = 1.5;
const MODE_SEARCH_TOLERANCE: f64 = 1e-10;
const GOLDEN_RATIO_CONJUGATE: f64 = 0.618_033_988_749_894_9;

/// Skew-normal distribution SN(location, scale, shape).
///
/// `shape` > 0 skews the mass to the right (back-loaded ramps), `shape` < 0
/// to the left (front-loaded ramps). `shape` = 0 is the normal distribution.
#[derive(Debug, Clone)]
pub struct SkewNormal {
    location: f64,
    scale: f64,
    shape: f64,
    standard: Normal,
}

impl SkewNormal {
    pub fn new(location: f64, scale: f64, shape: f64) -> DevFlowResult<Self> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(DevFlowError::invalid("scale", "Must be a positive finite number"));
        }
        if !location.is_finite() {
            return Err(DevFlowError::invalid("location", "Must be finite"));
        }
        if !shape.is_finite() {
            return Err(DevFlowError::invalid("shape_alpha", "Must be finite"));
        }
        Ok(Self {
            location,
            scale,
            shape,
            standard: standard_normal()?,
        })
    }

    /// Build the distribution whose density peaks at `mode`.
    pub fn with_mode(mode: f64, scale: f64, shape: f64) -> DevFlowResult<Self> {
        if !mode.is_finite() {
            return Err(DevFlowError::invalid("mode_month", "Must be finite"));
        }
        let unit = Self::new(0.0, 1.0, shape)?;
        let location = mode - scale * unit.standard_mode();
        Self::new(location, scale, shape)
    }

    pub fn location(&self) -> f64 {
        self.location
    }

    pub fn pdf(&self, x: f64) -> f64 {
        let z = (x - self.location) / self.scale;
        2.0 / self.scale * self.standard.pdf(z) * self.standard.cdf(self.shape * z)
    }

    /// F(x) = Φ(z) − 2·T(z, α)
    pub fn cdf(&self, x: f64) -> f64 {
        let z = (x - self.location) / self.scale;
        (self.standard.cdf(z) - 2.0 * owens_t(z, self.shape)).clamp(0.0, 1.0)
    }

    /// Mode of the standardised density, found by golden-section search.
    /// The density is log-concave, so the bracket holds a single maximum.
    fn standard_mode(&self) -> f64 {
        let density = |z: f64| self.standard.pdf(z) * self.standard.cdf(self.shape * z);

        let (mut lo, mut hi) = (-MODE_SEARCH_BOUND, MODE_SEARCH_BOUND);
        let mut x1 = hi - GOLDEN_RATIO_CONJUGATE * (hi - lo);
        let mut x2 = lo + GOLDEN_RATIO_CONJUGATE * (hi - lo);
        let (mut f1, mut f2) = (density(x1), density(x2));

        while hi - lo > MODE_SEARCH_TOLERANCE {
            if f1 < f2 {
                lo = x1;
                x1 = x2;
                f1 = f2;
                x2 = lo + GOLDEN_RATIO_CONJUGATE * (hi - lo);
                f2 = density(x2);
            } else {
                hi = x2;
                x2 = x1;
                f2 = f1;
                x1 = hi - GOLDEN_RATIO_CONJUGATE * (hi - lo);
                f1 = density(x1);
            }
        }
        0.5 * (lo + hi)
    }
}

fn standard_normal() -> DevFlowResult<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| DevFlowError::invalid("distribution", format!("{e}")))
}

/// Owen's T function T(h, a) = 1/(2π) ∫₀ᵃ exp(−h²(1+x²)/2) / (1+x²) dx,
/// evaluated with composite Simpson quadrature. Odd in `a`.
pub fn owens_t(h: f64, a: f64) -> f64 {
    if a == 0.0 {
        return 0.0;
    }
    let width = a.abs();
    let mut intervals = ((width * OWENS_T_INTERVALS_PER_UNIT).ceil() as usize)
        .clamp(OWENS_T_MIN_INTERVALS, OWENS_T_MAX_INTERVALS);
    if intervals % 2 == 1 {
        intervals += 1;
    }

    let half_h2 = 0.5 * h * h;
    let integrand = |x: f64| {
        let one_plus = 1.0 + x * x;
        (-half_h2 * one_plus).exp() / one_plus
    };

    let step = width / intervals as f64;
    let mut sum = integrand(0.0) + integrand(width);
    for i in 1..intervals {
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        sum += weight * integrand(i as f64 * step);
    }

    let value = sum * step / 3.0 / (2.0 * std::f64::consts::PI);
    value.copysign(a)
}

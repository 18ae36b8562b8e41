use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::{Normal, Uniform};

use crate::error::DevFlowError;
use crate::DevFlowResult;

/// Random shock applied to one scalar input of a scenario.
///
/// Relative variants scale the base value (`base * (1 + shock)`), absolute
/// variants shift it (`base + shock`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Perturbation {
    RelativeNormal { std_dev: f64 },
    RelativeUniform { half_width: f64 },
    AbsoluteNormal { std_dev: f64 },
    AbsoluteUniform { half_width: f64 },
}

impl Perturbation {
    pub fn validate(&self, field: &str) -> DevFlowResult<()> {
        let (name, width) = match self {
            Perturbation::RelativeNormal { std_dev } | Perturbation::AbsoluteNormal { std_dev } => {
                ("std_dev", *std_dev)
            }
            Perturbation::RelativeUniform { half_width }
            | Perturbation::AbsoluteUniform { half_width } => ("half_width", *half_width),
        };
        if !width.is_finite() || width < 0.0 {
            return Err(DevFlowError::invalid(
                format!("{field}.{name}"),
                "Must be finite and non-negative",
            ));
        }
        Ok(())
    }

    /// Draw a perturbed value around `base`.
    pub fn apply<R: Rng + ?Sized>(&self, rng: &mut R, base: f64) -> DevFlowResult<f64> {
        let shock = match self {
            Perturbation::RelativeNormal { std_dev } | Perturbation::AbsoluteNormal { std_dev } => {
                sample_normal(rng, *std_dev)?
            }
            Perturbation::RelativeUniform { half_width }
            | Perturbation::AbsoluteUniform { half_width } => sample_uniform(rng, *half_width)?,
        };
        Ok(match self {
            Perturbation::RelativeNormal { .. } | Perturbation::RelativeUniform { .. } => {
                base * (1.0 + shock)
            }
            Perturbation::AbsoluteNormal { .. } | Perturbation::AbsoluteUniform { .. } => {
                base + shock
            }
        })
    }
}

fn sample_normal<R: Rng + ?Sized>(rng: &mut R, std_dev: f64) -> DevFlowResult<f64> {
    if std_dev == 0.0 {
        return Ok(0.0);
    }
    let n = Normal::new(0.0, std_dev)
        .map_err(|e| DevFlowError::invalid("perturbation", format!("Invalid Normal parameters: {e}")))?;
    Ok(rng.sample(n))
}

fn sample_uniform<R: Rng + ?Sized>(rng: &mut R, half_width: f64) -> DevFlowResult<f64> {
    if half_width == 0.0 {
        return Ok(0.0);
    }
    let u = Uniform::new(-half_width, half_width).map_err(|e| {
        DevFlowError::invalid("perturbation", format!("Invalid Uniform parameters: {e}"))
    })?;
    Ok(rng.sample(u))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_zero_width_is_identity() {
        let mut rng = StdRng::seed_from_u64(1);
        let p = Perturbation::RelativeNormal { std_dev: 0.0 };
        assert_eq!(p.apply(&mut rng, 123.0).unwrap(), 123.0);
        let p = Perturbation::AbsoluteUniform { half_width: 0.0 };
        assert_eq!(p.apply(&mut rng, 123.0).unwrap(), 123.0);
    }

    #[test]
    fn test_uniform_stays_in_band() {
        let mut rng = StdRng::seed_from_u64(7);
        let rel = Perturbation::RelativeUniform { half_width: 0.1 };
        let abs = Perturbation::AbsoluteUniform { half_width: 2.0 };
        for _ in 0..1_000 {
            let r = rel.apply(&mut rng, 100.0).unwrap();
            assert!((90.0..=110.0).contains(&r), "{r}");
            let a = abs.apply(&mut rng, 18.0).unwrap();
            assert!((16.0..=20.0).contains(&a), "{a}");
        }
    }

    #[test]
    fn test_relative_normal_moments() {
        let mut rng = StdRng::seed_from_u64(42);
        let p = Perturbation::RelativeNormal { std_dev: 0.1 };
        let samples: Vec<f64> = (0..20_000).map(|_| p.apply(&mut rng, 1_000.0).unwrap()).collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / samples.len() as f64;
        assert!((mean - 1_000.0).abs() < 5.0, "mean={mean}");
        assert!((var.sqrt() - 100.0).abs() < 5.0, "sd={}", var.sqrt());
    }

    #[test]
    fn test_validate_rejects_negative_width() {
        assert!(Perturbation::AbsoluteNormal { std_dev: -1.0 }.validate("sales_mode").is_err());
        assert!(Perturbation::RelativeUniform { half_width: f64::NAN }.validate("x").is_err());
        assert!(Perturbation::RelativeUniform { half_width: 0.2 }.validate("x").is_ok());
    }

    #[test]
    fn test_serde_tag() {
        let p: Perturbation = serde_json::from_str(r#"{"type":"RelativeNormal","std_dev":0.15}"#).unwrap();
        assert_eq!(p, Perturbation::RelativeNormal { std_dev: 0.15 });
    }
}

//! Logistic variates and contamination mixtures
//!
//! Variates are drawn by inverse-CDF transform of an open-interval uniform,
//! so `ln(u / (1 - u))` is always finite.

use std::ops::Deref;

use rand::distributions::Open01;
use rand::Rng;
use rand_distr::Distribution;

use crate::params::DistributionParams;
use crate::{invalid, Result};

/// Draw one logistic(`shift`, `scale`) variate.
///
/// `scale` is not checked here; use [`Logistic::new`] for a validated law.
pub fn sample_logistic<R: Rng + ?Sized>(rng: &mut R, shift: f64, scale: f64) -> f64 {
    let u: f64 = rng.sample(Open01);
    scale * (u / (1.0 - u)).ln() + shift
}

/// Logistic law with location `shift` and scale `scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Logistic {
    shift: f64,
    scale: f64,
}

impl Logistic {
    pub fn new(shift: f64, scale: f64) -> Result<Self> {
        if !shift.is_finite() {
            return Err(invalid("logistic shift must be finite"));
        }
        if !(scale.is_finite() && scale > 0.0) {
            return Err(invalid(format!(
                "logistic scale must be finite and > 0, got {scale}"
            )));
        }
        Ok(Self { shift, scale })
    }

    /// logistic(0, 1)
    pub fn standard() -> Self {
        Self {
            shift: 0.0,
            scale: 1.0,
        }
    }

    pub fn shift(&self) -> f64 {
        self.shift
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn cdf(&self, x: f64) -> f64 {
        1.0 / (1.0 + (-(x - self.shift) / self.scale).exp())
    }
}

impl Distribution<f64> for Logistic {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        sample_logistic(rng, self.shift, self.scale)
    }
}

/// Immutable sample, in generation order.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample(Vec<f64>);

impl Sample {
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(invalid("sample must contain at least one observation"));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(invalid("sample observations must be finite"));
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl Deref for Sample {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

/// Draw `size` observations, each from `primary` with probability
/// `1 - contamination` and from `secondary` otherwise.
///
/// A uniform `r` in [0, 1) is drawn per observation; the primary is used when
/// `r < 1 - contamination`, so contamination 0 never calls `secondary` and
/// contamination 1 never calls `primary`.
pub fn generate_mixture<R, P, S>(
    rng: &mut R,
    size: usize,
    mut primary: P,
    mut secondary: S,
    contamination: f64,
) -> Result<Sample>
where
    R: Rng + ?Sized,
    P: FnMut(&mut R) -> f64,
    S: FnMut(&mut R) -> f64,
{
    if size == 0 {
        return Err(invalid("sample size must be > 0"));
    }
    if !(0.0..=1.0).contains(&contamination) {
        return Err(invalid(format!(
            "contamination must be in [0, 1], got {contamination}"
        )));
    }

    let threshold = 1.0 - contamination;
    let mut values = Vec::with_capacity(size);
    for _ in 0..size {
        let r: f64 = rng.gen();
        if r < threshold {
            values.push(primary(rng));
        } else {
            values.push(secondary(rng));
        }
    }

    Ok(Sample(values))
}

/// Contaminated logistic sampler: logistic(0, 1) mixed with
/// logistic(shift, scale).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixtureSampler {
    primary: Logistic,
    secondary: Logistic,
    contamination: f64,
}

impl MixtureSampler {
    pub fn new(params: &DistributionParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            primary: Logistic::standard(),
            secondary: Logistic::new(params.shift, params.scale)?,
            contamination: params.contamination,
        })
    }

    pub fn contamination(&self) -> f64 {
        self.contamination
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, size: usize) -> Result<Sample> {
        self.sample_with_count(rng, size).map(|(sample, _)| sample)
    }

    /// Like [`MixtureSampler::sample`], also returning how many observations
    /// came from the contaminating component.
    pub fn sample_with_count<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        size: usize,
    ) -> Result<(Sample, usize)> {
        let mut contaminated = 0usize;
        let sample = generate_mixture(
            rng,
            size,
            |rng| self.primary.sample(rng),
            |rng| {
                contaminated += 1;
                self.secondary.sample(rng)
            },
            self.contamination,
        )?;
        Ok((sample, contaminated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_logistic_median_is_shift() {
        let mut rng = StdRng::seed_from_u64(7);
        let law = Logistic::new(3.0, 2.0).unwrap();
        let n = 20_000;
        let below = (0..n).filter(|_| law.sample(&mut rng) < 3.0).count();
        let frac = below as f64 / n as f64;
        // 3 standard errors of a Bernoulli(0.5) proportion
        assert!((frac - 0.5).abs() < 3.0 * (0.25 / n as f64).sqrt());
    }

    #[test]
    fn test_logistic_quartiles() {
        let mut rng = StdRng::seed_from_u64(11);
        let law = Logistic::standard();
        let q1 = -(3.0_f64).ln();
        let n = 20_000;
        let below = (0..n).filter(|_| law.sample(&mut rng) < q1).count();
        let frac = below as f64 / n as f64;
        assert!((law.cdf(q1) - 0.25).abs() < 1e-12);
        assert!((frac - 0.25).abs() < 3.0 * (0.1875 / n as f64).sqrt());
    }

    #[test]
    fn test_logistic_rejects_bad_scale() {
        assert!(Logistic::new(0.0, 0.0).is_err());
        assert!(Logistic::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_mixture_edge_contaminations() {
        let mut rng = StdRng::seed_from_u64(1);
        let pure = generate_mixture(&mut rng, 500, |_| 0.0, |_| 1.0, 0.0).unwrap();
        assert!(pure.iter().all(|&v| v == 0.0));

        let full = generate_mixture(&mut rng, 500, |_| 0.0, |_| 1.0, 1.0).unwrap();
        assert!(full.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_mixture_rejects_invalid_input() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(generate_mixture(&mut rng, 0, |_| 0.0, |_| 1.0, 0.1).is_err());
        assert!(generate_mixture(&mut rng, 10, |_| 0.0, |_| 1.0, 1.5).is_err());
    }

    #[test]
    fn test_sampler_is_reproducible() {
        let sampler = MixtureSampler::new(&DistributionParams::default()).unwrap();
        let a = sampler.sample(&mut StdRng::seed_from_u64(42), 64).unwrap();
        let b = sampler.sample(&mut StdRng::seed_from_u64(42), 64).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sample_rejects_empty_and_nan() {
        assert!(Sample::new(vec![]).is_err());
        assert!(Sample::new(vec![1.0, f64::NAN]).is_err());
        assert_eq!(Sample::new(vec![1.0, 2.0]).unwrap().len(), 2);
    }
}

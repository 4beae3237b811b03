//! Estimating equations for the logistic location parameter
//!
//! Both scores sum a per-observation term in `t = exp((theta - y) / scale)`:
//!
//! - MLE: `(t - 1) / (t + 1)`
//! - generalized radical: `t^delta (t - 1) / (t + 1)^(2 delta + 1)`
//!
//! Terms are evaluated through the logistic probability `p = t / (t + 1)`,
//! using `t^delta / (t + 1)^(2 delta) = (p q)^delta` and
//! `(t - 1) / (t + 1) = p - q` with `q = 1 - p`. The two forms are equal, but
//! this one stays finite for observations arbitrarily far from theta.

use serde::{Deserialize, Serialize};

use crate::{invalid, Result};

/// Estimator kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    /// Maximum likelihood
    Mle,
    /// Generalized radical (Hampel-type) estimator with robustness `delta`
    GeneralizedRadical { delta: f64 },
}

impl Estimator {
    pub fn radical(delta: f64) -> Self {
        Estimator::GeneralizedRadical { delta }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Estimator::Mle => Ok(()),
            Estimator::GeneralizedRadical { delta } => check_delta(*delta),
        }
    }

    /// Robustness parameter; the MLE behaves as delta = 0.
    pub fn delta(&self) -> f64 {
        match self {
            Estimator::Mle => 0.0,
            Estimator::GeneralizedRadical { delta } => *delta,
        }
    }

    /// Stable label, used as a key in reports.
    pub fn name(&self) -> String {
        match self {
            Estimator::Mle => "mle".to_string(),
            Estimator::GeneralizedRadical { delta } => format!("radical_{delta}"),
        }
    }
}

/// A one-dimensional estimating equation in theta.
pub trait EstimatingEquation {
    fn name(&self) -> String;

    /// Value of the score at `theta`
    fn score(&self, theta: f64) -> f64;

    /// Analytic derivative of the score, when one is available
    fn derivative(&self, _theta: f64) -> Option<f64> {
        None
    }

    /// Closed interval containing every root, when one is known
    fn root_interval(&self) -> Option<(f64, f64)> {
        None
    }
}

/// Score of one estimator bound to a sample and a known scale.
#[derive(Debug, Clone, Copy)]
pub struct ScoreEquation<'a> {
    data: &'a [f64],
    scale: f64,
    estimator: Estimator,
    range: Option<(f64, f64)>,
}

impl<'a> ScoreEquation<'a> {
    pub fn new(data: &'a [f64], scale: f64, estimator: Estimator) -> Result<Self> {
        check_inputs(data, scale)?;
        estimator.validate()?;
        Ok(Self {
            data,
            scale,
            estimator,
            range: data_range(data),
        })
    }

    pub fn estimator(&self) -> Estimator {
        self.estimator
    }

    pub fn data(&self) -> &'a [f64] {
        self.data
    }
}

impl EstimatingEquation for ScoreEquation<'_> {
    fn name(&self) -> String {
        self.estimator.name()
    }

    fn score(&self, theta: f64) -> f64 {
        match self.estimator {
            Estimator::Mle => sum_terms(self.data, |y| mle_term(y, self.scale, theta)),
            Estimator::GeneralizedRadical { delta } => {
                sum_terms(self.data, |y| radical_term(y, self.scale, delta, theta))
            }
        }
    }

    fn derivative(&self, theta: f64) -> Option<f64> {
        let value = match self.estimator {
            Estimator::Mle => sum_terms(self.data, |y| mle_term_derivative(y, self.scale, theta)),
            Estimator::GeneralizedRadical { delta } => sum_terms(self.data, |y| {
                radical_term_derivative(y, self.scale, delta, theta)
            }),
        };
        Some(value)
    }

    /// Every term has the sign of `theta - y`, so both scores are negative
    /// below the smallest observation and positive above the largest.
    fn root_interval(&self) -> Option<(f64, f64)> {
        self.range
    }
}

/// MLE score: sum of `(t - 1) / (t + 1)`.
pub fn score_mle(data: &[f64], scale: f64, theta: f64) -> Result<f64> {
    check_inputs(data, scale)?;
    Ok(sum_terms(data, |y| mle_term(y, scale, theta)))
}

/// Generalized-radical score: sum of `t^delta (t - 1) / (t + 1)^(2 delta + 1)`.
pub fn score_radical(data: &[f64], scale: f64, delta: f64, theta: f64) -> Result<f64> {
    check_inputs(data, scale)?;
    check_delta(delta)?;
    Ok(sum_terms(data, |y| radical_term(y, scale, delta, theta)))
}

/// Derivative of [`score_radical`] with respect to theta.
pub fn radical_derivative(data: &[f64], scale: f64, delta: f64, theta: f64) -> Result<f64> {
    check_inputs(data, scale)?;
    check_delta(delta)?;
    Ok(sum_terms(data, |y| {
        radical_term_derivative(y, scale, delta, theta)
    }))
}

/// MLE term for one observation.
pub fn mle_term(y: f64, scale: f64, theta: f64) -> f64 {
    let (p, q) = split_probability((theta - y) / scale);
    p - q
}

/// Radical term for one observation.
pub fn radical_term(y: f64, scale: f64, delta: f64, theta: f64) -> f64 {
    let (p, q) = split_probability((theta - y) / scale);
    (p * q).powf(delta) * (p - q)
}

pub fn mle_term_derivative(y: f64, scale: f64, theta: f64) -> f64 {
    let (p, q) = split_probability((theta - y) / scale);
    2.0 * p * q / scale
}

/// d/dtheta of the radical term: `(p q)^delta (2 p q - delta (p - q)^2) / scale`.
pub fn radical_term_derivative(y: f64, scale: f64, delta: f64, theta: f64) -> f64 {
    let (p, q) = split_probability((theta - y) / scale);
    let pq = p * q;
    let diff = p - q;
    pq.powf(delta) * (2.0 * pq - delta * diff * diff) / scale
}

/// `(p, 1 - p)` for `p = 1 / (1 + exp(-z))`, each side computed without
/// cancellation.
fn split_probability(z: f64) -> (f64, f64) {
    if z >= 0.0 {
        let e = (-z).exp();
        (1.0 / (1.0 + e), e / (1.0 + e))
    } else {
        let e = z.exp();
        (e / (1.0 + e), 1.0 / (1.0 + e))
    }
}

fn data_range(data: &[f64]) -> Option<(f64, f64)> {
    let lo = data.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (lo.is_finite() && hi.is_finite()).then_some((lo, hi))
}

fn sum_terms(data: &[f64], term: impl Fn(f64) -> f64) -> f64 {
    data.iter().map(|&y| term(y)).sum()
}

fn check_inputs(data: &[f64], scale: f64) -> Result<()> {
    if data.is_empty() {
        return Err(invalid("estimating equation needs a non-empty sample"));
    }
    if !(scale.is_finite() && scale > 0.0) {
        return Err(invalid(format!("scale must be finite and > 0, got {scale}")));
    }
    Ok(())
}

fn check_delta(delta: f64) -> Result<()> {
    if !(delta.is_finite() && delta >= 0.0) {
        return Err(invalid(format!("delta must be finite and >= 0, got {delta}")));
    }
    Ok(())
}

//! Influence function of the generalized-radical estimator
//!
//! `IF(y) = -scale * psi(y) / I`, where `psi` is the radical score term and
//! `I = ∫ t^(delta+1) (t-1)^2 / (t+1)^(2 delta + 4) dy` over
//! [`INTEGRATION_BOUND`]. With `p = t / (t + 1)` the integrand is
//! `(p q)^(delta + 1) (p - q)^2`.

use serde::Serialize;

use crate::score::radical_term;
use crate::{invalid, Result};

/// Half-width of the integration window of the normalizer.
pub const INTEGRATION_BOUND: f64 = 116.0;

/// Simpson panels used for the normalizer.
pub const INTEGRATION_PANELS: usize = 20_000;

/// Robustness settings tabulated by default.
pub const DEFAULT_DELTAS: [f64; 4] = [0.0, 0.1, 0.5, 1.0];

/// Normalized influence function at fixed (theta, scale, delta).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InfluenceFunction {
    theta: f64,
    scale: f64,
    delta: f64,
    normalizer: f64,
}

impl InfluenceFunction {
    pub fn new(theta: f64, scale: f64, delta: f64) -> Result<Self> {
        if !theta.is_finite() {
            return Err(invalid("theta must be finite"));
        }
        if !(scale.is_finite() && scale > 0.0) {
            return Err(invalid(format!("scale must be finite and > 0, got {scale}")));
        }
        if !(delta.is_finite() && delta >= 0.0) {
            return Err(invalid(format!("delta must be finite and >= 0, got {delta}")));
        }

        let normalizer = simpson(
            |y| integrand(y, theta, scale, delta),
            theta - INTEGRATION_BOUND,
            theta + INTEGRATION_BOUND,
            INTEGRATION_PANELS,
        );

        Ok(Self {
            theta,
            scale,
            delta,
            normalizer,
        })
    }

    pub fn normalizer(&self) -> f64 {
        self.normalizer
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn evaluate(&self, y: f64) -> f64 {
        -self.scale * radical_term(y, self.scale, self.delta, self.theta) / self.normalizer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InfluenceRow {
    pub delta: f64,
    pub y: f64,
    pub value: f64,
}

/// `[-10, 10)` in steps of 0.2.
pub fn default_grid() -> Vec<f64> {
    (0..100).map(|i| -10.0 + 0.2 * i as f64).collect()
}

/// Evaluate the influence function over `grid`.
pub fn influence_curve(grid: &[f64], theta: f64, scale: f64, delta: f64) -> Result<Vec<(f64, f64)>> {
    let function = InfluenceFunction::new(theta, scale, delta)?;
    Ok(grid.iter().map(|&y| (y, function.evaluate(y))).collect())
}

/// Influence curves for several deltas, flattened into rows.
pub fn influence_table(
    grid: &[f64],
    deltas: &[f64],
    theta: f64,
    scale: f64,
) -> Result<Vec<InfluenceRow>> {
    let mut rows = Vec::with_capacity(grid.len() * deltas.len());
    for &delta in deltas {
        for (y, value) in influence_curve(grid, theta, scale, delta)? {
            rows.push(InfluenceRow { delta, y, value });
        }
    }
    Ok(rows)
}

fn integrand(y: f64, theta: f64, scale: f64, delta: f64) -> f64 {
    let z = (theta - y) / scale;
    let p = 1.0 / (1.0 + (-z).exp());
    let q = 1.0 / (1.0 + z.exp());
    let diff = p - q;
    (p * q).powf(delta + 1.0) * diff * diff
}

/// Composite Simpson rule; `panels` is rounded up to an even count.
fn simpson(f: impl Fn(f64) -> f64, a: f64, b: f64, panels: usize) -> f64 {
    let n = (panels.max(2) + 1) & !1;
    let h = (b - a) / n as f64;
    let mut sum = f(a) + f(b);
    for i in 1..n {
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        sum += weight * f(a + h * i as f64);
    }
    sum * h / 3.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_simpson_is_exact_for_cubics() {
        let value = simpson(|x| x * x * x - x, 0.0, 2.0, 4);
        assert_relative_eq!(value, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mle_normalizer_is_a_third_of_scale() {
        let f = InfluenceFunction::new(0.0, 1.0, 0.0).unwrap();
        assert_relative_eq!(f.normalizer(), 1.0 / 3.0, epsilon = 1e-8);
        let f2 = InfluenceFunction::new(0.0, 2.0, 0.0).unwrap();
        assert_relative_eq!(f2.normalizer(), 2.0 / 3.0, epsilon = 1e-8);
    }

    #[test]
    fn test_mle_influence_is_bounded_by_three() {
        let f = InfluenceFunction::new(0.0, 1.0, 0.0).unwrap();
        assert_relative_eq!(f.evaluate(60.0), 3.0, epsilon = 1e-6);
        assert_relative_eq!(f.evaluate(-60.0), -3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_influence_is_odd_around_theta() {
        let f = InfluenceFunction::new(1.5, 1.0, 0.5).unwrap();
        assert_eq!(f.evaluate(1.5), 0.0);
        for &u in &[0.3, 1.0, 4.0] {
            assert_relative_eq!(f.evaluate(1.5 + u), -f.evaluate(1.5 - u), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_radical_influence_redescends() {
        let f = InfluenceFunction::new(0.0, 1.0, 1.0).unwrap();
        assert!(f.evaluate(30.0).abs() < 1e-6);
        assert!(f.evaluate(1.5).abs() > f.evaluate(10.0).abs());
    }

    #[test]
    fn test_table_shape() {
        let grid = default_grid();
        assert_eq!(grid.len(), 100);
        let rows = influence_table(&grid, &DEFAULT_DELTAS, 0.0, 1.0).unwrap();
        assert_eq!(rows.len(), 400);
        assert!(influence_table(&grid, &[-1.0], 0.0, 1.0).is_err());
    }
}

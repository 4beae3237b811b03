//! One-dimensional root finders for estimating equations
//!
//! Secant iteration stops when successive iterates differ by less than
//! `tol`; Newton iteration stops when the Newton step is smaller than `tol`.
//! Both are bounded by `max_iter`.
//!
//! When the equation reports a root interval with a sign change at its ends,
//! iterates are kept inside a shrinking bracket and fall back to bisection
//! whenever the model step would leave it or stops making progress.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::score::EstimatingEquation;
use crate::{invalid, EstimationError, Result};

/// Root-finder settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// Absolute tolerance on the change in the iterate
    pub tol: f64,
    /// Iteration cap
    pub max_iter: usize,
    /// Offset of the second starting point of the secant method
    pub initial_step: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            tol: 1e-8,
            max_iter: 100,
            initial_step: 0.1,
        }
    }
}

impl SolverOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(invalid(format!("tol must be finite and > 0, got {}", self.tol)));
        }
        if self.max_iter == 0 {
            return Err(invalid("max_iter must be > 0"));
        }
        if !(self.initial_step.is_finite() && self.initial_step != 0.0) {
            return Err(invalid("initial_step must be finite and non-zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootMethod {
    Secant,
    Newton,
}

impl RootMethod {
    pub fn label(&self) -> &'static str {
        match self {
            RootMethod::Secant => "secant",
            RootMethod::Newton => "newton",
        }
    }
}

/// Converged root of an estimating equation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootEstimate {
    pub root: f64,
    /// Score at `root`
    pub score: f64,
    pub iterations: usize,
    pub method: RootMethod,
}

/// Solve `eq(theta) = 0` starting from `x0` with the chosen method.
pub fn solve<E: EstimatingEquation + ?Sized>(
    eq: &E,
    method: RootMethod,
    x0: f64,
    options: &SolverOptions,
) -> Result<RootEstimate> {
    match method {
        RootMethod::Secant => secant(eq, x0, options),
        RootMethod::Newton => newton(eq, x0, options),
    }
}

/// Sign-change interval kept around the iterates.
///
/// A model step is taken only if it lands strictly inside the interval and
/// is less than half the step before last; otherwise the iterate bisects.
#[derive(Debug, Clone, Copy)]
struct Bracket {
    neg: f64,
    pos: f64,
    last_step: f64,
    older_step: f64,
}

impl Bracket {
    fn new<E: EstimatingEquation + ?Sized>(eq: &E) -> Option<Self> {
        let (lo, hi) = eq.root_interval()?;
        let (f_lo, f_hi) = (eq.score(lo), eq.score(hi));
        let (neg, pos) = if f_lo < 0.0 && f_hi > 0.0 {
            (lo, hi)
        } else if f_lo > 0.0 && f_hi < 0.0 {
            (hi, lo)
        } else {
            return None;
        };
        let width = hi - lo;
        Some(Self {
            neg,
            pos,
            last_step: width,
            older_step: width,
        })
    }

    fn width(&self) -> f64 {
        (self.pos - self.neg).abs()
    }

    fn contains(&self, x: f64) -> bool {
        x > self.neg.min(self.pos) && x < self.neg.max(self.pos)
    }

    fn update(&mut self, x: f64, f: f64) {
        if !self.contains(x) {
            return;
        }
        if f < 0.0 {
            self.neg = x;
        } else if f > 0.0 {
            self.pos = x;
        }
    }

    /// Next iterate from `x`, given the unguarded `candidate` (NaN if none).
    fn next(&mut self, x: f64, candidate: f64) -> f64 {
        let accept = candidate.is_finite()
            && self.contains(candidate)
            && (candidate - x).abs() < 0.5 * self.older_step.abs();
        let next = if accept {
            candidate
        } else {
            0.5 * (self.neg + self.pos)
        };
        self.older_step = self.last_step;
        self.last_step = next - x;
        next
    }
}

/// Starting point moved into the root interval, if the equation has one.
fn start_point<E: EstimatingEquation + ?Sized>(eq: &E, x0: f64) -> f64 {
    match eq.root_interval() {
        Some((lo, hi)) if lo <= hi => x0.clamp(lo, hi),
        _ => x0,
    }
}

fn in_root_interval<E: EstimatingEquation + ?Sized>(eq: &E, x: f64) -> bool {
    eq.root_interval()
        .map_or(true, |(lo, hi)| x >= lo && x <= hi)
}

/// Accept `x` as a root, unless it lies outside the root interval or the
/// score only vanishes because every term underflowed.
fn accept<E: EstimatingEquation + ?Sized>(
    eq: &E,
    x: f64,
    f: f64,
    iterations: usize,
    method: RootMethod,
) -> Result<RootEstimate> {
    if !in_root_interval(eq, x) {
        return Err(non_convergence(
            method,
            iterations,
            format!("theta = {x} lies outside the root interval"),
        ));
    }
    if f == 0.0 && matches!(eq.derivative(x), Some(d) if d.abs() < f64::MIN_POSITIVE) {
        return Err(non_convergence(
            method,
            iterations,
            format!("score underflowed to zero at theta = {x}"),
        ));
    }
    Ok(estimate(x, f, iterations, method))
}

/// Secant iteration.
///
/// The first slope is a finite difference between `x0 - initial_step` and
/// `x0`. Equations with a root interval start inside it and are safeguarded
/// by bisection.
pub fn secant<E: EstimatingEquation + ?Sized>(
    eq: &E,
    x0: f64,
    options: &SolverOptions,
) -> Result<RootEstimate> {
    options.validate()?;
    check_start(x0)?;

    let mut bracket = Bracket::new(eq);
    let start = start_point(eq, x0);
    let mut prev = start - options.initial_step;
    let mut f_prev = eq.score(prev);
    let mut cur = start;
    let mut f_cur = eq.score(cur);

    if f_cur == 0.0 {
        return accept(eq, cur, f_cur, 0, RootMethod::Secant);
    }
    if let Some(b) = bracket.as_mut() {
        b.update(prev, f_prev);
        b.update(cur, f_cur);
    }

    for iteration in 1..=options.max_iter {
        let denom = f_cur - f_prev;
        let usable = denom != 0.0 && denom.is_finite();
        let candidate = if usable {
            cur - f_cur * (cur - prev) / denom
        } else {
            f64::NAN
        };

        let next = match bracket.as_mut() {
            Some(b) => b.next(cur, candidate),
            None if !usable => {
                return Err(non_convergence(
                    RootMethod::Secant,
                    iteration,
                    format!("secant denominator is {denom} at theta = {cur}"),
                ));
            }
            None => candidate,
        };
        if !next.is_finite() {
            return Err(non_convergence(
                RootMethod::Secant,
                iteration,
                "iterate left the finite range".to_string(),
            ));
        }

        prev = cur;
        f_prev = f_cur;
        cur = next;
        f_cur = eq.score(cur);
        trace!(iteration, theta = cur, score = f_cur, "secant step");

        if f_cur == 0.0 {
            return accept(eq, cur, f_cur, iteration, RootMethod::Secant);
        }
        if let Some(b) = bracket.as_mut() {
            b.update(cur, f_cur);
        }
        let collapsed = bracket.map_or(false, |b| b.width() < options.tol);
        if (cur - prev).abs() < options.tol || collapsed {
            return accept(eq, cur, f_cur, iteration, RootMethod::Secant);
        }
    }

    Err(non_convergence(
        RootMethod::Secant,
        options.max_iter,
        format!("iteration cap reached, last step {}", (cur - prev).abs()),
    ))
}

/// Newton iteration with the equation's analytic derivative.
///
/// Safeguarded by bisection like [`secant`] when a root interval is known;
/// a vanishing derivative then triggers a bisection step instead of a
/// failure.
pub fn newton<E: EstimatingEquation + ?Sized>(
    eq: &E,
    x0: f64,
    options: &SolverOptions,
) -> Result<RootEstimate> {
    options.validate()?;
    check_start(x0)?;

    let mut bracket = Bracket::new(eq);
    let mut x = start_point(eq, x0);
    let mut last_step = f64::INFINITY;

    for iteration in 1..=options.max_iter {
        let f = eq.score(x);
        if f == 0.0 {
            return accept(eq, x, f, iteration - 1, RootMethod::Newton);
        }
        if let Some(b) = bracket.as_mut() {
            b.update(x, f);
        }

        let d = eq.derivative(x).ok_or_else(|| {
            invalid(format!("{} has no analytic derivative", eq.name()))
        })?;
        let usable = d.is_finite() && d.abs() >= f64::MIN_POSITIVE;

        let next = match bracket.as_mut() {
            Some(b) => b.next(x, if usable { x - f / d } else { f64::NAN }),
            None if !usable => {
                return Err(non_convergence(
                    RootMethod::Newton,
                    iteration,
                    format!("derivative is {d} at theta = {x}"),
                ));
            }
            None => x - f / d,
        };
        if !next.is_finite() {
            return Err(non_convergence(
                RootMethod::Newton,
                iteration,
                "iterate left the finite range".to_string(),
            ));
        }
        last_step = next - x;
        x = next;
        trace!(iteration, theta = x, score = f, "newton step");

        let collapsed = bracket.map_or(false, |b| b.width() < options.tol);
        if last_step.abs() < options.tol || collapsed {
            return accept(eq, x, eq.score(x), iteration, RootMethod::Newton);
        }
    }

    Err(non_convergence(
        RootMethod::Newton,
        options.max_iter,
        format!("iteration cap reached, last step {}", last_step.abs()),
    ))
}

fn estimate(root: f64, score: f64, iterations: usize, method: RootMethod) -> RootEstimate {
    RootEstimate {
        root,
        score,
        iterations,
        method,
    }
}

fn check_start(x0: f64) -> Result<()> {
    if x0.is_finite() {
        Ok(())
    } else {
        Err(invalid(format!("initial guess must be finite, got {x0}")))
    }
}

fn non_convergence(method: RootMethod, iterations: usize, reason: String) -> EstimationError {
    EstimationError::NonConvergence {
        method: method.label(),
        iterations,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::{Estimator, ScoreEquation};

    struct Quadratic;

    impl EstimatingEquation for Quadratic {
        fn name(&self) -> String {
            "x^2 - 2".to_string()
        }

        fn score(&self, theta: f64) -> f64 {
            theta * theta - 2.0
        }

        fn derivative(&self, theta: f64) -> Option<f64> {
            Some(2.0 * theta)
        }
    }

    struct Flat;

    impl EstimatingEquation for Flat {
        fn name(&self) -> String {
            "flat".to_string()
        }

        fn score(&self, _theta: f64) -> f64 {
            1.0
        }

        fn derivative(&self, _theta: f64) -> Option<f64> {
            Some(0.0)
        }
    }

    struct NoDerivative;

    impl EstimatingEquation for NoDerivative {
        fn name(&self) -> String {
            "linear".to_string()
        }

        fn score(&self, theta: f64) -> f64 {
            theta - 1.0
        }
    }

    /// Zero with a zero slope everywhere, like a fully underflowed score.
    struct Vanished;

    impl EstimatingEquation for Vanished {
        fn name(&self) -> String {
            "vanished".to_string()
        }

        fn score(&self, _theta: f64) -> f64 {
            0.0
        }

        fn derivative(&self, _theta: f64) -> Option<f64> {
            Some(0.0)
        }
    }

    const TWO_CLUSTERS: [f64; 10] = [-0.5, 0.2, 0.4, 20.1, 20.3, 19.8, 21.0, 20.5, 19.5, 20.2];

    fn assert_real_root(data: &[f64], estimator: Estimator, root: &RootEstimate) {
        let lo = data.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert!(root.root >= lo && root.root <= hi, "root {} outside data", root.root);
        let eq = ScoreEquation::new(data, 1.0, estimator).unwrap();
        assert!(eq.score(root.root).abs() < 1e-6, "score {}", eq.score(root.root));
    }

    #[test]
    fn test_secant_and_newton_find_sqrt_two() {
        let opts = SolverOptions::default();
        let s = secant(&Quadratic, 1.0, &opts).unwrap();
        let n = newton(&Quadratic, 1.0, &opts).unwrap();
        assert!((s.root - 2f64.sqrt()).abs() < 1e-9);
        assert!((n.root - 2f64.sqrt()).abs() < 1e-9);
        assert_eq!(s.method, RootMethod::Secant);
        assert_eq!(n.method, RootMethod::Newton);
    }

    #[test]
    fn test_secant_on_symmetric_sample_is_centre() {
        let data = [-2.0, -1.0, 0.5, 1.0, 2.0, -0.5];
        let eq = ScoreEquation::new(&data, 1.0, Estimator::Mle).unwrap();
        let root = secant(&eq, 0.7, &SolverOptions::default()).unwrap();
        assert!(root.root.abs() < 1e-8);
        assert!(root.score.abs() < 1e-7);
    }

    #[test]
    fn test_newton_matches_secant_on_radical_score() {
        let data = [-1.3, -0.2, 0.1, 0.4, 0.9, 1.7, 2.2, 12.0];
        let eq = ScoreEquation::new(&data, 1.0, Estimator::radical(0.5)).unwrap();
        let opts = SolverOptions::default();
        let n = newton(&eq, 0.0, &opts).unwrap();
        let s = secant(&eq, 0.0, &opts).unwrap();
        assert!((n.root - s.root).abs() < 1e-6);
    }

    #[test]
    fn test_zero_denominator_is_non_convergence() {
        let err = secant(&Flat, 0.0, &SolverOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            EstimationError::NonConvergence {
                method: "secant",
                ..
            }
        ));
    }

    #[test]
    fn test_zero_derivative_is_non_convergence() {
        let err = newton(&Flat, 0.0, &SolverOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            EstimationError::NonConvergence {
                method: "newton",
                ..
            }
        ));
    }

    #[test]
    fn test_iteration_cap_is_enforced() {
        let opts = SolverOptions {
            tol: 1e-15,
            max_iter: 2,
            ..SolverOptions::default()
        };
        let err = newton(&Quadratic, 100.0, &opts).unwrap_err();
        assert!(matches!(
            err,
            EstimationError::NonConvergence { iterations: 2, .. }
        ));
        assert!(secant(&Quadratic, 100.0, &opts).is_err());
    }

    #[test]
    fn test_newton_needs_a_derivative() {
        let err = newton(&NoDerivative, 0.0, &SolverOptions::default()).unwrap_err();
        assert!(matches!(err, EstimationError::InvalidParameter(_)));
        let root = secant(&NoDerivative, 0.0, &SolverOptions::default()).unwrap();
        assert!((root.root - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let opts = SolverOptions {
            max_iter: 0,
            ..SolverOptions::default()
        };
        assert!(secant(&Quadratic, 1.0, &opts).is_err());
        assert!(solve(&Quadratic, RootMethod::Newton, f64::NAN, &SolverOptions::default()).is_err());
    }

    #[test]
    fn test_mle_converges_on_separated_clusters() {
        let eq = ScoreEquation::new(&TWO_CLUSTERS, 1.0, Estimator::Mle).unwrap();
        let opts = SolverOptions::default();
        let s = secant(&eq, 0.0, &opts).unwrap();
        let n = newton(&eq, 0.0, &opts).unwrap();
        assert_real_root(&TWO_CLUSTERS, Estimator::Mle, &s);
        assert_real_root(&TWO_CLUSTERS, Estimator::Mle, &n);
        // the MLE score is monotone, so the root is unique
        assert!((s.root - n.root).abs() < 1e-6);
    }

    #[test]
    fn test_underflowed_score_far_from_data_is_not_a_root() {
        let data = [-1.3, -0.2, 0.1, 0.4, 0.9, 1.7, 2.2, 12.0];
        let estimator = Estimator::radical(0.5);
        let eq = ScoreEquation::new(&data, 1.0, estimator).unwrap();
        // every term underflows this far out
        assert_eq!(eq.score(-2000.0), 0.0);

        let opts = SolverOptions::default();
        let n = newton(&eq, -2000.0, &opts).unwrap();
        let s = secant(&eq, -2000.0, &opts).unwrap();
        assert_real_root(&data, estimator, &n);
        assert_real_root(&data, estimator, &s);
    }

    #[test]
    fn test_vanished_score_is_non_convergence() {
        let opts = SolverOptions::default();
        assert!(matches!(
            newton(&Vanished, 5.0, &opts),
            Err(EstimationError::NonConvergence { .. })
        ));
        assert!(matches!(
            secant(&Vanished, 5.0, &opts),
            Err(EstimationError::NonConvergence { .. })
        ));
    }

    #[test]
    fn test_radical_newton_stays_inside_the_data() {
        let data = [0.0, 0.3, -0.2, 9.0];
        let estimator = Estimator::radical(1.0);
        let eq = ScoreEquation::new(&data, 1.0, estimator).unwrap();
        for &x0 in &[-50.0, 1.3, 4.0, 300.0] {
            let root = newton(&eq, x0, &SolverOptions::default()).unwrap();
            assert_real_root(&data, estimator, &root);
        }
    }
}

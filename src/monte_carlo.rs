//! Monte Carlo comparison of location estimators under contamination
//!
//! Every trial draws one contaminated sample and solves each configured
//! estimating equation on it. The quality criterion is the mean squared
//! estimate, i.e. the empirical MSE against the location of the primary
//! logistic(0, 1) component. Trials on which a root finder does not converge
//! are recorded as missing and left out of the mean.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::params::DistributionParams;
use crate::sampler::MixtureSampler;
use crate::score::{Estimator, ScoreEquation};
use crate::solver::{solve, RootEstimate, RootMethod, SolverOptions};
use crate::{invalid, EstimationError, Result};

pub const DEFAULT_TRIALS: usize = 1000;

/// Robustness settings of the default radical estimators.
pub const DEFAULT_RADICAL_DELTAS: [f64; 3] = [0.1, 0.5, 1.0];

/// Location of the primary component; estimates are scored against it.
pub const PRIMARY_LOCATION: f64 = 0.0;

/// One row of the estimator lookup table.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EstimatorSpec {
    pub estimator: Estimator,
    pub method: RootMethod,
    #[serde(default)]
    pub initial_guess: f64,
}

impl EstimatorSpec {
    pub fn new(estimator: Estimator, method: RootMethod) -> Self {
        Self {
            estimator,
            method,
            initial_guess: 0.0,
        }
    }

    pub fn name(&self) -> String {
        self.estimator.name()
    }

    /// Solve this estimator's equation on `data` with known `scale`.
    pub fn estimate(
        &self,
        data: &[f64],
        scale: f64,
        options: &SolverOptions,
    ) -> Result<RootEstimate> {
        let equation = ScoreEquation::new(data, scale, self.estimator)?;
        solve(&equation, self.method, self.initial_guess, options)
    }
}

/// MLE by secant iteration, then the radical estimators by Newton iteration.
pub fn default_estimators() -> Vec<EstimatorSpec> {
    let mut specs = vec![EstimatorSpec::new(Estimator::Mle, RootMethod::Secant)];
    specs.extend(
        DEFAULT_RADICAL_DELTAS
            .iter()
            .map(|&delta| EstimatorSpec::new(Estimator::radical(delta), RootMethod::Newton)),
    );
    specs
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    pub trials: usize,
    pub sample_size: usize,
    pub distribution: DistributionParams,
    /// Scale assumed known by the estimating equations
    pub estimator_scale: f64,
    pub seed: u64,
    pub solver: SolverOptions,
    pub estimators: Vec<EstimatorSpec>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            trials: DEFAULT_TRIALS,
            sample_size: 100,
            distribution: DistributionParams::default(),
            estimator_scale: 1.0,
            seed: 2026,
            solver: SolverOptions::default(),
            estimators: default_estimators(),
        }
    }
}

impl MonteCarloConfig {
    /// Default estimator table and solver settings for the given run shape.
    pub fn new(
        trials: usize,
        sample_size: usize,
        contamination: f64,
        shift: f64,
        scale: f64,
    ) -> Result<Self> {
        let config = Self {
            trials,
            sample_size,
            distribution: DistributionParams::new(shift, scale, contamination)?,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.trials == 0 {
            return Err(invalid("trials must be > 0"));
        }
        if self.sample_size == 0 {
            return Err(invalid("sample_size must be > 0"));
        }
        self.distribution.validate()?;
        if !(self.estimator_scale.is_finite() && self.estimator_scale > 0.0) {
            return Err(invalid(format!(
                "estimator_scale must be finite and > 0, got {}",
                self.estimator_scale
            )));
        }
        self.solver.validate()?;
        if self.estimators.is_empty() {
            return Err(invalid("at least one estimator must be configured"));
        }

        let mut seen = Vec::with_capacity(self.estimators.len());
        for spec in &self.estimators {
            spec.estimator.validate()?;
            if !spec.initial_guess.is_finite() {
                return Err(invalid("initial_guess must be finite"));
            }
            let name = spec.name();
            if seen.contains(&name) {
                return Err(invalid(format!("estimator {name} is configured twice")));
            }
            seen.push(name);
        }

        Ok(())
    }
}

/// Outcome of one estimator on one trial.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrialRecord {
    pub trial: usize,
    pub estimator: String,
    /// Observations drawn from the contaminating component
    pub contaminated: usize,
    pub estimate: Option<f64>,
    pub squared_error: Option<f64>,
    pub iterations: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct MonteCarloBatch {
    pub records: Vec<TrialRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EstimatorQuality {
    pub estimator: String,
    /// Mean squared error over converged trials; NaN if none converged
    pub mse: f64,
    pub converged: usize,
    pub failed: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MonteCarloSummary {
    pub trials: usize,
    pub sample_size: usize,
    pub seed: u64,
    pub distribution: DistributionParams,
    pub estimator_scale: f64,
    pub realized_contamination: f64,
    pub estimators: Vec<EstimatorQuality>,
}

#[derive(Debug, Default, Clone)]
struct QualityAccumulator {
    sum_sq: f64,
    converged: usize,
    failed: usize,
}

impl QualityAccumulator {
    fn observe(&mut self, squared_error: Option<f64>) {
        match squared_error {
            Some(value) => {
                self.sum_sq += value;
                self.converged += 1;
            }
            None => self.failed += 1,
        }
    }

    fn finalize(&self, estimator: String) -> EstimatorQuality {
        let mse = if self.converged > 0 {
            self.sum_sq / self.converged as f64
        } else {
            f64::NAN
        };
        EstimatorQuality {
            estimator,
            mse,
            converged: self.converged,
            failed: self.failed,
        }
    }
}

pub fn run_monte_carlo(config: &MonteCarloConfig) -> Result<MonteCarloBatch> {
    config.validate()?;

    let sampler = MixtureSampler::new(&config.distribution)?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut records = Vec::with_capacity(config.trials * config.estimators.len());

    info!(
        trials = config.trials,
        sample_size = config.sample_size,
        contamination = config.distribution.contamination,
        estimators = config.estimators.len(),
        "starting monte carlo run"
    );

    for trial in 0..config.trials {
        let (sample, contaminated) = sampler.sample_with_count(&mut rng, config.sample_size)?;

        for spec in &config.estimators {
            let estimator = spec.name();
            let outcome = match spec.estimate(&sample, config.estimator_scale, &config.solver) {
                Ok(root) => Some(root),
                Err(err @ EstimationError::NonConvergence { .. }) => {
                    warn!(trial, estimator = %estimator, error = %err, "estimate recorded as missing");
                    None
                }
                Err(err) => return Err(err),
            };

            records.push(TrialRecord {
                trial,
                estimator,
                contaminated,
                estimate: outcome.map(|root| root.root),
                squared_error: outcome.map(|root| (root.root - PRIMARY_LOCATION).powi(2)),
                iterations: outcome.map(|root| root.iterations),
            });
        }

        if (trial + 1) % 100 == 0 {
            debug!(completed = trial + 1, "monte carlo progress");
        }
    }

    Ok(MonteCarloBatch { records })
}

pub fn summarize_batch(config: &MonteCarloConfig, batch: &MonteCarloBatch) -> MonteCarloSummary {
    let mut accumulators: BTreeMap<String, QualityAccumulator> = BTreeMap::new();
    let mut contaminated_total = 0usize;
    let mut sampled_trials = 0usize;
    let mut last_trial = None;

    for record in &batch.records {
        accumulators
            .entry(record.estimator.clone())
            .or_default()
            .observe(record.squared_error);

        if last_trial != Some(record.trial) {
            contaminated_total += record.contaminated;
            sampled_trials += 1;
            last_trial = Some(record.trial);
        }
    }

    let realized_contamination = if sampled_trials == 0 {
        0.0
    } else {
        contaminated_total as f64 / (sampled_trials * config.sample_size) as f64
    };

    let estimators = config
        .estimators
        .iter()
        .map(|spec| {
            let name = spec.name();
            accumulators
                .get(&name)
                .cloned()
                .unwrap_or_default()
                .finalize(name)
        })
        .collect();

    MonteCarloSummary {
        trials: config.trials,
        sample_size: config.sample_size,
        seed: config.seed,
        distribution: config.distribution,
        estimator_scale: config.estimator_scale,
        realized_contamination,
        estimators,
    }
}

/// `{estimator name: MSE}` view of a summary.
pub fn quality_by_estimator(summary: &MonteCarloSummary) -> BTreeMap<String, f64> {
    summary
        .estimators
        .iter()
        .map(|quality| (quality.estimator.clone(), quality.mse))
        .collect()
}

/// Run the default estimator table and reduce it to `{estimator name: MSE}`.
pub fn run(
    trials: usize,
    sample_size: usize,
    contamination: f64,
    shift: f64,
    scale: f64,
) -> Result<BTreeMap<String, f64>> {
    let config = MonteCarloConfig::new(trials, sample_size, contamination, shift, scale)?;
    let batch = run_monte_carlo(&config)?;
    Ok(quality_by_estimator(&summarize_batch(&config, &batch)))
}

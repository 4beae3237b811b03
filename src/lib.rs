//! logit-mest - robust location estimation for contaminated logistic samples
//!
//! Solves the maximum-likelihood and generalized-radical (Hampel-type)
//! estimating equations for the location of a logistic law, and measures
//! how each estimator degrades under contamination with a Monte Carlo sweep.

pub mod influence;
pub mod logging;
pub mod monte_carlo;
pub mod output;
pub mod params;
pub mod sampler;
pub mod score;
pub mod solver;
pub mod stats;

use thiserror::Error;

// Re-export main types
pub use monte_carlo::{
    quality_by_estimator, run_monte_carlo, summarize_batch, EstimatorSpec, MonteCarloBatch,
    MonteCarloConfig, MonteCarloSummary, TrialRecord,
};
pub use params::{DistributionParams, EstimatorConfig};
pub use sampler::{generate_mixture, sample_logistic, Logistic, MixtureSampler, Sample};
pub use score::{EstimatingEquation, Estimator, ScoreEquation};
pub use solver::{solve, newton, secant, RootEstimate, RootMethod, SolverOptions};
pub use stats::SampleSummary;

#[derive(Debug, Error)]
pub enum EstimationError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("{method} did not converge after {iterations} iterations: {reason}")]
    NonConvergence {
        method: &'static str,
        iterations: usize,
        reason: String,
    },
    #[error("degenerate sample: variance is zero")]
    DegenerateSample,
    #[error("malformed dataset: {0}")]
    MalformedDataset(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EstimationError>;

/// Shorthand for building an [`EstimationError::InvalidParameter`].
pub(crate) fn invalid(message: impl Into<String>) -> EstimationError {
    EstimationError::InvalidParameter(message.into())
}

//! Distribution and estimator parameters
//!
//! Validated once at configuration time; everything downstream assumes the
//! invariants hold.

use serde::{Deserialize, Serialize};

use crate::score::{Estimator, ScoreEquation};
use crate::{invalid, Result};

/// Two-component logistic mixture.
///
/// The primary component is logistic(0, 1) and is drawn with probability
/// `1 - contamination`; the secondary is logistic(`shift`, `scale`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionParams {
    /// Location of the contaminating component
    pub shift: f64,
    /// Scale of the contaminating component (> 0)
    pub scale: f64,
    /// Mixing probability of the contaminating component, in [0, 1]
    pub contamination: f64,
}

impl DistributionParams {
    /// Create validated mixture parameters
    pub fn new(shift: f64, scale: f64, contamination: f64) -> Result<Self> {
        let params = Self {
            shift,
            scale,
            contamination,
        };
        params.validate()?;
        Ok(params)
    }

    /// Uncontaminated logistic(0, 1)
    pub fn pure() -> Self {
        Self {
            shift: 0.0,
            scale: 1.0,
            contamination: 0.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.shift.is_finite() {
            return Err(invalid("shift must be finite"));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(invalid(format!(
                "scale must be finite and > 0, got {}",
                self.scale
            )));
        }
        if !(0.0..=1.0).contains(&self.contamination) {
            return Err(invalid(format!(
                "contamination must be in [0, 1], got {}",
                self.contamination
            )));
        }
        Ok(())
    }
}

impl Default for DistributionParams {
    fn default() -> Self {
        Self {
            shift: 0.0,
            scale: 10.0,
            contamination: 0.2,
        }
    }
}

/// Which estimating equation to solve, and the scale it assumes known.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    pub estimator: Estimator,
    pub scale: f64,
}

impl EstimatorConfig {
    pub fn new(estimator: Estimator, scale: f64) -> Result<Self> {
        let config = Self { estimator, scale };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(invalid(format!(
                "estimator scale must be finite and > 0, got {}",
                self.scale
            )));
        }
        self.estimator.validate()
    }

    /// Bind the configuration to a sample.
    pub fn equation<'a>(&self, data: &'a [f64]) -> Result<ScoreEquation<'a>> {
        ScoreEquation::new(data, self.scale, self.estimator)
    }
}

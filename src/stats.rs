//! Descriptive statistics of a sample
//!
//! Variance is the population variance; skewness and kurtosis are the plain
//! (non-excess) moment ratios.

use serde::Serialize;

use crate::{invalid, EstimationError, Result};

pub fn mean(data: &[f64]) -> Result<f64> {
    check_non_empty(data)?;
    Ok(data.iter().sum::<f64>() / data.len() as f64)
}

pub fn median(data: &[f64]) -> Result<f64> {
    check_non_empty(data)?;
    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Ok((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Ok(sorted[mid])
    }
}

/// Population variance
pub fn variance(data: &[f64]) -> Result<f64> {
    let m = mean(data)?;
    Ok(central_moment(data, m, 2))
}

pub fn skewness(data: &[f64]) -> Result<f64> {
    let m = mean(data)?;
    let var = non_degenerate_variance(data, m)?;
    Ok(central_moment(data, m, 3) / var.powf(1.5))
}

pub fn kurtosis(data: &[f64]) -> Result<f64> {
    let m = mean(data)?;
    let var = non_degenerate_variance(data, m)?;
    Ok(central_moment(data, m, 4) / (var * var))
}

/// All descriptive statistics of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleSummary {
    pub size: usize,
    pub mean: f64,
    pub median: f64,
    pub variance: f64,
    pub skewness: f64,
    pub kurtosis: f64,
}

impl SampleSummary {
    pub fn from_sample(data: &[f64]) -> Result<Self> {
        Ok(Self {
            size: data.len(),
            mean: mean(data)?,
            median: median(data)?,
            variance: variance(data)?,
            skewness: skewness(data)?,
            kurtosis: kurtosis(data)?,
        })
    }
}

fn central_moment(data: &[f64], m: f64, order: i32) -> f64 {
    data.iter().map(|&x| (x - m).powi(order)).sum::<f64>() / data.len() as f64
}

fn non_degenerate_variance(data: &[f64], m: f64) -> Result<f64> {
    let var = central_moment(data, m, 2);
    if var > 0.0 {
        Ok(var)
    } else {
        Err(EstimationError::DegenerateSample)
    }
}

fn check_non_empty(data: &[f64]) -> Result<()> {
    if data.is_empty() {
        Err(invalid("statistics need a non-empty sample"))
    } else {
        Ok(())
    }
}

//! Descriptive statistics over sample series.

use serde::Serialize;

use crate::error::{DriveError, Result};

/// Summary of a sample series.
///
/// `stddev` is the population standard deviation (divides by `n`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub stddev: f64,
}

impl Summary {
    pub fn from_samples(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(DriveError::EmptySeries);
        }

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = count / 2;
        let median = if count % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        Ok(Self {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            mean,
            median,
            stddev: variance.sqrt(),
        })
    }

    /// Summarise integer samples.
    pub fn from_integers(values: &[i32]) -> Result<Self> {
        let values: Vec<f64> = values.iter().map(|&v| f64::from(v)).collect();
        Self::from_samples(&values)
    }
}

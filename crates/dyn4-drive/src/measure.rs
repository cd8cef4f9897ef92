//! Quantities derived from repeated reads.

use std::thread;
use std::time::{Duration, Instant};

use dyn4_transport::DriveLink;
use serde::Serialize;
use tracing::debug;

use crate::error::{DriveError, Result};
use crate::session::DriveSession;
use crate::stats::Summary;

/// Encoder counts per motor revolution.
pub const ENCODER_COUNTS_PER_REV: f64 = 65_536.0;

/// Gap between the two position samples of a speed measurement.
pub const DEFAULT_SPEED_INTERVAL: Duration = Duration::from_millis(100);

/// How long torque current is sampled for.
pub const DEFAULT_TORQUE_WINDOW: Duration = Duration::from_secs(1);

/// Convert a position delta over `interval` into revolutions per minute.
pub fn rpm_from_counts(delta: i64, interval: Duration) -> f64 {
    delta as f64 / interval.as_secs_f64() * 60.0 / ENCODER_COUNTS_PER_REV
}

/// Torque current sampled over a time window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TorqueReport {
    pub elapsed: Duration,
    pub samples: Vec<i32>,
    /// Statistics of the signed readings.
    pub signed: Summary,
    /// Statistics of the absolute readings.
    pub absolute: Summary,
}

impl TorqueReport {
    pub fn from_samples(samples: Vec<i32>, elapsed: Duration) -> Result<Self> {
        let signed = Summary::from_integers(&samples)?;
        let magnitudes: Vec<i32> = samples.iter().map(|s| s.saturating_abs()).collect();
        let absolute = Summary::from_integers(&magnitudes)?;
        Ok(Self {
            elapsed,
            samples,
            signed,
            absolute,
        })
    }
}

impl<L: DriveLink> DriveSession<L> {
    /// Estimate motor speed from two absolute positions `interval` apart.
    pub fn measure_speed(&mut self, interval: Duration) -> Result<f64> {
        if interval.is_zero() {
            return Err(DriveError::ValueOutOfRange {
                what: "interval",
                value: 0,
            });
        }

        let first = self.read_abs_pos32()?;
        thread::sleep(interval);
        let second = self.read_abs_pos32()?;

        let delta = i64::from(second) - i64::from(first);
        let rpm = rpm_from_counts(delta, interval);
        debug!(first, second, ?interval, rpm, "measured speed");
        Ok(rpm)
    }

    /// Sample torque current back to back until `window` has elapsed.
    ///
    /// At least one sample is always taken.
    pub fn integrate_trq_current(&mut self, window: Duration) -> Result<TorqueReport> {
        let start = Instant::now();
        let mut samples = Vec::new();
        loop {
            samples.push(self.read_trq_current()?);
            if start.elapsed() >= window {
                break;
            }
        }

        let elapsed = start.elapsed();
        debug!(samples = samples.len(), ?elapsed, "torque window closed");
        TorqueReport::from_samples(samples, elapsed)
    }
}

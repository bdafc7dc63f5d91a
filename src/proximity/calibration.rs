// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ble-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Reference RSSI calibration
//!
//! With the peer held at exactly one meter, the calibrator polls the link
//! RSSI at a fixed interval and replaces the model reference with the mean of
//! the valid readings. It is a blocking routine meant to run on demand, never
//! from the event handlers.

use std::time::Duration;

use log::{debug, info, warn};
use thiserror::Error;

use super::model::PathLossModel;

/// Default number of valid samples to collect
pub const DEFAULT_CALIBRATION_SAMPLES: usize = 10;

/// Default delay before each probe reading
pub const DEFAULT_CALIBRATION_INTERVAL: Duration = Duration::from_millis(500);

/// Source of on-demand RSSI readings for the active connection
#[cfg_attr(test, mockall::automock)]
pub trait RssiProbe {
    /// Current RSSI in dBm, `None` when there is no connection or no reading.
    fn read_rssi(&mut self) -> Option<i16>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("No valid RSSI sample in {attempts} attempts")]
    NoValidSamples { attempts: usize },
}

/// Result of a successful calibration
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationOutcome {
    /// New reference RSSI at 1 m
    pub reference_rssi: f64,
    /// Valid samples averaged
    pub samples: usize,
    /// Probe readings attempted
    pub attempts: usize,
}

/// Blocking reference RSSI calibration
#[derive(Debug, Clone)]
pub struct Calibrator {
    samples: usize,
    interval: Duration,
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::new(DEFAULT_CALIBRATION_SAMPLES, DEFAULT_CALIBRATION_INTERVAL)
    }
}

impl Calibrator {
    pub fn new(samples: usize, interval: Duration) -> Self {
        Self { samples, interval }
    }

    /// Run the calibration and update `model` on success.
    ///
    /// Tries at most twice the target sample count and stops as soon as the
    /// target is reached. Only negative readings count. When no reading is
    /// valid the model is left untouched.
    pub fn calibrate<P>(
        &self,
        probe: &mut P,
        model: &mut PathLossModel,
    ) -> Result<CalibrationOutcome, CalibrationError>
    where
        P: RssiProbe + ?Sized,
    {
        info!(
            "Starting calibration, place the peer at 1 m ({} samples every {} ms)",
            self.samples,
            self.interval.as_millis()
        );

        let max_attempts = self.samples * 2;
        let mut sum: i64 = 0;
        let mut valid = 0usize;
        let mut attempts = 0usize;

        while attempts < max_attempts && valid < self.samples {
            if !self.interval.is_zero() {
                std::thread::sleep(self.interval);
            }
            attempts += 1;

            match probe.read_rssi() {
                Some(rssi) if rssi < 0 => {
                    sum += rssi as i64;
                    valid += 1;
                    debug!("Sample {}/{}: RSSI={} dBm", valid, self.samples, rssi);
                }
                Some(rssi) => debug!("Discarding invalid calibration sample {} dBm", rssi),
                None => debug!("No RSSI reading available (attempt {})", attempts),
            }
        }

        if valid == 0 {
            warn!("Calibration failed: no valid sample in {} attempts", attempts);
            return Err(CalibrationError::NoValidSamples { attempts });
        }

        let reference_rssi = sum as f64 / valid as f64;
        model.set_reference_rssi(reference_rssi);
        info!(
            "Calibration complete! New reference RSSI: {:.2} dBm",
            reference_rssi
        );

        Ok(CalibrationOutcome {
            reference_rssi,
            samples: valid,
            attempts,
        })
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ble-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Proximity estimation configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bridge::DEFAULT_REPORT_INTERVAL;
use crate::proximity::calibration::{DEFAULT_CALIBRATION_INTERVAL, DEFAULT_CALIBRATION_SAMPLES};
use crate::proximity::filter::{DEFAULT_HISTORY_LEN, DEFAULT_SMOOTHING_ALPHA};
use crate::proximity::model::{DEFAULT_ENVIRONMENT_FACTOR, DEFAULT_REFERENCE_RSSI};
use crate::proximity::{Calibrator, PathLossModel, RssiFilter};

/// Path-loss model, filter and calibration settings.
///
/// `reference_rssi` is the starting value only: a calibration run replaces it
/// for the lifetime of the process and is not written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProximityConfig {
    /// RSSI measured at 1 m, in dBm. Default is -59.
    pub reference_rssi: f64,

    /// Attenuation exponent: 2.0 in free space, 2.5 to 4.0 indoors.
    pub environment_factor: f64,

    /// Samples kept for the rolling median.
    #[serde(default = "default_history_len")]
    pub history_len: usize,

    /// Weight of the newest distance in the exponential smoothing, in (0, 1].
    #[serde(default = "default_smoothing_alpha")]
    pub smoothing_alpha: f64,

    /// Minimum time between two distance reports.
    #[serde(default = "default_report_interval_ms")]
    pub report_interval_ms: u64,

    #[serde(default = "default_calibration_samples")]
    pub calibration_samples: usize,

    #[serde(default = "default_calibration_interval_ms")]
    pub calibration_interval_ms: u64,

    /// Clear the history and estimate when the peer disconnects.
    #[serde(default)]
    pub reset_on_disconnect: bool,
}

fn default_history_len() -> usize {
    DEFAULT_HISTORY_LEN
}

fn default_smoothing_alpha() -> f64 {
    DEFAULT_SMOOTHING_ALPHA
}

fn default_report_interval_ms() -> u64 {
    DEFAULT_REPORT_INTERVAL.as_millis() as u64
}

fn default_calibration_samples() -> usize {
    DEFAULT_CALIBRATION_SAMPLES
}

fn default_calibration_interval_ms() -> u64 {
    DEFAULT_CALIBRATION_INTERVAL.as_millis() as u64
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            reference_rssi: DEFAULT_REFERENCE_RSSI,
            environment_factor: DEFAULT_ENVIRONMENT_FACTOR,
            history_len: default_history_len(),
            smoothing_alpha: default_smoothing_alpha(),
            report_interval_ms: default_report_interval_ms(),
            calibration_samples: default_calibration_samples(),
            calibration_interval_ms: default_calibration_interval_ms(),
            reset_on_disconnect: false,
        }
    }
}

impl ProximityConfig {
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }

    pub fn build_model(&self) -> PathLossModel {
        PathLossModel::new(self.reference_rssi, self.environment_factor)
    }

    pub fn build_filter(&self) -> RssiFilter {
        RssiFilter::new(self.history_len, self.smoothing_alpha)
    }

    pub fn build_calibrator(&self) -> Calibrator {
        Calibrator::new(
            self.calibration_samples,
            Duration::from_millis(self.calibration_interval_ms),
        )
    }
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ble-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Log-distance path-loss model
//!
//! The received power falls off with the logarithm of the distance:
//!
//! ```text
//! rssi = reference_rssi - 10 * n * log10(d / 1 m)
//! ```
//!
//! Solving for `d` gives the estimator used here:
//!
//! ```text
//! d = 10 ^ ((reference_rssi - rssi) / (10 * n))
//! ```
//!
//! where `reference_rssi` is the RSSI measured at 1 m and `n` the
//! environment attenuation exponent (2.0 in free space, 2.5 to 4.0 indoors).

/// Default RSSI at 1 m (dBm)
pub const DEFAULT_REFERENCE_RSSI: f64 = -59.0;

/// Default environment attenuation exponent
pub const DEFAULT_ENVIRONMENT_FACTOR: f64 = 2.5;

/// Distance at which the reference RSSI is defined, and calibration is done
pub const REFERENCE_DISTANCE_M: f64 = 1.0;

/// Value reported in place of a distance when the measurement is unusable
pub const INVALID_DISTANCE: f64 = -1.0;

/// Round to two decimal places
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Convert an RSSI reading into a distance in meters.
///
/// Returns `None` for non-negative readings, which are not physical dBm
/// values for a received signal, and for results that are not finite.
///
/// ```
/// use ble_modbus_bridge::proximity::calculate_distance;
///
/// assert_eq!(calculate_distance(-59, -59.0, 2.5), Some(1.0));
/// assert_eq!(calculate_distance(-84, -59.0, 2.5), Some(10.0));
/// assert_eq!(calculate_distance(0, -59.0, 2.5), None);
/// ```
pub fn calculate_distance(rssi: i16, reference_rssi: f64, environment_factor: f64) -> Option<f64> {
    if rssi >= 0 {
        return None;
    }
    let exponent = (reference_rssi - rssi as f64) / (10.0 * environment_factor);
    let distance = round2(10f64.powf(exponent));
    distance.is_finite().then_some(distance)
}

/// Path-loss model parameters
///
/// `reference_rssi` is only ever changed by calibration; the environment
/// factor is fixed for the lifetime of the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathLossModel {
    reference_rssi: f64,
    environment_factor: f64,
}

impl Default for PathLossModel {
    fn default() -> Self {
        Self::new(DEFAULT_REFERENCE_RSSI, DEFAULT_ENVIRONMENT_FACTOR)
    }
}

impl PathLossModel {
    pub fn new(reference_rssi: f64, environment_factor: f64) -> Self {
        Self {
            reference_rssi,
            environment_factor,
        }
    }

    /// Distance for a reading under this model, see [`calculate_distance`].
    pub fn distance(&self, rssi: i16) -> Option<f64> {
        calculate_distance(rssi, self.reference_rssi, self.environment_factor)
    }

    /// Expected RSSI at `distance_m`, the inverse of [`PathLossModel::distance`].
    pub fn expected_rssi(&self, distance_m: f64) -> f64 {
        self.reference_rssi - 10.0 * self.environment_factor * distance_m.max(0.01).log10()
    }

    pub fn reference_rssi(&self) -> f64 {
        self.reference_rssi
    }

    pub fn environment_factor(&self) -> f64 {
        self.environment_factor
    }

    pub(crate) fn set_reference_rssi(&mut self, reference_rssi: f64) {
        self.reference_rssi = reference_rssi;
    }
}

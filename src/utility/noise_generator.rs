// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ble-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Gaussian RSSI noise
//!
//! Lightweight pseudo-random source used to fake radio measurements:
//!
//! * XORShift pseudo-random number generation
//! * Box-Muller transform for the Gaussian distribution
//! * RSSI samples scattered around a mean, clamped to valid dBm readings
//!
//! ## Examples
//!
//! ```rust
//! use ble_modbus_bridge::utility::noise_generator::NoiseGenerator;
//!
//! let mut generator = NoiseGenerator::new(12345);
//!
//! // 20 readings around -70 dBm with 3 dB of spread
//! let readings = generator.generate_rssi(20, -70.0, 3.0);
//! assert!(readings.iter().all(|&rssi| rssi < 0));
//! ```

use std::time::SystemTime;

/// Weakest RSSI a radio reports, in dBm
pub const MIN_RSSI: i16 = -127;

/// Strongest valid RSSI, anything at or above zero is not a received level
pub const MAX_RSSI: i16 = -1;

/// XORShift pseudo-random generator. Not suitable for cryptography.
#[derive(Debug, Clone)]
pub struct NoiseGenerator {
    rng_state: u32,
}

impl NoiseGenerator {
    /// Creates a generator from a seed; the same seed gives the same sequence.
    ///
    /// A zero seed would lock XORShift at zero and is replaced by a fixed one.
    pub fn new(seed: u32) -> Self {
        Self {
            rng_state: if seed == 0 { 0x9E37_79B9 } else { seed },
        }
    }

    /// Creates a generator seeded from the current time in milliseconds.
    pub fn new_from_system_time() -> Self {
        let seed = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u32;
        Self::new(seed)
    }

    /// Uniform value in [-1.0, 1.0].
    pub fn random_float(&mut self) -> f64 {
        self.rng_state ^= self.rng_state << 13;
        self.rng_state ^= self.rng_state >> 17;
        self.rng_state ^= self.rng_state << 5;

        (self.rng_state as f64 / u32::MAX as f64) * 2.0 - 1.0
    }

    /// Standard normal value (mean 0, deviation 1).
    ///
    /// ```text
    /// z = sqrt(-2 * ln(u1)) * cos(2 * π * u2)
    /// ```
    pub fn random_gaussian(&mut self) -> f64 {
        let u1 = (self.random_float() + 1.0) / 2.0;
        let u2 = (self.random_float() + 1.0) / 2.0;

        // Avoid ln(0)
        let u1 = u1.max(0.0001);

        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    /// One RSSI reading drawn around `mean_dbm` with `sigma_db` deviation.
    pub fn rssi_sample(&mut self, mean_dbm: f64, sigma_db: f64) -> i16 {
        let value = mean_dbm + self.random_gaussian() * sigma_db;
        (value.round() as i16).clamp(MIN_RSSI, MAX_RSSI)
    }

    /// A batch of [`NoiseGenerator::rssi_sample`] readings.
    pub fn generate_rssi(&mut self, count: usize, mean_dbm: f64, sigma_db: f64) -> Vec<i16> {
        (0..count)
            .map(|_| self.rssi_sample(mean_dbm, sigma_db))
            .collect()
    }
}

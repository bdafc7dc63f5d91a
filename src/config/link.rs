// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ble-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Wireless link configuration
//!
//! Settings of the wireless peripheral and of the simulated link used when no
//! radio stack is available.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bridge::{CONNECT_BANNER, DEFAULT_RSSI_INTERVAL};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Advertised name of the peripheral.
    pub device_name: String,

    /// RSSI subscription period requested on connect.
    #[serde(default = "default_rssi_interval_ms")]
    pub rssi_interval_ms: u64,

    /// Bytes written to the serial line when a peer connects, empty to disable.
    #[serde(default = "default_connect_banner")]
    pub connect_banner: Vec<u8>,

    /// Drive the bridge from the simulated link instead of a radio.
    #[serde(default)]
    pub simulated: bool,

    /// True distance of the simulated peer, in meters.
    #[serde(default = "default_simulated_distance_m")]
    pub simulated_distance_m: f64,

    /// Standard deviation of the simulated RSSI noise, in dB.
    #[serde(default = "default_simulated_noise_db")]
    pub simulated_noise_db: f64,
}

fn default_rssi_interval_ms() -> u64 {
    DEFAULT_RSSI_INTERVAL.as_millis() as u64
}

fn default_connect_banner() -> Vec<u8> {
    CONNECT_BANNER.to_vec()
}

fn default_simulated_distance_m() -> f64 {
    2.0
}

fn default_simulated_noise_db() -> f64 {
    2.0
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            device_name: "ESP32_Modbus".to_string(),
            rssi_interval_ms: default_rssi_interval_ms(),
            connect_banner: default_connect_banner(),
            simulated: false,
            simulated_distance_m: default_simulated_distance_m(),
            simulated_noise_db: default_simulated_noise_db(),
        }
    }
}

impl LinkConfig {
    pub fn rssi_interval(&self) -> Duration {
        Duration::from_millis(self.rssi_interval_ms)
    }
}

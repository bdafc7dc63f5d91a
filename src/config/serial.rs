// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ble-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Serial line configuration
//!
//! Physical UART settings of the wired Modbus side.

use serde::{Deserialize, Serialize};

/// UART parity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

/// Configuration of the serial port the Modbus master is wired to.
///
/// # Example
///
/// ```
/// use ble_modbus_bridge::config::{Parity, SerialConfig};
///
/// let serial = SerialConfig {
///     port: "/dev/ttyUSB1".to_string(),
///     baud_rate: 19200,
///     parity: Parity::Even,
///     ..SerialConfig::default()
/// };
/// assert_eq!(serial.data_bits, 8);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Device path (`/dev/ttyUSB0`, `COM3`, ...)
    pub port: String,

    /// Line speed in baud. Default is 9600.
    pub baud_rate: u32,

    /// Data bits per character, 5 to 8.
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,

    /// Stop bits, 1 or 2.
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,

    #[serde(default)]
    pub parity: Parity,
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: Parity::None,
        }
    }
}

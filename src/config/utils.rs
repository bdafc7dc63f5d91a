// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ble-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::{debug, warn};

use super::Config;
use crate::modbus::silence_for_baud;

/// Largest register count whose byte count still fits the response header
pub const MAX_REGISTER_COUNT: u16 = 125;

/// Output the embedded JSON schema to the console.
///
/// Called for the `--show-config-schema` flag.
///
/// # Example
///
/// ```bash
/// ./ble_modbus_bridge --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema_str = include_str!("../../resources/config.schema.json");

    let schema: serde_json::Value =
        serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Validates the configuration against rules the JSON schema cannot express.
///
/// # Validation Rules
///
/// - **Serial port**: the device path is not empty
/// - **Slave address**: 1 to 247, broadcast and reserved addresses are refused
/// - **Register bank**: 1 to 125 registers, initial values fit in the bank
/// - **Frame length**: at least one full request (8 bytes)
/// - **Filter**: history of at least one sample, smoothing factor in (0, 1]
/// - **Path loss**: strictly positive environment factor
///
/// A silence timeout that is not shorter than the poll period, or shorter than
/// what the baud rate requires, is only reported as a warning.
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    if config.serial.port.trim().is_empty() {
        anyhow::bail!("Serial port must not be empty");
    }

    let modbus = &config.modbus;
    if !(1..=247).contains(&modbus.slave_id) {
        anyhow::bail!("Invalid Modbus slave id: {}", modbus.slave_id);
    }
    if modbus.register_count == 0 || modbus.register_count > MAX_REGISTER_COUNT {
        anyhow::bail!(
            "Register count must be between 1 and {}, got {}",
            MAX_REGISTER_COUNT,
            modbus.register_count
        );
    }
    if modbus.initial_registers.len() > modbus.register_count as usize {
        anyhow::bail!(
            "{} initial registers do not fit in a bank of {}",
            modbus.initial_registers.len(),
            modbus.register_count
        );
    }
    if modbus.max_frame_len < crate::modbus::processor::MIN_REQUEST_LEN {
        anyhow::bail!(
            "Maximum frame length {} is shorter than a request",
            modbus.max_frame_len
        );
    }
    if modbus.silence_timeout_ms >= modbus.poll_interval_ms {
        warn!(
            "Silence timeout ({} ms) is not shorter than the poll period ({} ms), frames will be detected late",
            modbus.silence_timeout_ms, modbus.poll_interval_ms
        );
    }
    let required = silence_for_baud(config.serial.baud_rate);
    if modbus.silence_timeout() < required {
        warn!(
            "Silence timeout ({} ms) is shorter than {} ms needed at {} baud",
            modbus.silence_timeout_ms,
            required.as_millis(),
            config.serial.baud_rate
        );
    }

    let proximity = &config.proximity;
    if proximity.history_len == 0 {
        anyhow::bail!("RSSI history length must be at least 1");
    }
    if !(proximity.smoothing_alpha > 0.0 && proximity.smoothing_alpha <= 1.0) {
        anyhow::bail!(
            "Smoothing factor must be in (0, 1], got {}",
            proximity.smoothing_alpha
        );
    }
    if proximity.environment_factor.is_nan() || proximity.environment_factor <= 0.0 {
        anyhow::bail!(
            "Environment factor must be positive, got {}",
            proximity.environment_factor
        );
    }

    Ok(())
}

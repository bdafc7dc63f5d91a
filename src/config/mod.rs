// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ble-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the bridge
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML file and
//! validated against a JSON schema embedded in the binary.
//!
//! ## Configuration Structure
//!
//! - `serial`: UART settings of the wired side
//! - `modbus`: RTU slave address, register bank and framing timings
//! - `proximity`: path-loss model, RSSI filter and calibration
//! - `link`: wireless peripheral and simulated link
//!
//! ## Usage
//!
//! ```no_run
//! use ble_modbus_bridge::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some("/dev/ttyUSB1".to_string()), // Serial port
//!     Some(19200),                      // Baud rate
//!     None,                             // Slave id
//!     true,                             // Simulated link
//! );
//!
//! let bridge = config.build_bridge().unwrap();
//! ```

pub mod link;
pub mod modbus;
pub mod proximity;
pub mod serial;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::bridge::{Bridge, BridgeSettings};

pub use link::LinkConfig;
pub use modbus::ModbusConfig;
pub use proximity::ProximityConfig;
pub use serial::{Parity, SerialConfig};
pub use utils::output_config_schema;

/// Root configuration structure.
///
/// Every section falls back to its defaults when absent from the file, so an
/// empty document is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Serial port of the wired Modbus side.
    #[serde(default)]
    pub serial: SerialConfig,

    /// RTU slave settings.
    #[serde(default)]
    pub modbus: ModbusConfig,

    /// Distance estimation settings.
    #[serde(default)]
    pub proximity: ProximityConfig,

    /// Wireless side settings.
    #[serde(default)]
    pub link: LinkConfig,
}

impl Config {
    /// Write a default configuration next to `path` for the user to edit
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Original path: {:?}, Sample path: {:?}", path, sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;

        // An empty file parses as null, treat it as an empty mapping
        let json_value = match serde_json::to_value(&yaml_value).with_context(|| {
            format!("Failed to convert YAML to JSON for validation: {:?}", path)
        })? {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            value => value,
        };

        let schema_str = include_str!("../../resources/config.schema.json");
        let schema: serde_json::Value =
            serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config = match serde_json::from_value(json_value) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        if let Err(err) = utils::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only the values actually provided override the loaded configuration;
    /// `simulate` can only switch the simulated link on.
    ///
    /// # Parameters
    ///
    /// * `serial_port` - Serial device path
    /// * `baud_rate` - Line speed
    /// * `slave_id` - Modbus slave address
    /// * `simulate` - Drive the bridge from the simulated link
    pub fn apply_args(
        &mut self,
        serial_port: Option<String>,
        baud_rate: Option<u32>,
        slave_id: Option<u8>,
        simulate: bool,
    ) {
        if let Some(port) = serial_port {
            debug!("Overriding serial port from command line: {}", port);
            self.serial.port = port;
        }
        if let Some(baud) = baud_rate {
            debug!("Overriding baud rate from command line: {}", baud);
            self.serial.baud_rate = baud;
        }
        if let Some(id) = slave_id {
            debug!("Overriding Modbus slave id from command line: {}", id);
            self.modbus.slave_id = id;
        }
        if simulate {
            debug!("Enabling simulated link from command line");
            self.link.simulated = true;
        }
    }

    /// Bridge settings derived from the proximity and link sections.
    pub fn bridge_settings(&self) -> BridgeSettings {
        BridgeSettings {
            report_interval: self.proximity.report_interval(),
            rssi_interval: self.link.rssi_interval(),
            connect_banner: self.link.connect_banner.clone(),
            reset_on_disconnect: self.proximity.reset_on_disconnect,
        }
    }

    /// Assemble a [`Bridge`] from this configuration.
    pub fn build_bridge(&self) -> Result<Bridge> {
        let processor = self
            .modbus
            .build_processor()
            .context("Invalid Modbus register configuration")?;

        Ok(Bridge::new(
            self.modbus.build_assembler(),
            processor,
            self.proximity.build_filter(),
            self.proximity.build_model(),
            self.proximity.build_calibrator(),
            self.bridge_settings(),
        ))
    }
}

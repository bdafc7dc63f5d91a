// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ble-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::fs;
use std::sync::Once;
use std::time::Duration;

use anyhow::Result;
use ble_modbus_bridge::config::{Config, Parity, SerialConfig};
use tempfile::tempdir;

static INIT: Once = Once::new();

// Setup logger for tests
fn setup() {
    INIT.call_once(|| {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    });
}

#[test]
fn test_config_load_and_save() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    let mut config = Config {
        serial: SerialConfig {
            port: "/dev/ttyAMA0".to_string(),
            baud_rate: 19200,
            data_bits: 8,
            stop_bits: 2,
            parity: Parity::Even,
        },
        ..Config::default()
    };
    config.modbus.slave_id = 17;
    config.modbus.initial_registers = vec![1, 2, 3];
    config.proximity.reference_rssi = -62.5;
    config.link.connect_banner.clear();

    config.save_to_file(&config_path)?;
    let loaded_config = Config::from_file(&config_path)?;

    assert_eq!(loaded_config, config);
    assert_eq!(loaded_config.serial.parity, Parity::Even);
    assert!(loaded_config.link.connect_banner.is_empty());

    Ok(())
}

#[test]
fn test_missing_file_creates_default() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("non_existent.yaml");

    let config = Config::from_file(&config_path)?;

    assert!(config_path.exists());
    assert_eq!(config, Config::default());
    assert_eq!(config.serial.baud_rate, 9600);
    assert_eq!(config.modbus.slave_id, 1);
    assert_eq!(config.modbus.initial_registers, vec![1234, 3335]);
    assert_eq!(config.proximity.smoothing_alpha, 0.2);
    assert_eq!(config.link.device_name, "ESP32_Modbus");

    // The written default loads back through validation
    assert_eq!(Config::from_file(&config_path)?, config);
    Ok(())
}

#[test]
fn test_partial_file_uses_defaults() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(
        &config_path,
        r#"
modbus:
  slave_id: 5
  register_count: 4
proximity:
  reference_rssi: -65
  environment_factor: 3.0
"#,
    )?;

    let config = Config::from_file(&config_path)?;

    assert_eq!(config.modbus.slave_id, 5);
    assert_eq!(config.modbus.register_count, 4);
    assert_eq!(config.modbus.initial_registers, vec![1234, 3335]);
    assert_eq!(config.modbus.silence_timeout(), Duration::from_millis(32));
    assert_eq!(config.proximity.reference_rssi, -65.0);
    assert_eq!(config.proximity.history_len, 5);
    assert_eq!(config.serial, SerialConfig::default());
    Ok(())
}

#[test]
fn test_empty_file_is_default() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, "")?;

    assert_eq!(Config::from_file(&config_path)?, Config::default());
    Ok(())
}

#[test]
fn test_schema_violation_creates_sample_file() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(
        &config_path,
        r#"
modbus:
  slave_id: 0
  register_count: 10
"#,
    )?;

    let result = Config::from_file(&config_path);

    assert!(result.is_err(), "Config loading should have failed");
    let sample_path = temp_dir.path().join("config.sample.yaml");
    assert!(sample_path.exists(), "Sample file was not created");

    // The sample itself is a valid configuration
    assert_eq!(Config::from_file(&sample_path)?, Config::default());
    Ok(())
}

#[test]
fn test_unknown_field_is_rejected() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(
        &config_path,
        r#"
serial:
  port: /dev/ttyUSB0
  baud_rate: 9600
  flow_control: hardware
"#,
    )?;

    assert!(Config::from_file(&config_path).is_err());
    Ok(())
}

#[test]
fn test_specific_rules_are_enforced() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    // Schema-valid, but three initial values do not fit in two registers
    fs::write(
        &config_path,
        r#"
modbus:
  slave_id: 1
  register_count: 2
  initial_registers: [1, 2, 3]
"#,
    )?;

    let err = Config::from_file(&config_path).unwrap_err();
    assert!(err.to_string().contains("initial registers"), "{}", err);
    assert!(temp_dir.path().join("config.sample.yaml").exists());
    Ok(())
}

#[test]
fn test_apply_args() {
    let mut config = Config::default();

    config.apply_args(None, None, None, false);
    assert_eq!(config, Config::default());

    config.apply_args(Some("/dev/ttyS1".to_string()), Some(115200), Some(42), true);
    assert_eq!(config.serial.port, "/dev/ttyS1");
    assert_eq!(config.serial.baud_rate, 115200);
    assert_eq!(config.modbus.slave_id, 42);
    assert!(config.link.simulated);
}

#[test]
fn test_build_bridge_from_config() -> Result<()> {
    let mut config = Config::default();
    config.modbus.slave_id = 9;
    config.modbus.register_count = 4;
    config.modbus.initial_registers = vec![7, 8, 9, 10];
    config.proximity.reference_rssi = -61.0;
    config.proximity.report_interval_ms = 500;
    config.link.rssi_interval_ms = 250;

    let bridge = config.build_bridge()?;

    assert_eq!(bridge.processor().slave_id(), 9);
    assert_eq!(bridge.processor().registers().register(3), Some(10));
    assert_eq!(bridge.model().reference_rssi(), -61.0);
    assert_eq!(bridge.settings().report_interval, Duration::from_millis(500));
    assert_eq!(bridge.settings().rssi_interval, Duration::from_millis(250));
    assert_eq!(bridge.assembler().capacity(), 64);
    Ok(())
}

#[test]
fn test_build_bridge_rejects_overflowing_registers() {
    let mut config = Config::default();
    config.modbus.register_count = 1;
    assert!(config.build_bridge().is_err());
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ble-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! BLE / Modbus RTU bridge
//!
//! A wireless peripheral exposing a transparent tunnel to a phone or host,
//! while the wired serial port answers Modbus RTU register reads. The link
//! RSSI is turned into a smoothed distance estimate.
//!
//! - [`modbus`]: CRC16, frame segmentation and request processing
//! - [`proximity`]: path-loss model, RSSI filter and calibration
//! - [`bridge`]: the orchestrator tying both sides together
//! - [`config`] and [`daemon`]: hosting the bridge on a real serial port

pub mod bridge;
pub mod config;
pub mod daemon;
pub mod modbus;
pub mod proximity;
pub mod utility;

pub use bridge::{Bridge, BridgeAction, BridgeEvent};
pub use config::Config;

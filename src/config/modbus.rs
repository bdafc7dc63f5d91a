// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ble-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus RTU slave configuration
//!
//! This module defines the settings of the RTU slave served on the serial
//! line: its address, the register bank and the framing timings.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::modbus::frame::{DEFAULT_MAX_FRAME_LEN, DEFAULT_SILENCE_TIMEOUT};
use crate::modbus::processor::DEFAULT_SLAVE_ID;
use crate::modbus::registers::{DEFAULT_INITIAL_REGISTERS, DEFAULT_REGISTER_COUNT};
use crate::modbus::{FrameAssembler, RegisterBank, RequestProcessor};

/// Configuration for the Modbus RTU slave.
///
/// # Fields
///
/// * `slave_id` - Address answered on the bus (default: 1)
/// * `register_count` - Number of 16-bit holding registers (default: 10)
/// * `initial_registers` - Values loaded from register 0 upward (default: 1234, 3335)
/// * `max_frame_len` - Largest request accepted, in bytes (default: 64)
/// * `silence_timeout_ms` - Inter-byte silence ending a frame (default: 32)
/// * `poll_interval_ms` - Period of the frame polling timer (default: 50)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModbusConfig {
    /// Slave address, 1 to 247.
    pub slave_id: u8,

    /// Size of the register bank in registers.
    ///
    /// At most 125 so a full read fits in one response.
    pub register_count: u16,

    /// Startup values, must fit in the bank.
    #[serde(default = "default_initial_registers")]
    pub initial_registers: Vec<u16>,

    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,

    /// Silence after the last byte that ends a frame.
    ///
    /// 32 ms matches 8 characters at 9600 baud.
    #[serde(default = "default_silence_timeout_ms")]
    pub silence_timeout_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_initial_registers() -> Vec<u16> {
    DEFAULT_INITIAL_REGISTERS.to_vec()
}

fn default_max_frame_len() -> usize {
    DEFAULT_MAX_FRAME_LEN
}

fn default_silence_timeout_ms() -> u64 {
    DEFAULT_SILENCE_TIMEOUT.as_millis() as u64
}

fn default_poll_interval_ms() -> u64 {
    50
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            slave_id: DEFAULT_SLAVE_ID,
            register_count: DEFAULT_REGISTER_COUNT as u16,
            initial_registers: default_initial_registers(),
            max_frame_len: default_max_frame_len(),
            silence_timeout_ms: default_silence_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl ModbusConfig {
    pub fn silence_timeout(&self) -> Duration {
        Duration::from_millis(self.silence_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Frame assembler sized and timed from this configuration.
    pub fn build_assembler(&self) -> FrameAssembler {
        FrameAssembler::new(self.max_frame_len, self.silence_timeout())
    }

    /// Request processor with the configured address and register bank.
    pub fn build_processor(&self) -> Result<RequestProcessor> {
        let bank =
            RegisterBank::with_registers(self.register_count as usize, &self.initial_registers)?;
        Ok(RequestProcessor::new(self.slave_id, bank))
    }
}

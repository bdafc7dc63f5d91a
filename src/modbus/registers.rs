// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ble-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Holding register bank
//!
//! Registers are stored as a flat big-endian byte image so that a read
//! request can be answered with a direct slice copy.

use log::debug;
use thiserror::Error;

/// Default number of holding registers exposed by the slave
pub const DEFAULT_REGISTER_COUNT: usize = 10;

/// Values loaded into registers 0 and 1 at start-up
pub const DEFAULT_INITIAL_REGISTERS: [u16; 2] = [1234, 3335];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    #[error("Register {index} is outside the bank of {count} registers")]
    OutOfRange { index: usize, count: usize },
}

/// Fixed-size bank of 16-bit holding registers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterBank {
    bytes: Vec<u8>,
}

impl Default for RegisterBank {
    fn default() -> Self {
        let mut bank = Self::new(DEFAULT_REGISTER_COUNT);
        for (index, value) in DEFAULT_INITIAL_REGISTERS.iter().enumerate() {
            bank.bytes[index * 2..index * 2 + 2].copy_from_slice(&value.to_be_bytes());
        }
        bank
    }
}

impl RegisterBank {
    /// Create a zeroed bank of `register_count` registers.
    pub fn new(register_count: usize) -> Self {
        Self {
            bytes: vec![0; register_count * 2],
        }
    }

    /// Create a bank and load `initial` into the first registers.
    pub fn with_registers(register_count: usize, initial: &[u16]) -> Result<Self, RegisterError> {
        let mut bank = Self::new(register_count);
        for (index, value) in initial.iter().enumerate() {
            bank.set_register(index, *value)?;
        }
        debug!(
            "Register bank initialised: {} registers, {} preset",
            register_count,
            initial.len()
        );
        Ok(bank)
    }

    /// Read one register, `None` if out of range.
    pub fn register(&self, index: usize) -> Option<u16> {
        let offset = index.checked_mul(2)?;
        let pair = self.bytes.get(offset..offset.checked_add(2)?)?;
        Some(u16::from_be_bytes([pair[0], pair[1]]))
    }

    /// Write one register.
    pub fn set_register(&mut self, index: usize, value: u16) -> Result<(), RegisterError> {
        let count = self.register_count();
        if index >= count {
            return Err(RegisterError::OutOfRange { index, count });
        }
        self.bytes[index * 2..index * 2 + 2].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Raw byte slice `[start, start + len)`, `None` if it leaves the bank.
    pub fn read_bytes(&self, start: usize, len: usize) -> Option<&[u8]> {
        let end = start.checked_add(len)?;
        self.bytes.get(start..end)
    }

    /// Bank size in bytes
    pub fn len_bytes(&self) -> usize {
        self.bytes.len()
    }

    pub fn register_count(&self) -> usize {
        self.bytes.len() / 2
    }
}

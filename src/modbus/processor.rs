// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ble-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus RTU request processing for the bridge slave
//!
//! For avoiding confusion with the Modbus master/slave terminology, the
//! processor is the device that provides data (slave), while the device on the
//! other end of the serial line requests it (master).
//!
//! ## Supported functions
//!
//! | Code | Function | Behaviour |
//! |------|----------|-----------|
//! | 0x03 | Read Holding Registers | served from the [`RegisterBank`] |
//! | other | - | ignored, no reply |
//!
//! Frames that are too short, addressed to another slave or that fail the CRC
//! check are dropped silently, as an RTU slave never answers traffic it cannot
//! validate. A read that leaves the register bank is answered with an
//! `IllegalDataAddress` exception.

use log::{debug, error};
use thiserror::Error;

use super::crc;
use super::registers::RegisterBank;

/// Smallest request the processor will look at (addr + fc + 4 bytes + crc)
pub const MIN_REQUEST_LEN: usize = 8;

/// Default slave address
pub const DEFAULT_SLAVE_ID: u8 = 1;

/// Bit set on the function code of an exception response
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Most registers one read may return, the byte count field is a single byte
pub const MAX_READ_REGISTERS: usize = 125;

/// Modbus function codes known to the processor
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunctionCode {
    ReadHoldingRegisters = 0x03,
}

impl TryFrom<u8> for FunctionCode {
    type Error = FrameError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0x03 => Ok(FunctionCode::ReadHoldingRegisters),
            other => Err(FrameError::UnsupportedFunction(other)),
        }
    }
}

/// Exception codes the processor can emit
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExceptionCode {
    IllegalDataAddress = 0x02,
    IllegalDataValue = 0x03,
}

/// Reasons for dropping a frame without reply
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame too short: {0} bytes")]
    TooShort(usize),
    #[error("Frame addressed to slave {0}")]
    ForeignAddress(u8),
    #[error("CRC mismatch: expected {expected:02X?}, received {received:02X?}")]
    CrcMismatch { expected: [u8; 2], received: [u8; 2] },
    #[error("Unsupported function code 0x{0:02X}")]
    UnsupportedFunction(u8),
}

/// Request counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessorStats {
    pub responses: u64,
    pub exceptions: u64,
    pub too_short: u64,
    pub foreign_address: u64,
    pub crc_errors: u64,
    pub unsupported: u64,
}

impl ProcessorStats {
    fn record_rejection(&mut self, error: &FrameError) {
        match error {
            FrameError::TooShort(_) => self.too_short += 1,
            FrameError::ForeignAddress(_) => self.foreign_address += 1,
            FrameError::CrcMismatch { .. } => self.crc_errors += 1,
            FrameError::UnsupportedFunction(_) => self.unsupported += 1,
        }
    }

    /// Frames dropped without a reply, all reasons combined
    pub fn rejected(&self) -> u64 {
        self.too_short + self.foreign_address + self.crc_errors + self.unsupported
    }
}

/// Validates RTU requests and builds the matching responses.
#[derive(Debug)]
pub struct RequestProcessor {
    slave_id: u8,
    registers: RegisterBank,
    stats: ProcessorStats,
}

impl Default for RequestProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_SLAVE_ID, RegisterBank::default())
    }
}

impl RequestProcessor {
    pub fn new(slave_id: u8, registers: RegisterBank) -> Self {
        Self {
            slave_id,
            registers,
            stats: ProcessorStats::default(),
        }
    }

    /// Process one complete frame and return the reply to transmit, if any.
    pub fn process(&mut self, frame: &[u8]) -> Option<Vec<u8>> {
        match self.dispatch(frame) {
            Ok(response) => {
                if response.get(1).is_some_and(|fc| fc & EXCEPTION_FLAG != 0) {
                    self.stats.exceptions += 1;
                } else {
                    self.stats.responses += 1;
                }
                Some(response)
            }
            Err(err) => {
                debug!("Ignoring frame {:02X?}: {}", frame, err);
                self.stats.record_rejection(&err);
                None
            }
        }
    }

    fn dispatch(&self, frame: &[u8]) -> Result<Vec<u8>, FrameError> {
        self.validate(frame)?;

        match FunctionCode::try_from(frame[1])? {
            FunctionCode::ReadHoldingRegisters => Ok(self.read_holding_registers(frame)),
        }
    }

    /// Check length, address and CRC in that order.
    fn validate(&self, frame: &[u8]) -> Result<(), FrameError> {
        if frame.len() < MIN_REQUEST_LEN {
            return Err(FrameError::TooShort(frame.len()));
        }
        if frame[0] != self.slave_id {
            return Err(FrameError::ForeignAddress(frame[0]));
        }

        let (payload, received) = frame.split_at(frame.len() - 2);
        let expected = crc::checksum(payload);
        if expected != [received[0], received[1]] {
            return Err(FrameError::CrcMismatch {
                expected,
                received: [received[0], received[1]],
            });
        }
        Ok(())
    }

    fn read_holding_registers(&self, frame: &[u8]) -> Vec<u8> {
        let function = FunctionCode::ReadHoldingRegisters as u8;
        // Register units converted to byte offsets
        let start = u16::from_be_bytes([frame[2], frame[3]]) as usize * 2;
        let count = u16::from_be_bytes([frame[4], frame[5]]) as usize * 2;

        let Some(data) = self.registers.read_bytes(start, count) else {
            error!(
                "Exception::IllegalDataAddress - bytes {}..{} outside bank of {}",
                start,
                start + count,
                self.registers.len_bytes()
            );
            return self.exception_response(function, ExceptionCode::IllegalDataAddress);
        };
        if count / 2 > MAX_READ_REGISTERS {
            error!(
                "Exception::IllegalDataValue - {} registers requested, at most {} per read",
                count / 2,
                MAX_READ_REGISTERS
            );
            return self.exception_response(function, ExceptionCode::IllegalDataValue);
        }

        debug!(
            "Reading {} holding registers starting from address {}",
            count / 2,
            start / 2
        );

        let mut response = Vec::with_capacity(3 + data.len() + 2);
        response.push(self.slave_id);
        response.push(function);
        response.push(count as u8);
        response.extend_from_slice(data);
        crc::append_crc(&mut response);
        response
    }

    /// Build `[addr, fc | 0x80, code, crc]`.
    pub fn exception_response(&self, function: u8, code: ExceptionCode) -> Vec<u8> {
        let mut response = vec![self.slave_id, function | EXCEPTION_FLAG, code as u8];
        crc::append_crc(&mut response);
        response
    }

    pub fn slave_id(&self) -> u8 {
        self.slave_id
    }

    pub fn registers(&self) -> &RegisterBank {
        &self.registers
    }

    pub fn stats(&self) -> &ProcessorStats {
        &self.stats
    }
}

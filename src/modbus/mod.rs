// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ble-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus RTU slave engine
//!
//! This module implements the wired side of the bridge: a Modbus RTU slave
//! that answers holding register reads on a serial line.
//!
//! ## Key Components
//!
//! - [`crc`]: table-driven CRC16 used to validate and seal frames
//! - [`FrameAssembler`]: splits the incoming byte stream into frames using
//!   inter-byte silence
//! - [`RequestProcessor`]: validates a frame and builds the reply
//! - [`RegisterBank`]: the holding registers served to the master
//!
//! ## Wire format
//!
//! ```text
//! request   [slave][0x03][start hi][start lo][count hi][count lo][crc lo][crc hi]
//! response  [slave][0x03][byte count][register bytes...][crc lo][crc hi]
//! exception [slave][0x83][0x02][crc lo][crc hi]
//! ```
//!
//! ## Register Map
//!
//! | Register Address | Default |
//! |------------------|---------|
//! | 0 | 1234 |
//! | 1 | 3335 |
//! | 2-9 | 0 |

pub mod crc;
pub mod frame;
pub mod processor;
pub mod registers;

pub use frame::{silence_for_baud, AssemblerStats, FrameAssembler};
pub use processor::{ExceptionCode, FrameError, FunctionCode, ProcessorStats, RequestProcessor};
pub use registers::{RegisterBank, RegisterError};

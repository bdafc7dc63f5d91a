// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ble-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus CRC16 checksum
//!
//! Table-driven implementation of the Modbus RTU CRC (reflected polynomial
//! `0xA001`, initial value `0xFFFF`). The 256-entry table is computed at
//! compile time, so a checksum costs one table lookup per byte.
//!
//! On the wire the CRC is transmitted low byte first.
//!
//! ```
//! use ble_modbus_bridge::modbus::crc::{checksum, crc16};
//!
//! let request = [0x01, 0x03, 0x00, 0x00, 0x00, 0x01];
//! assert_eq!(crc16(&request), 0x0A84);
//! assert_eq!(checksum(&request), [0x84, 0x0A]);
//! ```

/// Reflected Modbus polynomial
pub const POLYNOMIAL: u16 = 0xA001;

/// Initial register value
pub const INITIAL_VALUE: u16 = 0xFFFF;

/// Precomputed lookup table, indexed by `(crc ^ byte) & 0xFF`
pub static CRC16_TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u16;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x0001 != 0 {
                (crc >> 1) ^ POLYNOMIAL
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Compute the CRC16 of `data` as a native integer.
///
/// Any input is valid; the CRC of an empty slice is the initial value.
pub fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(INITIAL_VALUE, |crc, &byte| {
        (crc >> 8) ^ CRC16_TABLE[((crc ^ byte as u16) & 0xFF) as usize]
    })
}

/// Compute the CRC16 of `data` in wire order (little-endian).
pub fn checksum(data: &[u8]) -> [u8; 2] {
    crc16(data).to_le_bytes()
}

/// Append the wire-order checksum of the current buffer contents.
pub fn append_crc(frame: &mut Vec<u8>) {
    let crc = checksum(frame);
    frame.extend_from_slice(&crc);
}

/// Check that the last two bytes of `frame` are the checksum of the rest.
///
/// Frames shorter than the checksum itself never verify.
pub fn verify(frame: &[u8]) -> bool {
    if frame.len() < 2 {
        return false;
    }
    let (payload, received) = frame.split_at(frame.len() - 2);
    checksum(payload) == [received[0], received[1]]
}

#[cfg(test)]
mod tests {
    use super::*;

    // Bitwise reference used to cross-check the table
    fn crc16_bitwise(data: &[u8]) -> u16 {
        let mut crc: u16 = 0xFFFF;
        for &byte in data {
            crc ^= byte as u16;
            for _ in 0..8 {
                if (crc & 0x0001) != 0 {
                    crc = (crc >> 1) ^ 0xA001;
                } else {
                    crc >>= 1;
                }
            }
        }
        crc
    }

    #[test]
    fn test_table_spot_values() {
        assert_eq!(CRC16_TABLE[0], 0x0000);
        assert_eq!(CRC16_TABLE[1], 0xC0C1);
        assert_eq!(CRC16_TABLE[2], 0xC181);
        assert_eq!(CRC16_TABLE[128], 0xA001);
        assert_eq!(CRC16_TABLE[255], 0x4040);
    }

    #[test]
    fn test_known_vectors() {
        assert_eq!(checksum(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01]), [0x84, 0x0A]);
        assert_eq!(checksum(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x0A]), [0xC5, 0xCD]);
        assert_eq!(crc16(b"123456789"), 0x4B37);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(crc16(&[]), INITIAL_VALUE);
        assert_eq!(checksum(&[]), [0xFF, 0xFF]);
    }

    #[test]
    fn test_table_matches_bitwise() {
        let data: Vec<u8> = (0..=255u8).chain((0..=255u8).rev()).collect();
        for len in [1, 7, 64, data.len()] {
            assert_eq!(crc16(&data[..len]), crc16_bitwise(&data[..len]));
        }
    }

    #[test]
    fn test_append_then_verify() {
        let mut frame = vec![0x11, 0x03, 0x00, 0x6B, 0x00, 0x03];
        append_crc(&mut frame);
        assert_eq!(frame.len(), 8);
        assert_eq!(&frame[6..], &[0x76, 0x87]);
        assert!(verify(&frame));

        frame[3] ^= 0x01;
        assert!(!verify(&frame));
    }

    #[test]
    fn test_verify_short_frames() {
        assert!(!verify(&[]));
        assert!(!verify(&[0xFF]));
        // An empty payload followed by its own CRC is still a valid pair
        assert!(verify(&[0xFF, 0xFF]));
    }
}

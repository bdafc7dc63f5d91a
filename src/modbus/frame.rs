// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ble-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Silence-delimited RTU frame assembly
//!
//! Modbus RTU carries no length prefix or terminator: a frame ends when the
//! line stays quiet for longer than a few character times. The assembler
//! accumulates bytes into a bounded buffer and hands the whole buffer out once
//! the gap since the last appended byte exceeds the configured threshold.

use std::time::{Duration, Instant};

use log::{debug, trace, warn};

/// Default maximum frame length in bytes
pub const DEFAULT_MAX_FRAME_LEN: usize = 64;

/// Default inter-frame silence (8 bytes at ~4 ms per byte at 9600 baud)
pub const DEFAULT_SILENCE_TIMEOUT: Duration = Duration::from_millis(32);

/// Bits per transmitted character (start + 8 data + parity/stop + stop)
const BITS_PER_CHAR: f64 = 11.0;

/// Derive the frame silence threshold for a given baud rate.
///
/// Uses 3.5 character times per byte over an 8 byte window, which gives the
/// 32 ms default at 9600 baud.
pub fn silence_for_baud(baud_rate: u32) -> Duration {
    if baud_rate == 0 {
        return DEFAULT_SILENCE_TIMEOUT;
    }
    let per_byte_ms = 3.5 * BITS_PER_CHAR * 1000.0 / baud_rate as f64;
    Duration::from_millis((8.0 * per_byte_ms).round().max(1.0) as u64)
}

/// Counters kept by the assembler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblerStats {
    /// Complete frames handed out by `poll`
    pub frames: u64,
    /// Bytes accepted into the buffer
    pub bytes_accepted: u64,
    /// Bytes discarded because the buffer was full
    pub bytes_dropped: u64,
}

/// Accumulates serial bytes and splits them into frames on line silence.
#[derive(Debug)]
pub struct FrameAssembler {
    buffer: Vec<u8>,
    capacity: usize,
    silence: Duration,
    last_rx: Option<Instant>,
    stats: AssemblerStats,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN, DEFAULT_SILENCE_TIMEOUT)
    }
}

impl FrameAssembler {
    /// Create an assembler holding at most `capacity` bytes per frame.
    pub fn new(capacity: usize, silence: Duration) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            capacity,
            silence,
            last_rx: None,
            stats: AssemblerStats::default(),
        }
    }

    /// Append as many of `bytes` as fit and return how many were taken.
    ///
    /// The arrival timestamp only moves when at least one byte is appended.
    /// Whatever does not fit is dropped for this cycle.
    pub fn ingest(&mut self, bytes: &[u8], now: Instant) -> usize {
        let accepted = bytes.len().min(self.remaining_capacity());
        if accepted > 0 {
            self.buffer.extend_from_slice(&bytes[..accepted]);
            self.last_rx = Some(now);
            self.stats.bytes_accepted += accepted as u64;
            trace!(
                "Frame buffer: +{} bytes ({}/{})",
                accepted,
                self.buffer.len(),
                self.capacity
            );
        }

        let dropped = bytes.len() - accepted;
        if dropped > 0 {
            self.stats.bytes_dropped += dropped as u64;
            warn!(
                "Frame buffer full ({} bytes), dropping {} bytes",
                self.capacity, dropped
            );
        }

        accepted
    }

    /// Return the accumulated frame if the line has been silent long enough.
    ///
    /// The buffer is reset as soon as a frame is handed out, whatever the
    /// caller does with it.
    pub fn poll(&mut self, now: Instant) -> Option<Vec<u8>> {
        if self.buffer.is_empty() {
            return None;
        }
        let last_rx = self.last_rx?;
        let elapsed = now.saturating_duration_since(last_rx);
        if elapsed <= self.silence {
            return None;
        }

        let frame = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.capacity));
        self.stats.frames += 1;
        debug!(
            "Frame complete after {} ms of silence: {} bytes",
            elapsed.as_millis(),
            frame.len()
        );
        Some(frame)
    }

    /// Bytes that can still be appended to the current frame
    pub fn remaining_capacity(&self) -> usize {
        self.capacity - self.buffer.len()
    }

    /// Number of bytes currently buffered
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn silence(&self) -> Duration {
        self.silence
    }

    pub fn stats(&self) -> &AssemblerStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_silence_for_baud() {
        assert_eq!(silence_for_baud(9600), ms(32));
        assert_eq!(silence_for_baud(19200), ms(16));
        assert_eq!(silence_for_baud(0), DEFAULT_SILENCE_TIMEOUT);
        assert!(silence_for_baud(921_600) >= ms(1));
    }

    #[test]
    fn test_chunks_within_threshold_form_one_frame() {
        let mut assembler = FrameAssembler::default();
        let start = Instant::now();

        assert_eq!(assembler.ingest(&[0x01, 0x03, 0x00], start), 3);
        assert!(assembler.poll(start + ms(20)).is_none());
        assert_eq!(assembler.ingest(&[0x00, 0x00], start + ms(25)), 2);
        assert!(assembler.poll(start + ms(50)).is_none());
        assert_eq!(assembler.ingest(&[0x01, 0x84, 0x0A], start + ms(55)), 3);

        // Exactly at the threshold is not yet silence
        assert!(assembler.poll(start + ms(55 + 32)).is_none());

        let frame = assembler.poll(start + ms(55 + 33)).unwrap();
        assert_eq!(frame, vec![0x01, 0x03, 0x00, 0x00, 0x00, 0x01, 0x84, 0x0A]);
        assert!(assembler.is_empty());
        assert_eq!(assembler.stats().frames, 1);
    }

    #[test]
    fn test_gap_dispatches_only_accumulated_bytes() {
        let mut assembler = FrameAssembler::default();
        let start = Instant::now();

        assembler.ingest(&[0xAA, 0xBB], start);
        let first = assembler.poll(start + ms(40)).unwrap();
        assert_eq!(first, vec![0xAA, 0xBB]);

        assembler.ingest(&[0xCC], start + ms(41));
        let second = assembler.poll(start + ms(100)).unwrap();
        assert_eq!(second, vec![0xCC]);
    }

    #[test]
    fn test_empty_buffer_never_dispatches() {
        let mut assembler = FrameAssembler::default();
        let start = Instant::now();
        assert!(assembler.poll(start + ms(1000)).is_none());
        assembler.ingest(&[], start);
        assert!(assembler.poll(start + ms(1000)).is_none());
    }

    #[test]
    fn test_overflow_drops_excess() {
        let mut assembler = FrameAssembler::new(8, DEFAULT_SILENCE_TIMEOUT);
        let start = Instant::now();

        assert_eq!(assembler.ingest(&[1, 2, 3, 4, 5], start), 5);
        assert_eq!(assembler.remaining_capacity(), 3);
        assert_eq!(assembler.ingest(&[6, 7, 8, 9, 10], start + ms(5)), 3);
        assert_eq!(assembler.remaining_capacity(), 0);

        // A full buffer does not refresh the arrival time
        assert_eq!(assembler.ingest(&[11], start + ms(30)), 0);
        assert_eq!(assembler.stats().bytes_dropped, 3);

        let frame = assembler.poll(start + ms(40)).unwrap();
        assert_eq!(frame, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(assembler.remaining_capacity(), 8);
    }
}

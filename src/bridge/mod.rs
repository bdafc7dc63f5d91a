// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ble-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Bridge orchestrator
//!
//! The [`Bridge`] owns the whole protocol core and is driven by its host:
//!
//! - serial bytes go through [`Bridge::ingest_serial`] and complete frames
//!   come back as replies from [`Bridge::poll_serial`];
//! - wireless events go through [`Bridge::handle_event`], which returns the
//!   [`BridgeAction`]s the host must carry out.
//!
//! Wireless writes are echoed back on the tunnel and never reach the Modbus
//! engine. Every handler runs to completion on the caller's thread and the
//! core holds no locks.

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::modbus::{FrameAssembler, RequestProcessor};
use crate::proximity::{
    CalibrationError, CalibrationOutcome, Calibrator, PathLossModel, RssiFilter, RssiProbe,
};

/// Identifier of a wireless connection
pub type ConnHandle = u16;

/// Bytes written to the serial line when a peer connects
pub const CONNECT_BANNER: [u8; 12] = [
    0x68, 0x40, 0xBF, 0x68, 0x04, 0x06, 0x73, 0x50, 0x30, 0x33, 0x33, 0x33,
];

/// Default minimum time between two distance reports
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_millis(2000);

/// Default RSSI subscription period requested on connect
pub const DEFAULT_RSSI_INTERVAL: Duration = Duration::from_millis(100);

/// Inputs from the wireless stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    Connected { handle: ConnHandle },
    Disconnected { handle: ConnHandle },
    Write { handle: ConnHandle, payload: Vec<u8> },
    Rssi { handle: ConnHandle, rssi: i16 },
}

/// Outputs the host must perform
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeAction {
    /// Send a notification to the peer
    Notify { handle: ConnHandle, payload: Vec<u8> },
    /// Write raw bytes to the serial line
    SerialWrite(Vec<u8>),
    /// A new smoothed distance is available
    ReportDistance { distance_m: f64, rssi_dbm: i16 },
    /// Drive the link status indicator
    LinkIndicator(bool),
    /// Ask the radio for periodic RSSI samples on a connection
    SubscribeRssi { handle: ConnHandle, interval: Duration },
    /// Restart advertising
    Advertise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperatingMode {
    #[default]
    Bridging,
    /// RSSI events are ignored while the reference is re-estimated
    Calibrating,
}

/// Tunables of the wireless side
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeSettings {
    pub report_interval: Duration,
    pub rssi_interval: Duration,
    /// Empty to disable
    pub connect_banner: Vec<u8>,
    pub reset_on_disconnect: bool,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            report_interval: DEFAULT_REPORT_INTERVAL,
            rssi_interval: DEFAULT_RSSI_INTERVAL,
            connect_banner: CONNECT_BANNER.to_vec(),
            reset_on_disconnect: false,
        }
    }
}

/// Protocol core of the bridge
#[derive(Debug)]
pub struct Bridge {
    assembler: FrameAssembler,
    processor: RequestProcessor,
    filter: RssiFilter,
    model: PathLossModel,
    calibrator: Calibrator,
    settings: BridgeSettings,
    connection: Option<ConnHandle>,
    mode: OperatingMode,
    last_report: Option<Instant>,
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new(
            FrameAssembler::default(),
            RequestProcessor::default(),
            RssiFilter::default(),
            PathLossModel::default(),
            Calibrator::default(),
            BridgeSettings::default(),
        )
    }
}

impl Bridge {
    pub fn new(
        assembler: FrameAssembler,
        processor: RequestProcessor,
        filter: RssiFilter,
        model: PathLossModel,
        calibrator: Calibrator,
        settings: BridgeSettings,
    ) -> Self {
        Self {
            assembler,
            processor,
            filter,
            model,
            calibrator,
            settings,
            connection: None,
            mode: OperatingMode::Bridging,
            last_report: None,
        }
    }

    /// Append serial bytes to the pending frame, returns how many were kept.
    pub fn ingest_serial(&mut self, bytes: &[u8], now: Instant) -> usize {
        self.assembler.ingest(bytes, now)
    }

    /// How many bytes the host may read from the serial line right now.
    pub fn serial_capacity(&self) -> usize {
        self.assembler.remaining_capacity()
    }

    /// Periodic tick: dispatch a complete frame and return the reply to send.
    pub fn poll_serial(&mut self, now: Instant) -> Option<Vec<u8>> {
        let frame = self.assembler.poll(now)?;
        debug!("Frame complete ({} bytes): {:02X?}", frame.len(), frame);
        self.processor.process(&frame)
    }

    /// React to one wireless event.
    pub fn handle_event(&mut self, event: BridgeEvent, now: Instant) -> Vec<BridgeAction> {
        match event {
            BridgeEvent::Connected { handle } => self.on_connected(handle),
            BridgeEvent::Disconnected { handle } => self.on_disconnected(handle),
            BridgeEvent::Write { handle, payload } => self.on_write(handle, payload),
            BridgeEvent::Rssi { handle, rssi } => self.on_rssi(handle, rssi, now),
        }
    }

    fn on_connected(&mut self, handle: ConnHandle) -> Vec<BridgeAction> {
        info!("Connected, handle={}", handle);
        self.connection = Some(handle);

        let mut actions = vec![
            BridgeAction::LinkIndicator(true),
            BridgeAction::SubscribeRssi {
                handle,
                interval: self.settings.rssi_interval,
            },
        ];
        if !self.settings.connect_banner.is_empty() {
            actions.push(BridgeAction::SerialWrite(
                self.settings.connect_banner.clone(),
            ));
        }
        actions
    }

    fn on_disconnected(&mut self, handle: ConnHandle) -> Vec<BridgeAction> {
        info!("Disconnected, handle={}", handle);
        self.connection = None;
        if self.settings.reset_on_disconnect {
            debug!("Clearing RSSI history and distance estimate");
            self.filter.reset();
            self.last_report = None;
        }
        vec![BridgeAction::LinkIndicator(false), BridgeAction::Advertise]
    }

    fn on_write(&mut self, handle: ConnHandle, payload: Vec<u8>) -> Vec<BridgeAction> {
        if self.connection.is_none() {
            debug!("Dropping {} bytes written while not connected", payload.len());
            return Vec::new();
        }
        debug!("Echoing {} bytes to handle {}", payload.len(), handle);
        vec![BridgeAction::Notify { handle, payload }]
    }

    fn on_rssi(&mut self, handle: ConnHandle, rssi: i16, now: Instant) -> Vec<BridgeAction> {
        if self.connection.is_none() || self.mode == OperatingMode::Calibrating {
            return Vec::new();
        }

        let due = self
            .last_report
            .map_or(true, |last| {
                now.saturating_duration_since(last) > self.settings.report_interval
            });
        if !due {
            return Vec::new();
        }

        match self.filter.update(rssi, &self.model) {
            Some(distance_m) if distance_m > 0.0 => {
                self.last_report = Some(now);
                info!(
                    "Distance: {:.2} m (RSSI: {} dBm, handle {})",
                    distance_m, rssi, handle
                );
                vec![BridgeAction::ReportDistance {
                    distance_m,
                    rssi_dbm: rssi,
                }]
            }
            _ => {
                debug!("No valid distance for RSSI {} dBm", rssi);
                Vec::new()
            }
        }
    }

    /// Re-estimate the 1 m reference from `probe`.
    ///
    /// Blocks for the whole calibration; RSSI events are ignored meanwhile.
    pub fn calibrate<P>(&mut self, probe: &mut P) -> Result<CalibrationOutcome, CalibrationError>
    where
        P: RssiProbe + ?Sized,
    {
        let previous = self.mode;
        self.mode = OperatingMode::Calibrating;
        let result = self.calibrator.calibrate(probe, &mut self.model);
        self.mode = previous;
        if let Err(err) = &result {
            warn!("Keeping reference RSSI {:.2} dBm: {}", self.model.reference_rssi(), err);
        }
        result
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn connection(&self) -> Option<ConnHandle> {
        self.connection
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: OperatingMode) {
        self.mode = mode;
    }

    /// Latest smoothed distance in meters
    pub fn distance(&self) -> Option<f64> {
        self.filter.estimate()
    }

    pub fn model(&self) -> &PathLossModel {
        &self.model
    }

    pub fn filter(&self) -> &RssiFilter {
        &self.filter
    }

    pub fn assembler(&self) -> &FrameAssembler {
        &self.assembler
    }

    pub fn processor(&self) -> &RequestProcessor {
        &self.processor
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modbus::crc;

    fn connected_bridge(now: Instant) -> Bridge {
        let mut bridge = Bridge::default();
        bridge.handle_event(BridgeEvent::Connected { handle: 1 }, now);
        bridge
    }

    #[test]
    fn test_connect_actions() {
        let mut bridge = Bridge::default();
        let actions = bridge.handle_event(BridgeEvent::Connected { handle: 7 }, Instant::now());
        assert_eq!(
            actions,
            vec![
                BridgeAction::LinkIndicator(true),
                BridgeAction::SubscribeRssi {
                    handle: 7,
                    interval: Duration::from_millis(100)
                },
                BridgeAction::SerialWrite(CONNECT_BANNER.to_vec()),
            ]
        );
        assert_eq!(bridge.connection(), Some(7));
    }

    #[test]
    fn test_empty_banner_is_not_written() {
        let settings = BridgeSettings {
            connect_banner: Vec::new(),
            ..BridgeSettings::default()
        };
        let mut bridge = Bridge::new(
            FrameAssembler::default(),
            RequestProcessor::default(),
            RssiFilter::default(),
            PathLossModel::default(),
            Calibrator::default(),
            settings,
        );
        let actions = bridge.handle_event(BridgeEvent::Connected { handle: 1 }, Instant::now());
        assert!(!actions
            .iter()
            .any(|a| matches!(a, BridgeAction::SerialWrite(_))));
    }

    #[test]
    fn test_echo_only_while_connected() {
        let now = Instant::now();
        let mut bridge = Bridge::default();
        let write = BridgeEvent::Write {
            handle: 1,
            payload: b"hello".to_vec(),
        };
        assert!(bridge.handle_event(write.clone(), now).is_empty());

        bridge.handle_event(BridgeEvent::Connected { handle: 1 }, now);
        assert_eq!(
            bridge.handle_event(write, now),
            vec![BridgeAction::Notify {
                handle: 1,
                payload: b"hello".to_vec()
            }]
        );
    }

    #[test]
    fn test_disconnect_preserves_estimate_by_default() {
        let now = Instant::now();
        let mut bridge = connected_bridge(now);
        bridge.handle_event(BridgeEvent::Rssi { handle: 1, rssi: -84 }, now);
        assert_eq!(bridge.distance(), Some(10.0));

        let actions = bridge.handle_event(BridgeEvent::Disconnected { handle: 1 }, now);
        assert_eq!(
            actions,
            vec![BridgeAction::LinkIndicator(false), BridgeAction::Advertise]
        );
        assert!(!bridge.is_connected());
        assert_eq!(bridge.distance(), Some(10.0));
    }

    #[test]
    fn test_disconnect_reset_policy() {
        let now = Instant::now();
        let settings = BridgeSettings {
            reset_on_disconnect: true,
            ..BridgeSettings::default()
        };
        let mut bridge = Bridge::new(
            FrameAssembler::default(),
            RequestProcessor::default(),
            RssiFilter::default(),
            PathLossModel::default(),
            Calibrator::default(),
            settings,
        );
        bridge.handle_event(BridgeEvent::Connected { handle: 1 }, now);
        bridge.handle_event(BridgeEvent::Rssi { handle: 1, rssi: -84 }, now);
        bridge.handle_event(BridgeEvent::Disconnected { handle: 1 }, now);
        assert_eq!(bridge.distance(), None);
        assert_eq!(bridge.filter().history().count(), 0);
    }

    #[test]
    fn test_rssi_is_rate_limited() {
        let t0 = Instant::now();
        let mut bridge = connected_bridge(t0);

        let first = bridge.handle_event(BridgeEvent::Rssi { handle: 1, rssi: -84 }, t0);
        assert_eq!(
            first,
            vec![BridgeAction::ReportDistance {
                distance_m: 10.0,
                rssi_dbm: -84
            }]
        );

        // Inside the window the sample is not even fed to the filter
        let early = t0 + Duration::from_millis(1500);
        assert!(bridge
            .handle_event(BridgeEvent::Rssi { handle: 1, rssi: -59 }, early)
            .is_empty());
        assert_eq!(bridge.filter().history().count(), 1);

        // Exactly on the boundary is still too early
        let boundary = t0 + DEFAULT_REPORT_INTERVAL;
        assert!(bridge
            .handle_event(BridgeEvent::Rssi { handle: 1, rssi: -59 }, boundary)
            .is_empty());

        let later = t0 + Duration::from_millis(2001);
        let actions = bridge.handle_event(BridgeEvent::Rssi { handle: 1, rssi: -84 }, later);
        assert_eq!(actions.len(), 1);
        assert_eq!(bridge.filter().history().count(), 2);
    }

    #[test]
    fn test_invalid_rssi_does_not_advance_report_time() {
        let t0 = Instant::now();
        let mut bridge = connected_bridge(t0);
        assert!(bridge
            .handle_event(BridgeEvent::Rssi { handle: 1, rssi: 0 }, t0)
            .is_empty());
        // The bad sample stays in the history and still wins the median
        let t1 = t0 + Duration::from_millis(100);
        assert!(bridge
            .handle_event(BridgeEvent::Rssi { handle: 1, rssi: -59 }, t1)
            .is_empty());
        // No report happened, so the next sample is accepted right away
        let t2 = t0 + Duration::from_millis(200);
        assert_eq!(
            bridge.handle_event(BridgeEvent::Rssi { handle: 1, rssi: -59 }, t2),
            vec![BridgeAction::ReportDistance {
                distance_m: 1.0,
                rssi_dbm: -59
            }]
        );
    }

    #[test]
    fn test_rssi_ignored_when_disconnected_or_calibrating() {
        let now = Instant::now();
        let mut bridge = Bridge::default();
        assert!(bridge
            .handle_event(BridgeEvent::Rssi { handle: 1, rssi: -60 }, now)
            .is_empty());

        bridge.handle_event(BridgeEvent::Connected { handle: 1 }, now);
        bridge.set_mode(OperatingMode::Calibrating);
        assert!(bridge
            .handle_event(BridgeEvent::Rssi { handle: 1, rssi: -60 }, now)
            .is_empty());
        assert_eq!(bridge.distance(), None);
    }

    #[test]
    fn test_serial_request_round_trip() {
        let t0 = Instant::now();
        let mut bridge = Bridge::default();
        let mut request = vec![0x01, 0x03, 0x00, 0x00, 0x00, 0x01];
        crc::append_crc(&mut request);

        assert_eq!(bridge.ingest_serial(&request, t0), 8);
        assert_eq!(bridge.poll_serial(t0 + Duration::from_millis(10)), None);

        let response = bridge
            .poll_serial(t0 + Duration::from_millis(40))
            .unwrap();
        assert_eq!(&response[..5], &[0x01, 0x03, 0x02, 0x04, 0xD2]);
        assert!(crc::verify(&response));
        assert_eq!(bridge.serial_capacity(), 64);
    }

    #[test]
    fn test_calibration_restores_mode() {
        struct Fixed(i16);
        impl RssiProbe for Fixed {
            fn read_rssi(&mut self) -> Option<i16> {
                Some(self.0)
            }
        }

        let mut bridge = Bridge::new(
            FrameAssembler::default(),
            RequestProcessor::default(),
            RssiFilter::default(),
            PathLossModel::default(),
            Calibrator::new(4, Duration::ZERO),
            BridgeSettings::default(),
        );
        let outcome = bridge.calibrate(&mut Fixed(-65)).unwrap();
        assert_eq!(outcome.reference_rssi, -65.0);
        assert_eq!(bridge.model().reference_rssi(), -65.0);
        assert_eq!(bridge.mode(), OperatingMode::Bridging);
    }
}

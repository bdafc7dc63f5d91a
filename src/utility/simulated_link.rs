// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ble-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Simulated wireless link
//!
//! Stands in for the radio stack when none is available: a single peer sits
//! at a configurable distance and its RSSI is the path-loss expectation plus
//! Gaussian noise from the [`NoiseGenerator`].

use log::debug;

use crate::bridge::{BridgeEvent, ConnHandle};
use crate::config::Config;
use crate::proximity::{PathLossModel, RssiProbe};
use crate::utility::noise_generator::NoiseGenerator;

/// Connection handle used by the simulated peer
pub const SIMULATED_HANDLE: ConnHandle = 1;

/// Single simulated peer
#[derive(Debug, Clone)]
pub struct SimulatedLink {
    generator: NoiseGenerator,
    // Channel used to synthesize readings, independent from the bridge's model
    channel: PathLossModel,
    distance_m: f64,
    noise_db: f64,
    connected: bool,
}

impl SimulatedLink {
    pub fn new(
        channel: PathLossModel,
        distance_m: f64,
        noise_db: f64,
        generator: NoiseGenerator,
    ) -> Self {
        Self {
            generator,
            channel,
            distance_m,
            noise_db,
            connected: false,
        }
    }

    /// Peer placed and modelled after the `link` and `proximity` sections.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.proximity.build_model(),
            config.link.simulated_distance_m,
            config.link.simulated_noise_db,
            NoiseGenerator::new_from_system_time(),
        )
    }

    pub fn connect(&mut self) -> BridgeEvent {
        debug!("Simulated peer connecting at {:.2} m", self.distance_m);
        self.connected = true;
        BridgeEvent::Connected {
            handle: SIMULATED_HANDLE,
        }
    }

    pub fn disconnect(&mut self) -> BridgeEvent {
        debug!("Simulated peer disconnecting");
        self.connected = false;
        BridgeEvent::Disconnected {
            handle: SIMULATED_HANDLE,
        }
    }

    /// Next periodic RSSI event, `None` while disconnected.
    pub fn next_rssi(&mut self) -> Option<BridgeEvent> {
        self.read_rssi().map(|rssi| BridgeEvent::Rssi {
            handle: SIMULATED_HANDLE,
            rssi,
        })
    }

    /// Data written by the peer on the tunnel, `None` while disconnected.
    pub fn write(&self, payload: &[u8]) -> Option<BridgeEvent> {
        self.connected.then(|| BridgeEvent::Write {
            handle: SIMULATED_HANDLE,
            payload: payload.to_vec(),
        })
    }

    /// Move the peer.
    pub fn set_distance(&mut self, distance_m: f64) {
        self.distance_m = distance_m;
    }

    pub fn distance(&self) -> f64 {
        self.distance_m
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

impl RssiProbe for SimulatedLink {
    fn read_rssi(&mut self) -> Option<i16> {
        if !self.connected {
            return None;
        }
        let mean = self.channel.expected_rssi(self.distance_m);
        Some(self.generator.rssi_sample(mean, self.noise_db))
    }
}

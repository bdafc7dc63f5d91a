// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ble-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::path::Path;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;

use super::event_loop::{run_bridge, LoggingHandler};
use super::report::ReportWriter;
use super::serial::open_serial;
use crate::bridge::{Bridge, BridgeEvent};
use crate::config::Config;
use crate::proximity::REFERENCE_DISTANCE_M;
use crate::utility::SimulatedLink;

/// Capacity of the wireless event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Represents a daemon task that can be started and managed
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    running: Arc<AtomicBool>,
    events: Option<mpsc::Sender<BridgeEvent>>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon instance
    pub fn new() -> Self {
        Daemon {
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            events: None,
        }
    }

    /// Launch all configured tasks based on configuration
    ///
    /// With `calibrate` set, the reference RSSI is re-estimated before the
    /// bridge starts serving. Distance reports are appended to `output` when
    /// given.
    pub async fn launch(
        &mut self,
        config: &Config,
        calibrate: bool,
        output: Option<&Path>,
    ) -> Result<()> {
        let mut bridge = config.build_bridge()?;
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let link = if config.link.simulated {
            Some(SimulatedLink::from_config(config))
        } else {
            None
        };

        let link = match (calibrate, link) {
            (true, Some(link)) => {
                let (calibrated, link) = Self::run_calibration(bridge, link).await?;
                bridge = calibrated;
                Some(link)
            }
            (true, None) => {
                warn!("Calibration needs an RSSI source, skipped without the simulated link");
                None
            }
            (false, link) => link,
        };

        let serial = open_serial(&config.serial)?;
        let reports = ReportWriter::open(output)?;
        self.start_bridge(bridge, serial, events_rx, config, reports);

        if let Some(link) = link {
            self.start_simulated_link(link, config.link.rssi_interval(), events_tx.clone());
        }
        self.events = Some(events_tx);

        // Start heartbeat task for monitoring
        self.start_heartbeat()?;

        Ok(())
    }

    /// Calibrate against the simulated peer, off the async workers.
    ///
    /// The peer is held at the reference distance for the duration of the
    /// calibration and put back where it was afterwards.
    async fn run_calibration(
        mut bridge: Bridge,
        mut link: SimulatedLink,
    ) -> Result<(Bridge, SimulatedLink)> {
        tokio::task::spawn_blocking(move || {
            let distance_m = link.distance();
            link.set_distance(REFERENCE_DISTANCE_M);
            link.connect();
            let result = bridge.calibrate(&mut link);
            link.disconnect();
            link.set_distance(distance_m);
            match result {
                Ok(outcome) => info!(
                    "Reference RSSI set to {:.2} dBm from {} samples",
                    outcome.reference_rssi, outcome.samples
                ),
                Err(e) => warn!("Calibration failed, keeping configured reference: {}", e),
            }
            (bridge, link)
        })
        .await
        .context("Calibration task failed")
    }

    /// Start the task serving the serial line and wireless events
    fn start_bridge(
        &mut self,
        bridge: Bridge,
        serial: tokio_serial::SerialStream,
        events: mpsc::Receiver<BridgeEvent>,
        config: &Config,
        reports: ReportWriter,
    ) {
        info!("Starting bridge task on {}", config.serial.port);

        let handler = LoggingHandler::new(config.link.device_name.clone(), reports);
        let poll_interval = config.modbus.poll_interval();
        let running = self.running.clone();
        let task = tokio::spawn(async move {
            run_bridge(bridge, serial, events, poll_interval, handler, running).await?;
            Ok(())
        });

        self.tasks.push(task);
    }

    /// Start the simulated peer feeding RSSI samples to the bridge
    fn start_simulated_link(
        &mut self,
        mut link: SimulatedLink,
        interval: Duration,
        events: mpsc::Sender<BridgeEvent>,
    ) {
        info!(
            "Starting simulated link, peer at {:.2} m",
            link.distance()
        );

        let running = self.running.clone();
        let task = tokio::spawn(async move {
            events
                .send(link.connect())
                .await
                .context("Bridge stopped before the simulated peer connected")?;

            let mut ticker = time::interval(interval);
            while running.load(Ordering::SeqCst) {
                ticker.tick().await;
                let Some(event) = link.next_rssi() else {
                    continue;
                };
                if events.send(event).await.is_err() {
                    debug!("Bridge gone, stopping simulated link");
                    return Ok(());
                }
            }

            // Best effort, the bridge may already be stopped
            let _ = events.send(link.disconnect()).await;
            Ok(())
        });

        self.tasks.push(task);
    }

    /// Start a heartbeat task that logs system status periodically
    fn start_heartbeat(&mut self) -> Result<()> {
        debug!("Starting heartbeat monitor");

        let running = self.running.clone();
        let task = tokio::spawn(async move {
            let mut seconds = 0u64;
            while running.load(Ordering::SeqCst) {
                if seconds % 60 == 0 {
                    debug!("Daemon heartbeat: running");
                }
                time::sleep(Duration::from_secs(1)).await;
                seconds += 1;
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Sender for wireless events, for a radio stack integration
    pub fn event_sender(&self) -> Option<mpsc::Sender<BridgeEvent>> {
        self.events.clone()
    }

    /// Stop all running tasks
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.running.store(false, Ordering::SeqCst);
    }

    /// Wait for all tasks to complete
    pub async fn join(self) -> Result<()> {
        for task in self.tasks {
            match task.await {
                Ok(Err(e)) => log::error!("Task failed: {:#}", e),
                Err(e) => log::error!("Task panicked: {}", e),
                Ok(Ok(())) => {}
            }
        }
        Ok(())
    }
}

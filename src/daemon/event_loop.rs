// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ble-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Bridge event loop
//!
//! A single task owns the [`Bridge`] and multiplexes three sources:
//!
//! - the frame polling ticker, which dispatches complete requests;
//! - serial reads, armed only while the assembler has room;
//! - the wireless event channel.
//!
//! Serial writes requested by the bridge are performed here; every other
//! action goes to an [`ActionHandler`].

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{debug, info};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};

use super::report::{DistanceReport, ReportWriter};
use crate::bridge::{Bridge, BridgeAction, BridgeEvent};

/// Host side of the wireless link
pub trait ActionHandler: Send {
    /// Carry out an action other than a serial write.
    fn handle(&mut self, action: BridgeAction) -> Result<()>;
}

/// Handler for hosts without a radio stack: logs link actions and records
/// distance reports.
pub struct LoggingHandler {
    device_name: String,
    reports: ReportWriter,
}

impl LoggingHandler {
    pub fn new(device_name: impl Into<String>, reports: ReportWriter) -> Self {
        Self {
            device_name: device_name.into(),
            reports,
        }
    }
}

impl ActionHandler for LoggingHandler {
    fn handle(&mut self, action: BridgeAction) -> Result<()> {
        match action {
            BridgeAction::Notify { handle, payload } => {
                debug!("Notify handle {}: {:02X?}", handle, payload);
            }
            BridgeAction::ReportDistance {
                distance_m,
                rssi_dbm,
            } => {
                self.reports
                    .write(&DistanceReport::now(distance_m, rssi_dbm))?;
            }
            BridgeAction::LinkIndicator(on) => {
                info!("Link indicator {}", if on { "on" } else { "off" });
            }
            BridgeAction::SubscribeRssi { handle, interval } => {
                debug!(
                    "RSSI subscription on handle {} every {} ms",
                    handle,
                    interval.as_millis()
                );
            }
            BridgeAction::Advertise => info!("Advertising as {}", self.device_name),
            BridgeAction::SerialWrite(bytes) => {
                debug!("Serial write outside the event loop ignored: {:02X?}", bytes);
            }
        }
        Ok(())
    }
}

/// Drive `bridge` until `running` is cleared or the serial stream closes.
///
/// Returns the bridge so callers can inspect its final state.
pub async fn run_bridge<S, H>(
    mut bridge: Bridge,
    mut serial: S,
    mut events: mpsc::Receiver<BridgeEvent>,
    poll_interval: Duration,
    mut handler: H,
    running: Arc<AtomicBool>,
) -> Result<Bridge>
where
    S: AsyncRead + AsyncWrite + Unpin,
    H: ActionHandler,
{
    let mut ticker = time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut buffer = vec![0u8; bridge.assembler().capacity()];
    let mut events_open = true;

    info!(
        "Bridge running: slave {}, polling every {} ms",
        bridge.processor().slave_id(),
        poll_interval.as_millis()
    );

    while running.load(Ordering::SeqCst) {
        let capacity = bridge.serial_capacity().min(buffer.len());

        tokio::select! {
            _ = ticker.tick() => {
                if let Some(response) = bridge.poll_serial(Instant::now()) {
                    debug!("Sending response: {:02X?}", response);
                    serial
                        .write_all(&response)
                        .await
                        .context("Failed to write Modbus response")?;
                    serial.flush().await.context("Failed to flush serial port")?;
                }
            }
            read = serial.read(&mut buffer[..capacity]), if capacity > 0 => {
                let count = read.context("Serial read failed")?;
                if count == 0 {
                    info!("Serial stream closed");
                    break;
                }
                bridge.ingest_serial(&buffer[..count], Instant::now());
            }
            event = events.recv(), if events_open => {
                let Some(event) = event else {
                    debug!("Wireless event channel closed");
                    events_open = false;
                    continue;
                };
                for action in bridge.handle_event(event, Instant::now()) {
                    match action {
                        BridgeAction::SerialWrite(bytes) => {
                            serial
                                .write_all(&bytes)
                                .await
                                .context("Failed to write to serial port")?;
                            serial.flush().await.context("Failed to flush serial port")?;
                        }
                        other => handler.handle(other)?,
                    }
                }
            }
        }
    }

    let stats = bridge.processor().stats();
    info!(
        "Bridge stopped: {} responses, {} exceptions, {} frames ignored",
        stats.responses,
        stats.exceptions,
        stats.rejected()
    );
    Ok(bridge)
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ble-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Module
//!
//! Hosts the bridge on a tokio runtime: the serial port, the wireless event
//! source and the distance report output.
//!
//! ## Components
//!
//! * **Launch Daemon**: starts, monitors and shuts down the background tasks
//! * **Event loop**: the single task owning the bridge
//! * **Serial**: opening the configured UART
//! * **Report**: JSON lines distance output
//!
//! ## Usage
//!
//! ```no_run
//! use ble_modbus_bridge::{config::Config, daemon::Daemon};
//!
//! async fn run() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml")?;
//!
//!     let mut daemon = Daemon::new();
//!     daemon.launch(&config, false, None).await?;
//!
//!     // Wait for shutdown signal (e.g., Ctrl+C)
//!     tokio::signal::ctrl_c().await?;
//!
//!     daemon.shutdown();
//!     daemon.join().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod event_loop;
pub mod launch_daemon;
pub mod report;
pub mod serial;

pub use event_loop::{run_bridge, ActionHandler, LoggingHandler};
pub use launch_daemon::Daemon;
pub use report::{DistanceReport, ReportWriter};
pub use serial::open_serial;

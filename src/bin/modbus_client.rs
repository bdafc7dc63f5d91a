// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ble-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::error::Error;

use ble_modbus_bridge::config::{Parity, SerialConfig};
use ble_modbus_bridge::daemon::open_serial;
use clap::Parser;
use tokio::time::Duration;
use tokio_modbus::prelude::*;

/// Modbus RTU master reading holding registers from the bridge
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Serial port wired to the bridge
    #[clap(long, default_value = "/dev/ttyUSB0")]
    port: String,

    /// Line speed
    #[clap(long, default_value = "9600")]
    baud_rate: u32,

    /// Slave address of the bridge
    #[clap(long, default_value = "1")]
    slave: u8,

    /// Starting holding register address
    #[clap(long, default_value = "0")]
    register: u16,

    /// Number of registers to read
    #[clap(long, default_value = "2")]
    quantity: u16,

    /// Response timeout in milliseconds
    #[clap(long, default_value = "1000")]
    timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let args = Args::parse();

    let serial = open_serial(&SerialConfig {
        port: args.port.clone(),
        baud_rate: args.baud_rate,
        data_bits: 8,
        stop_bits: 1,
        parity: Parity::None,
    })?;
    println!(
        "Connected to slave {} on {} at {} baud",
        args.slave, args.port, args.baud_rate
    );

    let mut ctx = rtu::attach_slave(serial, Slave(args.slave));

    println!(
        "Reading {} holding registers starting at address {}",
        args.quantity, args.register
    );
    let request = ctx.read_holding_registers(args.register, args.quantity);
    let response = tokio::time::timeout(Duration::from_millis(args.timeout_ms), request)
        .await
        .map_err(|_| "No response from the bridge")??;

    match response {
        Ok(values) => {
            println!("Raw register values: {:?}", values);
            for (i, value) in values.iter().enumerate() {
                let register = args.register + i as u16;
                println!("Register {}: {} (0x{:04X})", register, value, value);
            }
        }
        Err(exception) => {
            println!("Bridge answered with exception: {:?}", exception);
        }
    }

    Ok(())
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ble-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Serial port opening

use anyhow::{Context, Result};
use log::info;
use tokio_serial::{DataBits, SerialPortBuilderExt, SerialStream, StopBits};

use crate::config::{Parity, SerialConfig};

fn data_bits(bits: u8) -> Result<DataBits> {
    Ok(match bits {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        8 => DataBits::Eight,
        other => anyhow::bail!("Unsupported data bits: {}", other),
    })
}

fn stop_bits(bits: u8) -> Result<StopBits> {
    Ok(match bits {
        1 => StopBits::One,
        2 => StopBits::Two,
        other => anyhow::bail!("Unsupported stop bits: {}", other),
    })
}

impl From<Parity> for tokio_serial::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Even => tokio_serial::Parity::Even,
            Parity::Odd => tokio_serial::Parity::Odd,
        }
    }
}

/// Open the configured port as an async stream.
pub fn open_serial(config: &SerialConfig) -> Result<SerialStream> {
    info!(
        "Opening serial port {} at {} baud ({}{}{})",
        config.port,
        config.baud_rate,
        config.data_bits,
        match config.parity {
            Parity::None => 'N',
            Parity::Even => 'E',
            Parity::Odd => 'O',
        },
        config.stop_bits
    );

    tokio_serial::new(&config.port, config.baud_rate)
        .data_bits(data_bits(config.data_bits)?)
        .stop_bits(stop_bits(config.stop_bits)?)
        .parity(config.parity.into())
        .open_native_async()
        .with_context(|| format!("Failed to open serial port {}", config.port))
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ble-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Distance report output
//!
//! Reports are appended to a file as JSON lines, one object per report:
//!
//! ```text
//! {"distance_m":2.14,"rssi_dbm":-67,"timestamp":"2025-06-01T10:00:00Z"}
//! ```

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One smoothed distance measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceReport {
    pub distance_m: f64,
    pub rssi_dbm: i16,
    pub timestamp: DateTime<Utc>,
}

impl DistanceReport {
    pub fn now(distance_m: f64, rssi_dbm: i16) -> Self {
        Self {
            distance_m,
            rssi_dbm,
            timestamp: Utc::now(),
        }
    }
}

/// Appends reports to an optional JSON lines file
#[derive(Debug, Default)]
pub struct ReportWriter {
    output: Option<(PathBuf, File)>,
    written: u64,
}

impl ReportWriter {
    /// Writer appending to `path`, or discarding reports when `None`.
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let output = match path {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("Failed to open report file {:?}", path))?;
                Some((path.to_path_buf(), file))
            }
            None => None,
        };
        Ok(Self { output, written: 0 })
    }

    pub fn write(&mut self, report: &DistanceReport) -> Result<()> {
        let Some((path, file)) = self.output.as_mut() else {
            return Ok(());
        };
        let line = serde_json::to_string(report).context("Failed to serialize report")?;
        writeln!(file, "{}", line)
            .with_context(|| format!("Failed to write report to {:?}", path))?;
        self.written += 1;
        Ok(())
    }

    /// Reports written so far
    pub fn written(&self) -> u64 {
        self.written
    }
}

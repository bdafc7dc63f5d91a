// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ble-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Proximity estimation from link RSSI
//!
//! Turns the noisy signal strength reported by the wireless stack into a
//! smoothed distance in meters.
//!
//! ## Components
//!
//! * **Model**: log-distance path-loss formula and its parameters
//! * **Filter**: rolling median followed by exponential smoothing
//! * **Calibration**: blocking routine that re-estimates the 1 m reference
//!
//! ## Usage
//!
//! ```
//! use ble_modbus_bridge::proximity::{PathLossModel, RssiFilter};
//!
//! let model = PathLossModel::default();
//! let mut filter = RssiFilter::default();
//!
//! for rssi in [-62, -60, -85, -61, -59] {
//!     filter.update(rssi, &model);
//! }
//! let distance = filter.estimate().unwrap();
//! assert!(distance > 0.0);
//! ```

pub mod calibration;
pub mod filter;
pub mod model;

pub use calibration::{CalibrationError, CalibrationOutcome, Calibrator, RssiProbe};
pub use filter::RssiFilter;
pub use model::{calculate_distance, PathLossModel, INVALID_DISTANCE, REFERENCE_DISTANCE_M};

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ble-modbus-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! RSSI smoothing filter
//!
//! Each new reading goes through two stages:
//!
//! 1. A rolling median over the last few samples, which rejects the short
//!    spikes caused by multipath fading far better than a mean would.
//! 2. An exponential moving average on the resulting distance:
//!    `estimate = alpha * raw + (1 - alpha) * previous`. A small `alpha`
//!    favours stability since the physical distance changes slowly compared
//!    to the sampling cadence.

use std::collections::VecDeque;

use log::trace;

use super::model::{round2, PathLossModel};

/// Default number of samples kept for the median
pub const DEFAULT_HISTORY_LEN: usize = 5;

/// Default smoothing factor
pub const DEFAULT_SMOOTHING_ALPHA: f64 = 0.2;

/// Median + exponential smoothing filter producing a distance estimate
#[derive(Debug, Clone)]
pub struct RssiFilter {
    history: VecDeque<i16>,
    history_len: usize,
    alpha: f64,
    estimate: Option<f64>,
}

impl Default for RssiFilter {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LEN, DEFAULT_SMOOTHING_ALPHA)
    }
}

impl RssiFilter {
    /// Create a filter keeping `history_len` samples (at least one).
    pub fn new(history_len: usize, alpha: f64) -> Self {
        let history_len = history_len.max(1);
        Self {
            history: VecDeque::with_capacity(history_len),
            history_len,
            alpha,
            estimate: None,
        }
    }

    /// Feed one reading and return the updated distance estimate.
    ///
    /// Returns `None` when the median reading does not give a valid
    /// distance; the previous estimate is kept in that case.
    pub fn update(&mut self, rssi: i16, model: &PathLossModel) -> Option<f64> {
        if self.history.len() == self.history_len {
            self.history.pop_front();
        }
        self.history.push_back(rssi);

        let median = self.median()?;
        let raw = model.distance(median)?;

        let estimate = match self.estimate {
            None => raw,
            Some(previous) => round2(self.alpha * raw + (1.0 - self.alpha) * previous),
        };
        trace!(
            "RSSI {} dBm, median {} dBm, raw {:.2} m, smoothed {:.2} m",
            rssi,
            median,
            raw,
            estimate
        );
        self.estimate = Some(estimate);
        Some(estimate)
    }

    /// Middle element of the sorted history (upper middle for even lengths).
    pub fn median(&self) -> Option<i16> {
        if self.history.is_empty() {
            return None;
        }
        let mut sorted: Vec<i16> = self.history.iter().copied().collect();
        sorted.sort_unstable();
        Some(sorted[sorted.len() / 2])
    }

    /// Forget all samples and the current estimate.
    pub fn reset(&mut self) {
        self.history.clear();
        self.estimate = None;
    }

    pub fn estimate(&self) -> Option<f64> {
        self.estimate
    }

    pub fn history(&self) -> impl Iterator<Item = i16> + '_ {
        self.history.iter().copied()
    }

    pub fn history_len(&self) -> usize {
        self.history_len
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_fifo_and_capped() {
        let model = PathLossModel::default();
        let mut filter = RssiFilter::default();
        for rssi in [-50, -51, -52, -53, -54, -55, -56] {
            filter.update(rssi, &model);
        }
        let history: Vec<i16> = filter.history().collect();
        assert_eq!(history, vec![-52, -53, -54, -55, -56]);
    }

    #[test]
    fn test_median_rejects_spike() {
        let model = PathLossModel::default();
        let mut filter = RssiFilter::default();
        for rssi in [-59, -59, -59, -59] {
            filter.update(rssi, &model);
        }
        // A single deep fade does not move the median
        assert_eq!(filter.update(-95, &model), Some(1.0));
        assert_eq!(filter.median(), Some(-59));
    }

    #[test]
    fn test_even_history_takes_upper_middle() {
        let model = PathLossModel::default();
        let mut filter = RssiFilter::default();
        filter.update(-70, &model);
        filter.update(-60, &model);
        // sorted [-70, -60], index 1
        assert_eq!(filter.median(), Some(-60));
    }

    #[test]
    fn test_first_valid_sample_is_adopted() {
        let model = PathLossModel::default();
        let mut filter = RssiFilter::default();
        assert_eq!(filter.estimate(), None);
        assert_eq!(filter.update(-84, &model), Some(10.0));
        assert_eq!(filter.estimate(), Some(10.0));
    }

    #[test]
    fn test_smoothing_step() {
        let model = PathLossModel::default();
        let mut filter = RssiFilter::new(1, 0.2);
        filter.update(-84, &model); // 10.0 m
        // 0.2 * 1.0 + 0.8 * 10.0
        assert_eq!(filter.update(-59, &model), Some(8.2));
    }

    #[test]
    fn test_convergence_to_constant_input() {
        let model = PathLossModel::default();
        let mut filter = RssiFilter::new(5, 0.2);
        filter.update(-84, &model);
        for _ in 0..5 {
            filter.update(-59, &model);
        }
        let mut previous_error = (filter.estimate().unwrap() - 1.0).abs();
        for _ in 0..40 {
            let estimate = filter.update(-59, &model).unwrap();
            let error = (estimate - 1.0).abs();
            assert!(error <= previous_error);
            previous_error = error;
        }
        // The 2-decimal rounding stalls the tail within a few hundredths
        assert!(previous_error <= 0.03, "error {}", previous_error);
    }

    #[test]
    fn test_invalid_median_keeps_estimate() {
        let model = PathLossModel::default();
        let mut filter = RssiFilter::new(1, 0.2);
        filter.update(-59, &model);
        assert_eq!(filter.update(0, &model), None);
        assert_eq!(filter.estimate(), Some(1.0));
    }

    #[test]
    fn test_reset() {
        let model = PathLossModel::default();
        let mut filter = RssiFilter::default();
        filter.update(-60, &model);
        filter.reset();
        assert_eq!(filter.estimate(), None);
        assert_eq!(filter.history().count(), 0);
    }
}

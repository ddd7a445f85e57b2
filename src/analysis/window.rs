// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Window rollup: turns a sector's accumulated samples into a billing summary

use serde::{Deserialize, Serialize};

use crate::config::live::Params;
use crate::core::SectorState;

/// Consumption and cost over one rollup window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Wall-clock unix seconds at rollup
    pub timestamp: i64,
    pub avg_current: f64,
    pub window_kwh: f64,
    pub cumulative_kwh: f64,
    /// `None` when the window had no samples
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    pub presence_seconds: u64,
    pub estimated_cost: f64,
    pub cumulative_cost: f64,
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Decides when a window closes and computes its summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSummarizer {
    /// Seconds each sample stands for
    pub sampling_period_secs: u64,
    /// Minimum seconds between summaries
    pub rollup_interval_secs: u64,
}

impl Default for WindowSummarizer {
    fn default() -> Self {
        Self {
            sampling_period_secs: 10,
            rollup_interval_secs: 60,
        }
    }
}

impl WindowSummarizer {
    pub fn new(sampling_period_secs: u64, rollup_interval_secs: u64) -> Self {
        Self { sampling_period_secs, rollup_interval_secs }
    }

    pub fn is_due(&self, state: &SectorState, now: i64) -> bool {
        now.saturating_sub(state.last_summary_at) >= self.rollup_interval_secs as i64
    }

    /// Summarize the window and reset its buffers.
    ///
    /// Must run inside the sector's critical section so the reset is atomic
    /// with respect to concurrent ingestion.
    pub fn summarize(&self, state: &mut SectorState, params: &Params, now: i64) -> Summary {
        let samples = state.current_samples.len();
        let avg_current = if samples == 0 {
            0.0
        } else {
            state.current_samples.iter().sum::<f64>() / samples as f64
        };

        let window_hours = (samples as u64 * self.sampling_period_secs) as f64 / 3600.0;
        let window_kwh = avg_current * params.voltage * window_hours / 1000.0;
        let estimated_cost = window_kwh * params.tariff_per_kwh;

        state.cumulative_kwh += window_kwh;
        state.cumulative_cost += estimated_cost;

        let min_temp = state.temp_samples.iter().copied().reduce(f64::min);
        let max_temp = state.temp_samples.iter().copied().reduce(f64::max);

        let summary = Summary {
            timestamp: now,
            avg_current: round2(avg_current),
            window_kwh: round2(window_kwh),
            cumulative_kwh: round2(state.cumulative_kwh),
            min_temp: min_temp.map(round2),
            max_temp: max_temp.map(round2),
            presence_seconds: state.presence_seconds,
            estimated_cost: round2(estimated_cost),
            cumulative_cost: round2(state.cumulative_cost),
        };

        state.current_samples = Vec::new();
        state.temp_samples = Vec::new();
        state.presence_seconds = 0;
        state.last_summary_at = now;

        summary
    }
}

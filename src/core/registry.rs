// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Per-sector rolling state and the registry that owns it

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::sensors::SensorReading;

/// Rolling state for one sector.
///
/// Buffers accumulate between rollups and are only ever cleared as a whole by
/// the summarizer. Cumulative totals live for the process lifetime and start
/// from zero after a restart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectorState {
    /// Newest reading timestamp seen so far
    pub last_reading_at: i64,
    pub current_samples: Vec<f64>,
    pub temp_samples: Vec<f64>,
    /// Occupied seconds since the last rollup
    pub presence_seconds: u64,
    pub last_summary_at: i64,
    pub cumulative_kwh: f64,
    pub cumulative_cost: f64,

    // Last reported conditions, for edge detection
    pub lights_on: bool,
    pub ac_on: bool,
    pub over_current: bool,
    pub sensor_offline: bool,

    /// Start of the current zero-current run, if one is being timed
    pub outage_since: Option<i64>,
}

impl SectorState {
    /// Fold a reading into the window buffers
    pub fn record(&mut self, reading: &SensorReading, sampling_period_secs: u64) {
        self.current_samples.push(reading.current_amperes);
        self.temp_samples.push(reading.temperature_celsius);
        if reading.presence {
            self.presence_seconds += sampling_period_secs;
        }
        // A late, out-of-order reading must not make the sector look stale
        self.last_reading_at = self.last_reading_at.max(reading.timestamp);
    }
}

/// Shared handle to one sector's state; the mutex is the sector's critical section
pub type SectorHandle = Arc<Mutex<SectorState>>;

/// Lazily populated map of sector id to state. Entries are never removed.
#[derive(Default)]
pub struct SectorRegistry {
    sectors: RwLock<HashMap<String, SectorHandle>>,
}

impl SectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for a sector, creating a zero-valued state on first use
    pub fn get_or_create(&self, sector: &str) -> SectorHandle {
        if let Some(handle) = self.sectors.read().get(sector) {
            return handle.clone();
        }

        let mut sectors = self.sectors.write();
        // Another producer may have inserted between the two locks
        sectors
            .entry(sector.to_string())
            .or_insert_with(|| {
                info!("Tracking new sector: {}", sector);
                Arc::new(Mutex::new(SectorState::default()))
            })
            .clone()
    }

    pub fn get(&self, sector: &str) -> Option<SectorHandle> {
        self.sectors.read().get(sector).cloned()
    }

    /// Snapshot of every handle, taken without holding any sector lock
    pub fn handles(&self) -> Vec<(String, SectorHandle)> {
        self.sectors
            .read()
            .iter()
            .map(|(id, handle)| (id.clone(), handle.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sectors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.read().is_empty()
    }
}

// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Configuration module
//!
//! Two layers: the process [`Config`] read from TOML at startup, and the
//! [`live`] store that the control plane updates while the engine runs.

pub mod live;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::analysis::WindowSummarizer;
use crate::detection::DetectorLimits;
use crate::streaming::StreamingConfig;
use live::{EventCatalog, LiveConfig, Params};

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Timing and detection limits
    pub engine: EngineConfig,

    /// Live tunables in effect until the first update arrives
    pub tunables: TunablesConfig,

    /// Transport and export configuration
    pub streaming: StreamingConfig,

    /// Database configuration
    pub database: DatabaseConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Put the database and export files under `dir`
    pub fn relocate_data(&mut self, dir: &Path) {
        self.database.path = dir.join("sectorwatch.db");
        self.streaming.export_path = dir.join("export").to_string_lossy().into_owned();
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("sectorwatch"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// Engine timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds represented by one reading
    pub sampling_period_secs: u64,

    /// Minimum seconds between summaries per sector
    pub rollup_interval_secs: u64,

    /// Zero-current duration before an outage is reported
    pub outage_debounce_secs: u64,

    /// Silence before a sensor is reported offline
    pub offline_timeout_secs: u64,

    /// Draw with nobody present that counts as anomalous (A)
    pub anomalous_draw_amps: f64,

    /// How often quiet sectors are checked for liveness
    pub liveness_sweep_secs: u64,

    /// Capacity of the output bus before slow writers start losing records
    pub bus_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sampling_period_secs: 10,
            rollup_interval_secs: 60,
            outage_debounce_secs: 60,
            offline_timeout_secs: 60,
            anomalous_draw_amps: 10.0,
            liveness_sweep_secs: 15,
            bus_capacity: 1024,
        }
    }
}

impl EngineConfig {
    pub fn detector_limits(&self) -> DetectorLimits {
        DetectorLimits {
            outage_debounce_secs: self.outage_debounce_secs as i64,
            offline_timeout_secs: self.offline_timeout_secs as i64,
            anomalous_draw_amps: self.anomalous_draw_amps,
        }
    }

    pub fn summarizer(&self) -> WindowSummarizer {
        WindowSummarizer::new(self.sampling_period_secs, self.rollup_interval_secs)
    }
}

/// Seed values for the live configuration store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunablesConfig {
    pub roster: Vec<String>,
    /// Event identifiers in catalog order; detection stays off until ten are known
    pub event_catalog: Vec<String>,
    pub params: Params,
}

impl TunablesConfig {
    pub fn to_live(&self) -> LiveConfig {
        LiveConfig {
            params: self.params.clone(),
            roster: self.roster.clone(),
            catalog: EventCatalog::new(self.event_catalog.clone()),
            ..LiveConfig::default()
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Enable database storage
    pub enabled: bool,

    /// Database path
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("./data/sectorwatch.db"),
        }
    }
}

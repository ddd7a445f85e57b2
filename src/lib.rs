// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! SectorWatch - Per-Sector Electrical Telemetry Engine
//!
//! Consumes periodic readings (presence, current, temperature) for the sectors
//! of a building and turns them into:
//! - edge-triggered operational events (lighting, climate, overcurrent,
//!   anomalous draw, power outage, sensor offline)
//! - rolling consumption and cost summaries per sector
//!
//! Thresholds, device states, the sector roster and the event catalog are
//! pushed by a control plane at runtime and take effect on the next reading.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     SectorWatch Engine                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌──────────┐   ┌───────────┐   ┌──────────┐  │
//! │  │   MQTT   │ → │  Sector  │ → │ Detection │ → │  Window  │  │
//! │  │  Ingest  │   │ Registry │   │   Rules   │   │ Rollup   │  │
//! │  └──────────┘   └──────────┘   └───────────┘   └──────────┘  │
//! │       ↑              ↑               ↓              ↓        │
//! │  ┌──────────┐   ┌──────────┐   ┌──────────────────────────┐  │
//! │  │  Config  │ → │   Live   │   │        Event Bus         │  │
//! │  │   Feed   │   │  Config  │   └──────────────────────────┘  │
//! │  └──────────┘   └──────────┘        ↓              ↓         │
//! │                                ┌──────────┐   ┌──────────┐   │
//! │                                │ Database │   │  Export  │   │
//! │                                └──────────┘   └──────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod core;
pub mod sensors;
pub mod analysis;
pub mod detection;
pub mod streaming;
pub mod config;
pub mod db;
pub mod error;

// Re-exports for convenience
pub use config::Config;
pub use config::live::{ConfigStore, LiveConfig};
pub use crate::core::{Engine, EngineStats, EventBus, IngestOutcome, OutputRecord, OutputSink};
pub use sensors::SensorReading;
pub use analysis::{Summary, WindowSummarizer};
pub use detection::{Event, EventDetector, EventKind, Severity};
pub use streaming::{DataExporter, MqttIngest, RecordStore};
pub use db::Database;
pub use error::{ConfigError, IngestError, SinkError};

/// SectorWatch version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// SectorWatch name
pub const NAME: &str = "SectorWatch";

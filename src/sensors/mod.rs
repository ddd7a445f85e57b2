// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Sensor readings as they arrive from the bus

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// Latest accepted reading time, 9999-12-31T23:59:59Z
const MAX_TIMESTAMP: i64 = 253_402_300_799;

/// One periodic sample for a sector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Sector identifier
    pub sector: String,
    /// Unix seconds
    pub timestamp: i64,
    /// Occupancy detected during the sample
    pub presence: bool,
    /// Current draw in amperes
    pub current_amperes: f64,
    /// Ambient temperature in °C
    pub temperature_celsius: f64,
}

impl SensorReading {
    /// Decode and validate a bus payload
    pub fn from_slice(payload: &[u8]) -> Result<Self, IngestError> {
        let reading: SensorReading = serde_json::from_slice(payload)?;
        reading.validate()?;
        Ok(reading)
    }

    /// Reject values the engine cannot reason about
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.sector.trim().is_empty() {
            return Err(IngestError::Invalid("empty sector id".into()));
        }
        if self.timestamp <= 0 || self.timestamp > MAX_TIMESTAMP {
            return Err(IngestError::Invalid(format!(
                "timestamp out of range: {}",
                self.timestamp
            )));
        }
        if !self.current_amperes.is_finite() || self.current_amperes < 0.0 {
            return Err(IngestError::Invalid(format!(
                "current out of range: {}",
                self.current_amperes
            )));
        }
        if !self.temperature_celsius.is_finite() {
            return Err(IngestError::Invalid(format!(
                "temperature not finite: {}",
                self.temperature_celsius
            )));
        }
        Ok(())
    }
}

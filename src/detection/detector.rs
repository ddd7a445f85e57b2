// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Edge-triggered event detection for a single sector

use tracing::debug;

use super::{Event, EventKind};
use crate::config::live::{EventCatalog, LiveConfig};
use crate::core::SectorState;
use crate::sensors::SensorReading;

/// Fixed limits that do not come from the live configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorLimits {
    /// A zero-current run must last longer than this to be reported
    pub outage_debounce_secs: i64,
    /// Silence longer than this marks the sensor offline
    pub offline_timeout_secs: i64,
    /// Draw above this with nobody present is anomalous
    pub anomalous_draw_amps: f64,
}

impl Default for DetectorLimits {
    fn default() -> Self {
        Self {
            outage_debounce_secs: 60,
            offline_timeout_secs: 60,
            anomalous_draw_amps: 10.0,
        }
    }
}

/// Collects events stamped with one detection time
struct Emitter<'a> {
    catalog: &'a EventCatalog,
    now: i64,
    events: Vec<Event>,
}

impl<'a> Emitter<'a> {
    fn new(catalog: &'a EventCatalog, now: i64) -> Self {
        Self { catalog, now, events: Vec::new() }
    }

    fn emit(&mut self, kind: EventKind, detail: impl Into<String>) {
        // Callers check completeness first, so every kind resolves
        if let Some(id) = self.catalog.resolve(kind) {
            self.events.push(Event {
                timestamp: self.now,
                kind,
                kind_id: id.to_string(),
                detail: detail.into(),
                severity: kind.severity(),
            });
        }
    }
}

/// Turns readings into events, flipping the sector's condition flags as it goes
#[derive(Debug, Clone, Default)]
pub struct EventDetector {
    limits: DetectorLimits,
}

impl EventDetector {
    pub fn new(limits: DetectorLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &DetectorLimits {
        &self.limits
    }

    /// Apply every rule to one reading. `state` must already include the reading.
    ///
    /// With an incomplete event catalog nothing is emitted and no flag moves.
    pub fn detect(
        &self,
        reading: &SensorReading,
        state: &mut SectorState,
        config: &LiveConfig,
        now: i64,
    ) -> Vec<Event> {
        if !config.catalog.is_complete() {
            debug!(
                "Event catalog has {} of {} entries, skipping detection for {}",
                config.catalog.len(),
                EventKind::ALL.len(),
                reading.sector
            );
            return Vec::new();
        }

        let mut out = Emitter::new(&config.catalog, now);
        let devices = config.device_states(&reading.sector);
        let params = &config.params;

        // Lighting
        if reading.presence {
            if !devices.lights && state.lights_on {
                out.emit(EventKind::LightsOffByDevice, "lights reported off");
                state.lights_on = false;
            } else if devices.lights && !state.lights_on {
                out.emit(EventKind::LightsOn, "presence detected");
                state.lights_on = true;
            }
        } else if state.lights_on {
            out.emit(EventKind::LightsOffAbsence, "absence detected");
            state.lights_on = false;
        }

        // Climate control
        let should_cool = reading.presence && reading.temperature_celsius > params.ac_temp_threshold;
        if should_cool {
            if !devices.ac && state.ac_on {
                out.emit(EventKind::AcOffByDevice, "ac reported off");
                state.ac_on = false;
            } else if devices.ac && !state.ac_on {
                out.emit(
                    EventKind::AcOn,
                    format!(
                        "temperature {:.2} °C above {:.2} °C with presence",
                        reading.temperature_celsius, params.ac_temp_threshold
                    ),
                );
                state.ac_on = true;
            }
        } else if state.ac_on {
            out.emit(EventKind::AcOffConditions, "cooling conditions no longer met");
            state.ac_on = false;
        }

        // Anomalous draw repeats for as long as it lasts
        if !reading.presence && reading.current_amperes > self.limits.anomalous_draw_amps {
            out.emit(
                EventKind::AnomalousDraw,
                format!("draw {:.2} A with no presence", reading.current_amperes),
            );
        }

        // Outage timer re-arms after each report
        if reading.current_amperes <= 0.0 {
            match state.outage_since {
                None => state.outage_since = Some(reading.timestamp),
                Some(since) => {
                    let elapsed = reading.timestamp.saturating_sub(since);
                    if elapsed > self.limits.outage_debounce_secs {
                        out.emit(EventKind::PowerOutage, format!("no current for {elapsed} s"));
                        state.outage_since = None;
                    }
                }
            }
        } else {
            state.outage_since = None;
        }

        // Sensor liveness against wall-clock time
        self.apply_liveness(state, now, &mut out);

        // Overcurrent with hysteresis on the flag
        if reading.current_amperes > params.current_threshold {
            if !state.over_current {
                out.emit(
                    EventKind::OverCurrent,
                    format!(
                        "draw {:.2} A above {:.2} A",
                        reading.current_amperes, params.current_threshold
                    ),
                );
                state.over_current = true;
            }
        } else {
            state.over_current = false;
        }

        out.events
    }

    /// Liveness rule on its own, for sectors that have gone quiet.
    ///
    /// Returns the offline event the first time the sector is seen stale.
    pub fn check_liveness(
        &self,
        state: &mut SectorState,
        catalog: &EventCatalog,
        now: i64,
    ) -> Option<Event> {
        if !catalog.is_complete() {
            return None;
        }
        let mut out = Emitter::new(catalog, now);
        self.apply_liveness(state, now, &mut out);
        out.events.pop()
    }

    fn apply_liveness(&self, state: &mut SectorState, now: i64, out: &mut Emitter<'_>) {
        let staleness = now.saturating_sub(state.last_reading_at);
        if staleness > self.limits.offline_timeout_secs {
            if !state.sensor_offline {
                out.emit(EventKind::SensorOffline, format!("no response for {staleness} s"));
                state.sensor_offline = true;
            }
        } else {
            state.sensor_offline = false;
        }
    }
}

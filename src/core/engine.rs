// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Ingestion engine - routes readings through detection and rollup

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{Clock, OutputRecord, OutputSink, SectorRegistry, SectorState, SystemClock};
use crate::analysis::{Summary, WindowSummarizer};
use crate::config::live::ConfigStore;
use crate::config::EngineConfig;
use crate::detection::{Event, EventDetector};
use crate::error::IngestError;
use crate::sensors::SensorReading;

/// What one reading produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestOutcome {
    pub events: Vec<Event>,
    pub summary: Option<Summary>,
}

/// Counters since startup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub readings_accepted: u64,
    pub readings_rejected: u64,
    pub events_emitted: u64,
    pub summaries_emitted: u64,
    pub sectors: usize,
}

/// Main engine. Shared by every producer; all methods take `&self`.
pub struct Engine {
    registry: SectorRegistry,
    config: Arc<ConfigStore>,
    detector: EventDetector,
    summarizer: WindowSummarizer,
    sink: Arc<dyn OutputSink>,
    clock: Arc<dyn Clock>,

    readings_accepted: AtomicU64,
    readings_rejected: AtomicU64,
    events_emitted: AtomicU64,
    summaries_emitted: AtomicU64,
}

impl Engine {
    pub fn new(settings: &EngineConfig, config: Arc<ConfigStore>, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            registry: SectorRegistry::new(),
            config,
            detector: EventDetector::new(settings.detector_limits()),
            summarizer: settings.summarizer(),
            sink,
            clock: Arc::new(SystemClock),
            readings_accepted: AtomicU64::new(0),
            readings_rejected: AtomicU64::new(0),
            events_emitted: AtomicU64::new(0),
            summaries_emitted: AtomicU64::new(0),
        }
    }

    /// Replace the wall clock used for liveness and rollup timing
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Decode a raw bus payload and process it.
    ///
    /// A payload that fails to decode or validate leaves every sector untouched.
    pub fn ingest_payload(&self, payload: &[u8]) -> Result<IngestOutcome, IngestError> {
        match SensorReading::from_slice(payload) {
            Ok(reading) => self.process(reading),
            Err(e) => {
                self.readings_rejected.fetch_add(1, Ordering::Relaxed);
                warn!("Dropping reading: {}", e);
                Err(e)
            }
        }
    }

    /// Process an already decoded reading
    pub fn ingest(&self, reading: SensorReading) -> Result<IngestOutcome, IngestError> {
        if let Err(e) = reading.validate() {
            self.readings_rejected.fetch_add(1, Ordering::Relaxed);
            warn!("Dropping reading for {:?}: {}", reading.sector, e);
            return Err(e);
        }
        self.process(reading)
    }

    fn process(&self, reading: SensorReading) -> Result<IngestOutcome, IngestError> {
        let now = self.clock.now();
        let config = self.config.snapshot();

        if !config.is_known_sector(&reading.sector) {
            debug!("Reading from sector {} which is not on the roster", reading.sector);
        }

        let handle = self.registry.get_or_create(&reading.sector);
        let mut state = handle.lock();

        state.record(&reading, self.summarizer.sampling_period_secs);
        let events = self.detector.detect(&reading, &mut state, &config, now);

        for event in &events {
            info!("[{}] {} ({})", reading.sector, event.kind.label(), event.detail);
            self.sink.deliver(OutputRecord::Event {
                sector: reading.sector.clone(),
                event: event.clone(),
            });
        }

        let summary = if self.summarizer.is_due(&state, now) {
            let summary = self.summarizer.summarize(&mut state, &config.params, now);
            info!(
                "[{}] summary: avg {:.2} A, {:.2} kWh, cost {:.2}",
                reading.sector, summary.avg_current, summary.window_kwh, summary.estimated_cost
            );
            self.sink.deliver(OutputRecord::Summary {
                sector: reading.sector.clone(),
                summary: summary.clone(),
            });
            Some(summary)
        } else {
            None
        };
        drop(state);

        self.readings_accepted.fetch_add(1, Ordering::Relaxed);
        self.events_emitted.fetch_add(events.len() as u64, Ordering::Relaxed);
        if summary.is_some() {
            self.summaries_emitted.fetch_add(1, Ordering::Relaxed);
        }

        Ok(IngestOutcome { events, summary })
    }

    /// Report sectors that stopped sending readings. Returns how many went offline.
    pub fn sweep_liveness(&self) -> usize {
        let now = self.clock.now();
        let config = self.config.snapshot();
        let mut reported = 0;

        for (sector, handle) in self.registry.handles() {
            let event = {
                let mut state = handle.lock();
                self.detector.check_liveness(&mut state, &config.catalog, now)
            };
            if let Some(event) = event {
                warn!("[{}] {} ({})", sector, event.kind.label(), event.detail);
                self.sink.deliver(OutputRecord::Event { sector, event });
                reported += 1;
            }
        }

        self.events_emitted.fetch_add(reported as u64, Ordering::Relaxed);
        reported
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            readings_accepted: self.readings_accepted.load(Ordering::Relaxed),
            readings_rejected: self.readings_rejected.load(Ordering::Relaxed),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
            summaries_emitted: self.summaries_emitted.load(Ordering::Relaxed),
            sectors: self.registry.len(),
        }
    }

    /// Copy of a sector's state, if the sector has been seen
    pub fn sector_snapshot(&self, sector: &str) -> Option<SectorState> {
        self.registry.get(sector).map(|handle| handle.lock().clone())
    }

    pub fn config_store(&self) -> &Arc<ConfigStore> {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::live::{DeviceStates, EventCatalog, LiveConfig};
    use crate::core::ManualClock;
    use crate::detection::EventKind;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CollectingSink {
        records: Mutex<Vec<OutputRecord>>,
    }

    impl OutputSink for CollectingSink {
        fn deliver(&self, record: OutputRecord) {
            self.records.lock().push(record);
        }
    }

    struct Harness {
        engine: Arc<Engine>,
        sink: Arc<CollectingSink>,
        clock: Arc<ManualClock>,
    }

    fn harness(complete_catalog: bool) -> Harness {
        let mut live = LiveConfig::default();
        if complete_catalog {
            live.catalog = EventCatalog::new((0..10).map(|i| format!("ev-{i}")).collect());
        }
        live.devices.insert("A".into(), DeviceStates { lights: false, ac: true });

        let sink = Arc::new(CollectingSink::default());
        let clock = Arc::new(ManualClock::new(0));
        let engine = Engine::new(
            &EngineConfig::default(),
            Arc::new(ConfigStore::new(live)),
            sink.clone(),
        )
        .with_clock(clock.clone());

        Harness { engine: Arc::new(engine), sink, clock }
    }

    fn reading(sector: &str, ts: i64, presence: bool, current: f64, temp: f64) -> SensorReading {
        SensorReading {
            sector: sector.into(),
            timestamp: ts,
            presence,
            current_amperes: current,
            temperature_celsius: temp,
        }
    }

    fn kinds(outcome: &IngestOutcome) -> Vec<EventKind> {
        outcome.events.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_ac_on_then_outage() {
        let h = harness(true);
        let t = 1_000;

        h.clock.set(t);
        let first = h.engine.ingest(reading("A", t, true, 12.0, 26.0)).unwrap();
        assert_eq!(kinds(&first), vec![EventKind::AcOn]);
        assert_eq!(first.events[0].kind_id, "ev-4");
        assert!(h.engine.sector_snapshot("A").unwrap().ac_on);

        // The first zero reading starts the outage timer
        h.clock.set(t + 61);
        let arming = h.engine.ingest(reading("A", t + 61, true, 0.0, 26.0)).unwrap();
        assert!(arming.events.is_empty());

        h.clock.set(t + 122);
        let outage = h.engine.ingest(reading("A", t + 122, true, 0.0, 26.0)).unwrap();
        assert_eq!(kinds(&outage), vec![EventKind::PowerOutage]);
    }

    #[test]
    fn test_repeated_reading_reports_once() {
        let h = harness(true);
        h.clock.set(100);

        let first = h.engine.ingest(reading("A", 100, true, 25.0, 20.0)).unwrap();
        assert_eq!(kinds(&first), vec![EventKind::OverCurrent]);

        for ts in [110, 120, 130] {
            h.clock.set(ts);
            let again = h.engine.ingest(reading("A", ts, true, 25.0, 20.0)).unwrap();
            assert!(again.events.is_empty());
        }
    }

    #[test]
    fn test_sweep_reports_offline_once() {
        let h = harness(true);
        h.clock.set(1_000);
        h.engine.ingest(reading("A", 1_000, false, 1.0, 20.0)).unwrap();

        h.clock.advance(61);
        assert_eq!(h.engine.sweep_liveness(), 1);
        assert_eq!(h.engine.sweep_liveness(), 0);
        assert!(h.engine.sector_snapshot("A").unwrap().sensor_offline);

        // Recovery clears the flag without an event
        h.clock.set(1_070);
        let back = h.engine.ingest(reading("A", 1_070, false, 1.0, 20.0)).unwrap();
        assert!(!kinds(&back).contains(&EventKind::SensorOffline));
        assert!(!h.engine.sector_snapshot("A").unwrap().sensor_offline);
    }

    #[test]
    fn test_malformed_payload_changes_nothing() {
        let h = harness(true);

        assert!(h.engine.ingest_payload(b"{not json").is_err());
        assert!(h
            .engine
            .ingest_payload(br#"{"sector":"A","timestamp":1,"presence":true,"current_amperes":-1.0,"temperature_celsius":20.0}"#)
            .is_err());

        assert!(h.engine.sector_snapshot("A").is_none());
        let stats = h.engine.stats();
        assert_eq!(stats.readings_rejected, 2);
        assert_eq!(stats.readings_accepted, 0);
        assert_eq!(stats.sectors, 0);
        assert!(h.sink.records.lock().is_empty());
    }

    #[test]
    fn test_rollup_through_engine() {
        let h = harness(false);

        h.clock.set(30);
        let quiet = h.engine.ingest(reading("B", 30, true, 2.0, 21.0)).unwrap();
        assert!(quiet.summary.is_none());

        h.clock.set(60);
        let outcome = h
            .engine
            .ingest_payload(br#"{"sector":"B","timestamp":60,"presence":false,"current_amperes":4.0,"temperature_celsius":23.0}"#)
            .unwrap();

        let summary = outcome.summary.unwrap();
        assert_eq!(summary.avg_current, 3.0);
        assert_eq!(summary.min_temp, Some(21.0));
        assert_eq!(summary.max_temp, Some(23.0));
        assert_eq!(summary.presence_seconds, 10);

        let state = h.engine.sector_snapshot("B").unwrap();
        assert!(state.current_samples.is_empty());
        assert_eq!(state.last_summary_at, 60);

        let records = h.sink.records.lock();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path(), "summaries/B/60");
    }

    #[test]
    fn test_incomplete_catalog_suppresses_events() {
        let h = harness(false);
        h.clock.set(10);

        let outcome = h.engine.ingest(reading("A", 10, true, 30.0, 30.0)).unwrap();
        assert!(outcome.events.is_empty());
        let state = h.engine.sector_snapshot("A").unwrap();
        assert!(!state.ac_on);
        assert!(!state.over_current);
    }

    #[test]
    fn test_concurrent_readings_for_one_sector() {
        let h = harness(false);
        h.clock.set(30);

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let engine = h.engine.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        engine.ingest(reading("A", 10, true, 1.0, 20.0)).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let state = h.engine.sector_snapshot("A").unwrap();
        assert_eq!(state.current_samples.len(), 200);
        assert_eq!(state.temp_samples.len(), 200);
        assert_eq!(state.presence_seconds, 2_000);
        assert_eq!(h.engine.stats().readings_accepted, 200);
    }

    #[test]
    fn test_events_reach_sink() {
        let h = harness(true);
        h.clock.set(5);

        h.engine.ingest(reading("C", 5, false, 15.0, 20.0)).unwrap();

        let records = h.sink.records.lock();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sector(), "C");
        assert_eq!(records[0].path(), "events/C/5");
        assert_eq!(h.engine.stats().events_emitted, 1);
    }

    #[test]
    fn test_off_roster_sector_is_processed() {
        let h = harness(true);
        h.engine
            .config_store()
            .apply_json(br#"{"type":"office_roster","data":["A"]}"#)
            .unwrap();
        h.clock.set(1);

        h.engine.ingest(reading("Z", 1, true, 1.0, 20.0)).unwrap();
        assert!(h.engine.sector_snapshot("Z").is_some());
    }

    #[test]
    fn test_extreme_timestamp_is_rejected() {
        let h = harness(true);
        h.clock.set(1_700_000_000);

        let payload = format!(
            r#"{{"sector":"A","timestamp":{},"presence":true,"current_amperes":1.0,"temperature_celsius":20.0}}"#,
            i64::MIN
        );
        assert!(matches!(
            h.engine.ingest_payload(payload.as_bytes()),
            Err(IngestError::Invalid(_))
        ));
        assert!(h.engine.sector_snapshot("A").is_none());

        // The sector keeps working afterwards
        let outcome = h.engine.ingest(reading("A", 1_700_000_000, true, 1.0, 20.0)).unwrap();
        assert!(outcome.events.is_empty());
        assert_eq!(h.engine.stats().readings_rejected, 1);
    }
}

// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Live tunables pushed by the control plane
//!
//! The store holds one immutable [`LiveConfig`] behind an `Arc`. Updates build a
//! new snapshot from the current one and swap it in under a short write lock;
//! readers clone the `Arc` and never observe a half-applied update.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::detection::EventKind;
use crate::error::ConfigError;

/// Office hours as decimal hours of the day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkHours {
    pub start: f64,
    pub end: f64,
}

impl Default for WorkHours {
    fn default() -> Self {
        Self { start: 8.0, end: 20.0 }
    }
}

/// Numeric thresholds and billing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Params {
    /// Temperature above which an occupied sector should be cooled (°C)
    pub ac_temp_threshold: f64,
    /// Current above which the overcurrent alarm fires (A)
    pub current_threshold: f64,
    /// Nominal supply voltage (V)
    pub voltage: f64,
    /// Price per kWh
    pub tariff_per_kwh: f64,
    #[serde(default)]
    pub work_hours: WorkHours,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            ac_temp_threshold: 25.0,
            current_threshold: 21.5,
            voltage: 220.0,
            tariff_per_kwh: 0.25,
            work_hours: WorkHours::default(),
        }
    }
}

impl Params {
    /// Check every field; the first failure is reported
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("ac_temp_threshold", self.ac_temp_threshold),
            ("current_threshold", self.current_threshold),
            ("voltage", self.voltage),
            ("tariff_per_kwh", self.tariff_per_kwh),
            ("work_hours.start", self.work_hours.start),
            ("work_hours.end", self.work_hours.end),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(format!("{name} is not a finite number"));
        }
        if self.voltage <= 0.0 {
            return Err(format!("voltage must be positive, got {}", self.voltage));
        }
        if self.tariff_per_kwh < 0.0 {
            return Err(format!("tariff must not be negative, got {}", self.tariff_per_kwh));
        }
        if self.current_threshold < 0.0 || self.ac_temp_threshold < 0.0 {
            return Err(format!(
                "thresholds must not be negative, got {} A and {} °C",
                self.current_threshold, self.ac_temp_threshold
            ));
        }
        let WorkHours { start, end } = self.work_hours;
        if !(0.0..=24.0).contains(&start) || !(0.0..=24.0).contains(&end) || start >= end {
            return Err(format!("work hours {start}..{end} are not a valid range"));
        }
        Ok(())
    }
}

/// Power state of a sector's controllable devices as reported by the control plane
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStates {
    pub lights: bool,
    pub ac: bool,
}

impl DeviceStates {
    fn from_named(devices: &HashMap<String, bool>) -> Self {
        Self {
            lights: devices.get("lights").copied().unwrap_or(false),
            ac: devices.get("ac").copied().unwrap_or(false),
        }
    }
}

/// External identifiers for each [`EventKind`], in [`EventKind::ALL`] order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventCatalog {
    ids: Vec<String>,
}

impl EventCatalog {
    pub fn new(ids: Vec<String>) -> Self {
        Self { ids }
    }

    /// Identifier for a kind, or `None` if the catalog is too short to cover it
    pub fn resolve(&self, kind: EventKind) -> Option<&str> {
        self.ids.get(kind.index()).map(String::as_str)
    }

    /// True when every kind has an identifier
    pub fn is_complete(&self) -> bool {
        self.ids.len() >= EventKind::ALL.len()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// One immutable configuration snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveConfig {
    /// Incremented on every accepted update
    pub version: u64,
    pub params: Params,
    pub devices: HashMap<String, DeviceStates>,
    pub roster: Vec<String>,
    pub catalog: EventCatalog,
}

impl LiveConfig {
    /// Reported device state for a sector; unknown sectors read as all-off
    pub fn device_states(&self, sector: &str) -> DeviceStates {
        self.devices.get(sector).copied().unwrap_or_default()
    }

    /// Whether a sector is on the roster. An empty roster admits everything.
    pub fn is_known_sector(&self, sector: &str) -> bool {
        self.roster.is_empty() || self.roster.iter().any(|s| s == sector)
    }
}

/// A validated update, ready to apply
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigUpdate {
    Params(Params),
    DeviceStates(HashMap<String, DeviceStates>),
    Roster(Vec<String>),
    Catalog(EventCatalog),
}

impl ConfigUpdate {
    fn kind(&self) -> &'static str {
        match self {
            ConfigUpdate::Params(_) => "params",
            ConfigUpdate::DeviceStates(_) => "device_states",
            ConfigUpdate::Roster(_) => "office_roster",
            ConfigUpdate::Catalog(_) => "event_catalog",
        }
    }

    /// Decode a feed message. `Ok(None)` means the tag is not one we handle.
    pub fn from_json(payload: &[u8]) -> Result<Option<Self>, ConfigError> {
        let envelope: Envelope = serde_json::from_slice(payload)?;
        let update = match envelope.kind.as_str() {
            "params" => {
                let params: Params = serde_json::from_value(envelope.data)?;
                params
                    .validate()
                    .map_err(|reason| ConfigError::Rejected { kind: "params", reason })?;
                ConfigUpdate::Params(params)
            }
            "device_states" => {
                let raw: HashMap<String, HashMap<String, bool>> =
                    serde_json::from_value(envelope.data)?;
                ConfigUpdate::DeviceStates(
                    raw.iter()
                        .map(|(sector, devices)| (sector.clone(), DeviceStates::from_named(devices)))
                        .collect(),
                )
            }
            "office_roster" => {
                let ids = IdList::deserialize(envelope.data)?.into_ordered();
                check_ids("office_roster", &ids)?;
                ConfigUpdate::Roster(ids)
            }
            "event_catalog" => {
                let ids = IdList::deserialize(envelope.data)?.into_ordered();
                check_ids("event_catalog", &ids)?;
                ConfigUpdate::Catalog(EventCatalog::new(ids))
            }
            other => {
                debug!("Ignoring configuration message with tag {:?}", other);
                return Ok(None);
            }
        };
        Ok(Some(update))
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Identifier collections arrive either as a list or as an object keyed by id
#[derive(Deserialize)]
#[serde(untagged)]
enum IdList {
    List(Vec<String>),
    Keys(serde_json::Map<String, Value>),
}

impl IdList {
    fn into_ordered(self) -> Vec<String> {
        match self {
            IdList::List(ids) => ids,
            IdList::Keys(map) => {
                let mut ids: Vec<String> = map.into_iter().map(|(k, _)| k).collect();
                ids.sort_by(|a, b| match (a.parse::<u64>(), b.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                    (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                    (Err(_), Err(_)) => a.cmp(b),
                });
                ids
            }
        }
    }
}

fn check_ids(kind: &'static str, ids: &[String]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(ConfigError::Rejected { kind, reason: "empty identifier".into() });
        }
        if !seen.insert(id.as_str()) {
            return Err(ConfigError::Rejected { kind, reason: format!("duplicate identifier {id:?}") });
        }
    }
    Ok(())
}

/// Result of feeding one message to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Snapshot replaced; carries the new version
    Applied(u64),
    /// Tag not recognised, nothing changed
    Ignored,
}

/// Holder of the current snapshot
pub struct ConfigStore {
    current: RwLock<Arc<LiveConfig>>,
}

impl ConfigStore {
    pub fn new(initial: LiveConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// Current snapshot; the read lock is held only to clone the `Arc`
    pub fn snapshot(&self) -> Arc<LiveConfig> {
        self.current.read().clone()
    }

    /// Replace one section and bump the version
    pub fn apply(&self, update: ConfigUpdate) -> u64 {
        let kind = update.kind();
        let mut current = self.current.write();
        let mut next = LiveConfig::clone(&current);
        match update {
            ConfigUpdate::Params(params) => next.params = params,
            ConfigUpdate::DeviceStates(devices) => next.devices = devices,
            ConfigUpdate::Roster(roster) => next.roster = roster,
            ConfigUpdate::Catalog(catalog) => next.catalog = catalog,
        }
        next.version += 1;
        let version = next.version;
        *current = Arc::new(next);
        drop(current);

        info!("Configuration updated ({}), version {}", kind, version);
        version
    }

    /// Decode and apply a raw feed message, all-or-nothing
    pub fn apply_json(&self, payload: &[u8]) -> Result<ApplyOutcome, ConfigError> {
        match ConfigUpdate::from_json(payload) {
            Ok(Some(update)) => Ok(ApplyOutcome::Applied(self.apply(update))),
            Ok(None) => Ok(ApplyOutcome::Ignored),
            Err(e) => {
                warn!("Configuration update rejected: {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_json() -> &'static [u8] {
        br#"{"type":"event_catalog","data":["k0","k1","k2","k3","k4","k5","k6","k7","k8","k9"]}"#
    }

    #[test]
    fn test_params_update_replaces_snapshot() {
        let store = ConfigStore::new(LiveConfig::default());
        let before = store.snapshot();

        let outcome = store
            .apply_json(br#"{"type":"params","data":{"ac_temp_threshold":24.0,"current_threshold":18.0,"voltage":230.0,"tariff_per_kwh":0.3,"work_hours":{"start":9.0,"end":18.0}}}"#)
            .unwrap();

        assert_eq!(outcome, ApplyOutcome::Applied(1));
        let after = store.snapshot();
        assert_eq!(after.params.voltage, 230.0);
        assert_eq!(after.params.work_hours.start, 9.0);
        // Readers holding the old snapshot are unaffected
        assert_eq!(before.params.voltage, 220.0);
        assert_eq!(before.version, 0);
    }

    #[test]
    fn test_invalid_params_keep_previous_snapshot() {
        let store = ConfigStore::new(LiveConfig::default());

        let err = store
            .apply_json(br#"{"type":"params","data":{"ac_temp_threshold":24.0,"current_threshold":18.0,"voltage":0.0,"tariff_per_kwh":0.3}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Rejected { kind: "params", .. }));

        let partial = store.apply_json(br#"{"type":"params","data":{"voltage":230.0}}"#);
        assert!(matches!(partial, Err(ConfigError::Malformed(_))));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.version, 0);
        assert_eq!(snapshot.params, Params::default());
    }

    #[test]
    fn test_unknown_tag_is_ignored() {
        let store = ConfigStore::new(LiveConfig::default());
        let outcome = store.apply_json(br#"{"type":"summaries","data":{}}"#).unwrap();
        assert_eq!(outcome, ApplyOutcome::Ignored);
        assert_eq!(store.snapshot().version, 0);
    }

    #[test]
    fn test_device_states() {
        let store = ConfigStore::new(LiveConfig::default());
        store
            .apply_json(br#"{"type":"device_states","data":{"A":{"lights":true,"ac":false,"fan":true},"B":{"ac":true}}}"#)
            .unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.device_states("A"), DeviceStates { lights: true, ac: false });
        assert_eq!(snapshot.device_states("B"), DeviceStates { lights: false, ac: true });
        assert_eq!(snapshot.device_states("Z"), DeviceStates::default());
    }

    #[test]
    fn test_catalog_resolution() {
        let store = ConfigStore::new(LiveConfig::default());
        store.apply_json(catalog_json()).unwrap();

        let catalog = store.snapshot().catalog.clone();
        assert!(catalog.is_complete());
        assert_eq!(catalog.resolve(EventKind::LightsOffByDevice), Some("k0"));
        assert_eq!(catalog.resolve(EventKind::OverCurrent), Some("k9"));
    }

    #[test]
    fn test_keyed_catalog_is_ordered_numerically() {
        let update = ConfigUpdate::from_json(
            br#"{"type":"event_catalog","data":{"10":{},"2":{},"0":{},"1":{}}}"#,
        )
        .unwrap();
        let Some(ConfigUpdate::Catalog(catalog)) = update else {
            panic!("expected catalog update");
        };
        assert_eq!(catalog.resolve(EventKind::LightsOffByDevice), Some("0"));
        assert_eq!(catalog.resolve(EventKind::LightsOffAbsence), Some("2"));
        assert_eq!(catalog.resolve(EventKind::AcOffByDevice), Some("10"));
        assert!(!catalog.is_complete());
    }

    #[test]
    fn test_duplicate_roster_rejected() {
        let store = ConfigStore::new(LiveConfig::default());
        let err = store
            .apply_json(br#"{"type":"office_roster","data":["A","B","A"]}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Rejected { kind: "office_roster", .. }));

        store.apply_json(br#"{"type":"office_roster","data":["A","B"]}"#).unwrap();
        let snapshot = store.snapshot();
        assert!(snapshot.is_known_sector("B"));
        assert!(!snapshot.is_known_sector("C"));
    }

    #[test]
    fn test_non_finite_params_rejected() {
        let valid = Params::default();
        for params in [
            Params { ac_temp_threshold: f64::NAN, ..valid.clone() },
            Params { voltage: f64::INFINITY, ..valid.clone() },
            Params { tariff_per_kwh: f64::NEG_INFINITY, ..valid.clone() },
            Params { work_hours: WorkHours { start: f64::NAN, end: 20.0 }, ..valid.clone() },
        ] {
            assert!(params.validate().is_err(), "{params:?} validated");
        }
    }

    #[test]
    fn test_params_rejections_leave_store_untouched() {
        let store = ConfigStore::new(LiveConfig::default());
        let valid = Params::default();

        let cases = [
            ("negative tariff", Params { tariff_per_kwh: -0.01, ..valid.clone() }),
            ("negative current threshold", Params { current_threshold: -1.0, ..valid.clone() }),
            ("negative ac threshold", Params { ac_temp_threshold: -5.0, ..valid.clone() }),
            ("negative voltage", Params { voltage: -220.0, ..valid.clone() }),
            ("start after end", Params { work_hours: WorkHours { start: 20.0, end: 8.0 }, ..valid.clone() }),
            ("empty range", Params { work_hours: WorkHours { start: 9.0, end: 9.0 }, ..valid.clone() }),
            ("end past midnight", Params { work_hours: WorkHours { start: 8.0, end: 25.0 }, ..valid.clone() }),
            ("negative start", Params { work_hours: WorkHours { start: -1.0, end: 20.0 }, ..valid.clone() }),
        ];

        for (name, params) in cases {
            let payload = serde_json::json!({ "type": "params", "data": params }).to_string();
            let err = store.apply_json(payload.as_bytes()).unwrap_err();
            assert!(matches!(err, ConfigError::Rejected { kind: "params", .. }), "{name}: {err}");
        }

        let snapshot = store.snapshot();
        assert_eq!(snapshot.version, 0);
        assert_eq!(snapshot.params, valid);

        // A valid update after the rejections still applies
        let payload = serde_json::json!({ "type": "params", "data": valid }).to_string();
        assert_eq!(store.apply_json(payload.as_bytes()).unwrap(), ApplyOutcome::Applied(1));
    }
}

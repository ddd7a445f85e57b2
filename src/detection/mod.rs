// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Detection module - operational events raised on sector state transitions

mod detector;

pub use detector::{DetectorLimits, EventDetector};

use serde::{Deserialize, Serialize};

/// Kinds of event the detector can raise.
///
/// The declaration order is the order of the pushed event catalog: the n-th
/// catalog entry is the external identifier of the n-th kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    // Lighting
    LightsOffByDevice,
    LightsOn,
    LightsOffAbsence,

    // Climate control
    AcOffByDevice,
    AcOn,
    AcOffConditions,

    // Electrical
    AnomalousDraw,
    PowerOutage,
    SensorOffline,
    OverCurrent,
}

impl EventKind {
    /// Every kind, in catalog order
    pub const ALL: [EventKind; 10] = [
        EventKind::LightsOffByDevice,
        EventKind::LightsOn,
        EventKind::LightsOffAbsence,
        EventKind::AcOffByDevice,
        EventKind::AcOn,
        EventKind::AcOffConditions,
        EventKind::AnomalousDraw,
        EventKind::PowerOutage,
        EventKind::SensorOffline,
        EventKind::OverCurrent,
    ];

    /// Position in the event catalog
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn severity(self) -> Severity {
        match self {
            EventKind::LightsOn | EventKind::AcOn => Severity::Success,
            EventKind::LightsOffByDevice
            | EventKind::LightsOffAbsence
            | EventKind::AcOffByDevice
            | EventKind::AcOffConditions
            | EventKind::AnomalousDraw
            | EventKind::OverCurrent => Severity::Warning,
            EventKind::PowerOutage | EventKind::SensorOffline => Severity::Error,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EventKind::LightsOffByDevice => "lights off",
            EventKind::LightsOn => "lights on",
            EventKind::LightsOffAbsence => "lights off",
            EventKind::AcOffByDevice => "ac off",
            EventKind::AcOn => "ac on",
            EventKind::AcOffConditions => "ac off",
            EventKind::AnomalousDraw => "anomalous draw",
            EventKind::PowerOutage => "power outage",
            EventKind::SensorOffline => "sensor offline",
            EventKind::OverCurrent => "overcurrent",
        }
    }
}

/// Severity class of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Warning,
    Error,
}

/// A discrete operational event for one sector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Wall-clock unix seconds at detection
    pub timestamp: i64,
    pub kind: EventKind,
    /// Identifier resolved from the event catalog
    pub kind_id: String,
    /// Free-text detail, empty when the kind says it all
    pub detail: String,
    pub severity: Severity,
}

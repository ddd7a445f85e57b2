// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Event bus carrying events and summaries from the engine to persistence

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

use crate::analysis::Summary;
use crate::detection::Event;

/// Something the engine produced for a sector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum OutputRecord {
    Event { sector: String, event: Event },
    Summary { sector: String, summary: Summary },
}

impl OutputRecord {
    pub fn sector(&self) -> &str {
        match self {
            OutputRecord::Event { sector, .. } | OutputRecord::Summary { sector, .. } => sector,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            OutputRecord::Event { event, .. } => event.timestamp,
            OutputRecord::Summary { summary, .. } => summary.timestamp,
        }
    }

    /// Logical storage key, e.g. `events/A/1700000000`
    pub fn path(&self) -> String {
        let collection = match self {
            OutputRecord::Event { .. } => "events",
            OutputRecord::Summary { .. } => "summaries",
        };
        format!("{}/{}/{}", collection, self.sector(), self.timestamp())
    }
}

/// Destination for engine output.
///
/// Called while a sector lock is held, so implementations must hand the record
/// off without blocking on I/O.
pub trait OutputSink: Send + Sync {
    fn deliver(&self, record: OutputRecord);
}

/// Broadcast fan-out to any number of writers
pub struct EventBus {
    record_tx: broadcast::Sender<OutputRecord>,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (record_tx, _) = broadcast::channel(capacity);

        Self {
            record_tx,
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OutputRecord> {
        self.record_tx.subscribe()
    }

    /// Records handed to at least one subscriber
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Records discarded because nobody was listening
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl OutputSink for EventBus {
    fn deliver(&self, record: OutputRecord) {
        match self.record_tx.send(record) {
            Ok(_) => {
                self.published.fetch_add(1, Ordering::Relaxed);
            }
            Err(broadcast::error::SendError(record)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("No subscribers, dropped {}", record.path());
            }
        }
    }
}

//! Streaming module - MQTT ingest, configuration feed, and record writers

mod mqtt;
mod feed;
mod export;

pub use mqtt::*;
pub use feed::*;
pub use export::*;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::core::OutputRecord;
use crate::error::SinkError;

/// Streaming configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Enable MQTT ingest
    pub mqtt_enabled: bool,
    pub mqtt_broker: String,
    pub mqtt_port: u16,
    pub mqtt_client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mqtt_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mqtt_password: Option<String>,
    /// Topic filter carrying sensor readings
    pub reading_topic: String,

    /// Websocket endpoints pushing configuration updates
    pub feed_urls: Vec<String>,
    /// Pause before reconnecting a dropped feed or broker
    pub reconnect_secs: u64,

    /// Enable JSON-lines export
    pub export_enabled: bool,
    pub export_path: String,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            mqtt_enabled: true,
            mqtt_broker: "localhost".to_string(),
            mqtt_port: 1883,
            mqtt_client_id: "sectorwatch".to_string(),
            mqtt_username: None,
            mqtt_password: None,
            reading_topic: "sectors/+/readings".to_string(),

            feed_urls: Vec::new(),
            reconnect_secs: 5,

            export_enabled: false,
            export_path: "./data/export".to_string(),
        }
    }
}

/// Durable destination for engine output
pub trait RecordStore: Send + Sync {
    fn name(&self) -> &str;

    fn store(&self, record: &OutputRecord) -> Result<(), SinkError>;
}

/// Drain bus records into a store until the bus closes.
///
/// Failures are logged and the record is lost; nothing is retried. The task
/// resolves to the number of records stored.
pub fn spawn_store_writer(
    mut records: broadcast::Receiver<OutputRecord>,
    store: Arc<dyn RecordStore>,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        info!("Store writer '{}' started", store.name());
        let mut written = 0u64;

        loop {
            match records.recv().await {
                Ok(record) => match store.store(&record) {
                    Ok(()) => {
                        written += 1;
                        debug!("{} stored {}", store.name(), record.path());
                    }
                    Err(e) => {
                        error!("{} failed to store {}: {}", store.name(), record.path(), e);
                    }
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("{} fell behind, {} records lost", store.name(), skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        info!("Store writer '{}' stopped after {} records", store.name(), written);
        written
    })
}

// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! WebSocket client following the control plane's configuration feed

use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::config::live::{ApplyOutcome, ConfigStore};

/// Follow one feed endpoint forever, applying each message to `store`.
///
/// Dropped connections are retried after `reconnect`. Bad messages are logged
/// by the store and leave the current snapshot in place.
pub fn spawn_config_feed(url: String, store: Arc<ConfigStore>, reconnect: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match connect_async(url.as_str()).await {
                Ok((ws_stream, _)) => {
                    info!("Configuration feed connected: {}", url);
                    let (_, mut ws_receiver) = ws_stream.split();

                    while let Some(msg) = ws_receiver.next().await {
                        match msg {
                            Ok(Message::Text(text)) => apply_message(&store, text.as_bytes()),
                            Ok(Message::Binary(data)) => apply_message(&store, &data),
                            Ok(Message::Close(_)) => break,
                            Ok(_) => {}
                            Err(e) => {
                                warn!("Configuration feed {} error: {}", url, e);
                                break;
                            }
                        }
                    }
                    info!("Configuration feed disconnected: {}", url);
                }
                Err(e) => {
                    warn!("Configuration feed {} unreachable: {}", url, e);
                }
            }

            tokio::time::sleep(reconnect).await;
        }
    })
}

fn apply_message(store: &ConfigStore, payload: &[u8]) {
    if let Ok(ApplyOutcome::Applied(version)) = store.apply_json(payload) {
        debug!("Feed update applied, version {}", version);
    }
}

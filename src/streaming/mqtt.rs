// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! MQTT subscriber feeding sensor readings into the engine

use anyhow::{anyhow, Result};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::StreamingConfig;
use crate::core::Engine;

/// Subscription to the reading topic, driving [`Engine::ingest_payload`]
pub struct MqttIngest {
    client: AsyncClient,
    topic: String,
    task: JoinHandle<()>,
}

impl MqttIngest {
    /// Start the event loop. The broker connection is made, and remade after
    /// failures, in the background.
    pub fn start(config: &StreamingConfig, engine: Arc<Engine>) -> Self {
        let (client, mut eventloop) = AsyncClient::new(mqtt_options(config), 100);
        let topic = config.reading_topic.clone();
        let retry = Duration::from_secs(config.reconnect_secs.max(1));

        let subscriber = client.clone();
        let subscription = topic.clone();
        let task = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("MQTT connected");
                        // Sessions are clean, so every connect needs a fresh subscription
                        if let Err(e) = subscriber.try_subscribe(subscription.as_str(), QoS::AtLeastOnce) {
                            warn!("MQTT subscribe to {} failed: {}", subscription, e);
                        }
                    }
                    Ok(Event::Incoming(Packet::SubAck(_))) => {
                        info!("Subscribed to MQTT topic: {}", subscription);
                    }
                    Ok(Event::Incoming(Packet::Publish(msg))) => {
                        debug!("MQTT received on {}", msg.topic);
                        // Rejections are counted and logged by the engine
                        let _ = engine.ingest_payload(&msg.payload);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("MQTT error: {:?}", e);
                        tokio::time::sleep(retry).await;
                    }
                }
            }
        });

        info!("MQTT ingest started for {}:{}", config.mqtt_broker, config.mqtt_port);

        Self { client, topic, task }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub async fn stop(self) -> Result<()> {
        let result = self
            .client
            .disconnect()
            .await
            .map_err(|e| anyhow!("MQTT disconnect failed: {}", e));
        self.task.abort();
        info!("MQTT ingest stopped");
        result
    }
}

fn mqtt_options(config: &StreamingConfig) -> MqttOptions {
    let mut options = MqttOptions::new(&config.mqtt_client_id, &config.mqtt_broker, config.mqtt_port);
    options.set_keep_alive(Duration::from_secs(30));
    options.set_clean_session(true);

    if let (Some(username), Some(password)) = (&config.mqtt_username, &config.mqtt_password) {
        options.set_credentials(username, password);
    }
    options
}

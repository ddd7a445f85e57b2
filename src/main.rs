// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! SectorWatch - Per-Sector Electrical Telemetry Engine
//!
//! Headless service: readings in over MQTT, configuration in over websocket,
//! events and summaries out to SQLite and JSON-lines files.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use sectorwatch::{
    core::{Engine, EventBus, Scheduler, SystemClock},
    config::live::ConfigStore,
    db::Database,
    streaming::{spawn_config_feed, spawn_store_writer, DataExporter, MqttIngest, RecordStore},
    Config, NAME, VERSION,
};

/// SectorWatch - Per-Sector Electrical Telemetry Engine
#[derive(Parser, Debug)]
#[command(name = "sectorwatch")]
#[command(author = "bad-antics")]
#[command(version = VERSION)]
#[command(about = "Per-sector consumption monitoring and event detection")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// MQTT broker address
    #[arg(long)]
    mqtt_broker: Option<String>,

    /// Data output directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Configuration feed endpoint (repeatable)
    #[arg(long = "feed-url")]
    feed_urls: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over the flags when set
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{} v{}", NAME, VERSION);

    // Load or create configuration
    let config_path = args.config.unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Override with command line args
    if let Some(data_dir) = args.data_dir {
        config.relocate_data(&data_dir);
    }
    if let Some(mqtt) = args.mqtt_broker {
        config.streaming.mqtt_enabled = true;
        config.streaming.mqtt_broker = mqtt;
    }
    if !args.feed_urls.is_empty() {
        config.streaming.feed_urls = args.feed_urls;
    }

    info!("Configuration loaded from {:?}", config_path);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config))
}

async fn run(config: Config) -> Result<()> {
    let store = Arc::new(ConfigStore::new(config.tunables.to_live()));
    let bus = Arc::new(EventBus::new(config.engine.bus_capacity));

    // Writers subscribe before the engine can publish anything
    let mut writers = Vec::new();
    if config.database.enabled {
        let db: Arc<dyn RecordStore> = Arc::new(Database::open(&config.database)?);
        writers.push(spawn_store_writer(bus.subscribe(), db));
    }
    if config.streaming.export_enabled {
        let exporter: Arc<dyn RecordStore> = Arc::new(DataExporter::new(&config.streaming.export_path)?);
        writers.push(spawn_store_writer(bus.subscribe(), exporter));
    }
    if writers.is_empty() {
        warn!("No record store enabled, events and summaries will only be logged");
    }

    let engine = Arc::new(
        Engine::new(&config.engine, store.clone(), bus.clone()).with_clock(Arc::new(SystemClock)),
    );
    info!("Core engine initialized");

    let ingest = if config.streaming.mqtt_enabled {
        Some(MqttIngest::start(&config.streaming, engine.clone()))
    } else {
        warn!("MQTT ingest disabled, no readings will arrive");
        None
    };

    let reconnect = Duration::from_secs(config.streaming.reconnect_secs.max(1));
    let feeds: Vec<_> = config
        .streaming
        .feed_urls
        .iter()
        .map(|url| spawn_config_feed(url.clone(), store.clone(), reconnect))
        .collect();

    let scheduler = Scheduler::new();
    let sweeper = engine.clone();
    scheduler.spawn_periodic(
        "liveness",
        Duration::from_secs(config.engine.liveness_sweep_secs.max(1)),
        move || {
            sweeper.sweep_liveness();
        },
    );

    info!("{} running", NAME);
    info!("   Press Ctrl+C to shutdown");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received, cleaning up...");

    scheduler.shutdown();
    for feed in feeds {
        feed.abort();
    }
    if let Some(ingest) = ingest {
        if let Err(e) = ingest.stop().await {
            warn!("{}", e);
        }
    }

    let stats = engine.stats();
    info!(
        "Processed {} readings ({} rejected), {} events, {} summaries across {} sectors",
        stats.readings_accepted,
        stats.readings_rejected,
        stats.events_emitted,
        stats.summaries_emitted,
        stats.sectors
    );

    // Closing the bus lets the writers drain and exit
    drop(engine);
    drop(bus);
    for writer in writers {
        match tokio::time::timeout(Duration::from_secs(5), writer).await {
            Ok(Ok(written)) => info!("Writer flushed {} records", written),
            Ok(Err(e)) => warn!("Writer task failed: {}", e),
            Err(_) => warn!("Writer did not finish in time"),
        }
    }

    info!("{} shutdown complete", NAME);
    Ok(())
}

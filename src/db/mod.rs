// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Database module for persistent storage of events and summaries

use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::Summary;
use crate::config::DatabaseConfig;
use crate::core::OutputRecord;
use crate::detection::Event;
use crate::error::SinkError;
use crate::streaming::RecordStore;

/// Database manager
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create database
    pub fn open(config: &DatabaseConfig) -> Result<Self, SinkError> {
        // Create parent directories
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&config.path)?;

        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        "#,
        )?;

        let db = Self::with_connection(conn)?;
        info!("Database opened at {:?}", config.path);
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, SinkError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, SinkError> {
        let db = Self { conn: Mutex::new(conn) };
        db.create_tables()?;
        Ok(db)
    }

    /// Create database tables
    fn create_tables(&self) -> Result<(), SinkError> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            -- Several events can share a path when rules fire together
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                path TEXT NOT NULL,
                sector TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                kind_id TEXT NOT NULL,
                severity TEXT NOT NULL,
                data TEXT NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_events_sector ON events(sector, timestamp);

            CREATE TABLE IF NOT EXISTS summaries (
                path TEXT PRIMARY KEY,
                sector TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                data TEXT NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_summaries_sector ON summaries(sector, timestamp);
        "#,
        )?;

        Ok(())
    }

    /// Store an event
    pub fn store_event(&self, sector: &str, event: &Event) -> Result<(), SinkError> {
        let data = serde_json::to_string(event)?;
        let severity = serde_json::to_value(event.severity)?;
        let conn = self.conn.lock();

        conn.execute(
            "INSERT INTO events (path, sector, timestamp, kind_id, severity, data) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                format!("events/{}/{}", sector, event.timestamp),
                sector,
                event.timestamp,
                event.kind_id,
                severity.as_str().unwrap_or_default(),
                data
            ],
        )?;

        Ok(())
    }

    /// Store a summary, replacing any earlier one at the same path
    pub fn store_summary(&self, sector: &str, summary: &Summary) -> Result<(), SinkError> {
        let data = serde_json::to_string(summary)?;
        let conn = self.conn.lock();

        conn.execute(
            "INSERT OR REPLACE INTO summaries (path, sector, timestamp, data) VALUES (?1, ?2, ?3, ?4)",
            params![
                format!("summaries/{}/{}", sector, summary.timestamp),
                sector,
                summary.timestamp,
                data
            ],
        )?;

        Ok(())
    }

    /// Latest events for a sector, newest first
    pub fn recent_events(&self, sector: &str, limit: usize) -> Result<Vec<Event>, SinkError> {
        let rows = self.query_data(
            "SELECT data FROM events WHERE sector = ?1 ORDER BY timestamp DESC, id DESC LIMIT ?2",
            sector,
            limit,
        )?;
        rows.iter()
            .map(|data| serde_json::from_str(data).map_err(SinkError::from))
            .collect()
    }

    /// Latest summaries for a sector, newest first
    pub fn recent_summaries(&self, sector: &str, limit: usize) -> Result<Vec<Summary>, SinkError> {
        let rows = self.query_data(
            "SELECT data FROM summaries WHERE sector = ?1 ORDER BY timestamp DESC LIMIT ?2",
            sector,
            limit,
        )?;
        rows.iter()
            .map(|data| serde_json::from_str(data).map_err(SinkError::from))
            .collect()
    }

    fn query_data(&self, sql: &str, sector: &str, limit: usize) -> Result<Vec<String>, SinkError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;

        let rows = stmt.query_map(params![sector, limit as i64], |row| row.get::<_, String>(0))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DatabaseStats, SinkError> {
        let conn = self.conn.lock();

        let event_count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        let summary_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM summaries", [], |row| row.get(0))?;
        let sector_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM (SELECT sector FROM events UNION SELECT sector FROM summaries)",
            [],
            |row| row.get(0),
        )?;

        Ok(DatabaseStats {
            event_count: event_count as usize,
            summary_count: summary_count as usize,
            sector_count: sector_count as usize,
        })
    }
}

impl RecordStore for Database {
    fn name(&self) -> &str {
        "database"
    }

    fn store(&self, record: &OutputRecord) -> Result<(), SinkError> {
        match record {
            OutputRecord::Event { sector, event } => self.store_event(sector, event),
            OutputRecord::Summary { sector, summary } => self.store_summary(sector, summary),
        }
    }
}

/// Database statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseStats {
    pub event_count: usize,
    pub summary_count: usize,
    pub sector_count: usize,
}

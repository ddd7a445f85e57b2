// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Error types shared by the engine and its adapters

use thiserror::Error;

/// A reading that could not be accepted. Nothing is mutated when this is returned.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Payload does not deserialize to the reading shape
    #[error("malformed reading: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Payload parsed but carries unusable values
    #[error("invalid reading: {0}")]
    Invalid(String),
}

/// A configuration update that was not applied. The previous snapshot stays active.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Envelope or payload does not parse
    #[error("malformed configuration update: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Payload parsed but failed validation
    #[error("rejected {kind} update: {reason}")]
    Rejected {
        /// Update tag
        kind: &'static str,
        /// Why it was refused
        reason: String,
    },
}

/// Failure to persist an event or summary. Logged by the writer, never retried.
#[derive(Debug, Error)]
pub enum SinkError {
    /// SQLite failure
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File export failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be encoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

//! Error taxonomy shared across the sensor, store and configuration layers.
//!
//! Only `ConfigError` is ever fatal, and only before the game loop starts.
//! Everything else is recovered where it happens.

use std::path::PathBuf;

use thiserror::Error;

/// A sensor line that does not look like `FSR1: <int>, FSR2: <int>, <rest>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty sensor line")]
    Empty,
    #[error("expected 3 comma-separated fields, got {0}")]
    FieldCount(usize),
    #[error("field '{0}' has no ': ' separated value")]
    MissingValue(String),
    #[error("value '{0}' is not an integer")]
    InvalidInteger(String),
}

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to open sensor device: {0}")]
    Open(String),
    #[error("sensor device I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("sensor device disconnected")]
    Disconnected,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("high score file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("high score file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("score query failed: {0:#}")]
    Query(anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("store_backend is 'history' but no store_url was configured")]
    MissingStoreUrl,
    #[error("collection '{0}' is not a valid table name")]
    InvalidCollection(String),
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

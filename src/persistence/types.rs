use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Persistence error types
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        PersistenceError::SerializationError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Durable record mirroring one application-cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub key: String,
    pub value: Vec<u8>,
    pub expires_at_ms: u64,
}

/// Outcome of a startup load.
///
/// Corrupt and already-expired records are skipped and counted, never
/// surfaced as errors: the mirror is best-effort and the in-memory tier
/// stays authoritative.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub records: Vec<PersistedRecord>,
    pub corrupt_skipped: usize,
    pub expired_skipped: usize,
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    pub directory: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./data/chromacache"),
        }
    }
}

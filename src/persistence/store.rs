//! Durable key→{value, expiry} mirror for the application cache.
//!
//! One JSON record per key, written best-effort. Records share a fixed
//! filename prefix so cache state can coexist with (and be wiped
//! independently of) unrelated application files in the same directory.

use super::types::{LoadReport, PersistedRecord, PersistenceConfig, Result};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, warn};

/// Filename prefix separating cache records from unrelated state
pub const RECORD_PREFIX: &str = "chromacache-";

/// File-backed record store, one record per key
#[derive(Clone)]
pub struct RecordStore {
    directory: PathBuf,
}

impl RecordStore {
    pub fn new(config: PersistenceConfig) -> Self {
        Self {
            directory: config.directory,
        }
    }

    /// Ensure the record directory exists
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.directory).await?;
        info!(directory = ?self.directory, "record store initialized");
        Ok(())
    }

    fn record_path(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let digest = hex::encode(hasher.finalize());
        self.directory.join(format!("{RECORD_PREFIX}{digest}.json"))
    }

    /// Write a record, overwriting silently
    pub async fn write(&self, key: &str, value: &[u8], expires_at_ms: u64) -> Result<()> {
        let record = PersistedRecord {
            key: key.to_string(),
            value: value.to_vec(),
            expires_at_ms,
        };
        let json = serde_json::to_vec(&record)?;
        fs::write(self.record_path(key), json).await?;
        Ok(())
    }

    /// Load every record under the fixed prefix.
    ///
    /// Records that fail to parse are skipped and counted; records whose
    /// expiry has already passed at `now_ms` are discarded.
    pub async fn load_all(&self, now_ms: u64) -> Result<LoadReport> {
        let mut report = LoadReport::default();

        if !self.directory.exists() {
            return Ok(report);
        }

        let mut dir = fs::read_dir(&self.directory).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };
            if !name.starts_with(RECORD_PREFIX) || !name.ends_with(".json") {
                continue;
            }

            let bytes = match fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(?path, error = %e, "unreadable record skipped");
                    report.corrupt_skipped += 1;
                    continue;
                }
            };

            let record: PersistedRecord = match serde_json::from_slice(&bytes) {
                Ok(record) => record,
                Err(e) => {
                    warn!(?path, error = %e, "corrupt record skipped");
                    report.corrupt_skipped += 1;
                    continue;
                }
            };

            if record.expires_at_ms <= now_ms {
                report.expired_skipped += 1;
                let _ = fs::remove_file(&path).await;
                continue;
            }

            report.records.push(record);
        }

        info!(
            loaded = report.records.len(),
            corrupt = report.corrupt_skipped,
            expired = report.expired_skipped,
            "record store load complete"
        );
        Ok(report)
    }

    /// Remove a record; missing files are not an error
    pub async fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.record_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove every record under the fixed prefix
    pub async fn clear(&self) -> Result<()> {
        if !self.directory.exists() {
            return Ok(());
        }

        let mut removed = 0usize;
        let mut dir = fs::read_dir(&self.directory).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            let is_record = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(RECORD_PREFIX) && n.ends_with(".json"));
            if is_record {
                let _ = fs::remove_file(&path).await;
                removed += 1;
            }
        }

        debug!(removed, "record store cleared");
        Ok(())
    }
}

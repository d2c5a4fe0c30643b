//! Aggregate size and age bounds for the response store.
//!
//! Enforcement is a discrete pass, not continuous polling: it runs
//! synchronously before a write that would exceed quota and on explicit
//! maintenance hints.

use super::response_store::ResponseStore;
use crate::core::clock::Clock;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// After a size purge, usage is driven down to this fraction of max
const TARGET_RATIO: f64 = 0.8;

/// Quota configuration for the response store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Maximum aggregate bytes in the active namespace
    pub max_bytes: u64,
    /// Entries older than this are purged regardless of size
    pub max_age_ms: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            max_bytes: 50 * 1024 * 1024,
            max_age_ms: 24 * 60 * 60 * 1000,
        }
    }
}

/// Quota statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct QuotaStats {
    pub used_bytes: u64,
    pub max_bytes: u64,
    pub entries: usize,
    /// Entries removed for exceeding max age
    pub age_evictions: u64,
    /// Entries removed to bring usage back under quota
    pub size_evictions: u64,
}

/// Evictor for the active response-store namespace
#[derive(Clone)]
pub struct QuotaManager {
    store: ResponseStore,
    config: QuotaConfig,
    clock: Arc<dyn Clock>,
    counters: Arc<RwLock<(u64, u64)>>,
}

impl QuotaManager {
    pub fn new(store: ResponseStore, config: QuotaConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            config,
            clock,
            counters: Arc::new(RwLock::new((0, 0))),
        }
    }

    /// Run one maintenance pass: age purge first, then size purge down to
    /// the target if usage still exceeds the configured max.
    pub fn enforce(&self) {
        let now = self.clock.now_ms();
        let cutoff = now.saturating_sub(self.config.max_age_ms);

        let (age_removed, freed) = self.store.purge_older_than(cutoff);
        if age_removed > 0 {
            info!(removed = age_removed, freed, "quota age purge");
        }

        let mut size_removed = 0;
        if self.store.used_bytes() > self.config.max_bytes {
            let target = (self.config.max_bytes as f64 * TARGET_RATIO) as u64;
            size_removed = self.store.evict_oldest_until(target);
            info!(
                removed = size_removed,
                used = self.store.used_bytes(),
                target,
                "quota size purge"
            );
        }

        let mut counters = self.counters.write();
        counters.0 += age_removed as u64;
        counters.1 += size_removed as u64;
    }

    /// Make room before a write of `incoming` bytes; runs a full pass
    /// only when the write would exceed quota.
    pub fn ensure_capacity(&self, incoming: u64) {
        if self.store.used_bytes() + incoming > self.config.max_bytes {
            debug!(incoming, used = self.store.used_bytes(), "write over quota, enforcing");
            self.enforce();
        }
    }

    pub fn stats(&self) -> QuotaStats {
        let counters = self.counters.read();
        QuotaStats {
            used_bytes: self.store.used_bytes(),
            max_bytes: self.config.max_bytes,
            entries: self.store.entry_count(),
            age_evictions: counters.0,
            size_evictions: counters.1,
        }
    }
}

use serde::{Deserialize, Serialize};

/// Stored entry in the application cache with access metadata
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Raw byte payload
    pub value: Vec<u8>,
    /// Creation time (epoch ms)
    pub created_at_ms: u64,
    /// Expiration time (epoch ms); always strictly after `created_at_ms`
    pub expires_at_ms: u64,
    /// Accesses since this entry was (re)inserted
    pub access_count: u64,
    /// Last access time (epoch ms)
    pub last_accessed_ms: u64,
    /// Insertion sequence, breaks eviction-score ties in insertion order
    pub seq: u64,
}

impl CacheEntry {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.expires_at_ms
    }

    /// Entry age in whole seconds at `now_ms`
    pub fn age_secs(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.created_at_ms) / 1000
    }

    pub fn record_access(&mut self, now_ms: u64) {
        self.access_count += 1;
        self.last_accessed_ms = now_ms;
    }
}

/// Cleanup hint issued by the host after a high-level operation completes.
///
/// Each kind selects a different cleanup sub-routine; see
/// [`AppCache::post_operation_cleanup`](crate::core::AppCache::post_operation_cleanup).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    /// Purge expired entries only
    Light,
    /// Purge entries outside the essential key prefixes
    Heavy,
    /// Purge entries whose access frequency is below the configured floor
    Pressure,
    /// Full reset
    UserAction,
}

/// Configuration for the application cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct L1Config {
    /// Starting adaptive capacity (entries)
    pub initial_capacity: usize,
    /// Hard lower bound for adaptive capacity
    pub min_capacity: usize,
    /// Hard upper bound for adaptive capacity
    pub max_capacity: usize,
    /// Key prefixes exempt from the heavy cleanup purge
    pub essential_prefixes: Vec<String>,
    /// Entries accessed fewer times than this are purged under pressure
    pub frequency_floor: u64,
}

impl Default for L1Config {
    fn default() -> Self {
        Self {
            initial_capacity: 200,
            min_capacity: 50,
            max_capacity: 2_000,
            essential_prefixes: vec!["palette:".to_string(), "session:".to_string()],
            frequency_floor: 2,
        }
    }
}

/// Statistics for the application cache
#[derive(Debug, Default, Clone, Serialize)]
pub struct L1Stats {
    /// Resident entries
    pub size: usize,
    /// Current adaptive capacity
    pub max_size: usize,
    /// Entries purged because their TTL had passed
    pub expired_count: u64,
    /// Entries removed by the scoring eviction sweep
    pub evictions: u64,
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
}

impl L1Stats {
    /// Calculate hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

//! In-process application cache (L1).
//!
//! TTL store with scored eviction and adaptive capacity, mirrored
//! best-effort to the persistence adapter. The mirror is never
//! authoritative: a failed write or remove is logged and ignored.

use super::clock::Clock;
use super::error::{CacheError, Result};
use super::types::{CacheEntry, L1Config, L1Stats, OperationKind};
use crate::persistence::RecordStore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Fraction of capacity removed by one eviction sweep
const EVICTION_FRACTION: f64 = 0.2;

/// Application cache service.
///
/// Cloning is cheap and shares the same underlying store.
#[derive(Clone)]
pub struct AppCache {
    inner: Arc<RwLock<CacheInner>>,
    mirror: RecordStore,
    clock: Arc<dyn Clock>,
    config: L1Config,
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    /// Long-lived per-key access frequency; survives overwrite-on-set
    frequency: HashMap<String, u64>,
    capacity: usize,
    next_seq: u64,
    expired_count: u64,
    evictions: u64,
    hits: u64,
    misses: u64,
    /// Hit/miss counters for the current adaptive sampling window
    window_hits: u64,
    window_misses: u64,
}

enum Lookup {
    Hit(Option<Vec<u8>>),
    Miss,
    Expired,
}

impl AppCache {
    pub fn new(config: L1Config, mirror: RecordStore, clock: Arc<dyn Clock>) -> Self {
        info!(
            capacity = config.initial_capacity,
            min = config.min_capacity,
            max = config.max_capacity,
            "initializing application cache"
        );

        Self {
            inner: Arc::new(RwLock::new(CacheInner {
                entries: HashMap::new(),
                frequency: HashMap::new(),
                capacity: config.initial_capacity,
                next_seq: 0,
                expired_count: 0,
                evictions: 0,
                hits: 0,
                misses: 0,
                window_hits: 0,
                window_misses: 0,
            })),
            mirror,
            clock,
            config,
        }
    }

    /// Set a key-value pair with the given TTL.
    ///
    /// Rejects empty keys and zero TTLs. If the cache is at capacity an
    /// eviction sweep runs before the insert.
    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        if key.is_empty() {
            return Err(CacheError::InvalidArgument("empty key".to_string()));
        }
        if ttl.is_zero() {
            return Err(CacheError::InvalidArgument(format!(
                "non-positive ttl for key {key}"
            )));
        }

        let now = self.clock.now_ms();
        let expires_at_ms = now + ttl.as_millis() as u64;

        let evicted = {
            let mut inner = self.inner.write();

            let evicted = if inner.entries.len() >= inner.capacity
                && !inner.entries.contains_key(key)
            {
                Self::evict_batch(&mut inner, now)
            } else {
                Vec::new()
            };

            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.entries.insert(
                key.to_string(),
                CacheEntry {
                    value: value.clone(),
                    created_at_ms: now,
                    expires_at_ms,
                    access_count: 0,
                    last_accessed_ms: now,
                    seq,
                },
            );
            evicted
        };

        for victim in &evicted {
            if let Err(e) = self.mirror.remove(victim).await {
                debug!(key = %victim, error = %e, "mirror remove failed");
            }
        }
        if let Err(e) = self.mirror.write(key, &value, expires_at_ms).await {
            debug!(key, error = %e, "mirror write failed");
        }

        Ok(())
    }

    /// Get a value by key; expired entries are purged on observation
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        match self.lookup(key, true) {
            Lookup::Hit(value) => value,
            Lookup::Miss => None,
            Lookup::Expired => {
                if let Err(e) = self.mirror.remove(key).await {
                    debug!(key, error = %e, "mirror remove failed");
                }
                None
            }
        }
    }

    /// Check whether a key resolves to a live entry
    pub async fn has(&self, key: &str) -> bool {
        match self.lookup(key, false) {
            Lookup::Hit(_) => true,
            Lookup::Miss => false,
            Lookup::Expired => {
                if let Err(e) = self.mirror.remove(key).await {
                    debug!(key, error = %e, "mirror remove failed");
                }
                false
            }
        }
    }

    fn lookup(&self, key: &str, clone_value: bool) -> Lookup {
        let now = self.clock.now_ms();
        let mut inner = self.inner.write();

        let expired = match inner.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => {
                inner.misses += 1;
                inner.window_misses += 1;
                return Lookup::Miss;
            }
        };

        if expired {
            inner.entries.remove(key);
            inner.expired_count += 1;
            inner.misses += 1;
            inner.window_misses += 1;
            debug!(key, "expired entry purged on read");
            return Lookup::Expired;
        }

        let mut value = None;
        if let Some(entry) = inner.entries.get_mut(key) {
            entry.record_access(now);
            if clone_value {
                value = Some(entry.value.clone());
            }
        }
        *inner.frequency.entry(key.to_string()).or_insert(0) += 1;
        inner.hits += 1;
        inner.window_hits += 1;
        Lookup::Hit(value)
    }

    /// Delete a key; returns whether an entry was resident
    pub async fn delete(&self, key: &str) -> bool {
        let removed = {
            let mut inner = self.inner.write();
            inner.frequency.remove(key);
            inner.entries.remove(key).is_some()
        };
        if let Err(e) = self.mirror.remove(key).await {
            debug!(key, error = %e, "mirror remove failed");
        }
        removed
    }

    /// Remove all entries from memory and the mirror
    pub async fn clear(&self) {
        let count = {
            let mut inner = self.inner.write();
            let count = inner.entries.len();
            inner.entries.clear();
            inner.frequency.clear();
            count
        };
        if let Err(e) = self.mirror.clear().await {
            debug!(error = %e, "mirror clear failed");
        }
        debug!(count, "cache cleared");
    }

    /// Snapshot current statistics
    pub async fn stats(&self) -> L1Stats {
        let inner = self.inner.read();
        L1Stats {
            size: inner.entries.len(),
            max_size: inner.capacity,
            expired_count: inner.expired_count,
            evictions: inner.evictions,
            hits: inner.hits,
            misses: inner.misses,
        }
    }

    /// Populate the cache from the persistence mirror.
    ///
    /// Invoked once at startup; corrupt and expired records were already
    /// filtered by the adapter. Returns the number of entries loaded.
    pub async fn load_persisted(&self) -> crate::persistence::Result<usize> {
        let now = self.clock.now_ms();
        let report = self.mirror.load_all(now).await?;
        let loaded = report.records.len();

        let mut inner = self.inner.write();
        for record in report.records {
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.entries.insert(
                record.key,
                CacheEntry {
                    value: record.value,
                    created_at_ms: now,
                    expires_at_ms: record.expires_at_ms,
                    access_count: 0,
                    last_accessed_ms: now,
                    seq,
                },
            );
        }

        info!(
            loaded,
            corrupt = report.corrupt_skipped,
            expired = report.expired_skipped,
            "warm start from mirror"
        );
        Ok(loaded)
    }

    /// Purge every expired entry; returns the number removed
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let removed = {
            let mut inner = self.inner.write();
            let victims: Vec<String> = inner
                .entries
                .iter()
                .filter(|(_, e)| e.is_expired(now))
                .map(|(k, _)| k.clone())
                .collect();
            for key in &victims {
                inner.entries.remove(key);
            }
            inner.expired_count += victims.len() as u64;
            victims
        };

        if !removed.is_empty() {
            debug!(count = removed.len(), "expired entries purged");
        }
        self.mirror_remove_all(&removed).await;
        removed.len()
    }

    /// Cleanup hook invoked by the host after a high-level operation.
    ///
    /// Returns the number of entries removed.
    pub async fn post_operation_cleanup(&self, kind: OperationKind) -> usize {
        match kind {
            OperationKind::Light => self.purge_expired().await,
            OperationKind::Heavy => {
                let prefixes = self.config.essential_prefixes.clone();
                let removed = self.remove_matching(|key, _, _| {
                    !prefixes.iter().any(|p| key.starts_with(p.as_str()))
                });
                self.mirror_remove_all(&removed).await;
                debug!(count = removed.len(), "non-essential entries purged");
                removed.len()
            }
            OperationKind::Pressure => {
                let floor = self.config.frequency_floor;
                let removed = self.remove_matching(|_, _, freq| freq < floor);
                self.mirror_remove_all(&removed).await;
                debug!(count = removed.len(), "low-frequency entries purged");
                removed.len()
            }
            OperationKind::UserAction => {
                let count = self.inner.read().entries.len();
                self.clear().await;
                count
            }
        }
    }

    /// Re-evaluate adaptive capacity from the current sampling window.
    ///
    /// Called periodically by the maintenance scheduler; resets the window
    /// counters. Returns the capacity in effect afterwards.
    pub async fn sample_adaptive(&self) -> usize {
        let mut inner = self.inner.write();

        let total = inner.window_hits + inner.window_misses;
        let hit_rate = if total == 0 {
            // No traffic this window; leave capacity alone
            inner.window_hits = 0;
            inner.window_misses = 0;
            return inner.capacity;
        } else {
            inner.window_hits as f64 / total as f64
        };
        let utilization = inner.entries.len() as f64 / inner.capacity as f64;

        let previous = inner.capacity;
        if hit_rate > 0.8 && utilization < 0.7 {
            inner.capacity =
                ((inner.capacity as f64 * 1.25) as usize).min(self.config.max_capacity);
        } else if hit_rate < 0.3 || utilization > 0.9 {
            inner.capacity =
                ((inner.capacity as f64 * 0.8) as usize).max(self.config.min_capacity);
        }

        if inner.capacity != previous {
            info!(
                previous,
                capacity = inner.capacity,
                hit_rate,
                utilization,
                "adaptive capacity adjusted"
            );
        }

        inner.window_hits = 0;
        inner.window_misses = 0;
        inner.capacity
    }

    /// Remove entries matching a predicate over (key, entry, frequency)
    fn remove_matching<F>(&self, predicate: F) -> Vec<String>
    where
        F: Fn(&str, &CacheEntry, u64) -> bool,
    {
        let mut inner = self.inner.write();
        let victims: Vec<String> = inner
            .entries
            .iter()
            .filter(|(k, e)| {
                let freq = inner.frequency.get(*k).copied().unwrap_or(0);
                predicate(k, e, freq)
            })
            .map(|(k, _)| k.clone())
            .collect();
        for key in &victims {
            inner.entries.remove(key);
            inner.frequency.remove(key);
        }
        victims
    }

    async fn mirror_remove_all(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.mirror.remove(key).await {
                debug!(key = %key, error = %e, "mirror remove failed");
            }
        }
    }

    /// Remove the lowest-scoring 20% of capacity.
    ///
    /// Score is `frequency*10 + access_count - age_seconds`; the mixed
    /// units are a tuning knob, not an oversight. Ties break in
    /// insertion order.
    fn evict_batch(inner: &mut CacheInner, now_ms: u64) -> Vec<String> {
        let batch = ((inner.capacity as f64 * EVICTION_FRACTION) as usize).max(1);

        let mut scored: Vec<(i64, u64, String)> = inner
            .entries
            .iter()
            .map(|(key, entry)| {
                let frequency = inner.frequency.get(key).copied().unwrap_or(0) as i64;
                let score = frequency * 10 + entry.access_count as i64
                    - entry.age_secs(now_ms) as i64;
                (score, entry.seq, key.clone())
            })
            .collect();
        scored.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let victims: Vec<String> = scored.into_iter().take(batch).map(|(_, _, k)| k).collect();
        for key in &victims {
            inner.entries.remove(key);
        }
        inner.evictions += victims.len() as u64;

        if !victims.is_empty() {
            debug!(count = victims.len(), capacity = inner.capacity, "eviction sweep");
        }
        victims
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::persistence::PersistenceConfig;
    use tempfile::TempDir;

    fn cache_with(config: L1Config) -> (AppCache, Arc<ManualClock>, TempDir) {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::new(1_000_000);
        let mirror = RecordStore::new(PersistenceConfig {
            directory: dir.path().to_path_buf(),
        });
        (AppCache::new(config, mirror, clock.clone()), clock, dir)
    }

    fn small_cache(capacity: usize) -> (AppCache, Arc<ManualClock>, TempDir) {
        cache_with(L1Config {
            initial_capacity: capacity,
            min_capacity: 1,
            max_capacity: 10_000,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let (cache, _clock, _dir) = small_cache(100);

        cache
            .set("palette:warm", b"#ff7f50".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("palette:warm").await, Some(b"#ff7f50".to_vec()));
        assert!(cache.has("palette:warm").await);
    }

    #[tokio::test]
    async fn test_empty_key_and_zero_ttl_rejected() {
        let (cache, _clock, _dir) = small_cache(100);

        assert!(matches!(
            cache.set("", b"x".to_vec(), Duration::from_secs(1)).await,
            Err(CacheError::InvalidArgument(_))
        ));
        assert!(matches!(
            cache.set("k", b"x".to_vec(), Duration::ZERO).await,
            Err(CacheError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_ttl_expiry_purges_entry() {
        let (cache, clock, _dir) = small_cache(100);

        cache
            .set("k", b"v".to_vec(), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(cache.has("k").await);

        clock.advance(5_001);
        assert_eq!(cache.get("k").await, None);

        let stats = cache.stats().await;
        assert_eq!(stats.size, 0);
        assert_eq!(stats.expired_count, 1);
    }

    #[tokio::test]
    async fn test_eviction_bound() {
        let (cache, _clock, _dir) = small_cache(10);

        for i in 0..11 {
            cache
                .set(&format!("key-{i}"), vec![i as u8], Duration::from_secs(60))
                .await
                .unwrap();
        }

        let stats = cache.stats().await;
        assert!(stats.size <= 10, "resident {} > capacity", stats.size);
        assert!(stats.evictions >= 1);
    }

    #[tokio::test]
    async fn test_lower_score_evicted_first() {
        let (cache, _clock, _dir) = small_cache(5);

        for i in 0..5 {
            cache
                .set(&format!("key-{i}"), vec![i as u8], Duration::from_secs(60))
                .await
                .unwrap();
        }
        // Raise the score of every key except key-0
        for i in 1..5 {
            cache.get(&format!("key-{i}")).await;
        }

        // Overflow triggers a sweep of 20% of capacity = 1 entry
        cache
            .set("key-5", vec![5], Duration::from_secs(60))
            .await
            .unwrap();

        assert!(!cache.has("key-0").await, "lowest-scoring entry survived");
        for i in 1..6 {
            assert!(cache.has(&format!("key-{i}")).await, "key-{i} missing");
        }
    }

    #[tokio::test]
    async fn test_eviction_tie_breaks_in_insertion_order() {
        let (cache, _clock, _dir) = small_cache(5);

        // All entries end up with identical scores
        for i in 0..5 {
            cache
                .set(&format!("key-{i}"), vec![i as u8], Duration::from_secs(60))
                .await
                .unwrap();
        }

        cache
            .set("key-5", vec![5], Duration::from_secs(60))
            .await
            .unwrap();

        assert!(!cache.has("key-0").await, "earliest insertion should go first");
        assert!(cache.has("key-1").await);
    }

    #[tokio::test]
    async fn test_delete_idempotent() {
        let (cache, _clock, _dir) = small_cache(100);

        cache
            .set("k", b"v".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        assert!(cache.delete("k").await);
        assert!(!cache.delete("k").await);
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_overwrite_keeps_single_entry() {
        let (cache, _clock, _dir) = small_cache(100);

        cache
            .set("k", b"first".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set("k", b"second".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.get("k").await, Some(b"second".to_vec()));
        assert_eq!(cache.stats().await.size, 1);
    }

    #[tokio::test]
    async fn test_adaptive_capacity_grows_and_shrinks() {
        let (cache, _clock, _dir) = cache_with(L1Config {
            initial_capacity: 100,
            min_capacity: 10,
            max_capacity: 400,
            ..Default::default()
        });

        // High hit rate, low utilization
        cache
            .set("k", b"v".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        for _ in 0..20 {
            cache.get("k").await;
        }
        assert_eq!(cache.sample_adaptive().await, 125);

        // Low hit rate shrinks
        for _ in 0..20 {
            cache.get("missing").await;
        }
        assert_eq!(cache.sample_adaptive().await, 100);
    }

    #[tokio::test]
    async fn test_adaptive_capacity_respects_bounds() {
        let (cache, _clock, _dir) = cache_with(L1Config {
            initial_capacity: 100,
            min_capacity: 90,
            max_capacity: 110,
            ..Default::default()
        });

        cache
            .set("k", b"v".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        for _ in 0..20 {
            cache.get("k").await;
        }
        assert_eq!(cache.sample_adaptive().await, 110);

        for _ in 0..20 {
            cache.get("missing").await;
        }
        assert_eq!(cache.sample_adaptive().await, 90);
        for _ in 0..20 {
            cache.get("missing").await;
        }
        assert_eq!(cache.sample_adaptive().await, 90);
    }

    #[tokio::test]
    async fn test_cleanup_light_purges_expired_only() {
        let (cache, clock, _dir) = small_cache(100);

        cache
            .set("short", b"x".to_vec(), Duration::from_secs(1))
            .await
            .unwrap();
        cache
            .set("long", b"y".to_vec(), Duration::from_secs(600))
            .await
            .unwrap();
        clock.advance(2_000);

        let removed = cache.post_operation_cleanup(OperationKind::Light).await;
        assert_eq!(removed, 1);
        assert!(cache.has("long").await);
    }

    #[tokio::test]
    async fn test_cleanup_heavy_keeps_essential_prefixes() {
        let (cache, _clock, _dir) = cache_with(L1Config {
            essential_prefixes: vec!["palette:".to_string()],
            ..Default::default()
        });

        cache
            .set("palette:warm", b"x".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set("export:png", b"y".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        let removed = cache.post_operation_cleanup(OperationKind::Heavy).await;
        assert_eq!(removed, 1);
        assert!(cache.has("palette:warm").await);
        assert!(!cache.has("export:png").await);
    }

    #[tokio::test]
    async fn test_cleanup_pressure_purges_low_frequency() {
        let (cache, _clock, _dir) = cache_with(L1Config {
            frequency_floor: 2,
            ..Default::default()
        });

        cache
            .set("hot", b"x".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set("cold", b"y".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        cache.get("hot").await;
        cache.get("hot").await;

        let removed = cache.post_operation_cleanup(OperationKind::Pressure).await;
        assert_eq!(removed, 1);
        assert!(cache.has("hot").await);
    }

    #[tokio::test]
    async fn test_cleanup_user_action_resets() {
        let (cache, _clock, _dir) = small_cache(100);

        cache
            .set("a", b"x".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set("b", b"y".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        let removed = cache.post_operation_cleanup(OperationKind::UserAction).await;
        assert_eq!(removed, 2);
        assert_eq!(cache.stats().await.size, 0);
    }

    #[tokio::test]
    async fn test_warm_start_round_trip() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::new(1_000_000);
        let mirror = RecordStore::new(PersistenceConfig {
            directory: dir.path().to_path_buf(),
        });
        mirror.init().await.unwrap();

        let cache = AppCache::new(L1Config::default(), mirror.clone(), clock.clone());
        cache
            .set("palette:warm", b"#ff7f50".to_vec(), Duration::from_secs(600))
            .await
            .unwrap();

        // Fresh instance over the same directory
        let restarted = AppCache::new(L1Config::default(), mirror, clock.clone());
        let loaded = restarted.load_persisted().await.unwrap();
        assert_eq!(loaded, 1);
        assert_eq!(
            restarted.get("palette:warm").await,
            Some(b"#ff7f50".to_vec())
        );
    }

    #[tokio::test]
    async fn test_stats_counters() {
        let (cache, _clock, _dir) = small_cache(100);

        cache
            .set("k", b"v".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        cache.get("k").await;
        cache.get("missing").await;

        let stats = cache.stats().await;
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }
}

//! Versioned store for intercepted responses (L2).
//!
//! Entries are partitioned into namespaces named by the version tag that
//! was active at write time. Only the active namespace is visible to
//! reads; entries under any other tag are logically absent and reclaimed
//! on version rollover.

use super::request::RequestIdentity;
use super::response::ResponseSnapshot;
use super::strategy::Strategy;
use crate::core::clock::Clock;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Stored response with its provenance and accounting metadata
#[derive(Debug, Clone)]
pub struct ResponseEntry {
    pub snapshot: ResponseSnapshot,
    /// Strategy that produced this entry
    pub strategy: Strategy,
    pub cached_at_ms: u64,
    pub size_bytes: u64,
}

#[derive(Default)]
struct Namespace {
    entries: HashMap<RequestIdentity, ResponseEntry>,
    total_bytes: u64,
}

struct StoreInner {
    namespaces: HashMap<String, Namespace>,
    active: String,
}

/// Statistics for the response store
#[derive(Debug, Clone, Serialize)]
pub struct L2Stats {
    pub active_version: String,
    pub namespaces: usize,
    pub entries: usize,
    pub used_bytes: u64,
}

/// Namespaced response store shared by the interceptor and its evictor
#[derive(Clone)]
pub struct ResponseStore {
    inner: Arc<RwLock<StoreInner>>,
    clock: Arc<dyn Clock>,
}

impl ResponseStore {
    pub fn new(version: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner {
                namespaces: HashMap::new(),
                active: version.into(),
            })),
            clock,
        }
    }

    pub fn active_version(&self) -> String {
        self.inner.read().active.clone()
    }

    /// Switch the active version tag; existing namespaces are untouched
    /// until the next activation pass reclaims them.
    pub fn set_active(&self, version: impl Into<String>) {
        self.inner.write().active = version.into();
    }

    /// Look up an entry in the active namespace
    pub fn get(&self, identity: &RequestIdentity) -> Option<ResponseSnapshot> {
        let inner = self.inner.read();
        inner
            .namespaces
            .get(&inner.active)
            .and_then(|ns| ns.entries.get(identity))
            .map(|entry| entry.snapshot.clone())
    }

    /// Insert into the active namespace, overwriting any prior entry
    pub fn insert(&self, identity: RequestIdentity, snapshot: ResponseSnapshot, strategy: Strategy) {
        let size_bytes = snapshot.size_bytes();
        let cached_at_ms = self.clock.now_ms();

        let mut inner = self.inner.write();
        let active = inner.active.clone();
        let ns = inner.namespaces.entry(active).or_default();

        if let Some(previous) = ns.entries.insert(
            identity,
            ResponseEntry {
                snapshot,
                strategy,
                cached_at_ms,
                size_bytes,
            },
        ) {
            ns.total_bytes = ns.total_bytes.saturating_sub(previous.size_bytes);
        }
        ns.total_bytes += size_bytes;
    }

    /// Remove an entry from the active namespace
    pub fn remove(&self, identity: &RequestIdentity) -> bool {
        let mut inner = self.inner.write();
        let active = inner.active.clone();
        let Some(ns) = inner.namespaces.get_mut(&active) else {
            return false;
        };
        match ns.entries.remove(identity) {
            Some(entry) => {
                ns.total_bytes = ns.total_bytes.saturating_sub(entry.size_bytes);
                true
            }
            None => false,
        }
    }

    /// Remove the GET entry for a normalized URL from the active namespace
    pub fn remove_url(&self, url: &str) -> bool {
        match RequestIdentity::get(url) {
            Some(identity) => self.remove(&identity),
            None => false,
        }
    }

    /// Total bytes resident in the active namespace
    pub fn used_bytes(&self) -> u64 {
        let inner = self.inner.read();
        inner
            .namespaces
            .get(&inner.active)
            .map(|ns| ns.total_bytes)
            .unwrap_or(0)
    }

    pub fn entry_count(&self) -> usize {
        let inner = self.inner.read();
        inner
            .namespaces
            .get(&inner.active)
            .map(|ns| ns.entries.len())
            .unwrap_or(0)
    }

    /// All namespace tags currently resident
    pub fn namespaces(&self) -> Vec<String> {
        self.inner.read().namespaces.keys().cloned().collect()
    }

    /// Drop an entire namespace; returns the number of entries reclaimed
    pub fn remove_namespace(&self, tag: &str) -> usize {
        let mut inner = self.inner.write();
        let removed = inner
            .namespaces
            .remove(tag)
            .map(|ns| ns.entries.len())
            .unwrap_or(0);
        if removed > 0 {
            debug!(tag, removed, "namespace dropped");
        }
        removed
    }

    /// Delete active-namespace entries cached before `cutoff_ms`.
    ///
    /// Returns (entries removed, bytes freed).
    pub fn purge_older_than(&self, cutoff_ms: u64) -> (usize, u64) {
        let mut inner = self.inner.write();
        let active = inner.active.clone();
        let Some(ns) = inner.namespaces.get_mut(&active) else {
            return (0, 0);
        };

        let victims: Vec<RequestIdentity> = ns
            .entries
            .iter()
            .filter(|(_, e)| e.cached_at_ms < cutoff_ms)
            .map(|(id, _)| id.clone())
            .collect();

        let mut freed = 0u64;
        for identity in &victims {
            if let Some(entry) = ns.entries.remove(identity) {
                freed += entry.size_bytes;
            }
        }
        ns.total_bytes = ns.total_bytes.saturating_sub(freed);
        (victims.len(), freed)
    }

    /// Delete oldest-cached-first from the active namespace until usage
    /// drops to `target_bytes` or the namespace is empty.
    pub fn evict_oldest_until(&self, target_bytes: u64) -> usize {
        let mut inner = self.inner.write();
        let active = inner.active.clone();
        let Some(ns) = inner.namespaces.get_mut(&active) else {
            return 0;
        };

        let mut by_age: Vec<(u64, RequestIdentity)> = ns
            .entries
            .iter()
            .map(|(id, e)| (e.cached_at_ms, id.clone()))
            .collect();
        by_age.sort_by(|a, b| a.0.cmp(&b.0));

        let mut removed = 0usize;
        for (_, identity) in by_age {
            if ns.total_bytes <= target_bytes {
                break;
            }
            if let Some(entry) = ns.entries.remove(&identity) {
                ns.total_bytes = ns.total_bytes.saturating_sub(entry.size_bytes);
                removed += 1;
            }
        }
        removed
    }

    pub fn stats(&self) -> L2Stats {
        let inner = self.inner.read();
        let active_ns = inner.namespaces.get(&inner.active);
        L2Stats {
            active_version: inner.active.clone(),
            namespaces: inner.namespaces.len(),
            entries: active_ns.map(|ns| ns.entries.len()).unwrap_or(0),
            used_bytes: active_ns.map(|ns| ns.total_bytes).unwrap_or(0),
        }
    }
}

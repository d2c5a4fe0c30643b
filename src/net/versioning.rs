//! Version rollover for the response store.
//!
//! A single version string names the active namespace. Activation drops
//! every namespace carrying a different tag, then deletes the
//! forced-invalidation assets from the *current* namespace so critical
//! bundles are fetched fresh even after a partial rollover.

use super::response_store::ResponseStore;
use crate::core::clock::Clock;
use crate::core::events::{CacheEvent, EventBus};
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of an activation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationReport {
    /// Entries reclaimed from stale namespaces
    pub reclaimed: usize,
    /// Forced-invalidation entries dropped from the current namespace
    pub forced: usize,
}

/// Owns version activation and the invalidation event
#[derive(Clone)]
pub struct VersionManager {
    store: ResponseStore,
    events: EventBus,
    clock: Arc<dyn Clock>,
    /// Fully resolved URLs of critical assets to drop on activation
    forced_invalidation: Vec<String>,
}

impl VersionManager {
    pub fn new(
        store: ResponseStore,
        events: EventBus,
        clock: Arc<dyn Clock>,
        forced_invalidation: Vec<String>,
    ) -> Self {
        Self {
            store,
            events,
            clock,
            forced_invalidation,
        }
    }

    /// Delete every namespace whose tag differs from the active version,
    /// then the forced-invalidation list from the current namespace, and
    /// announce the rollover.
    pub fn activate(&self) -> ActivationReport {
        let current = self.store.active_version();

        let mut reclaimed = 0;
        for tag in self.store.namespaces() {
            if tag != current {
                reclaimed += self.store.remove_namespace(&tag);
            }
        }

        let mut forced = 0;
        for url in &self.forced_invalidation {
            if self.store.remove_url(url) {
                debug!(url = %url, "forced invalidation");
                forced += 1;
            }
        }

        info!(version = %current, reclaimed, forced, "version activated");
        self.events.publish(CacheEvent::CacheUpdated {
            version: current,
            timestamp_ms: self.clock.now_ms(),
        });

        ActivationReport { reclaimed, forced }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::net::request::RequestIdentity;
    use crate::net::response::ResponseSnapshot;
    use crate::net::strategy::Strategy;

    fn insert(store: &ResponseStore, url: &str) {
        store.insert(
            RequestIdentity::get(url).unwrap(),
            ResponseSnapshot::new(200, "text/plain", "x"),
            Strategy::CacheFirst,
        );
    }

    #[tokio::test]
    async fn test_activation_drops_stale_namespaces() {
        let clock = ManualClock::new(5_000);
        let store = ResponseStore::new("v1", clock.clone());
        insert(&store, "https://a/one");
        insert(&store, "https://a/two");

        store.set_active("v2");
        insert(&store, "https://a/three");

        let events = EventBus::new();
        let mut rx = events.subscribe();
        let versioning = VersionManager::new(store.clone(), events, clock, Vec::new());

        let report = versioning.activate();
        assert_eq!(report.reclaimed, 2);
        assert_eq!(store.namespaces(), vec!["v2".to_string()]);
        assert!(store.get(&RequestIdentity::get("https://a/three").unwrap()).is_some());

        assert_eq!(
            rx.recv().await.unwrap(),
            CacheEvent::CacheUpdated {
                version: "v2".to_string(),
                timestamp_ms: 5_000,
            }
        );
    }

    #[tokio::test]
    async fn test_forced_invalidation_hits_current_namespace() {
        let clock = ManualClock::new(0);
        let store = ResponseStore::new("v2", clock.clone());
        insert(&store, "https://a/main.js");
        insert(&store, "https://a/logo.png");

        let versioning = VersionManager::new(
            store.clone(),
            EventBus::new(),
            clock,
            vec!["https://a/main.js".to_string()],
        );

        let report = versioning.activate();
        assert_eq!(report.forced, 1);
        assert!(store.get(&RequestIdentity::get("https://a/main.js").unwrap()).is_none());
        assert!(store.get(&RequestIdentity::get("https://a/logo.png").unwrap()).is_some());
    }
}

//! Request interception and strategy dispatch.
//!
//! The interceptor sits between the application and the network as the
//! sole handler for outbound resource fetches. Every request is
//! classified, resolved against the versioned response store, and always
//! answered: fetch failures resolve to a cached copy, the offline
//! document, or a structured error payload, never to an error.

use super::fetcher::Fetcher;
use super::quota::{QuotaConfig, QuotaManager, QuotaStats};
use super::request::{RequestIdentity, ResourceRequest};
use super::response::{ResponseSnapshot, ServedResponse};
use super::response_store::{L2Stats, ResponseStore};
use super::strategy::{InterceptorConfig, Strategy, classify};
use super::versioning::{ActivationReport, VersionManager};
use crate::core::clock::Clock;
use crate::core::events::{ControlMessage, EventBus};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Network-interception cache service
#[derive(Clone)]
pub struct RequestInterceptor {
    store: ResponseStore,
    quota: QuotaManager,
    versioning: VersionManager,
    fetcher: Arc<dyn Fetcher>,
    config: InterceptorConfig,
}

impl RequestInterceptor {
    /// Install the interceptor over an existing response store.
    ///
    /// The store outlives any single interceptor generation; the version
    /// tag supplied here becomes its active namespace, and entries written
    /// by prior generations stay resident until [`activate`] reclaims
    /// them.
    ///
    /// [`activate`]: RequestInterceptor::activate
    pub fn new(
        config: InterceptorConfig,
        quota_config: QuotaConfig,
        version: impl Into<String>,
        store: ResponseStore,
        fetcher: Arc<dyn Fetcher>,
        events: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let version = version.into();
        info!(version = %version, origin = %config.origin, "installing interceptor");

        store.set_active(version);
        let quota = QuotaManager::new(store.clone(), quota_config, clock.clone());
        let forced = config
            .forced_invalidation
            .iter()
            .map(|entry| config.resolve_url(entry))
            .collect();
        let versioning = VersionManager::new(store.clone(), events, clock, forced);

        Self {
            store,
            quota,
            versioning,
            fetcher,
            config,
        }
    }

    /// Resolve one request. Infallible: every failure path produces a
    /// served response.
    pub async fn handle(&self, request: &ResourceRequest) -> ServedResponse {
        match classify(request, &self.config) {
            Strategy::Passthrough => self.passthrough(request).await,
            Strategy::StaleServing => self.stale_serving(request).await,
            Strategy::NetworkFirst => self.network_first(request).await,
            Strategy::CacheFirst => self.cache_first(request).await,
        }
    }

    /// Pre-populate the store from the static install manifest.
    ///
    /// Individual failures are logged and skipped; returns the number of
    /// entries stored.
    pub async fn precache(&self, manifest: &[String]) -> usize {
        let mut stored = 0;
        for entry in manifest {
            let url = self.config.resolve_url(entry);
            let request = ResourceRequest::get(&url);
            let Some(identity) = RequestIdentity::of(&request) else {
                warn!(url = %url, "unparsable manifest entry skipped");
                continue;
            };
            match self.fetcher.fetch(&request).await {
                Ok(snapshot) if snapshot.is_success() => {
                    self.store_response(identity, snapshot, Strategy::CacheFirst);
                    stored += 1;
                }
                Ok(snapshot) => {
                    warn!(url = %url, status = snapshot.status, "manifest entry not stored");
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "manifest fetch failed");
                }
            }
        }
        info!(stored, total = manifest.len(), "precache complete");
        stored
    }

    /// Handle a host control message
    pub async fn handle_control(&self, message: ControlMessage) {
        match message {
            ControlMessage::SkipWaiting => {
                self.versioning.activate();
            }
            ControlMessage::CacheCleanup => {
                self.quota.enforce();
            }
        }
    }

    /// Run version activation directly (deploy hook)
    pub fn activate(&self) -> ActivationReport {
        self.versioning.activate()
    }

    pub fn active_version(&self) -> String {
        self.store.active_version()
    }

    /// Evictor handle for the maintenance scheduler
    pub fn quota(&self) -> QuotaManager {
        self.quota.clone()
    }

    pub fn stats(&self) -> L2Stats {
        self.store.stats()
    }

    pub fn quota_stats(&self) -> QuotaStats {
        self.quota.stats()
    }

    async fn passthrough(&self, request: &ResourceRequest) -> ServedResponse {
        match self.fetcher.fetch(request).await {
            Ok(snapshot) => ServedResponse::network(snapshot),
            Err(e) => {
                warn!(url = %request.url, error = %e, "passthrough fetch failed");
                ServedResponse::offline_fallback()
            }
        }
    }

    /// Serve any cached copy regardless of freshness; fetch only on miss.
    /// A miss that also fails to fetch resolves to a structured error so
    /// API callers keep receiving machine-readable bodies.
    async fn stale_serving(&self, request: &ResourceRequest) -> ServedResponse {
        let Some(identity) = RequestIdentity::of(request) else {
            return self.passthrough(request).await;
        };

        if let Some(snapshot) = self.store.get(&identity) {
            debug!(url = %request.url, "stale-serving hit");
            return ServedResponse::cached(snapshot);
        }

        match self.fetcher.fetch(request).await {
            Ok(snapshot) => {
                self.store_response(identity, snapshot.clone(), Strategy::StaleServing);
                ServedResponse::network(snapshot)
            }
            Err(e) => {
                warn!(url = %request.url, error = %e, "api fetch failed with no cached copy");
                ServedResponse::api_error(&e.to_string())
            }
        }
    }

    /// Always attempt the network; the cached entry is only a fallback.
    async fn network_first(&self, request: &ResourceRequest) -> ServedResponse {
        let Some(identity) = RequestIdentity::of(request) else {
            return self.passthrough(request).await;
        };

        match self.fetcher.fetch(request).await {
            Ok(snapshot) => {
                self.store_response(identity, snapshot.clone(), Strategy::NetworkFirst);
                ServedResponse::network(snapshot)
            }
            Err(e) => match self.store.get(&identity) {
                Some(snapshot) => {
                    debug!(url = %request.url, error = %e, "network-first falling back to cache");
                    ServedResponse::cached(snapshot)
                }
                None => {
                    warn!(url = %request.url, error = %e, "network-first with no fallback");
                    ServedResponse::offline_fallback()
                }
            },
        }
    }

    async fn cache_first(&self, request: &ResourceRequest) -> ServedResponse {
        let Some(identity) = RequestIdentity::of(request) else {
            return self.passthrough(request).await;
        };

        if let Some(snapshot) = self.store.get(&identity) {
            debug!(url = %request.url, "cache-first hit");
            return ServedResponse::cached(snapshot);
        }

        match self.fetcher.fetch(request).await {
            Ok(snapshot) => {
                self.store_response(identity, snapshot.clone(), Strategy::CacheFirst);
                ServedResponse::network(snapshot)
            }
            Err(e) => {
                warn!(url = %request.url, error = %e, "cache-first miss and fetch failed");
                ServedResponse::offline_fallback()
            }
        }
    }

    /// Store a fetched response, making room first. Error responses are
    /// served but never cached as good copies.
    fn store_response(&self, identity: RequestIdentity, snapshot: ResponseSnapshot, strategy: Strategy) {
        if !snapshot.is_success() {
            debug!(url = %identity.url, status = snapshot.status, "non-success response not stored");
            return;
        }
        self.quota.ensure_capacity(snapshot.size_bytes());
        self.store.insert(identity, snapshot, strategy);
    }
}

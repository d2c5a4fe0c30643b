//! Maintenance scheduler.
//!
//! Owns the periodic sweeps (TTL purge, adaptive-capacity sampling,
//! quota enforcement) as explicit tasks started and stopped
//! deterministically, instead of timers scattered through the tiers.
//! Sweeps never run concurrently with each other for the same component:
//! each is a discrete task that takes the component's own lock.

use crate::core::AppCache;
use crate::net::QuotaManager;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Sweep intervals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    pub ttl_sweep_interval_ms: u64,
    pub adaptive_sample_interval_ms: u64,
    pub quota_interval_ms: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            ttl_sweep_interval_ms: 1_000,
            adaptive_sample_interval_ms: 30_000,
            quota_interval_ms: 60_000,
        }
    }
}

/// Handle owning the background sweep tasks
pub struct MaintenanceScheduler {
    handles: Vec<JoinHandle<()>>,
}

impl MaintenanceScheduler {
    /// Spawn the sweep tasks for the given components
    pub fn start(cache: AppCache, quota: QuotaManager, config: MaintenanceConfig) -> Self {
        info!(
            ttl_ms = config.ttl_sweep_interval_ms,
            adaptive_ms = config.adaptive_sample_interval_ms,
            quota_ms = config.quota_interval_ms,
            "starting maintenance scheduler"
        );

        let ttl_cache = cache.clone();
        let ttl_handle = tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_millis(config.ttl_sweep_interval_ms));
            loop {
                interval.tick().await;
                let removed = ttl_cache.purge_expired().await;
                if removed > 0 {
                    debug!(removed, "ttl sweep");
                }
            }
        });

        let adaptive_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(
                config.adaptive_sample_interval_ms,
            ));
            loop {
                interval.tick().await;
                cache.sample_adaptive().await;
            }
        });

        let quota_handle = tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_millis(config.quota_interval_ms));
            loop {
                interval.tick().await;
                quota.enforce();
            }
        });

        Self {
            handles: vec![ttl_handle, adaptive_handle, quota_handle],
        }
    }

    /// Stop every sweep task. Idempotent.
    pub fn stop(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        info!("maintenance scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        !self.handles.is_empty()
    }
}

impl Drop for MaintenanceScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

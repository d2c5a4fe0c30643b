//! Two-tier caching layer for Chroma Studio.
//!
//! - **L1** ([`AppCache`]): in-process TTL store with adaptive capacity and
//!   scored eviction, warm-started from a best-effort persistence mirror.
//! - **L2** ([`RequestInterceptor`]): classifies every outbound resource
//!   request and resolves it against a versioned response store under one
//!   of four strategies, with quota enforcement and versioned
//!   invalidation on deploy.
//!
//! The tiers share no locks; coordination happens over the typed
//! [`EventBus`]. Both take an injectable [`Clock`] so expiry and quota
//! behavior are deterministic under test.

pub mod config;
pub mod core;
pub mod maintenance;
pub mod net;
pub mod persistence;

// Re-export commonly used types
pub use config::CacheConfig;
pub use core::{
    AppCache, CacheError, CacheEvent, Clock, ControlMessage, EventBus, L1Config, L1Stats,
    ManualClock, OperationKind, Result, SystemClock,
};
pub use maintenance::{MaintenanceConfig, MaintenanceScheduler};
pub use net::{
    FetchError, Fetcher, HttpFetcher, InterceptorConfig, MockFetcher, QuotaConfig, QuotaManager,
    QuotaStats, RequestIdentity, RequestInterceptor, ResourceRequest, ResponseSnapshot,
    ServeSource, ServedResponse, Strategy,
};
pub use persistence::{PersistenceConfig, PersistenceError, RecordStore};

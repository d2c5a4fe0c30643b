//! Network-interception cache tier (L2).

pub mod fetcher;
pub mod interceptor;
pub mod quota;
pub mod request;
pub mod response;
pub mod response_store;
pub mod strategy;
pub mod versioning;

pub use fetcher::{FetchError, FetchResult, Fetcher, HttpFetcher, MockFetcher};
pub use interceptor::RequestInterceptor;
pub use quota::{QuotaConfig, QuotaManager, QuotaStats};
pub use request::{RequestIdentity, ResourceRequest};
pub use response::{ResponseSnapshot, ServeSource, ServedResponse};
pub use response_store::{L2Stats, ResponseEntry, ResponseStore};
pub use strategy::{InterceptorConfig, Strategy, classify};
pub use versioning::{ActivationReport, VersionManager};

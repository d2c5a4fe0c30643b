//! Network seam for the interceptor.
//!
//! Strategies talk to the network only through [`Fetcher`], so tests can
//! swap in a scripted double and count fetches instead of opening sockets.

use super::request::ResourceRequest;
use super::response::ResponseSnapshot;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Fetch failure; timeouts follow the same fallback chain as any other
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub type FetchResult = std::result::Result<ResponseSnapshot, FetchError>;

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &ResourceRequest) -> FetchResult;
}

/// Headers worth replaying from a cached snapshot
const REPLAYED_HEADERS: [&str; 2] = ["cache-control", "etag"];

/// Production fetcher over a shared reqwest client
pub struct HttpFetcher {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl HttpFetcher {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            default_timeout,
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &ResourceRequest) -> FetchResult {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;

        let response = self
            .client
            .request(method, &request.url)
            .timeout(request.timeout.unwrap_or(self.default_timeout))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let headers: Vec<(String, String)> = REPLAYED_HEADERS
            .iter()
            .filter_map(|name| {
                let value = response.headers().get(*name)?.to_str().ok()?;
                Some((name.to_string(), value.to_string()))
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(ResponseSnapshot {
            status,
            content_type,
            headers,
            body,
        })
    }
}

/// Scriptable fetcher double for host and crate tests.
///
/// Responses are keyed by exact request URL; unknown URLs resolve to a
/// 404. The offline switch turns every fetch into a network error.
#[derive(Clone, Default)]
pub struct MockFetcher {
    responses: Arc<RwLock<HashMap<String, ResponseSnapshot>>>,
    offline: Arc<AtomicBool>,
    calls: Arc<AtomicU64>,
    calls_per_url: Arc<RwLock<HashMap<String, u64>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the response for a URL
    pub fn set_response(&self, url: impl Into<String>, snapshot: ResponseSnapshot) {
        self.responses.write().insert(url.into(), snapshot);
    }

    /// Convenience: script a 200 response with the given body
    pub fn set_body(&self, url: impl Into<String>, content_type: &str, body: &'static [u8]) {
        self.set_response(
            url,
            ResponseSnapshot::new(200, content_type, Bytes::from_static(body)),
        );
    }

    /// Toggle simulated network unreachability
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Total fetches attempted, including failed ones
    pub fn fetch_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fetch_count_for(&self, url: &str) -> u64 {
        self.calls_per_url.read().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &ResourceRequest) -> FetchResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .calls_per_url
            .write()
            .entry(request.url.clone())
            .or_insert(0) += 1;

        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Network("offline".to_string()));
        }

        match self.responses.read().get(&request.url) {
            Some(snapshot) => Ok(snapshot.clone()),
            None => Ok(ResponseSnapshot::new(404, "text/plain", "not found")),
        }
    }
}

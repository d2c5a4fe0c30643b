//! Request classification and the closed strategy set.
//!
//! Classification is a fixed rule chain evaluated in order; its result is
//! one of four strategies, matched exhaustively by the interceptor.

use super::request::ResourceRequest;
use serde::{Deserialize, Serialize};
use url::Url;

/// How a request is resolved against the cache
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Serve cached copy if present, otherwise fetch, store and serve
    CacheFirst,
    /// Always attempt a cache-bypassing fetch; cache is the fallback
    NetworkFirst,
    /// Serve any cached copy regardless of freshness; fetch only on miss
    StaleServing,
    /// Never touches the cache
    Passthrough,
}

/// Interceptor configuration: origin, rule inputs, install manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterceptorConfig {
    /// Origin of the host page, e.g. `https://app.chroma.studio`
    pub origin: String,
    /// Same-origin path prefixes treated as dynamic/API traffic
    pub api_prefixes: Vec<String>,
    /// Same-origin paths always treated as versioned bundles
    pub bundle_paths: Vec<String>,
    /// Extensions recognized as static assets
    pub static_extensions: Vec<String>,
    /// Cross-origin hosts allowed into the cache
    pub allowed_cross_origin_hosts: Vec<String>,
    /// URLs (or same-origin paths) pre-populated at install time
    pub precache_manifest: Vec<String>,
    /// Critical assets deleted from the current namespace on activation
    pub forced_invalidation: Vec<String>,
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self {
            origin: "https://app.chroma.studio".to_string(),
            api_prefixes: vec!["/api/".to_string()],
            bundle_paths: vec!["/main.js".to_string(), "/styles.css".to_string()],
            static_extensions: [
                "png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "woff", "woff2", "ttf", "otf",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            allowed_cross_origin_hosts: vec![
                "fonts.googleapis.com".to_string(),
                "fonts.gstatic.com".to_string(),
            ],
            precache_manifest: vec![
                "/".to_string(),
                "/main.js".to_string(),
                "/styles.css".to_string(),
            ],
            forced_invalidation: vec!["/main.js".to_string()],
        }
    }
}

impl InterceptorConfig {
    /// Resolve a manifest entry or invalidation target against the origin
    pub fn resolve_url(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with('/') {
            format!("{}{}", self.origin.trim_end_matches('/'), path_or_url)
        } else {
            path_or_url.to_string()
        }
    }

    fn is_same_origin(&self, url: &Url) -> bool {
        match Url::parse(&self.origin) {
            Ok(origin) => {
                origin.scheme() == url.scheme()
                    && origin.host_str() == url.host_str()
                    && origin.port_or_known_default() == url.port_or_known_default()
            }
            Err(_) => false,
        }
    }

    fn is_versioned_bundle(&self, url: &Url) -> bool {
        let path = url.path();
        if self.bundle_paths.iter().any(|p| p == path) {
            return true;
        }
        let script_or_style = path.ends_with(".js") || path.ends_with(".css");
        script_or_style && url.query_pairs().any(|(k, _)| k == "v")
    }

    fn is_static_asset(&self, path: &str) -> bool {
        match path.rsplit_once('.') {
            Some((_, ext)) => self.static_extensions.iter().any(|e| e == ext),
            None => false,
        }
    }

    fn is_allowed_host(&self, url: &Url) -> bool {
        url.host_str()
            .is_some_and(|host| self.allowed_cross_origin_hosts.iter().any(|h| h == host))
    }
}

/// Classify a request into its caching strategy.
///
/// Rules, first match wins:
/// 1. non-GET or non-http(s) scheme: passthrough
/// 2. same-origin API path: stale-serving
/// 3. same-origin versioned script/style bundle: strict network-first
/// 4. static asset extension or allow-listed cross-origin host: cache-first
/// 5. anything else: cache-first (default dynamic handling)
pub fn classify(request: &ResourceRequest, config: &InterceptorConfig) -> Strategy {
    if request.method != "GET" {
        return Strategy::Passthrough;
    }
    let url = match Url::parse(&request.url) {
        Ok(url) => url,
        Err(_) => return Strategy::Passthrough,
    };
    if !matches!(url.scheme(), "http" | "https") {
        return Strategy::Passthrough;
    }

    let same_origin = config.is_same_origin(&url);
    let path = url.path().to_string();

    if same_origin && config.api_prefixes.iter().any(|p| path.starts_with(p)) {
        return Strategy::StaleServing;
    }
    if same_origin && config.is_versioned_bundle(&url) {
        return Strategy::NetworkFirst;
    }
    if config.is_static_asset(&path) || (!same_origin && config.is_allowed_host(&url)) {
        return Strategy::CacheFirst;
    }
    Strategy::CacheFirst
}

use bytes::Bytes;
use serde_json::json;

/// Snapshot of a fetched response, as stored and served by the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub content_type: Option<String>,
    /// Subset of headers worth replaying (cache-control, etag)
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ResponseSnapshot {
    pub fn new(status: u16, content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: Some(content_type.into()),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Whether this response is storeable (non-error)
    pub fn is_success(&self) -> bool {
        self.status < 400
    }

    /// Approximate resident size in bytes
    pub fn size_bytes(&self) -> u64 {
        let headers: usize = self
            .headers
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum();
        (self.body.len() + headers) as u64
    }

    /// Generic offline fallback document
    pub fn offline_document() -> Self {
        Self::new(
            503,
            "text/html; charset=utf-8",
            Bytes::from_static(OFFLINE_DOCUMENT.as_bytes()),
        )
    }

    /// Structured error payload for API paths, kept machine-readable
    pub fn api_error(message: &str) -> Self {
        let body = json!({
            "error": message,
            "offline": true,
            "code": 503,
        });
        Self::new(503, "application/json", body.to_string())
    }
}

/// Where a served response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeSource {
    Network,
    Cache,
    OfflineFallback,
    ErrorPayload,
}

/// Response handed back to the caller; produced under all failure modes
#[derive(Debug, Clone)]
pub struct ServedResponse {
    pub snapshot: ResponseSnapshot,
    pub source: ServeSource,
}

impl ServedResponse {
    pub fn network(snapshot: ResponseSnapshot) -> Self {
        Self {
            snapshot,
            source: ServeSource::Network,
        }
    }

    pub fn cached(snapshot: ResponseSnapshot) -> Self {
        Self {
            snapshot,
            source: ServeSource::Cache,
        }
    }

    pub fn offline_fallback() -> Self {
        Self {
            snapshot: ResponseSnapshot::offline_document(),
            source: ServeSource::OfflineFallback,
        }
    }

    pub fn api_error(message: &str) -> Self {
        Self {
            snapshot: ResponseSnapshot::api_error(message),
            source: ServeSource::ErrorPayload,
        }
    }
}

const OFFLINE_DOCUMENT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Chroma Studio - offline</title></head>
<body>
<h1>You are offline</h1>
<p>Chroma Studio could not reach the network and no cached copy of this
resource is available. Your palettes are safe; reconnect and try again.</p>
</body>
</html>
"#;

use std::time::Duration;
use url::Url;

/// Outbound resource request as seen by the interceptor
#[derive(Debug, Clone)]
pub struct ResourceRequest {
    /// Uppercase HTTP method
    pub method: String,
    /// Raw request URL
    pub url: String,
    /// Caller-supplied fetch timeout; a timeout is a fetch failure
    pub timeout: Option<Duration>,
}

impl ResourceRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            timeout: None,
        }
    }

    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into().to_uppercase(),
            url: url.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Cache identity of a request: method plus normalized URL.
///
/// Normalization strips the fragment and elides default ports, so
/// `https://host:443/a#x` and `https://host/a` share an identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestIdentity {
    pub method: String,
    pub url: String,
}

impl RequestIdentity {
    /// Build the identity for a request; `None` if the URL does not parse
    pub fn of(request: &ResourceRequest) -> Option<Self> {
        let mut parsed = Url::parse(&request.url).ok()?;
        parsed.set_fragment(None);
        Some(Self {
            method: request.method.to_uppercase(),
            url: parsed.to_string(),
        })
    }

    /// Identity for a GET of the given URL, as stored by the interceptor
    pub fn get(url: &str) -> Option<Self> {
        Self::of(&ResourceRequest::get(url))
    }
}

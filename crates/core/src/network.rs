//! Transport seam between the cache manager and the network.
//!
//! The manager never talks HTTP itself: populate fetches and cache-miss
//! fallbacks both go through a [`Fetcher`], so hosts can plug in a real
//! client and tests can count calls.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;

use crate::Error;

/// An intercepted outgoing request for one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Resource as forwarded to the network, path and query untouched.
    pub resource: String,
    /// Store lookup key, when it differs from `resource` (see [`Request::cache_key`]).
    pub key: Option<String>,
    /// Upper-case HTTP method.
    pub method: String,
    /// Ask the transport to bypass any intermediate HTTP cache.
    pub reload: bool,
    pub body: Option<Bytes>,
}

impl Request {
    pub fn new(method: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            key: None,
            method: method.into().to_ascii_uppercase(),
            reload: false,
            body: None,
        }
    }

    pub fn get(resource: impl Into<String>) -> Self {
        Self::new("GET", resource)
    }

    /// Look the request up in the store under `key` instead of `resource`.
    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Manifest identifier used for store lookups.
    pub fn cache_key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.resource)
    }

    pub fn with_reload(mut self) -> Self {
        self.reload = true;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Only GET requests are ever answered from the store.
    pub fn is_cacheable(&self) -> bool {
        self.method == "GET"
    }
}

/// A response, either fresh from the network or replayed from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub resource: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl Response {
    pub fn new(resource: impl Into<String>, status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            resource: resource.into(),
            status,
            content_type: None,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network access used for populate and cache-miss fallback.
///
/// Implementations return every HTTP status as a `Response`; only transport
/// failures (connect, timeout, oversized body) are errors.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

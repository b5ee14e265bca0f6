//! HTTP network fetcher for the offline cache manager.
//!
//! ### Resource resolution
//! - Identifiers resolve against the configured origin (`/` is the origin)
//! - Absolute http(s) identifiers are fetched as-is
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)
//! - Request timeout: 20s (configurable)
//!
//! ### Responses
//! - Every HTTP status is returned as a `Response`, unmodified
//! - Only transport failures and oversized bodies are errors
//! - `reload` requests carry `Cache-Control: no-cache` to skip HTTP caches

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method, header};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

pub use url::{UrlError, canonicalize_origin, request_path, resolve, resource_key};

use offcache_core::{AppConfig, Error, Fetcher, Request, Response};

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "offcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "offcache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Self::default()
        }
    }
}

/// reqwest-backed [`Fetcher`] bound to one origin.
pub struct HttpFetcher {
    http: Client,
    origin: reqwest::Url,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a fetcher for `origin` with the given configuration.
    pub fn new(origin: &str, config: FetchConfig) -> Result<Self, Error> {
        let origin = canonicalize_origin(origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, origin, config })
    }

    /// Build a fetcher from application configuration.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        Self::new(&config.origin, FetchConfig::from(config))
    }

    /// Map an intercepted URL or path to its manifest identifier.
    pub fn resource_key(&self, raw: &str) -> Result<String, Error> {
        resource_key(&self.origin, raw).map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    /// Origin-relative form of an intercepted URL, forwarded to the network as-is.
    pub fn request_path(&self, raw: &str) -> Result<String, Error> {
        request_path(&self.origin, raw).map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    pub fn origin(&self) -> &reqwest::Url {
        &self.origin
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn too_large(&self, len: usize) -> Error {
        Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let url = resolve(&self.origin, &request.resource).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {}", request.method, e)))?;

        let mut builder = self.http.request(method, url.as_str());
        if request.reload {
            builder = builder
                .header(header::CACHE_CONTROL, "no-cache")
                .header(header::PRAGMA, "no-cache");
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::HttpError(format!("timeout fetching {}", url))
            } else {
                Error::HttpError(format!("network error: {}", e))
            }
        })?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(self.too_large(len as usize));
        }

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();
        let content_type = headers.get(header::CONTENT_TYPE.as_str()).cloned();

        let body: Bytes = response
            .bytes()
            .await
            .map_err(|e| Error::HttpError(format!("failed to read response: {}", e)))?;

        if body.len() > self.config.max_bytes {
            return Err(self.too_large(body.len()));
        }

        tracing::debug!(
            "fetched {} -> {} ({}) in {}ms ({} bytes)",
            url,
            final_url,
            status,
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(Response { resource: request.resource.clone(), status, content_type, headers, body })
    }
}

//! cache_request tool implementation.
//!
//! Answers an intercepted request cache-first, falling back to the network.

use offcache_core::{Error, Fetcher, OfflineCacheManager, Request};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::json_result;

/// Parameters for the cache_request tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheRequestParams {
    /// Intercepted URL, or a path relative to the origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET is answered from the store.
    #[serde(default)]
    pub method: Option<String>,

    /// Request body, forwarded as-is for non-GET requests.
    #[serde(default)]
    pub body: Option<String>,
}

/// Output from the cache_request tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheRequestOutput {
    /// Manifest identifier the URL mapped to.
    pub resource: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: BTreeMap<String, String>,
    /// Body length in bytes.
    pub body_bytes: usize,
    /// Body as text, when it is valid UTF-8.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_text: Option<String>,
}

/// Implementation of the cache_request tool.
pub async fn request_impl<F: Fetcher + 'static>(
    manager: &OfflineCacheManager<F>, origin: &url::Url, params: CacheRequestParams,
) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let invalid = |e: offcache_client::UrlError| Error::InvalidUrl(e.to_string());
    let key = offcache_client::resource_key(origin, &params.url).map_err(invalid)?;
    let forwarded = offcache_client::request_path(origin, &params.url).map_err(invalid)?;
    let mut request = Request::new(params.method.as_deref().unwrap_or("GET"), forwarded).with_cache_key(key);
    if let Some(body) = params.body {
        request = request.with_body(body);
    }

    let response = manager.handle_request(&request).await?;

    let output = CacheRequestOutput {
        resource: request.cache_key().to_string(),
        status: response.status,
        content_type: response.content_type,
        headers: response.headers,
        body_bytes: response.body.len(),
        body_text: std::str::from_utf8(&response.body).ok().map(str::to_string),
    };
    json_result(&output)
}

//! MCP tool implementations.
//!
//! Each tool is one event delivered by the host: `cache_activate` is the
//! "new version becoming active" event, `cache_request` an intercepted
//! request. The `cache_*` inspection tools live under [`cache`].

pub mod activate;
pub mod cache;
pub mod request;

pub use activate::{CacheActivateParams, activate_impl};
pub use request::{CacheRequestParams, request_impl};

use rmcp::{ErrorData as McpError, model::*};
use serde::Serialize;

/// Render a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| McpError::internal_error(format!("Failed to serialize output: {e}"), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

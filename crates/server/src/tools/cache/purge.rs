//! cache_purge tool implementation.
//!
//! Destroys every cache store; requests use the network until the next activation.

use offcache_core::{Fetcher, OfflineCacheManager};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of stores deleted.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl<F: Fetcher + 'static>(manager: &OfflineCacheManager<F>) -> Result<CallToolResult, McpError> {
    let deleted = manager.purge().await?;
    json_result(&CachePurgeOutput { deleted })
}

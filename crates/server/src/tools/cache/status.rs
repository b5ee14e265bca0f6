//! cache_status tool implementation.
//!
//! Reports readiness, request counters and the stores on disk.

use chrono::Utc;
use offcache_core::{Fetcher, ManagerStats, OfflineCacheManager, StoreState};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Output from the cache_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatusOutput {
    pub cache_name: String,
    pub state: StoreState,
    pub stats: ManagerStats,
    /// Every store currently in the database.
    pub stores: Vec<String>,
    /// ISO8601 timestamp of this report.
    pub checked_at: String,
}

/// Implementation of the cache_status tool.
pub async fn status_impl<F: Fetcher + 'static>(manager: &OfflineCacheManager<F>) -> Result<CallToolResult, McpError> {
    let output = CacheStatusOutput {
        cache_name: manager.cache_name().to_string(),
        state: manager.state().await,
        stats: manager.stats(),
        stores: manager.db().store_names().await?,
        checked_at: Utc::now().to_rfc3339(),
    };

    json_result(&output)
}

//! cache_keys tool implementation.
//!
//! Lists the resources held by the managed store.

use offcache_core::{Fetcher, OfflineCacheManager, StoreInfo};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    /// Store metadata; absent when no store exists.
    pub store: Option<StoreInfo>,
    /// Resource identifiers held by the store, sorted.
    pub keys: Vec<String>,
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl<F: Fetcher + 'static>(manager: &OfflineCacheManager<F>) -> Result<CallToolResult, McpError> {
    let db = manager.db();
    let store = db.store_info(manager.cache_name()).await?;
    let keys = match &store {
        Some(info) => db.entry_keys(&info.name).await?,
        None => Vec::new(),
    };

    json_result(&CacheKeysOutput { store, keys })
}

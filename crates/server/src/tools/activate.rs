//! cache_activate tool implementation.
//!
//! Replaces the managed store with a freshly populated copy of the manifest.

use std::path::Path;

use offcache_core::{Fetcher, OfflineCacheManager, ResourceManifest};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the cache_activate tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheActivateParams {
    /// Inline manifest mapping resource identifiers to fingerprints.
    /// When omitted, the configured manifest file is read again.
    #[serde(default)]
    pub manifest: Option<ResourceManifest>,
}

/// Implementation of the cache_activate tool.
pub async fn activate_impl<F: Fetcher + 'static>(
    manager: &OfflineCacheManager<F>, manifest_path: &Path, params: CacheActivateParams,
) -> Result<CallToolResult, McpError> {
    let manifest = match params.manifest {
        Some(manifest) => manifest,
        None => ResourceManifest::load(manifest_path)?,
    };

    let report = manager.activate(&manifest).await?;
    json_result(&report)
}

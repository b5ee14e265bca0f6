//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::cache::{keys_impl, purge_impl, status_impl};
use crate::tools::{CacheActivateParams, CacheRequestParams, activate_impl, request_impl};

use offcache_client::HttpFetcher;
use offcache_core::{AppConfig, OfflineCacheManager};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for offcache.
#[derive(Clone)]
pub struct OffcacheServer {
    tool_router: ToolRouter<Self>,
    manager: Arc<OfflineCacheManager<HttpFetcher>>,
    fetcher: Arc<HttpFetcher>,
    config: Arc<AppConfig>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl OffcacheServer {
    /// Create a new server handler around a ready-to-use manager.
    pub fn new(manager: Arc<OfflineCacheManager<HttpFetcher>>, fetcher: Arc<HttpFetcher>, config: AppConfig) -> Self {
        Self { tool_router: Self::tool_router(), manager, fetcher, config: Arc::new(config) }
    }

    /// Activate a new deployment generation.
    ///
    /// Deletes every cache store, then fetches and stores every manifest resource.
    #[tool(description = "Activate a deployment: delete all cache stores, then fetch and store every manifest \
                          resource. Fails as a whole if any resource cannot be fetched.")]
    async fn cache_activate(&self, params: Parameters<CacheActivateParams>) -> Result<CallToolResult, McpError> {
        activate_impl(&self.manager, &self.config.manifest_path, params.0).await
    }

    /// Handle an intercepted request, cache-first.
    #[tool(description = "Answer a resource request from the offline cache, falling back to the network on a miss.")]
    async fn cache_request(&self, params: Parameters<CacheRequestParams>) -> Result<CallToolResult, McpError> {
        request_impl(&self.manager, self.fetcher.origin(), params.0).await
    }

    #[tool(description = "List the resources held by the offline cache store.")]
    async fn cache_keys(&self) -> Result<CallToolResult, McpError> {
        keys_impl(&self.manager).await
    }

    #[tool(description = "Report offline cache readiness, request counters and stores.")]
    async fn cache_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.manager).await
    }

    #[tool(description = "Delete every offline cache store. Requests use the network until the next activation.")]
    async fn cache_purge(&self) -> Result<CallToolResult, McpError> {
        purge_impl(&self.manager).await
    }
}

impl ServerHandler for OffcacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "offcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tool_router_lists_lifecycle_tools() {
        let config = AppConfig::default();
        let db = offcache_core::CacheDb::open_in_memory().await.unwrap();
        let fetcher = Arc::new(HttpFetcher::from_app_config(&config).unwrap());
        let manager = Arc::new(OfflineCacheManager::new(db, fetcher.clone(), config.cache_name.clone()));
        let server = OffcacheServer::new(manager, fetcher, config);

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["cache_activate", "cache_keys", "cache_purge", "cache_request", "cache_status"]);
    }
}

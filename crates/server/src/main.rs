//! offcache server entry point.
//!
//! Boots the offline cache manager, runs the startup activation, then serves
//! the lifecycle events as MCP tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use offcache_client::HttpFetcher;
use offcache_core::{AppConfig, CacheDb, OfflineCacheManager, ResourceManifest};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        cache = %config.cache_name,
        origin = %config.origin,
        db_path = %config.db_path.display(),
        "Starting offcache server on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let fetcher = Arc::new(HttpFetcher::from_app_config(&config)?);
    let manager = Arc::new(
        OfflineCacheManager::new(db, fetcher.clone(), config.cache_name.clone())
            .with_max_concurrency(config.max_concurrency),
    );

    startup_activation(&manager, &config).await;

    let handler = handler::OffcacheServer::new(manager, fetcher, config);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}

/// Bring the store up for this deployment before serving requests.
///
/// Failures are logged, not fatal: without a ready store every request is
/// answered from the network until `cache_activate` succeeds.
async fn startup_activation(manager: &OfflineCacheManager<HttpFetcher>, config: &AppConfig) {
    let manifest = match ResourceManifest::load(&config.manifest_path) {
        Ok(manifest) => manifest,
        Err(e) => {
            tracing::warn!(error = %e, "no usable manifest at startup; serving from network");
            return;
        }
    };

    if !config.activate_on_start {
        match manager.restore(&manifest).await {
            Ok(Some(_)) => return,
            Ok(None) => tracing::info!("no persisted store for this manifest; activating"),
            Err(e) => tracing::warn!(error = %e, "restore failed; activating"),
        }
    }

    if let Err(e) = manager.activate(&manifest).await {
        tracing::warn!(error = %e, "startup activation failed; serving from network");
    }
}

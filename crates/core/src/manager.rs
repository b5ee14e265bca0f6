//! Offline cache manager.
//!
//! Keeps one named store consistent with the current [`ResourceManifest`]
//! and answers requests cache-first with network fallback.
//!
//! ### Activation
//! - Delete every store in the database (no reuse of old entries).
//! - Create a fresh store under the fixed cache name.
//! - Fetch and store every manifest resource concurrently; the first failure
//!   aborts the batch, removes the partial store and fails the activation.
//! - Only after every entry is stored is the store flagged ready.
//!
//! ### Requests
//! - GET requests for a resource held by the ready store are replayed without
//!   touching the network.
//! - Everything else (misses, non-GET, no ready store) goes to the network
//!   unmodified. Network failures propagate to the caller.
//!
//! Request handling only takes the readiness gate for the instant needed to
//! read it, so it never waits on an activation in progress.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock, Semaphore};
use tokio::task::JoinSet;

use crate::Error;
use crate::cache::{CacheDb, StoredEntry};
use crate::manifest::ResourceManifest;
use crate::network::{Fetcher, Request, Response};

/// Default cap on populate fetches in flight.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Readiness of the managed store, as seen by request handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StoreState {
    /// No activation has run yet.
    Absent,
    /// Old stores are gone and the new one is being filled.
    Populating { generation: u64 },
    Ready(ActivationReport),
    /// The last activation failed; no store is served.
    Failed { generation: u64, reason: String },
}

impl StoreState {
    pub fn is_ready(&self) -> bool {
        matches!(self, StoreState::Ready(_))
    }
}

/// Outcome of a completed activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ActivationReport {
    pub cache_name: String,
    pub generation: u64,
    pub manifest_digest: String,
    pub entries: u64,
    /// Stores removed before populating; zero when restored.
    pub stores_deleted: u64,
}

/// Request counters since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ManagerStats {
    pub hits: u64,
    pub misses: u64,
    pub bypassed: u64,
    pub network_failures: u64,
    pub activations: u64,
    pub failed_activations: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    bypassed: AtomicU64,
    network_failures: AtomicU64,
    activations: AtomicU64,
    failed_activations: AtomicU64,
}

/// Cache-first request handler backed by one replaceable named store.
pub struct OfflineCacheManager<F> {
    db: CacheDb,
    fetcher: Arc<F>,
    cache_name: String,
    max_concurrency: usize,
    state: RwLock<StoreState>,
    activation: Mutex<()>,
    generation: AtomicU64,
    counters: Counters,
}

impl<F> OfflineCacheManager<F>
where
    F: Fetcher + 'static,
{
    pub fn new(db: CacheDb, fetcher: Arc<F>, cache_name: impl Into<String>) -> Self {
        Self {
            db,
            fetcher,
            cache_name: cache_name.into(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            state: RwLock::new(StoreState::Absent),
            activation: Mutex::new(()),
            generation: AtomicU64::new(0),
            counters: Counters::default(),
        }
    }

    /// Cap populate fetches in flight. Zero is treated as one.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub async fn state(&self) -> StoreState {
        self.state.read().await.clone()
    }

    pub fn stats(&self) -> ManagerStats {
        let c = &self.counters;
        ManagerStats {
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            bypassed: c.bypassed.load(Ordering::Relaxed),
            network_failures: c.network_failures.load(Ordering::Relaxed),
            activations: c.activations.load(Ordering::Relaxed),
            failed_activations: c.failed_activations.load(Ordering::Relaxed),
        }
    }

    /// Replace every cached resource with a fresh copy of `manifest`.
    ///
    /// Concurrent calls are serialized. Each call runs to completion.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidManifest` if the manifest fails validation; stores are
    ///   left untouched in that case.
    /// - `Error::ManifestFetchFailure` if any resource fails to fetch, answers
    ///   with a non-2xx status, or cannot be stored.
    /// - `Error::Database` / `Error::TaskFailed` for store or runtime failures.
    pub async fn activate(&self, manifest: &ResourceManifest) -> Result<ActivationReport, Error> {
        manifest.validate()?;

        let _activation = self.activation.lock().await;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        // Close the gate before anything is deleted so readers go to the network.
        *self.state.write().await = StoreState::Populating { generation };

        match self.replace_store(manifest, generation).await {
            Ok(report) => {
                self.counters.activations.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    cache = %report.cache_name,
                    generation,
                    entries = report.entries,
                    stores_deleted = report.stores_deleted,
                    "cache activated"
                );
                *self.state.write().await = StoreState::Ready(report.clone());
                Ok(report)
            }
            Err(err) => {
                self.counters.failed_activations.fetch_add(1, Ordering::Relaxed);
                if let Err(cleanup) = self.db.delete_store(&self.cache_name).await {
                    tracing::warn!(cache = %self.cache_name, error = %cleanup, "failed to drop partial store");
                }
                tracing::warn!(cache = %self.cache_name, generation, error = %err, "cache activation failed");
                *self.state.write().await = StoreState::Failed { generation, reason: err.to_string() };
                Err(err)
            }
        }
    }

    async fn replace_store(&self, manifest: &ResourceManifest, generation: u64) -> Result<ActivationReport, Error> {
        let stores_deleted = self.db.delete_all_stores().await?;
        tracing::debug!(stores_deleted, "deleted previous cache stores");

        let manifest_digest = manifest.digest();
        self.db.create_store(&self.cache_name, generation, &manifest_digest).await?;

        self.populate(manifest).await?;

        let entries = self.db.entry_count(&self.cache_name).await?;
        if entries != manifest.len() as u64 {
            return Err(Error::TaskFailed(format!(
                "populate stored {entries} of {} resources",
                manifest.len()
            )));
        }

        self.db.mark_store_ready(&self.cache_name).await?;

        Ok(ActivationReport {
            cache_name: self.cache_name.clone(),
            generation,
            manifest_digest,
            entries,
            stores_deleted,
        })
    }

    /// Fetch and store every manifest resource; fail on the first error.
    async fn populate(&self, manifest: &ResourceManifest) -> Result<(), Error> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut join_set = JoinSet::new();

        for (resource, fingerprint) in manifest.iter() {
            let semaphore = semaphore.clone();
            let fetcher = self.fetcher.clone();
            let db = self.db.clone();
            let cache_name = self.cache_name.clone();
            let resource = resource.to_string();
            let fingerprint = fingerprint.to_string();

            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::TaskFailed(e.to_string()))?;
                fetch_and_store(fetcher.as_ref(), &db, &cache_name, &resource, &fingerprint).await
            });
        }

        while let Some(joined) = join_set.join_next().await {
            let outcome = joined.map_err(|e| Error::TaskFailed(e.to_string())).and_then(|r| r);
            if let Err(err) = outcome {
                join_set.shutdown().await;
                return Err(err);
            }
        }

        Ok(())
    }

    /// Re-adopt a persisted store that finished populating for `manifest`.
    ///
    /// Returns None (and leaves the state alone) when there is no ready store
    /// under the cache name, or when it was built from a different manifest.
    pub async fn restore(&self, manifest: &ResourceManifest) -> Result<Option<ActivationReport>, Error> {
        let _activation = self.activation.lock().await;

        let Some(info) = self.db.store_info(&self.cache_name).await? else {
            return Ok(None);
        };
        if !info.ready || info.manifest_digest != manifest.digest() || info.entries != manifest.len() as u64 {
            tracing::debug!(cache = %info.name, ready = info.ready, "persisted store does not match manifest");
            return Ok(None);
        }

        self.generation.fetch_max(info.generation, Ordering::SeqCst);
        let report = ActivationReport {
            cache_name: info.name,
            generation: info.generation,
            manifest_digest: info.manifest_digest,
            entries: info.entries,
            stores_deleted: 0,
        };
        tracing::info!(cache = %report.cache_name, generation = report.generation, "restored persisted cache");
        *self.state.write().await = StoreState::Ready(report.clone());
        Ok(Some(report))
    }

    /// Answer a request from the ready store, or from the network.
    ///
    /// # Errors
    ///
    /// Returns `Error::NetworkFallbackFailure` when the request had to go to
    /// the network and the fetcher failed.
    pub async fn handle_request(&self, request: &Request) -> Result<Response, Error> {
        if !request.is_cacheable() {
            self.counters.bypassed.fetch_add(1, Ordering::Relaxed);
            return self.network(request).await;
        }

        let serving = match &*self.state.read().await {
            StoreState::Ready(report) => Some(report.cache_name.clone()),
            _ => None,
        };

        if let Some(cache_name) = serving {
            match self.db.match_entry(&cache_name, request.cache_key()).await {
                Ok(Some(entry)) => {
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(resource = %request.cache_key(), "cache hit");
                    return Ok(entry.into_response());
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(resource = %request.cache_key(), error = %err, "cache lookup failed; using network");
                }
            }
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(resource = %request.resource, "cache miss");
        self.network(request).await
    }

    async fn network(&self, request: &Request) -> Result<Response, Error> {
        self.fetcher.fetch(request).await.map_err(|err| {
            self.counters.network_failures.fetch_add(1, Ordering::Relaxed);
            Error::NetworkFallbackFailure { resource: request.resource.clone(), reason: err.to_string() }
        })
    }

    /// Destroy every store and close the gate.
    ///
    /// Returns the number of stores removed.
    pub async fn purge(&self) -> Result<u64, Error> {
        let _activation = self.activation.lock().await;
        *self.state.write().await = StoreState::Absent;
        let deleted = self.db.delete_all_stores().await?;
        tracing::info!(stores_deleted = deleted, "purged cache stores");
        Ok(deleted)
    }
}

async fn fetch_and_store<F: Fetcher + ?Sized>(
    fetcher: &F, db: &CacheDb, cache_name: &str, resource: &str, fingerprint: &str,
) -> Result<(), Error> {
    let failure = |reason: String| Error::ManifestFetchFailure { resource: resource.to_string(), reason };

    let response = fetcher
        .fetch(&Request::get(resource).with_reload())
        .await
        .map_err(|e| failure(e.to_string()))?;

    if !response.is_success() {
        return Err(failure(format!("status {}", response.status)));
    }

    let mut entry = StoredEntry::from_response(&response, Some(fingerprint));
    entry.resource = resource.to_string();
    db.put_entry(cache_name, &entry)
        .await
        .map_err(|e| failure(e.to_string()))?;

    tracing::debug!(resource, bytes = entry.body.len(), "stored resource");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Serves `body of <resource>` for every resource not marked failing.
    #[derive(Default)]
    struct MockFetcher {
        calls: AtomicUsize,
        requested: StdMutex<Vec<Request>>,
        failing: StdMutex<HashSet<String>>,
        not_found: StdMutex<HashSet<String>>,
        delay: Option<Duration>,
    }

    impl MockFetcher {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn fail(&self, resource: &str) {
            self.failing.lock().unwrap().insert(resource.to_string());
        }

        fn recover(&self, resource: &str) {
            self.failing.lock().unwrap().remove(resource);
        }

        fn answer_404(&self, resource: &str) {
            self.not_found.lock().unwrap().insert(resource.to_string());
        }
    }

    #[async_trait]
    impl Fetcher for MockFetcher {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().unwrap().push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.lock().unwrap().contains(&request.resource) {
                return Err(Error::HttpError("network error: offline".into()));
            }
            if self.not_found.lock().unwrap().contains(&request.resource) {
                return Ok(Response::new(&request.resource, 404, "not found"));
            }
            Ok(Response::new(&request.resource, 200, format!("body of {}", request.resource))
                .with_content_type("text/plain"))
        }
    }

    async fn setup() -> (Arc<MockFetcher>, OfflineCacheManager<MockFetcher>) {
        let db = CacheDb::open_in_memory().await.unwrap();
        let fetcher = Arc::new(MockFetcher::default());
        let manager = OfflineCacheManager::new(db, fetcher.clone(), "offline-cache");
        (fetcher, manager)
    }

    fn example_manifest() -> ResourceManifest {
        ResourceManifest::new([("index.html", "h1"), ("main.js", "h2")])
    }

    async fn stored_keys(manager: &OfflineCacheManager<MockFetcher>) -> Vec<String> {
        manager.db().entry_keys(manager.cache_name()).await.unwrap()
    }

    #[tokio::test]
    async fn test_activate_stores_exactly_manifest_keys() {
        let (fetcher, manager) = setup().await;
        let manifest = ResourceManifest::new([("/", "h0"), ("index.html", "h1"), ("assets/app.css", "h2")]);

        let report = manager.activate(&manifest).await.unwrap();

        assert_eq!(report.entries, 3);
        assert_eq!(report.generation, 1);
        assert_eq!(report.manifest_digest, manifest.digest());
        assert_eq!(stored_keys(&manager).await, manifest.resources().collect::<Vec<_>>());
        assert_eq!(fetcher.calls(), 3);
        assert!(manager.state().await.is_ready());
    }

    #[tokio::test]
    async fn test_populate_requests_bypass_http_cache() {
        let (fetcher, manager) = setup().await;
        manager.activate(&example_manifest()).await.unwrap();

        let requested = fetcher.requested.lock().unwrap().clone();
        assert!(requested.iter().all(|r| r.reload && r.method == "GET"));
    }

    #[tokio::test]
    async fn test_stored_entries_keep_fingerprint() {
        let (_, manager) = setup().await;
        manager.activate(&example_manifest()).await.unwrap();

        let entry = manager.db().match_entry("offline-cache", "main.js").await.unwrap().unwrap();
        assert_eq!(entry.fingerprint.as_deref(), Some("h2"));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let (fetcher, manager) = setup().await;
        manager.activate(&example_manifest()).await.unwrap();
        let populate_calls = fetcher.calls();

        let response = manager.handle_request(&Request::get("index.html")).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, "body of index.html");
        assert_eq!(response.content_type.as_deref(), Some("text/plain"));
        assert_eq!(fetcher.calls(), populate_calls);
        assert_eq!(manager.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_cache_miss_issues_one_network_call() {
        let (fetcher, manager) = setup().await;
        manager.activate(&example_manifest()).await.unwrap();
        let populate_calls = fetcher.calls();

        let response = manager.handle_request(&Request::get("other.png")).await.unwrap();

        assert_eq!(fetcher.calls(), populate_calls + 1);
        assert_eq!(response, Response::new("other.png", 200, "body of other.png").with_content_type("text/plain"));
        assert_eq!(manager.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_lookup_uses_cache_key() {
        let (fetcher, manager) = setup().await;
        manager.activate(&example_manifest()).await.unwrap();
        let populate_calls = fetcher.calls();

        let hit = Request::get("main.js?v=3").with_cache_key("main.js");
        let response = manager.handle_request(&hit).await.unwrap();
        assert_eq!(response.body, "body of main.js");
        assert_eq!(fetcher.calls(), populate_calls);

        let miss = Request::get("api/tiles?v=7&z=3").with_cache_key("api/tiles");
        manager.handle_request(&miss).await.unwrap();
        assert_eq!(fetcher.calls(), populate_calls + 1);
        assert_eq!(fetcher.requested.lock().unwrap().last(), Some(&miss));
    }

    #[tokio::test]
    async fn test_miss_returns_error_status_unmodified() {
        let (fetcher, manager) = setup().await;
        manager.activate(&example_manifest()).await.unwrap();
        fetcher.answer_404("missing.png");

        let response = manager.handle_request(&Request::get("missing.png")).await.unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_miss_is_not_written_to_store() {
        let (_, manager) = setup().await;
        manager.activate(&example_manifest()).await.unwrap();

        manager.handle_request(&Request::get("other.png")).await.unwrap();
        assert_eq!(stored_keys(&manager).await, vec!["index.html", "main.js"]);
    }

    #[tokio::test]
    async fn test_network_fallback_failure_propagates() {
        let (fetcher, manager) = setup().await;
        manager.activate(&example_manifest()).await.unwrap();
        fetcher.fail("other.png");

        let result = manager.handle_request(&Request::get("other.png")).await;
        assert!(matches!(result, Err(Error::NetworkFallbackFailure { resource, .. }) if resource == "other.png"));
        assert_eq!(manager.stats().network_failures, 1);
    }

    #[tokio::test]
    async fn test_cached_resource_served_while_offline() {
        let (fetcher, manager) = setup().await;
        manager.activate(&example_manifest()).await.unwrap();
        fetcher.fail("index.html");

        let response = manager.handle_request(&Request::get("index.html")).await.unwrap();
        assert_eq!(response.body, "body of index.html");
    }

    #[tokio::test]
    async fn test_non_get_bypasses_store() {
        let (fetcher, manager) = setup().await;
        manager.activate(&example_manifest()).await.unwrap();
        let populate_calls = fetcher.calls();

        let request = Request::new("POST", "index.html").with_body("form=1");
        manager.handle_request(&request).await.unwrap();

        assert_eq!(fetcher.calls(), populate_calls + 1);
        assert_eq!(fetcher.requested.lock().unwrap().last(), Some(&request));
        assert_eq!(manager.stats().bypassed, 1);
    }

    #[tokio::test]
    async fn test_requests_before_activation_use_network() {
        let (fetcher, manager) = setup().await;
        assert_eq!(manager.state().await, StoreState::Absent);

        manager.handle_request(&Request::get("index.html")).await.unwrap();
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_activate_twice_is_idempotent() {
        let (fetcher, manager) = setup().await;
        let manifest = example_manifest();

        let first = manager.activate(&manifest).await.unwrap();
        let keys_first = stored_keys(&manager).await;
        let second = manager.activate(&manifest).await.unwrap();

        assert_eq!(keys_first, stored_keys(&manager).await);
        assert_eq!(second.generation, first.generation + 1);
        assert_eq!(second.stores_deleted, 1);
        assert_eq!(fetcher.calls(), 2 * manifest.len());
    }

    #[tokio::test]
    async fn test_replacement_drops_stale_keys() {
        let (fetcher, manager) = setup().await;
        manager.activate(&example_manifest()).await.unwrap();
        manager
            .activate(&ResourceManifest::new([("index.html", "h9"), ("app.js", "h3")]))
            .await
            .unwrap();

        assert_eq!(stored_keys(&manager).await, vec!["app.js", "index.html"]);

        let calls = fetcher.calls();
        manager.handle_request(&Request::get("main.js")).await.unwrap();
        assert_eq!(fetcher.calls(), calls + 1);
    }

    #[tokio::test]
    async fn test_activate_deletes_foreign_stores() {
        let (_, manager) = setup().await;
        manager.db().create_store("legacy-cache", 7, "old").await.unwrap();

        let report = manager.activate(&example_manifest()).await.unwrap();

        assert_eq!(report.stores_deleted, 1);
        assert_eq!(manager.db().store_names().await.unwrap(), vec!["offline-cache"]);
    }

    #[tokio::test]
    async fn test_failed_fetch_fails_activation() {
        let (fetcher, manager) = setup().await;
        fetcher.fail("main.js");

        let result = manager.activate(&example_manifest()).await;

        assert!(matches!(result, Err(Error::ManifestFetchFailure { resource, .. }) if resource == "main.js"));
        assert!(matches!(manager.state().await, StoreState::Failed { generation: 1, .. }));
        assert!(manager.db().store_info("offline-cache").await.unwrap().is_none());
        assert_eq!(manager.stats().failed_activations, 1);
    }

    #[tokio::test]
    async fn test_error_status_fails_activation() {
        let (fetcher, manager) = setup().await;
        fetcher.answer_404("index.html");

        let result = manager.activate(&example_manifest()).await;
        assert!(matches!(result, Err(Error::ManifestFetchFailure { reason, .. }) if reason == "status 404"));
        assert!(!manager.state().await.is_ready());
    }

    #[tokio::test]
    async fn test_failed_activation_serves_from_network() {
        let (fetcher, manager) = setup().await;
        manager.activate(&example_manifest()).await.unwrap();
        fetcher.fail("main.js");
        assert!(manager.activate(&example_manifest()).await.is_err());

        let calls = fetcher.calls();
        let response = manager.handle_request(&Request::get("index.html")).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(fetcher.calls(), calls + 1);
    }

    #[tokio::test]
    async fn test_retry_after_failure_succeeds() {
        let (fetcher, manager) = setup().await;
        fetcher.fail("main.js");
        assert!(manager.activate(&example_manifest()).await.is_err());

        fetcher.recover("main.js");
        let report = manager.activate(&example_manifest()).await.unwrap();
        assert_eq!(report.generation, 2);
        assert_eq!(report.entries, 2);
    }

    #[tokio::test]
    async fn test_invalid_manifest_leaves_store_untouched() {
        let (fetcher, manager) = setup().await;
        let ready = manager.activate(&example_manifest()).await.unwrap();

        let result = manager.activate(&ResourceManifest::default()).await;

        assert!(matches!(result, Err(Error::InvalidManifest(_))));
        assert_eq!(manager.state().await, StoreState::Ready(ready));
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrency_limit_one_still_populates() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let fetcher = Arc::new(MockFetcher { delay: Some(Duration::from_millis(5)), ..Default::default() });
        let manager = OfflineCacheManager::new(db, fetcher, "offline-cache").with_max_concurrency(0);

        let manifest = ResourceManifest::new((0..5).map(|i| (format!("chunk-{i}.js"), format!("h{i}"))));
        let report = manager.activate(&manifest).await.unwrap();
        assert_eq!(report.entries, 5);
    }

    #[tokio::test]
    async fn test_requests_do_not_wait_for_activation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let fetcher = Arc::new(MockFetcher { delay: Some(Duration::from_millis(200)), ..Default::default() });
        let manager = Arc::new(OfflineCacheManager::new(db, fetcher, "offline-cache"));

        let activating = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.activate(&example_manifest()).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(matches!(manager.state().await, StoreState::Populating { .. }));

        // Served by the network path while the store is being filled.
        let response = manager.handle_request(&Request::get("index.html")).await.unwrap();
        assert_eq!(response.status, 200);

        activating.await.unwrap().unwrap();
        assert!(manager.state().await.is_ready());
    }

    #[tokio::test]
    async fn test_restore_adopts_matching_store() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let fetcher = Arc::new(MockFetcher::default());
        let first = OfflineCacheManager::new(db.clone(), fetcher.clone(), "offline-cache");
        first.activate(&example_manifest()).await.unwrap();

        let second = OfflineCacheManager::new(db, fetcher.clone(), "offline-cache");
        let report = second.restore(&example_manifest()).await.unwrap().unwrap();
        assert_eq!(report.generation, 1);

        let calls = fetcher.calls();
        second.handle_request(&Request::get("main.js")).await.unwrap();
        assert_eq!(fetcher.calls(), calls);

        let next = second.activate(&example_manifest()).await.unwrap();
        assert_eq!(next.generation, 2);
    }

    #[tokio::test]
    async fn test_restore_rejects_other_manifest() {
        let (_, manager) = setup().await;
        manager.activate(&example_manifest()).await.unwrap();

        let other = ResourceManifest::new([("index.html", "h1"), ("main.js", "changed")]);
        assert!(manager.restore(&other).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_restore_rejects_unfinished_store() {
        let (_, manager) = setup().await;
        let manifest = example_manifest();
        manager.db().create_store("offline-cache", 3, &manifest.digest()).await.unwrap();
        for resource in manifest.resources() {
            let entry = StoredEntry::from_response(&Response::new(resource, 200, "partial"), manifest.fingerprint(resource));
            manager.db().put_entry("offline-cache", &entry).await.unwrap();
        }

        assert!(manager.restore(&manifest).await.unwrap().is_none());
        assert_eq!(manager.state().await, StoreState::Absent);
    }

    #[tokio::test]
    async fn test_restore_without_store() {
        let (_, manager) = setup().await;
        assert!(manager.restore(&example_manifest()).await.unwrap().is_none());
        assert_eq!(manager.state().await, StoreState::Absent);
    }

    #[tokio::test]
    async fn test_purge_closes_gate() {
        let (fetcher, manager) = setup().await;
        manager.activate(&example_manifest()).await.unwrap();

        assert_eq!(manager.purge().await.unwrap(), 1);
        assert_eq!(manager.state().await, StoreState::Absent);

        let calls = fetcher.calls();
        manager.handle_request(&Request::get("index.html")).await.unwrap();
        assert_eq!(fetcher.calls(), calls + 1);
    }
}

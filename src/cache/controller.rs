use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use futures::stream::{self, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::fetch::{Fetch, FetchError, FetchRequest, FetchResponse};
use super::messages::{ClientMessage, WorkerMessage};
use super::store::{CacheGeneration, CacheStorage};
use super::sync::SyncQueue;

/// Current asset generation version.
/// Bump to invalidate previously installed static/dynamic caches.
pub const CACHE_VERSION: &str = "v3";

/// Generation name prefixes; the version suffix makes each install distinct
const STATIC_PREFIX: &str = "quizcache-static-";
const DYNAMIC_PREFIX: &str = "quizcache-dynamic-";

/// URL the pushed quiz data payload is cached under
const QUIZ_DATA_URL: &str = "/api/quiz-data";

/// Maximum concurrent precache fetches at install time.
/// Keeps install fast without flooding the network on slow connections.
const MAX_CONCURRENT_PRECACHE: usize = 4;

/// Buffer for the client update broadcast channel.
/// Updates are rare; 16 leaves room for slow receivers.
const UPDATE_CHANNEL_CAPACITY: usize = 16;

/// Caching policy chosen for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Bypass the cache entirely
    NetworkOnly,
    /// Serve from the static cache, fill it on miss
    CacheFirst,
    /// Try the network, fall back to cache
    NetworkFirst,
    /// Serve stale immediately, refresh in the background
    StaleWhileRevalidate,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::NetworkOnly => write!(f, "network-only"),
            Strategy::CacheFirst => write!(f, "cache-first"),
            Strategy::NetworkFirst => write!(f, "network-first"),
            Strategy::StaleWhileRevalidate => write!(f, "stale-while-revalidate"),
        }
    }
}

/// URL classification rules and the install manifest
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub version: String,
    /// Assets cached synchronously at install; install fails hard if any is
    /// unreachable
    pub precache_manifest: Vec<String>,
    /// Path prefixes that always go to the network, checked first
    pub never_cache_prefixes: Vec<String>,
    /// Path prefixes served network-first into the dynamic cache
    pub dynamic_prefixes: Vec<String>,
    /// Cached shell served when an offline navigation misses everything
    pub app_shell: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            version: CACHE_VERSION.to_string(),
            precache_manifest: vec![
                "/".to_string(),
                "/index.html".to_string(),
                "/styles.css".to_string(),
                "/app.js".to_string(),
                "/storage.js".to_string(),
                "/manifest.json".to_string(),
                "/icons/icon-192.png".to_string(),
                "/icons/icon-512.png".to_string(),
                // The one cross-origin entry: the shell depends on this font
                "https://fonts.googleapis.com/css2?family=Inter:wght@400;600&display=swap"
                    .to_string(),
            ],
            never_cache_prefixes: vec!["/api/auth/".to_string(), "/api/sync/".to_string()],
            dynamic_prefixes: vec!["/api/".to_string(), "/data/".to_string()],
            app_shell: "/index.html".to_string(),
        }
    }
}

impl CacheConfig {
    fn static_name(&self) -> String {
        format!("{}{}", STATIC_PREFIX, self.version)
    }

    fn dynamic_name(&self) -> String {
        format!("{}{}", DYNAMIC_PREFIX, self.version)
    }

    /// Static assets match by exact URL, exact path, or manifest suffix
    fn is_static_asset(&self, request: &FetchRequest) -> bool {
        let path = request.path();
        self.precache_manifest
            .iter()
            .any(|a| request.url == *a || path == a || request.url.ends_with(a.as_str()))
    }
}

/// The single fetch interception point.
///
/// Owns the cache generation lifecycle (install, activate, versioned
/// eviction), dispatches each GET to exactly one strategy, and relays the
/// page↔worker message protocol.
pub struct CacheController {
    config: CacheConfig,
    storage: Arc<CacheStorage>,
    fetcher: Arc<dyn Fetch>,
    sync: Arc<SyncQueue>,
    updates: broadcast::Sender<ClientMessage>,
}

impl CacheController {
    pub fn new(
        config: CacheConfig,
        storage: Arc<CacheStorage>,
        fetcher: Arc<dyn Fetch>,
        sync: Arc<SyncQueue>,
    ) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            config,
            storage,
            fetcher,
            sync,
            updates,
        }
    }

    /// Receive worker-to-client messages (UPDATE_AVAILABLE)
    pub fn subscribe(&self) -> broadcast::Receiver<ClientMessage> {
        self.updates.subscribe()
    }

    // ===== Lifecycle =====

    /// Populate the static generation from the install manifest.
    ///
    /// Every entry must be reachable and successful; a single failure fails
    /// the install. Prior generations are left in place — readiness is
    /// signaled as soon as this returns, and eviction waits for `activate`.
    pub async fn install(&self) -> Result<()> {
        let cache = self.storage.open(&self.config.static_name())?;

        // Fetch manifest entries with bounded concurrency
        let results: Vec<_> = stream::iter(self.config.precache_manifest.clone())
            .map(|url| {
                let fetcher = self.fetcher.clone();
                async move {
                    let result = fetcher.fetch(&FetchRequest::get(url.clone())).await;
                    (url, result)
                }
            })
            .buffer_unordered(MAX_CONCURRENT_PRECACHE)
            .collect()
            .await;

        for (url, result) in results {
            let response =
                result.with_context(|| format!("Precache fetch failed for {}", url))?;
            if !response.is_success() {
                return Err(anyhow!(
                    "Precache entry {} returned status {}",
                    url,
                    response.status
                ));
            }
            cache.put(&url, &response)?;
        }

        info!(
            version = %self.config.version,
            assets = self.config.precache_manifest.len(),
            "Installed static cache"
        );
        Ok(())
    }

    /// Delete every generation not matching the current names and take
    /// control of open clients immediately.
    pub fn activate(&self) -> Result<()> {
        let keep = [self.config.static_name(), self.config.dynamic_name()];
        for name in self.storage.list() {
            if !keep.contains(&name) {
                self.storage.delete(&name)?;
            }
        }
        info!(version = %self.config.version, "Activated cache generation");
        Ok(())
    }

    /// Look for generations installed by a newer build and notify clients
    pub fn check_update(&self) {
        for name in self.storage.list() {
            if let Some(version) = name.strip_prefix(STATIC_PREFIX) {
                if version != self.config.version {
                    info!(version = version, "Newer asset generation detected");
                    let _ = self.updates.send(ClientMessage::UpdateAvailable {
                        version: version.to_string(),
                    });
                    return;
                }
            }
        }
    }

    // ===== Fetch interception =====

    fn classify(&self, request: &FetchRequest) -> Strategy {
        let path = request.path();
        if self
            .config
            .never_cache_prefixes
            .iter()
            .any(|p| path.starts_with(p.as_str()))
        {
            Strategy::NetworkOnly
        } else if self.config.is_static_asset(request) {
            Strategy::CacheFirst
        } else if self
            .config
            .dynamic_prefixes
            .iter()
            .any(|p| path.starts_with(p.as_str()))
        {
            Strategy::NetworkFirst
        } else {
            Strategy::StaleWhileRevalidate
        }
    }

    /// Intercept one request. GETs on http(s) URLs are dispatched to exactly
    /// one strategy; everything else passes through untouched.
    pub async fn handle_fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        if !request.is_get() || !request.is_http() {
            return self.fetcher.fetch(request).await;
        }

        let strategy = self.classify(request);
        // Single instrumentation point for all intercepted fetches
        debug!(url = %request.url, strategy = %strategy, "Intercepted fetch");

        let response = match strategy {
            Strategy::NetworkOnly => self.fetcher.fetch(request).await?,
            Strategy::CacheFirst => self.cache_first(request).await,
            Strategy::NetworkFirst => self.network_first(request).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
        };
        Ok(response)
    }

    /// Open a generation, degrading to "no cache" on storage failure rather
    /// than failing the fetch.
    fn open_generation(&self, name: &str) -> Option<CacheGeneration> {
        match self.storage.open(name) {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!(generation = name, error = %e, "Cache generation unavailable");
                None
            }
        }
    }

    async fn cache_first(&self, request: &FetchRequest) -> FetchResponse {
        let cache = self.open_generation(&self.config.static_name());

        if let Some(hit) = cache.as_ref().and_then(|c| c.get(&request.url)) {
            return hit;
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    if let Some(cache) = cache {
                        if let Err(e) = cache.put(&request.url, &response) {
                            warn!(url = %request.url, error = %e, "Failed to cache static asset");
                        }
                    }
                }
                response
            }
            Err(e) => {
                debug!(url = %request.url, error = %e, "Static asset unreachable with no cache entry");
                FetchResponse::service_unavailable()
            }
        }
    }

    async fn network_first(&self, request: &FetchRequest) -> FetchResponse {
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    if let Some(cache) = self.open_generation(&self.config.dynamic_name()) {
                        if let Err(e) = cache.put(&request.url, &response) {
                            warn!(url = %request.url, error = %e, "Failed to cache dynamic response");
                        }
                    }
                }
                response
            }
            Err(e) => {
                debug!(url = %request.url, error = %e, "Network failed, trying cache fallback");
                self.cached_copy(&request.url)
                    .unwrap_or_else(FetchResponse::service_unavailable)
            }
        }
    }

    async fn stale_while_revalidate(&self, request: &FetchRequest) -> FetchResponse {
        if let Some(stale) = self.cached_copy(&request.url) {
            self.spawn_background_refresh(request.clone());
            return stale;
        }

        // No cached copy: behave like network-first, with the app shell as a
        // last resort for navigations.
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    if let Some(cache) = self.open_generation(&self.config.dynamic_name()) {
                        if let Err(e) = cache.put(&request.url, &response) {
                            warn!(url = %request.url, error = %e, "Failed to cache response");
                        }
                    }
                }
                response
            }
            Err(e) => {
                debug!(url = %request.url, error = %e, "Offline with no cached copy");
                if request.is_navigation() {
                    if let Some(shell) = self
                        .open_generation(&self.config.static_name())
                        .and_then(|c| c.get(&self.config.app_shell))
                    {
                        return shell;
                    }
                }
                FetchResponse::service_unavailable()
            }
        }
    }

    /// Dynamic cache first, then static (precached assets may be requested
    /// through the default route)
    fn cached_copy(&self, url: &str) -> Option<FetchResponse> {
        self.open_generation(&self.config.dynamic_name())
            .and_then(|c| c.get(url))
            .or_else(|| {
                self.open_generation(&self.config.static_name())
                    .and_then(|c| c.get(url))
            })
    }

    /// Refresh the dynamic cache after the stale response has already been
    /// returned. Detached: failures are logged and swallowed, never
    /// propagated to the caller that got the stale copy, and ordering
    /// relative to that caller is unspecified.
    fn spawn_background_refresh(&self, request: FetchRequest) {
        let fetcher = self.fetcher.clone();
        let storage = self.storage.clone();
        let dynamic_name = self.config.dynamic_name();

        tokio::spawn(async move {
            match fetcher.fetch(&request).await {
                Ok(response) if response.is_success() => {
                    match storage.open(&dynamic_name) {
                        Ok(cache) => {
                            if let Err(e) = cache.put(&request.url, &response) {
                                debug!(url = %request.url, error = %e, "Background refresh write failed");
                            }
                        }
                        Err(e) => {
                            debug!(error = %e, "Background refresh could not open cache")
                        }
                    }
                }
                Ok(response) => {
                    debug!(url = %request.url, status = response.status, "Background refresh got error status");
                }
                Err(e) => {
                    debug!(url = %request.url, error = %e, "Background refresh failed");
                }
            }
        });
    }

    // ===== Message protocol =====

    /// Handle a typed message from the page
    pub async fn handle_message(&self, message: WorkerMessage) -> Result<()> {
        match message {
            WorkerMessage::SkipWaiting => self.activate(),
            WorkerMessage::CheckUpdate => {
                self.check_update();
                Ok(())
            }
            WorkerMessage::CacheQuizData(data) => {
                let cache = self.storage.open(&self.config.dynamic_name())?;
                cache.put(QUIZ_DATA_URL, &FetchResponse::json(&data))?;
                debug!("Cached pushed quiz data");
                Ok(())
            }
            WorkerMessage::ScheduleSync { tag } => {
                // Fire-and-forget drain; failed entries stay queued
                let sync = self.sync.clone();
                tokio::spawn(async move {
                    if let Err(e) = sync.drain(&tag).await {
                        warn!(tag = %tag, error = %e, "Sync drain failed");
                    }
                });
                Ok(())
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

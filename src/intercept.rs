//! Per-request interception: executes the selected strategy against the
//! content cache and the network, resolving exactly one response per request.

use std::sync::Arc;

use color_eyre::Result;
use futures::StreamExt;
use reqwest::Method;
use tracing::{debug, warn};
use url::Url;

use crate::cache::CacheStore;
use crate::http::{cache_key_for, Request, Response, StoredResponse};
use crate::net::NetworkClient;
use crate::strategy::Strategy;

/// How many precache fetches run at once during install.
const PRECACHE_CONCURRENCY: usize = 4;

/// The per-request control flow of the interception layer.
///
/// Every call to [`handle`](Self::handle) settles with exactly one response
/// or one propagated failure. Cache writes never block the response path:
/// they run as detached tasks whose failures are logged and discarded.
pub struct InterceptEngine {
  store: Arc<dyn CacheStore>,
  net: Arc<dyn NetworkClient>,
  version: String,
  fallback: Url,
}

impl InterceptEngine {
  /// Create an engine serving from the given cache version, with `fallback`
  /// naming the entry document used when a navigation cannot reach the
  /// network.
  pub fn new(
    store: Arc<dyn CacheStore>,
    net: Arc<dyn NetworkClient>,
    version: impl Into<String>,
    fallback: Url,
  ) -> Self {
    Self {
      store,
      net,
      version: version.into(),
      fallback,
    }
  }

  /// Resolve one intercepted request.
  pub async fn handle(&self, request: Request) -> Result<Response> {
    match Strategy::select(&request.method, request.mode) {
      Strategy::NetworkPassthrough => self.net.fetch(request).await,
      Strategy::NavigationFallback => self.navigate(request).await,
      Strategy::CacheFirst => self.cache_first(request).await,
    }
  }

  /// Network first; cached entry document on failure.
  async fn navigate(&self, request: Request) -> Result<Response> {
    let key = request.cache_key();
    let fallback_key = cache_key_for(&Method::GET, &self.fallback);

    match self.net.fetch(request).await {
      Ok(response) => {
        if response.is_success() {
          let snapshot = StoredResponse::snapshot(&response);
          // A live navigation refreshes the fallback snapshot served when
          // later navigations cannot reach the network, not just its own key.
          if fallback_key != key {
            self.spawn_store(fallback_key, snapshot.clone());
          }
          self.spawn_store(key, snapshot);
        }
        Ok(response)
      }
      Err(e) => {
        match self.store.lookup(&self.version, &fallback_key)? {
          Some(entry) => {
            debug!(error = %e, "Navigation failed, serving cached entry document");
            Ok(entry.into_response())
          }
          None => Err(e),
        }
      }
    }
  }

  /// Cached entry wins if present; the network refreshes the cache either
  /// way. The caller only waits on the network when the cache misses.
  async fn cache_first(&self, request: Request) -> Result<Response> {
    let key = request.cache_key();
    let cached = self.store.lookup(&self.version, &key)?;

    // The network request is issued whether or not the lookup hit.
    let fetch = self.net.fetch(request);

    if let Some(entry) = cached {
      // Detached refresh: the result is discarded, a stale in-flight fetch
      // may overwrite a newer entry (last write wins, self-correcting).
      let store = Arc::clone(&self.store);
      let version = self.version.clone();
      tokio::spawn(async move {
        match fetch.await {
          Ok(response) if response.is_success() => {
            if let Err(e) = store.store(&version, &key, &StoredResponse::snapshot(&response)) {
              warn!(error = %e, "Failed to refresh cache entry");
            }
          }
          Ok(response) => {
            debug!(status = response.status, "Skipping refresh with non-success response")
          }
          Err(e) => debug!(error = %e, "Background refresh failed"),
        }
      });

      return Ok(entry.into_response());
    }

    // Cache miss: the network result is the answer, success or failure.
    let response = fetch.await?;
    if response.is_success() {
      self.spawn_store(key, StoredResponse::snapshot(&response));
    }
    Ok(response)
  }

  /// Pre-populate the cache with the install-time asset manifest.
  ///
  /// A single URL failing to fetch does not prevent the others from being
  /// stored; failures are logged and the install proceeds.
  pub async fn populate(&self, urls: &[Url]) -> Result<()> {
    self.store.open(&self.version)?;

    let fetches = urls.iter().cloned().map(|url| {
      let request = Request::get(url.clone());
      let key = request.cache_key();
      let fetch = self.net.fetch(request);
      async move { (url, key, fetch.await) }
    });

    let mut results = futures::stream::iter(fetches).buffer_unordered(PRECACHE_CONCURRENCY);

    while let Some((url, key, result)) = results.next().await {
      match result {
        Ok(response) if response.is_success() => {
          self
            .store
            .store(&self.version, &key, &StoredResponse::snapshot(&response))?;
          debug!(url = %url, "Precached");
        }
        Ok(response) => {
          warn!(url = %url, status = response.status, "Skipping precache of non-success response")
        }
        Err(e) => warn!(url = %url, error = %e, "Failed to precache URL"),
      }
    }

    Ok(())
  }

  /// Write an entry off the response path. The caller never blocks on it.
  fn spawn_store(&self, key: String, snapshot: StoredResponse) {
    let store = Arc::clone(&self.store);
    let version = self.version.clone();
    tokio::spawn(async move {
      if let Err(e) = store.store(&version, &key, &snapshot) {
        warn!(error = %e, "Failed to write cache entry");
      }
    });
  }
}

//! Per-request caching strategy selection.

use reqwest::Method;

use crate::http::RequestMode;

/// The policy governing how a single request is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
  /// Send to the network unmodified; never touch the cache.
  NetworkPassthrough,
  /// Prefer the network; fall back to the cached entry document on failure.
  NavigationFallback,
  /// Serve from cache when present; refresh from the network regardless.
  CacheFirst,
}

impl Strategy {
  /// Select the strategy for a request's method and mode.
  ///
  /// Mutating and otherwise unsafe methods must reach the origin unmodified
  /// and uncached, so anything that is not a GET is a passthrough.
  pub fn select(method: &Method, mode: RequestMode) -> Self {
    if *method != Method::GET {
      return Strategy::NetworkPassthrough;
    }

    match mode {
      RequestMode::Navigate => Strategy::NavigationFallback,
      RequestMode::Subresource => Strategy::CacheFirst,
    }
  }
}

//! Request and response types shared across the interception layer.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

/// How a request was issued by the application.
///
/// A `Navigate` request is a full-page document load; everything else
/// (scripts, styles, images, API calls) is a `Subresource` fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
  Navigate,
  Subresource,
}

/// An outgoing request intercepted at the application boundary.
#[derive(Debug, Clone)]
pub struct Request {
  pub method: Method,
  pub url: Url,
  pub mode: RequestMode,
}

impl Request {
  pub fn get(url: Url) -> Self {
    Self {
      method: Method::GET,
      url,
      mode: RequestMode::Subresource,
    }
  }

  pub fn navigate(url: Url) -> Self {
    Self {
      method: Method::GET,
      url,
      mode: RequestMode::Navigate,
    }
  }

  /// Canonical cache key for this request: sha256 over method + URL.
  ///
  /// Hashing gives stable, fixed-length keys regardless of URL length.
  pub fn cache_key(&self) -> String {
    cache_key_for(&self.method, &self.url)
  }
}

/// Compute the cache key for a method/URL pair without building a `Request`.
pub fn cache_key_for(method: &Method, url: &Url) -> String {
  let mut hasher = Sha256::new();
  hasher.update(method.as_str().as_bytes());
  hasher.update(b" ");
  hasher.update(url.as_str().as_bytes());
  hex::encode(hasher.finalize())
}

/// Where a resolved response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
  /// Fresh from the network
  Network,
  /// Served from the content cache
  Cache,
}

/// A resolved response delivered back to the application.
#[derive(Debug, Clone)]
pub struct Response {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
  pub source: ResponseSource,
}

impl Response {
  /// Whether the status is in the 2xx success range.
  pub fn is_success(&self) -> bool {
    (200..=299).contains(&self.status)
  }
}

/// A response snapshot as persisted in the content cache store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResponse {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
  pub stored_at: DateTime<Utc>,
}

impl StoredResponse {
  /// Snapshot a network response for storage.
  pub fn snapshot(response: &Response) -> Self {
    Self {
      status: response.status,
      headers: response.headers.clone(),
      body: response.body.clone(),
      stored_at: Utc::now(),
    }
  }

  /// Rehydrate the snapshot into a response tagged as cache-sourced.
  pub fn into_response(self) -> Response {
    Response {
      status: self.status,
      headers: self.headers,
      body: self.body,
      source: ResponseSource::Cache,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
  }

  #[test]
  fn test_cache_key_is_stable() {
    let a = Request::get(url("https://example.com/demo/main.js"));
    let b = Request::get(url("https://example.com/demo/main.js"));
    assert_eq!(a.cache_key(), b.cache_key());
  }

  #[test]
  fn test_cache_key_varies_by_method_and_url() {
    let get = Request::get(url("https://example.com/a"));
    let other_url = Request::get(url("https://example.com/b"));
    let post = Request {
      method: Method::POST,
      url: url("https://example.com/a"),
      mode: RequestMode::Subresource,
    };

    assert_ne!(get.cache_key(), other_url.cache_key());
    assert_ne!(get.cache_key(), post.cache_key());
  }

  #[test]
  fn test_snapshot_round_trip() {
    let response = Response {
      status: 200,
      headers: vec![("content-type".to_string(), "text/html".to_string())],
      body: b"<html></html>".to_vec(),
      source: ResponseSource::Network,
    };

    let restored = StoredResponse::snapshot(&response).into_response();

    assert_eq!(restored.status, response.status);
    assert_eq!(restored.headers, response.headers);
    assert_eq!(restored.body, response.body);
    assert_eq!(restored.source, ResponseSource::Cache);
  }

  #[test]
  fn test_is_success_range() {
    let mut response = Response {
      status: 200,
      headers: Vec::new(),
      body: Vec::new(),
      source: ResponseSource::Network,
    };
    assert!(response.is_success());

    response.status = 299;
    assert!(response.is_success());

    response.status = 404;
    assert!(!response.is_success());

    response.status = 301;
    assert!(!response.is_success());
  }
}

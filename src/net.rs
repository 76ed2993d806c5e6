//! Network boundary: the transport used to reach the origin server.

use color_eyre::{eyre::eyre, Result};
use futures::future::BoxFuture;

use crate::http::{Request, Response, ResponseSource};

/// Transport abstraction for outbound requests.
///
/// The interception engine never talks to reqwest directly; it goes through
/// this trait so tests can inject a scripted transport.
pub trait NetworkClient: Send + Sync {
  /// Issue the request to the network and resolve its response or failure.
  fn fetch(&self, request: Request) -> BoxFuture<'static, Result<Response>>;
}

/// reqwest-backed transport.
#[derive(Clone)]
pub struct ReqwestClient {
  client: reqwest::Client,
}

impl ReqwestClient {
  pub fn new() -> Self {
    Self {
      client: reqwest::Client::new(),
    }
  }
}

impl Default for ReqwestClient {
  fn default() -> Self {
    Self::new()
  }
}

impl NetworkClient for ReqwestClient {
  fn fetch(&self, request: Request) -> BoxFuture<'static, Result<Response>> {
    let client = self.client.clone();

    Box::pin(async move {
      let response = client
        .request(request.method.clone(), request.url.clone())
        .send()
        .await
        .map_err(|e| eyre!("Network request to {} failed: {}", request.url, e))?;

      let status = response.status().as_u16();
      let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
          value
            .to_str()
            .ok()
            .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

      let body = response
        .bytes()
        .await
        .map_err(|e| eyre!("Failed to read response body from {}: {}", request.url, e))?
        .to_vec();

      Ok(Response {
        status,
        headers,
        body,
        source: ResponseSource::Network,
      })
    })
  }
}

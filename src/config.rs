use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::sync::DrainPolicy;

/// Configuration surface of the interception layer.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// Origin the relative paths below are resolved against
  pub origin: String,

  /// Name of the current cache generation (e.g. "content-v10")
  pub cache_version: String,

  /// Asset paths pre-populated into the current version at install time
  #[serde(default)]
  pub precache: Vec<String>,

  /// Entry document served when a navigation cannot reach the network
  #[serde(default = "default_fallback_path")]
  pub fallback_path: String,

  /// Deferred-sync tag that triggers the reconciliation worker
  #[serde(default = "default_sync_tag")]
  pub sync_tag: String,

  /// What happens to the offline queue after a reconciliation run
  #[serde(default)]
  pub drain: DrainPolicy,

  /// Remote endpoint pending records are forwarded to, if any
  pub forward_endpoint: Option<String>,

  /// Icon path attached to notifications
  pub notification_icon: Option<String>,
}

fn default_fallback_path() -> String {
  "/index.html".to_string()
}

fn default_sync_tag() -> String {
  "syncAttendance".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./waylay.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/waylay/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/waylay/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("waylay.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("waylay").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  fn origin_url(&self) -> Result<Url> {
    Url::parse(&self.origin).map_err(|e| eyre!("Invalid origin '{}': {}", self.origin, e))
  }

  /// Resolve the precache manifest against the origin.
  ///
  /// A malformed manifest fails the whole operation; install must not
  /// proceed with a partial asset list.
  pub fn manifest_urls(&self) -> Result<Vec<Url>> {
    let origin = self.origin_url()?;

    self
      .precache
      .iter()
      .map(|path| {
        origin
          .join(path)
          .map_err(|e| eyre!("Invalid precache path '{}': {}", path, e))
      })
      .collect()
  }

  /// Absolute URL of the navigation fallback entry document.
  pub fn fallback_url(&self) -> Result<Url> {
    let origin = self.origin_url()?;
    origin
      .join(&self.fallback_path)
      .map_err(|e| eyre!("Invalid fallback path '{}': {}", self.fallback_path, e))
  }

  /// Parsed forward endpoint, if one is configured.
  pub fn forward_url(&self) -> Result<Option<Url>> {
    match &self.forward_endpoint {
      Some(endpoint) => Url::parse(endpoint)
        .map(Some)
        .map_err(|e| eyre!("Invalid forward endpoint '{}': {}", endpoint, e)),
      None => Ok(None),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(yaml: &str) -> Config {
    serde_yaml::from_str(yaml).unwrap()
  }

  #[test]
  fn test_minimal_config_gets_defaults() {
    let config = parse(
      r#"
origin: "https://example.com"
cache_version: "content-v10"
"#,
    );

    assert_eq!(config.fallback_path, "/index.html");
    assert_eq!(config.sync_tag, "syncAttendance");
    assert_eq!(config.drain, DrainPolicy::NotifyOnly);
    assert!(config.precache.is_empty());
    assert!(config.forward_endpoint.is_none());
  }

  #[test]
  fn test_manifest_urls_resolve_against_origin() {
    let config = parse(
      r#"
origin: "https://example.com"
cache_version: "content-v10"
precache:
  - "/demo/"
  - "/demo/main.js"
"#,
    );

    let urls = config.manifest_urls().unwrap();
    assert_eq!(urls[0].as_str(), "https://example.com/demo/");
    assert_eq!(urls[1].as_str(), "https://example.com/demo/main.js");
  }

  #[test]
  fn test_malformed_origin_fails_manifest_resolution() {
    let config = parse(
      r#"
origin: "not a url"
cache_version: "content-v10"
precache:
  - "/demo/"
"#,
    );

    assert!(config.manifest_urls().is_err());
  }

  #[test]
  fn test_drain_policy_parses_from_snake_case() {
    let config = parse(
      r#"
origin: "https://example.com"
cache_version: "content-v10"
drain: clear_after_forward
forward_endpoint: "https://example.com/api/sync"
"#,
    );

    assert_eq!(config.drain, DrainPolicy::ClearAfterForward);
    assert!(config.forward_url().unwrap().is_some());
  }
}

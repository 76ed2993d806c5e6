//! Core trait for the versioned content cache store.

use color_eyre::Result;

use crate::http::StoredResponse;

/// Versioned key-value store mapping request identity to stored responses.
///
/// Each version names one generation of cached content. Exactly one version
/// is "current" at any time; the lifecycle sweep deletes the rest. Backends
/// must make `open` idempotent and `store` an overwrite-or-insert.
pub trait CacheStore: Send + Sync {
  /// Ensure a store named by `version` exists. Idempotent.
  fn open(&self, version: &str) -> Result<()>;

  /// Look up a stored response by request key. No side effects.
  fn lookup(&self, version: &str, key: &str) -> Result<Option<StoredResponse>>;

  /// Insert or overwrite the entry for `key`.
  ///
  /// Callers only pass success-status responses; backends may assume it.
  fn store(&self, version: &str, key: &str, response: &StoredResponse) -> Result<()>;

  /// All versions that currently exist.
  fn list_versions(&self) -> Result<Vec<String>>;

  /// Delete a version and every entry it owns.
  fn delete_version(&self, version: &str) -> Result<()>;
}

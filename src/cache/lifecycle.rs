//! Activation-time sweep of superseded cache versions.

use color_eyre::Result;
use tracing::{debug, warn};

use super::traits::CacheStore;

/// Delete every cache version other than `current`.
///
/// Best-effort: a failed deletion is logged and does not stop the sweep, and
/// the caller's activation proceeds once all attempts have been made. Running
/// the sweep twice with no version change is a no-op the second time.
pub fn cleanup_stale(store: &dyn CacheStore, current: &str) -> Result<()> {
  let versions = store.list_versions()?;

  for version in versions {
    if version == current {
      continue;
    }

    match store.delete_version(&version) {
      Ok(()) => debug!(version = %version, "Deleted stale cache version"),
      Err(e) => warn!(version = %version, error = %e, "Failed to delete stale cache version"),
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::MemoryStore;

  #[test]
  fn test_cleanup_deletes_everything_but_current() {
    let store = MemoryStore::new();
    store.open("v9").unwrap();
    store.open("v10").unwrap();
    store.open("v8").unwrap();

    cleanup_stale(&store, "v10").unwrap();

    assert_eq!(store.list_versions().unwrap(), vec!["v10".to_string()]);
  }

  #[test]
  fn test_cleanup_is_idempotent() {
    let store = MemoryStore::new();
    store.open("v9").unwrap();
    store.open("v10").unwrap();

    cleanup_stale(&store, "v10").unwrap();
    let after_first = store.list_versions().unwrap();

    cleanup_stale(&store, "v10").unwrap();
    let after_second = store.list_versions().unwrap();

    assert_eq!(after_first, after_second);
    assert_eq!(after_second, vec!["v10".to_string()]);
  }

  #[test]
  fn test_cleanup_with_no_stale_versions() {
    let store = MemoryStore::new();
    store.open("v10").unwrap();

    cleanup_stale(&store, "v10").unwrap();

    assert_eq!(store.list_versions().unwrap(), vec!["v10".to_string()]);
  }
}

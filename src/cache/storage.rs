//! Cache store backends: SQLite and in-memory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection};

use super::traits::CacheStore;
use crate::http::StoredResponse;

/// SQLite-backed content cache store.
///
/// All versions share one database; entries are keyed `(version, request_key)`
/// so deleting a version drops its entries in a single statement.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open the store at the default location under the user data directory.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  /// Open the store at an explicit path.
  pub fn open_at(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  /// Open an in-memory store. Contents are lost when the store is dropped.
  pub fn open_in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory cache: {}", e))?;
    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;
    Ok(store)
  }

  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("waylay").join("cache.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for the versioned content cache.
const CACHE_SCHEMA: &str = r#"
-- One row per cache generation
CREATE TABLE IF NOT EXISTS cache_versions (
    version TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Stored response snapshots, owned by their version
CREATE TABLE IF NOT EXISTS cache_entries (
    version TEXT NOT NULL,
    request_key TEXT NOT NULL,
    status INTEGER NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    stored_at TEXT NOT NULL,
    PRIMARY KEY (version, request_key),
    FOREIGN KEY (version) REFERENCES cache_versions(version) ON DELETE CASCADE
);
"#;

impl CacheStore for SqliteStore {
  fn open(&self, version: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR IGNORE INTO cache_versions (version) VALUES (?)",
        params![version],
      )
      .map_err(|e| eyre!("Failed to open cache version {}: {}", version, e))?;

    Ok(())
  }

  fn lookup(&self, version: &str, key: &str) -> Result<Option<StoredResponse>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare(
        "SELECT status, headers, body, stored_at FROM cache_entries
         WHERE version = ? AND request_key = ?",
      )
      .map_err(|e| eyre!("Failed to prepare lookup: {}", e))?;

    let row: Option<(u16, String, Vec<u8>, String)> = stmt
      .query_row(params![version, key], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
      })
      .ok();

    match row {
      Some((status, headers_json, body, stored_at_str)) => {
        let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)
          .map_err(|e| eyre!("Failed to parse stored headers: {}", e))?;
        let stored_at = parse_datetime(&stored_at_str)?;

        Ok(Some(StoredResponse {
          status,
          headers,
          body,
          stored_at,
        }))
      }
      None => Ok(None),
    }
  }

  fn store(&self, version: &str, key: &str, response: &StoredResponse) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let headers_json = serde_json::to_string(&response.headers)
      .map_err(|e| eyre!("Failed to serialize headers: {}", e))?;

    // Make sure the version row exists so the entry has an owner
    conn
      .execute(
        "INSERT OR IGNORE INTO cache_versions (version) VALUES (?)",
        params![version],
      )
      .map_err(|e| eyre!("Failed to ensure cache version {}: {}", version, e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO cache_entries (version, request_key, status, headers, body, stored_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
          version,
          key,
          response.status,
          headers_json,
          response.body,
          response.stored_at.format("%Y-%m-%d %H:%M:%S").to_string()
        ],
      )
      .map_err(|e| eyre!("Failed to store cache entry: {}", e))?;

    Ok(())
  }

  fn list_versions(&self) -> Result<Vec<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT version FROM cache_versions ORDER BY version")
      .map_err(|e| eyre!("Failed to prepare version listing: {}", e))?;

    let versions: Vec<String> = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list cache versions: {}", e))?
      .filter_map(|r| r.ok())
      .collect();

    Ok(versions)
  }

  fn delete_version(&self, version: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "DELETE FROM cache_entries WHERE version = ?",
        params![version],
      )
      .map_err(|e| eyre!("Failed to delete entries for {}: {}", version, e))?;

    conn
      .execute(
        "DELETE FROM cache_versions WHERE version = ?",
        params![version],
      )
      .map_err(|e| eyre!("Failed to delete cache version {}: {}", version, e))?;

    Ok(())
  }
}

/// In-memory content cache store.
///
/// Used by tests and by embedders that do not want persistence across
/// restarts.
#[derive(Default)]
pub struct MemoryStore {
  versions: Mutex<HashMap<String, HashMap<String, StoredResponse>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl CacheStore for MemoryStore {
  fn open(&self, version: &str) -> Result<()> {
    let mut versions = self
      .versions
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    versions.entry(version.to_string()).or_default();
    Ok(())
  }

  fn lookup(&self, version: &str, key: &str) -> Result<Option<StoredResponse>> {
    let versions = self
      .versions
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(
      versions
        .get(version)
        .and_then(|entries| entries.get(key))
        .cloned(),
    )
  }

  fn store(&self, version: &str, key: &str, response: &StoredResponse) -> Result<()> {
    let mut versions = self
      .versions
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    versions
      .entry(version.to_string())
      .or_default()
      .insert(key.to_string(), response.clone());
    Ok(())
  }

  fn list_versions(&self) -> Result<Vec<String>> {
    let versions = self
      .versions
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let mut names: Vec<String> = versions.keys().cloned().collect();
    names.sort();
    Ok(names)
  }

  fn delete_version(&self, version: &str) -> Result<()> {
    let mut versions = self
      .versions
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    versions.remove(version);
    Ok(())
  }
}

/// Parse a datetime string in SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

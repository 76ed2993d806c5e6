//! Read/drain contract over the persisted offline-record queue.
//!
//! The queue's storage engine lives in the host application; this layer only
//! consumes records and, depending on the drain policy, clears them.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};

/// One unit of data captured while offline. The payload is opaque here; the
/// layer only cares that records exist and how many there are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRecord {
  pub payload: serde_json::Value,
  pub captured_at: DateTime<Utc>,
}

impl PendingRecord {
  pub fn new(payload: serde_json::Value) -> Self {
    Self {
      payload,
      captured_at: Utc::now(),
    }
  }
}

/// Contract consumed from the host's persisted queue.
pub trait PendingQueue: Send + Sync {
  /// Read every pending record without removing it.
  fn read_all(&self) -> Result<Vec<PendingRecord>>;

  /// Remove all records.
  fn clear(&self) -> Result<()>;
}

/// In-memory queue for tests and embedders without persistence.
#[derive(Default)]
pub struct MemoryQueue {
  records: Mutex<Vec<PendingRecord>>,
}

impl MemoryQueue {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&self, record: PendingRecord) -> Result<()> {
    let mut records = self
      .records
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    records.push(record);
    Ok(())
  }
}

impl PendingQueue for MemoryQueue {
  fn read_all(&self) -> Result<Vec<PendingRecord>> {
    let records = self
      .records
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(records.clone())
  }

  fn clear(&self) -> Result<()> {
    let mut records = self
      .records
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    records.clear();
    Ok(())
  }
}

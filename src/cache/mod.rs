//! Versioned content cache for intercepted responses.
//!
//! This module provides the storage side of the interception layer:
//! - Named cache versions, exactly one of which is current
//! - Response snapshots keyed by request identity
//! - Whole-version create/enumerate/delete for lifecycle management
//! - Activation-time sweep of superseded versions

mod lifecycle;
mod storage;
mod traits;

pub use lifecycle::cleanup_stale;
pub use storage::{MemoryStore, SqliteStore};
pub use traits::CacheStore;

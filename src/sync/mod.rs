//! Offline reconciliation: draining the persisted record queue once
//! connectivity returns and summarizing the backlog to the user.

mod queue;
mod worker;

pub use queue::{MemoryQueue, PendingQueue, PendingRecord};
pub use worker::{DrainPolicy, Forwarder, HttpForwarder, ReconcileWorker};

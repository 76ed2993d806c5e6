//! Offline-first request interception layer.
//!
//! waylay sits between a web client and the network. It:
//! - selects a caching strategy per request (passthrough, navigation
//!   fallback, or cache-first)
//! - serves cached responses without waiting on the network when possible
//! - keeps a versioned content cache fresh and sweeps superseded versions
//! - drains a persisted offline-record queue when connectivity returns and
//!   summarizes the backlog to the user
//!
//! The host application stays in charge of issuing requests, persisting
//! offline records, and rendering notifications; those collaborators plug in
//! through the [`CacheStore`], [`PendingQueue`], [`Notifier`], and
//! [`NetworkClient`] traits.
//!
//! # Example
//!
//! ```ignore
//! let config = Config::load(None)?;
//! let store = Arc::new(SqliteStore::open()?);
//! let agent = Arc::new(Agent::new(
//!     config,
//!     store,
//!     Arc::new(ReqwestClient::new()),
//!     queue,
//!     notifier,
//!     Arc::new(OnceGate::new()),
//! )?);
//!
//! let (sender, receiver) = event::channel();
//! tokio::spawn(Arc::clone(&agent).run(receiver));
//!
//! sender.send(AgentEvent::Install);
//! sender.send(AgentEvent::Activate);
//! let response = sender.request(request).await?;
//! ```

pub mod agent;
pub mod cache;
pub mod config;
pub mod event;
pub mod http;
pub mod intercept;
pub mod net;
pub mod notify;
pub mod strategy;
pub mod sync;

pub use agent::Agent;
pub use cache::{CacheStore, MemoryStore, SqliteStore};
pub use config::Config;
pub use event::{AgentEvent, EventSender};
pub use http::{Request, RequestMode, Response, ResponseSource, StoredResponse};
pub use intercept::InterceptEngine;
pub use net::{NetworkClient, ReqwestClient};
pub use notify::{Notification, NotificationGate, Notifier, OnceGate};
pub use strategy::Strategy;
pub use sync::{DrainPolicy, PendingQueue, PendingRecord, ReconcileWorker};

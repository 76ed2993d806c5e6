//! Top-level wiring of the interception layer.
//!
//! The agent owns one of everything: the content cache, the network client,
//! the interception engine, the reconciliation worker, and the notification
//! gate. Boundary events from the host application dispatch into it.

use std::sync::Arc;

use color_eyre::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::cache::{cleanup_stale, CacheStore};
use crate::config::Config;
use crate::event::AgentEvent;
use crate::http::{Request, Response};
use crate::intercept::InterceptEngine;
use crate::net::NetworkClient;
use crate::notify::{Notification, NotificationGate, Notifier};
use crate::sync::{Forwarder, HttpForwarder, PendingQueue, ReconcileWorker};

/// Control-message action that requests the connection-lost notice.
const OFFLINE_NOTIFICATION_ACTION: &str = "offlineNotification";

/// The assembled interception layer.
pub struct Agent {
  config: Config,
  store: Arc<dyn CacheStore>,
  engine: InterceptEngine,
  worker: ReconcileWorker,
  notifier: Arc<dyn Notifier>,
  offline_gate: Arc<dyn NotificationGate>,
}

impl Agent {
  /// Assemble the layer from its collaborators.
  ///
  /// The queue and notifier are owned by the host application; the agent
  /// only consumes their contracts.
  pub fn new(
    config: Config,
    store: Arc<dyn CacheStore>,
    net: Arc<dyn NetworkClient>,
    queue: Arc<dyn PendingQueue>,
    notifier: Arc<dyn Notifier>,
    offline_gate: Arc<dyn NotificationGate>,
  ) -> Result<Self> {
    let fallback = config.fallback_url()?;

    let engine = InterceptEngine::new(
      Arc::clone(&store),
      net,
      config.cache_version.clone(),
      fallback,
    );

    let forwarder: Option<Arc<dyn Forwarder>> = config
      .forward_url()?
      .map(|endpoint| Arc::new(HttpForwarder::new(endpoint)) as Arc<dyn Forwarder>);

    let worker = ReconcileWorker::new(
      queue,
      Arc::clone(&notifier),
      forwarder,
      config.drain,
      config.notification_icon.clone(),
    );

    Ok(Self {
      config,
      store,
      engine,
      worker,
      notifier,
      offline_gate,
    })
  }

  /// Install: pre-populate the current cache version from the manifest.
  ///
  /// The new version takes over as soon as this returns; there is no
  /// waiting period for old clients.
  pub async fn on_install(&self) -> Result<()> {
    let manifest = self.config.manifest_urls()?;
    debug!(
      version = %self.config.cache_version,
      assets = manifest.len(),
      "Installing"
    );
    self.engine.populate(&manifest).await
  }

  /// Activate: delete every cache version but the current one.
  pub fn on_activate(&self) -> Result<()> {
    cleanup_stale(self.store.as_ref(), &self.config.cache_version)
  }

  /// Resolve one intercepted request.
  pub async fn on_request(&self, request: Request) -> Result<Response> {
    self.engine.handle(request).await
  }

  /// Deferred-sync signal. Only the configured tag triggers reconciliation.
  pub async fn on_sync(&self, tag: &str) {
    if tag != self.config.sync_tag {
      debug!(tag, "Ignoring sync signal with unknown tag");
      return;
    }
    self.worker.run().await;
  }

  /// Control message from the application.
  pub fn on_message(&self, action: &str) {
    if action != OFFLINE_NOTIFICATION_ACTION {
      debug!(action, "Ignoring unknown control message");
      return;
    }

    if !self.offline_gate.try_acquire() {
      debug!("Offline notice already shown");
      return;
    }

    let notice = Notification::connection_lost(self.config.notification_icon.clone());
    if let Err(e) = self.notifier.notify(notice) {
      warn!(error = %e, "Failed to deliver offline notice");
    }
  }

  /// Consume boundary events until the host drops its sender.
  ///
  /// Requests are answered from spawned tasks so a slow network call never
  /// stalls install, activation, or sync handling behind it.
  pub async fn run(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<AgentEvent>) {
    while let Some(event) = events.recv().await {
      match event {
        AgentEvent::Install => {
          if let Err(e) = self.on_install().await {
            error!(error = %e, "Install failed");
          }
        }
        AgentEvent::Activate => {
          if let Err(e) = self.on_activate() {
            error!(error = %e, "Activation sweep failed");
          }
        }
        AgentEvent::Request { request, respond } => {
          let agent = Arc::clone(&self);
          tokio::spawn(async move {
            let result = agent.on_request(request).await;
            // Ignore send errors - the caller may have been dropped
            let _ = respond.send(result);
          });
        }
        AgentEvent::Sync { tag } => self.on_sync(&tag).await,
        AgentEvent::Message { action } => self.on_message(&action),
      }
    }
  }
}

//! Background reconciliation of offline records.

use std::sync::Arc;

use color_eyre::{eyre::eyre, Result};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use url::Url;

use super::queue::{PendingQueue, PendingRecord};
use crate::notify::{Notification, Notifier};

/// What happens to the queue after a reconciliation run.
///
/// Under `NotifyOnly` the queue is never drained and growth is unbounded;
/// pick a clearing policy when the host does not prune records itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainPolicy {
  /// Notify only; records stay queued for the next trigger.
  #[default]
  NotifyOnly,
  /// Clear the queue as soon as the summary notification is delivered.
  ClearAfterNotify,
  /// Forward the batch to the remote endpoint and clear only on confirmed
  /// delivery.
  ClearAfterForward,
}

/// Delivery contract for forwarding batched records to a remote endpoint.
pub trait Forwarder: Send + Sync {
  fn forward(&self, records: Vec<PendingRecord>) -> BoxFuture<'static, Result<()>>;
}

/// reqwest-backed forwarder posting the batch as JSON.
pub struct HttpForwarder {
  client: reqwest::Client,
  endpoint: Url,
}

impl HttpForwarder {
  pub fn new(endpoint: Url) -> Self {
    Self {
      client: reqwest::Client::new(),
      endpoint,
    }
  }
}

impl Forwarder for HttpForwarder {
  fn forward(&self, records: Vec<PendingRecord>) -> BoxFuture<'static, Result<()>> {
    let client = self.client.clone();
    let endpoint = self.endpoint.clone();

    Box::pin(async move {
      let response = client
        .post(endpoint.clone())
        .json(&records)
        .send()
        .await
        .map_err(|e| eyre!("Failed to forward records to {}: {}", endpoint, e))?;

      if !response.status().is_success() {
        return Err(eyre!(
          "Forward endpoint {} answered {}",
          endpoint,
          response.status()
        ));
      }

      Ok(())
    })
  }
}

/// Drains the persisted offline queue when a deferred-sync signal fires.
///
/// One run delivers at most one notification: the summary when records are
/// pending, or the sync-error notice when anything in the run fails. A
/// failure never propagates out of [`run`](Self::run).
pub struct ReconcileWorker {
  queue: Arc<dyn PendingQueue>,
  notifier: Arc<dyn Notifier>,
  forwarder: Option<Arc<dyn Forwarder>>,
  policy: DrainPolicy,
  icon: Option<String>,
}

impl ReconcileWorker {
  pub fn new(
    queue: Arc<dyn PendingQueue>,
    notifier: Arc<dyn Notifier>,
    forwarder: Option<Arc<dyn Forwarder>>,
    policy: DrainPolicy,
    icon: Option<String>,
  ) -> Self {
    Self {
      queue,
      notifier,
      forwarder,
      policy,
      icon,
    }
  }

  /// Run one reconciliation pass, absorbing every failure.
  pub async fn run(&self) {
    if let Err(e) = self.reconcile().await {
      warn!(error = %e, "Reconciliation failed");
      if let Err(e) = self.notifier.notify(Notification::sync_error(self.icon.clone())) {
        error!(error = %e, "Failed to deliver sync-error notification");
      }
    }
  }

  async fn reconcile(&self) -> Result<()> {
    let records = self.queue.read_all()?;

    if records.is_empty() {
      debug!("No pending offline records");
      return Ok(());
    }

    let count = records.len();

    // Forward before notifying so a failed delivery surfaces as the error
    // notice instead of a summary followed by an error.
    if self.policy == DrainPolicy::ClearAfterForward {
      let forwarder = self.forwarder.as_ref().ok_or_else(|| {
        eyre!("Drain policy requires a forward endpoint but none is configured")
      })?;
      forwarder.forward(records).await?;
    }

    self
      .notifier
      .notify(Notification::sync_summary(count, self.icon.clone()))?;

    match self.policy {
      DrainPolicy::NotifyOnly => {}
      DrainPolicy::ClearAfterNotify | DrainPolicy::ClearAfterForward => self.queue.clear()?,
    }

    debug!(count, policy = ?self.policy, "Reconciliation pass complete");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::notify::MemoryNotifier;
  use crate::sync::queue::MemoryQueue;
  use serde_json::json;
  use std::sync::Mutex;

  struct FailingQueue;

  impl PendingQueue for FailingQueue {
    fn read_all(&self) -> Result<Vec<PendingRecord>> {
      Err(eyre!("queue unreadable"))
    }

    fn clear(&self) -> Result<()> {
      Ok(())
    }
  }

  struct FnForwarder<F>(F);

  impl<F> Forwarder for FnForwarder<F>
  where
    F: Fn(Vec<PendingRecord>) -> Result<()> + Send + Sync,
  {
    fn forward(&self, records: Vec<PendingRecord>) -> BoxFuture<'static, Result<()>> {
      let result = (self.0)(records);
      Box::pin(async move { result })
    }
  }

  fn queue_with(n: usize) -> Arc<MemoryQueue> {
    let queue = Arc::new(MemoryQueue::new());
    for i in 0..n {
      queue.push(PendingRecord::new(json!({"id": i}))).unwrap();
    }
    queue
  }

  fn worker(
    queue: Arc<MemoryQueue>,
    notifier: Arc<MemoryNotifier>,
    policy: DrainPolicy,
  ) -> ReconcileWorker {
    ReconcileWorker::new(queue, notifier, None, policy, None)
  }

  #[tokio::test]
  async fn test_empty_queue_produces_no_notification() {
    let notifier = Arc::new(MemoryNotifier::default());
    worker(queue_with(0), Arc::clone(&notifier), DrainPolicy::NotifyOnly)
      .run()
      .await;

    assert!(notifier.sent().is_empty());
  }

  #[tokio::test]
  async fn test_pending_records_produce_one_summary_with_count() {
    let notifier = Arc::new(MemoryNotifier::default());
    worker(queue_with(3), Arc::clone(&notifier), DrainPolicy::NotifyOnly)
      .run()
      .await;

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].tag, "sync-summary");
    assert!(sent[0].body.contains('3'));
  }

  #[tokio::test]
  async fn test_notify_only_leaves_queue_intact() {
    let queue = queue_with(2);
    let notifier = Arc::new(MemoryNotifier::default());
    worker(Arc::clone(&queue), notifier, DrainPolicy::NotifyOnly)
      .run()
      .await;

    assert_eq!(queue.read_all().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn test_clear_after_notify_drains_queue() {
    let queue = queue_with(2);
    let notifier = Arc::new(MemoryNotifier::default());
    worker(Arc::clone(&queue), notifier, DrainPolicy::ClearAfterNotify)
      .run()
      .await;

    assert!(queue.read_all().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_repeated_triggers_each_notify_once() {
    let queue = queue_with(2);
    let notifier = Arc::new(MemoryNotifier::default());
    let worker = worker(queue, Arc::clone(&notifier), DrainPolicy::NotifyOnly);

    worker.run().await;
    worker.run().await;

    // Idempotent per trigger, not deduplicated across triggers
    assert_eq!(notifier.sent().len(), 2);
  }

  #[tokio::test]
  async fn test_queue_read_failure_surfaces_as_sync_error() {
    let notifier = Arc::new(MemoryNotifier::default());
    let worker = ReconcileWorker::new(
      Arc::new(FailingQueue),
      Arc::clone(&notifier) as Arc<dyn Notifier>,
      None,
      DrainPolicy::NotifyOnly,
      None,
    );

    worker.run().await;

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].tag, "sync-error");
  }

  #[tokio::test]
  async fn test_confirmed_forward_clears_queue() {
    let queue = queue_with(2);
    let notifier = Arc::new(MemoryNotifier::default());
    let forwarded = Arc::new(Mutex::new(0usize));
    let forwarded_clone = Arc::clone(&forwarded);

    let worker = ReconcileWorker::new(
      Arc::clone(&queue) as Arc<dyn PendingQueue>,
      Arc::clone(&notifier) as Arc<dyn Notifier>,
      Some(Arc::new(FnForwarder(move |records: Vec<PendingRecord>| {
        *forwarded_clone.lock().unwrap() = records.len();
        Ok(())
      }))),
      DrainPolicy::ClearAfterForward,
      None,
    );

    worker.run().await;

    assert_eq!(*forwarded.lock().unwrap(), 2);
    assert!(queue.read_all().unwrap().is_empty());
    assert_eq!(notifier.sent().len(), 1);
    assert_eq!(notifier.sent()[0].tag, "sync-summary");
  }

  #[tokio::test]
  async fn test_failed_forward_keeps_queue_and_reports_error() {
    let queue = queue_with(2);
    let notifier = Arc::new(MemoryNotifier::default());

    let worker = ReconcileWorker::new(
      Arc::clone(&queue) as Arc<dyn PendingQueue>,
      Arc::clone(&notifier) as Arc<dyn Notifier>,
      Some(Arc::new(FnForwarder(|_: Vec<PendingRecord>| {
        Err(eyre!("endpoint down"))
      }))),
      DrainPolicy::ClearAfterForward,
      None,
    );

    worker.run().await;

    assert_eq!(queue.read_all().unwrap().len(), 2);
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].tag, "sync-error");
  }

  #[tokio::test]
  async fn test_forward_policy_without_forwarder_reports_error() {
    let notifier = Arc::new(MemoryNotifier::default());
    let worker = worker(
      queue_with(1),
      Arc::clone(&notifier),
      DrainPolicy::ClearAfterForward,
    );

    worker.run().await;

    assert_eq!(notifier.sent().len(), 1);
    assert_eq!(notifier.sent()[0].tag, "sync-error");
  }
}

//! User notification boundary.
//!
//! The interception layer never renders anything itself; it hands fixed
//! messages to an injected [`Notifier`]. Deduplication of the offline notice
//! goes through an injected, resettable [`NotificationGate`] rather than a
//! process-global flag, so embedders and tests control its scope.

use std::sync::atomic::{AtomicBool, Ordering};

use color_eyre::Result;
use tracing::info;

/// A message handed to the user-notification channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub title: String,
  pub body: String,
  pub icon: Option<String>,
  pub tag: String,
}

impl Notification {
  /// Fixed notice shown when the application reports lost connectivity.
  pub fn connection_lost(icon: Option<String>) -> Self {
    Self {
      title: "Connection lost".to_string(),
      body: "You are offline. Please check your internet connection.".to_string(),
      icon,
      tag: "offline-notification".to_string(),
    }
  }

  /// Summary delivered once per reconciliation run with pending records.
  pub fn sync_summary(pending: usize, icon: Option<String>) -> Self {
    Self {
      title: "Offline records pending".to_string(),
      body: format!("{} record(s) captured offline are waiting to sync.", pending),
      icon,
      tag: "sync-summary".to_string(),
    }
  }

  /// Distinct notice for a reconciliation run that failed outright.
  pub fn sync_error(icon: Option<String>) -> Self {
    Self {
      title: "Sync failed".to_string(),
      body: "Offline records could not be checked. They will be retried.".to_string(),
      icon,
      tag: "sync-error".to_string(),
    }
  }
}

/// Delivery contract for user notifications.
///
/// Delivery is fire-and-forget from the layer's point of view; errors are
/// caught and logged at the call sites that care.
pub trait Notifier: Send + Sync {
  fn notify(&self, notification: Notification) -> Result<()>;
}

/// Default notifier that only logs. Embedders supply a real channel.
pub struct LogNotifier;

impl Notifier for LogNotifier {
  fn notify(&self, notification: Notification) -> Result<()> {
    info!(
      title = %notification.title,
      body = %notification.body,
      tag = %notification.tag,
      "Notification"
    );
    Ok(())
  }
}

/// Notifier that retains every delivery in memory. Used by tests and by
/// embedders that poll for messages instead of receiving them.
#[derive(Default)]
pub struct MemoryNotifier {
  sent: std::sync::Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn sent(&self) -> Vec<Notification> {
    self.sent.lock().map(|s| s.clone()).unwrap_or_default()
  }
}

impl Notifier for MemoryNotifier {
  fn notify(&self, notification: Notification) -> Result<()> {
    self
      .sent
      .lock()
      .map_err(|e| color_eyre::eyre::eyre!("Lock poisoned: {}", e))?
      .push(notification);
    Ok(())
  }
}

/// Gate deciding whether a deduplicated notification may fire.
pub trait NotificationGate: Send + Sync {
  /// Returns true exactly when the caller may deliver; marks the gate shown.
  fn try_acquire(&self) -> bool;

  /// Re-arm the gate.
  fn reset(&self);
}

/// One-shot gate backed by an atomic flag.
#[derive(Default)]
pub struct OnceGate {
  shown: AtomicBool,
}

impl OnceGate {
  pub fn new() -> Self {
    Self::default()
  }
}

impl NotificationGate for OnceGate {
  fn try_acquire(&self) -> bool {
    !self.shown.swap(true, Ordering::SeqCst)
  }

  fn reset(&self) {
    self.shown.store(false, Ordering::SeqCst);
  }
}

//! Boundary events raised into the interception layer by the host
//! application.

use color_eyre::Result;
use tokio::sync::{mpsc, oneshot};

use crate::http::{Request, Response};

/// Events consumed by the agent's run loop.
#[derive(Debug)]
pub enum AgentEvent {
  /// A new version is being installed; pre-populate its cache.
  Install,
  /// The new version took over; sweep superseded cache generations.
  Activate,
  /// An intercepted request. The resolved response (or failure) is sent
  /// back on `respond`.
  Request {
    request: Request,
    respond: oneshot::Sender<Result<Response>>,
  },
  /// A deferred-sync signal with its tag.
  Sync { tag: String },
  /// A control message from the application, identified by action name.
  Message { action: String },
}

/// Sender half handed to the host application.
#[derive(Clone)]
pub struct EventSender {
  tx: mpsc::UnboundedSender<AgentEvent>,
}

impl EventSender {
  pub fn send(&self, event: AgentEvent) {
    // A dropped receiver means the agent is gone; nothing left to notify.
    let _ = self.tx.send(event);
  }

  /// Raise a request event and await its resolution.
  pub async fn request(&self, request: Request) -> Result<Response> {
    let (respond, rx) = oneshot::channel();
    self.send(AgentEvent::Request { request, respond });
    rx.await
      .map_err(|_| color_eyre::eyre::eyre!("Interception layer shut down before responding"))?
  }
}

/// Create the event channel between the host and the agent run loop.
pub fn channel() -> (EventSender, mpsc::UnboundedReceiver<AgentEvent>) {
  let (tx, rx) = mpsc::unbounded_channel();
  (EventSender { tx }, rx)
}

//! User-facing alert channel.
//!
//! Alerts carry a human-readable message only; no structured error code is passed on.

use tokio::sync::broadcast;

/// An error to show the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct AlertService {
    tx: broadcast::Sender<Alert>,
}

impl AlertService {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
        self.tx.subscribe()
    }

    /// Sends `message` verbatim to every current listener.
    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(%message, "error alert");
        // No subscribers means nobody is displaying alerts right now.
        let _ = self.tx.send(Alert { message });
    }
}

impl Default for AlertService {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_EVENT_CAPACITY)
    }
}

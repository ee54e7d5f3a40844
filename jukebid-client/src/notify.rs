//! Non-blocking user notification surface
//!
//! Fans notifications out to every mounted view. Failures surface here
//! instead of blocking the session loop; a view that went away is
//! cleaned up on the next publish.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use jukebid_core::models::generate_id;

/// Notification severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// One user-facing notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// In-memory hub routing notifications to subscribed views
#[derive(Clone, Default)]
pub struct NotificationHub {
    subscribers: Arc<DashMap<String, mpsc::UnboundedSender<Notification>>>,
}

impl NotificationHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a view; returns its id and the notification stream
    #[must_use]
    pub fn subscribe(&self) -> (String, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber_id = generate_id();
        self.subscribers.insert(subscriber_id.clone(), tx);
        debug!(subscriber_id = %subscriber_id, "View subscribed to notifications");
        (subscriber_id, rx)
    }

    pub fn unsubscribe(&self, subscriber_id: &str) {
        self.subscribers.remove(subscriber_id);
    }

    /// Deliver to all live subscribers, pruning dead ones
    pub fn publish(&self, notification: &Notification) {
        let mut dead = Vec::new();

        for entry in self.subscribers.iter() {
            if entry.value().send(notification.clone()).is_err() {
                dead.push(entry.key().clone());
            }
        }

        for subscriber_id in dead {
            warn!(subscriber_id = %subscriber_id, "Pruning dead notification subscriber");
            self.subscribers.remove(&subscriber_id);
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

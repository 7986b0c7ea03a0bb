//! "Presence changed" notifications.
//!
//! A presence write and its notification are two separate steps that fail
//! independently. The store write is the durable fact; the notification is
//! best effort and is published at most once per write. Observers that need
//! guaranteed delivery poll the store instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::interval::PersonId;
use crate::presence::{PresenceOverride, PresenceStatus};

/// Wire payload announced to observers on every presence write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceChanged {
    pub person_id: PersonId,
    pub status: PresenceStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<&PresenceOverride> for PresenceChanged {
    fn from(p: &PresenceOverride) -> Self {
        Self {
            person_id: p.person_id.clone(),
            status: p.status,
            expires_at: p.expires_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("transport error: {0}")]
    Transport(String),
}

/// Outcome of the notification step of a presence write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "delivery", rename_all = "snake_case")]
pub enum Delivery {
    /// Handed to the channel; `receivers` observers were subscribed.
    Published { receivers: usize },
    /// Not delivered. The store write still stands.
    Failed { reason: String },
}

/// Publish capability for presence changes.
///
/// Callers invoke `publish` exactly once per successful write and never retry.
pub trait PresenceNotifier: Send + Sync {
    /// Returns the number of observers the event was handed to.
    fn publish(&self, event: &PresenceChanged) -> Result<usize, PublishError>;
}

/// Fan-out over a `tokio::sync::broadcast` channel.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<PresenceChanged>,
}

impl BroadcastNotifier {
    /// A channel buffering up to `capacity` events per lagging observer.
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PresenceChanged> {
        self.sender.subscribe()
    }
}

impl PresenceNotifier for BroadcastNotifier {
    fn publish(&self, event: &PresenceChanged) -> Result<usize, PublishError> {
        // With no subscribers there is nobody to tell; that is not a failure.
        Ok(self.sender.send(event.clone()).unwrap_or(0))
    }
}

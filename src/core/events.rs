use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Event published by the cache layer to the host
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheEvent {
    /// A version activation completed; stale namespaces were dropped
    CacheUpdated { version: String, timestamp_ms: u64 },
}

/// Control message sent by the host to the interceptor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate the current version immediately, dropping stale namespaces
    SkipWaiting,
    /// Run quota enforcement now
    CacheCleanup,
}

/// Typed publish/subscribe channel owned by the host process.
///
/// Replaces an ambient notification channel: consumers subscribe
/// explicitly and receive every event published after subscription.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<Vec<mpsc::UnboundedSender<CacheEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to cache events
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<CacheEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Publish an event to all live subscribers, pruning closed channels
    pub fn publish(&self, event: CacheEvent) {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        debug!(?event, subscribers = subscribers.len(), "event published");
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

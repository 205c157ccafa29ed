//! Bounded queues with an explicit backpressure policy.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;

use crate::metrics::NodeMetrics;
use crate::NodeError;

/// What a producer does when the queue is full.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuePolicy {
    /// Wait for room.
    Block,
    /// Drop the item being sent and count it.
    DropNewest,
}

/// Sending half of a named bounded queue.
pub struct QueueSender<T> {
    name: &'static str,
    policy: QueuePolicy,
    tx: mpsc::Sender<T>,
    metrics: Arc<NodeMetrics>,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            policy: self.policy,
            tx: self.tx.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// Create a queue of `capacity` items.
pub fn bounded<T>(
    name: &'static str,
    capacity: usize,
    policy: QueuePolicy,
    metrics: Arc<NodeMetrics>,
) -> (QueueSender<T>, mpsc::Receiver<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        QueueSender {
            name,
            policy,
            tx,
            metrics,
        },
        rx,
    )
}

impl<T> QueueSender<T> {
    /// Send according to the queue's policy.
    ///
    /// Returns `Ok(false)` if the item was dropped on a full `DropNewest`
    /// queue. A closed queue is an error under either policy.
    pub async fn send(&self, item: T) -> Result<bool, NodeError> {
        match self.policy {
            QueuePolicy::Block => {
                self.tx
                    .send(item)
                    .await
                    .map_err(|_| NodeError::QueueClosed(self.name))?;
                Ok(true)
            }
            QueuePolicy::DropNewest => self.try_send(item),
        }
    }

    /// Never waits, whatever the policy.
    pub fn try_send(&self, item: T) -> Result<bool, NodeError> {
        match self.tx.try_send(item) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => {
                warn!(queue = self.name, "queue full, dropping");
                self.metrics.dropped(self.name);
                Ok(false)
            }
            Err(TrySendError::Closed(_)) => Err(NodeError::QueueClosed(self.name)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn policy(&self) -> QueuePolicy {
        self.policy
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drop_newest_counts_overflow() {
        let metrics = Arc::new(NodeMetrics::new());
        let (tx, mut rx) = bounded::<u32>("invalid", 2, QueuePolicy::DropNewest, Arc::clone(&metrics));
        assert!(tx.send(1).await.unwrap());
        assert!(tx.send(2).await.unwrap());
        assert!(!tx.send(3).await.unwrap());
        assert_eq!(
            metrics.messages_dropped.with_label_values(&["invalid"]).get(),
            1
        );
        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));
    }

    #[tokio::test]
    async fn block_waits_for_room() {
        let metrics = Arc::new(NodeMetrics::new());
        let (tx, mut rx) = bounded::<u32>("outbound", 1, QueuePolicy::Block, metrics);
        tx.send(1).await.unwrap();
        let sender = tx.clone();
        let pending = tokio::spawn(async move { sender.send(2).await });
        assert_eq!(rx.recv().await, Some(1));
        assert!(pending.await.unwrap().unwrap());
        assert_eq!(rx.recv().await, Some(2));
    }

    #[tokio::test]
    async fn closed_queue_is_an_error() {
        let metrics = Arc::new(NodeMetrics::new());
        let (tx, rx) = bounded::<u32>("commits", 4, QueuePolicy::Block, metrics);
        drop(rx);
        assert!(tx.is_closed());
        assert!(matches!(tx.send(1).await, Err(NodeError::QueueClosed("commits"))));
        assert!(matches!(tx.try_send(1), Err(NodeError::QueueClosed("commits"))));
    }

    #[test]
    fn policy_names_in_config() {
        let policy: QueuePolicy = serde_json::from_str("\"drop_newest\"").unwrap();
        assert_eq!(policy, QueuePolicy::DropNewest);
    }
}

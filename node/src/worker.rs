//! One task per leader slot, owning that slot's election.
//!
//! The election is never shared: the worker is its only writer, so no lock
//! is involved. Outbound votes and commit announcements go to the outbound
//! queue (blocking), accepted volunteers are re-advertised on the inventory
//! queue (best effort) and a commit is handed to block production through
//! the commits queue.

use std::sync::Arc;

use fedchain_consensus::Election;
use fedchain_messages::Message;
use fedchain_types::{DbHeight, IdentityChainId, SlotIndex};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info};

use crate::metrics::NodeMetrics;
use crate::queues::QueueSender;
use crate::NodeError;

/// A slot whose election reached quorum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedSlot {
    pub slot: SlotIndex,
    pub height: DbHeight,
    pub winner: IdentityChainId,
}

/// Queues a worker writes to.
#[derive(Clone)]
pub struct WorkerOutputs {
    pub outbound: QueueSender<Message>,
    pub inventory: QueueSender<Message>,
    pub commits: QueueSender<CommittedSlot>,
}

pub struct SlotWorker {
    election: Election,
    inbox: mpsc::Receiver<Message>,
    outputs: WorkerOutputs,
    metrics: Arc<NodeMetrics>,
    shutdown: broadcast::Receiver<()>,
    consumed: u64,
}

impl SlotWorker {
    pub fn new(
        election: Election,
        inbox: mpsc::Receiver<Message>,
        outputs: WorkerOutputs,
        metrics: Arc<NodeMetrics>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            election,
            inbox,
            outputs,
            metrics,
            shutdown,
            consumed: 0,
        }
    }

    /// Process messages until shutdown or until the inbox closes, then hand
    /// the election back.
    pub async fn run(mut self) -> Result<Election, NodeError> {
        loop {
            tokio::select! {
                _ = self.shutdown.recv() => break,
                next = self.inbox.recv() => match next {
                    Some(message) => match self.handle(message).await {
                        Ok(()) => {}
                        Err(NodeError::QueueClosed(queue)) => {
                            debug!(queue, "output queue closed, worker stopping");
                            break;
                        }
                        Err(e) => return Err(e),
                    },
                    None => break,
                },
            }
        }
        Ok(self.election)
    }

    async fn handle(&mut self, message: Message) -> Result<(), NodeError> {
        let was_terminal = self.election.is_terminal();
        let was_halted = self.election.is_halted();
        self.consumed += 1;

        let execution = self.election.execute(&message);
        if let Some(rejection) = execution.rejection {
            self.metrics.rejected(rejection.as_str());
        }
        if execution.changed {
            match &message {
                Message::Vote(_) => self.metrics.votes_counted.inc(),
                Message::Volunteer(_) => {
                    self.outputs.inventory.send(message.clone()).await?;
                }
                _ => {}
            }
        }
        for outbound in execution.outbound {
            self.outputs.outbound.send(outbound).await?;
        }

        if !was_halted && self.election.is_halted() {
            self.metrics.safety_violations.inc();
            error!(
                slot = self.election.slot(),
                violation = ?self.election.violation(),
                "slot halted"
            );
        }
        if !was_terminal && self.election.is_terminal() {
            self.metrics.open_elections.dec();
            self.on_terminal().await?;
        }
        Ok(())
    }

    async fn on_terminal(&mut self) -> Result<(), NodeError> {
        if self.election.is_halted() {
            return Ok(());
        }
        let Some(winner) = self.election.committed_winner() else {
            self.metrics.elections_expired.inc();
            return Ok(());
        };
        self.metrics.elections_committed.inc();
        self.metrics.messages_to_commit.observe(self.consumed as f64);
        info!(
            slot = self.election.slot(),
            winner = ?winner,
            messages = self.consumed,
            "slot replacement committed"
        );
        self.outputs
            .commits
            .send(CommittedSlot {
                slot: self.election.slot(),
                height: self.election.height(),
                winner,
            })
            .await?;
        Ok(())
    }
}

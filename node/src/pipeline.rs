//! Wiring: network intake → validator → per-slot workers → outbound.
//!
//! ```text
//!  inbound ─► router ─┬─► slot 0 worker ─┐
//!  control ─┘         ├─► slot 1 worker ─┼─► outbound / inventory / commits
//!                     ├─► slot n worker ─┘
//!                     ├─► leader (block production)
//!                     └─► invalid
//! ```
//!
//! The router owns the [`Validator`] and the [`FaultMonitor`]. Only the
//! control queue, fed by the local clock and the block layer, reaches the
//! monitor. On a tick the router forwards the tick to every slot, refreshes
//! its registry snapshot and asks the monitor whether a leader faulted; a
//! volunteer this node produces goes to the local slot worker and to the
//! peers.

use std::sync::{Arc, RwLock};

use fedchain_consensus::{Controller, Election, FaultAction, FaultMonitor, SharedContext};
use fedchain_messages::{BlockKind, BlockMessage, Message, Tick};
use fedchain_registry::{AuthorityRegistry, AuthoritySet};
use fedchain_types::{DbHeight, IdentityChainId, PrivateKey, SlotIndex};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};

use crate::config::NodeConfig;
use crate::metrics::NodeMetrics;
use crate::queues::{bounded, QueueSender};
use crate::router::{Route, Validator};
use crate::shutdown::ShutdownController;
use crate::tracing_spans::{router_span, slot_span};
use crate::worker::{CommittedSlot, SlotWorker, WorkerOutputs};
use crate::NodeError;

/// A message the validator or an election refused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidMessage {
    pub message: Message,
    pub reason: fedchain_consensus::Rejection,
}

/// Trusted, locally generated input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Control {
    /// The local clock closed a minute.
    Tick(Tick),
    /// The block layer accepted a leader's signed end-of-minute.
    Synced(BlockMessage),
}

/// The receiving ends of everything the pipeline produces.
pub struct PipelineOutputs {
    /// Votes, commit announcements and own volunteers for peers.
    pub outbound: mpsc::Receiver<Message>,
    /// Accepted volunteers to re-advertise.
    pub inventory: mpsc::Receiver<Message>,
    pub commits: mpsc::Receiver<CommittedSlot>,
    pub leader: mpsc::Receiver<BlockMessage>,
    pub invalid: mpsc::Receiver<InvalidMessage>,
}

/// A running pipeline.
pub struct PipelineHandle {
    /// Network intake.
    pub inbound: QueueSender<Message>,
    /// Local clock and block-layer intake.
    pub control: QueueSender<Control>,
    local: IdentityChainId,
    height: DbHeight,
    registry: Arc<RwLock<AuthorityRegistry>>,
    router: Option<JoinHandle<Result<(), NodeError>>>,
    workers: Vec<JoinHandle<Result<Election, NodeError>>>,
}

/// Start the router and one worker per leader slot at `height`.
///
/// Must be called from within a tokio runtime.
pub fn spawn_pipeline(
    config: &NodeConfig,
    registry: Arc<RwLock<AuthorityRegistry>>,
    height: DbHeight,
    local: IdentityChainId,
    key: PrivateKey,
    metrics: Arc<NodeMetrics>,
    shutdown: &ShutdownController,
) -> Result<(PipelineHandle, PipelineOutputs), NodeError> {
    let authorities = snapshot(&registry, height)?;
    let context = Arc::new(
        SharedContext::new(Arc::clone(&authorities), local, key)
            .with_network(config.network)
            .with_election_window(config.election_window),
    );
    let elections = Controller::new(Arc::clone(&context))?.into_elections();

    let q = &config.queues;
    let (inbound_tx, inbound_rx) = bounded("inbound", q.capacity, q.inbound, Arc::clone(&metrics));
    let (control_tx, control_rx) = bounded("control", q.capacity, q.control, Arc::clone(&metrics));
    let (outbound_tx, outbound_rx) =
        bounded("outbound", q.capacity, q.outbound, Arc::clone(&metrics));
    let (inventory_tx, inventory_rx) =
        bounded("inventory", q.capacity, q.inventory, Arc::clone(&metrics));
    let (commits_tx, commits_rx) = bounded("commits", q.capacity, q.commits, Arc::clone(&metrics));
    let (leader_tx, leader_rx) = bounded("leader", q.capacity, q.leader, Arc::clone(&metrics));
    let (invalid_tx, invalid_rx) = bounded("invalid", q.capacity, q.invalid, Arc::clone(&metrics));

    let outputs = WorkerOutputs {
        outbound: outbound_tx.clone(),
        inventory: inventory_tx,
        commits: commits_tx,
    };

    let mut slots = Vec::with_capacity(elections.len());
    let mut workers = Vec::with_capacity(elections.len());
    for election in elections {
        let slot = election.slot();
        let (tx, rx) = bounded("election", q.capacity, q.election, Arc::clone(&metrics));
        slots.push(tx);
        let worker = SlotWorker::new(
            election,
            rx,
            outputs.clone(),
            Arc::clone(&metrics),
            shutdown.subscribe(),
        );
        workers.push(tokio::spawn(
            worker.run().instrument(slot_span(&local, slot, height)),
        ));
    }
    metrics.open_elections.add(slots.len() as i64);

    let router = Router {
        validator: Validator::new(authorities, config.network),
        monitor: FaultMonitor::new(context),
        registry: Arc::clone(&registry),
        height,
        slots,
        outbound: outbound_tx,
        leader: leader_tx,
        invalid: invalid_tx,
        metrics,
        inbound: inbound_rx,
        control: control_rx,
        shutdown: shutdown.subscribe(),
    };
    let router = tokio::spawn(router.run().instrument(router_span(&local, height)));
    info!(node = ?local, %height, slots = workers.len(), "pipeline started");

    Ok((
        PipelineHandle {
            inbound: inbound_tx,
            control: control_tx,
            local,
            height,
            registry,
            router: Some(router),
            workers,
        },
        PipelineOutputs {
            outbound: outbound_rx,
            inventory: inventory_rx,
            commits: commits_rx,
            leader: leader_rx,
            invalid: invalid_rx,
        },
    ))
}

fn snapshot(
    registry: &RwLock<AuthorityRegistry>,
    height: DbHeight,
) -> Result<Arc<AuthoritySet>, NodeError> {
    let registry = registry.read().map_err(|_| NodeError::RegistryPoisoned)?;
    Ok(registry.snapshot(height))
}

impl PipelineHandle {
    pub fn local(&self) -> IdentityChainId {
        self.local
    }

    pub fn height(&self) -> DbHeight {
        self.height
    }

    pub fn registry(&self) -> &Arc<RwLock<AuthorityRegistry>> {
        &self.registry
    }

    /// Wait for every task to stop (after shutdown) and return the
    /// elections in slot order.
    pub async fn join(&mut self) -> Result<Vec<Election>, NodeError> {
        if let Some(router) = self.router.take() {
            router.await.map_err(|e| NodeError::Task(e.to_string()))??;
        }
        let mut elections = Vec::with_capacity(self.workers.len());
        for worker in self.workers.drain(..) {
            elections.push(worker.await.map_err(|e| NodeError::Task(e.to_string()))??);
        }
        Ok(elections)
    }
}

struct Router {
    validator: Validator,
    monitor: FaultMonitor,
    registry: Arc<RwLock<AuthorityRegistry>>,
    height: DbHeight,
    slots: Vec<QueueSender<Message>>,
    outbound: QueueSender<Message>,
    leader: QueueSender<BlockMessage>,
    invalid: QueueSender<InvalidMessage>,
    metrics: Arc<NodeMetrics>,
    inbound: mpsc::Receiver<Message>,
    control: mpsc::Receiver<Control>,
    shutdown: broadcast::Receiver<()>,
}

impl Router {
    async fn run(mut self) -> Result<(), NodeError> {
        loop {
            tokio::select! {
                _ = self.shutdown.recv() => break,
                next = self.inbound.recv() => {
                    let Some(message) = next else { break };
                    if stopped(self.route(message).await)? {
                        break;
                    }
                }
                Some(control) = self.control.recv() => {
                    if stopped(self.on_control(control).await)? {
                        break;
                    }
                }
            }
        }
        debug!("router stopped");
        Ok(())
    }

    async fn route(&mut self, message: Message) -> Result<(), NodeError> {
        self.metrics.messages_received.inc();
        match self.validator.classify(message) {
            Route::Invalid { message, reason } => {
                if reason.is_stale() {
                    debug!(reason = reason.as_str(), %message, "stale message discarded");
                } else {
                    warn!(reason = reason.as_str(), %message, "invalid message discarded");
                }
                self.metrics.rejected(reason.as_str());
                self.invalid.send(InvalidMessage { message, reason }).await?;
            }
            Route::Election { slot, message } => {
                self.metrics.messages_validated.inc();
                self.slot(slot)?.send(message).await?;
            }
            Route::Leader(block) => {
                self.metrics.messages_validated.inc();
                self.leader.send(block).await?;
            }
        }
        Ok(())
    }

    async fn on_control(&mut self, control: Control) -> Result<(), NodeError> {
        match control {
            Control::Synced(block) if block.kind == BlockKind::Eom => {
                let status = self.monitor.observe_eom(&block);
                debug!(sender = ?block.sender, ?status, "eom");
            }
            Control::Synced(block) => {
                debug!(kind = ?block.kind, "ignoring non-eom sync report");
            }
            Control::Tick(tick) => {
                for slot in &self.slots {
                    slot.send(Message::Tick(tick)).await?;
                }
                self.validator.refresh(snapshot(&self.registry, self.height)?);
                self.on_timeout(tick).await?;
            }
        }
        Ok(())
    }

    async fn on_timeout(&mut self, tick: Tick) -> Result<(), NodeError> {
        match self.monitor.on_timeout(&tick) {
            FaultAction::Fault {
                slot,
                round,
                volunteer: Some(volunteer),
            } => {
                self.metrics.volunteers_sent.inc();
                info!(slot, round, "volunteering for faulted slot");
                let message = Message::Volunteer(volunteer);
                self.slot(slot)?.send(message.clone()).await?;
                self.outbound.send(message).await?;
            }
            FaultAction::Fault { slot, round, .. } => {
                debug!(slot, round, "leader faulted, another audit server volunteers");
            }
            action => debug!(?action, "minute closed"),
        }
        Ok(())
    }

    fn slot(&self, slot: SlotIndex) -> Result<&QueueSender<Message>, NodeError> {
        self.slots.get(slot).ok_or_else(|| {
            NodeError::Consensus(fedchain_consensus::ConsensusError::InvalidSlot {
                slot,
                slots: self.slots.len(),
            })
        })
    }
}

/// `Ok(true)` when a downstream queue closed and the router should stop.
fn stopped(result: Result<(), NodeError>) -> Result<bool, NodeError> {
    match result {
        Ok(()) => Ok(false),
        Err(NodeError::QueueClosed(queue)) => {
            debug!(queue, "output queue closed, router stopping");
            Ok(true)
        }
        Err(e) => Err(e),
    }
}

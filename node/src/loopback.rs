//! In-process network connecting several pipelines.
//!
//! Every message a node puts on its outbound or inventory queue is encoded
//! with the wire codec, decoded again and pushed into the inbound queue of
//! every other node. [`simulate`] uses it to run a whole federation through
//! a leader fault.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use fedchain_consensus::ConsensusError;
use fedchain_messages::{decode, encode, BlockKind, BlockMessage, Message, Tick};
use fedchain_registry::{AuthorityRegistry, AuthorityStatus, KeyType};
use fedchain_search::Roster;
use fedchain_types::{DbHeight, IdentityChainId};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn, Instrument};

use crate::config::NodeConfig;
use crate::metrics::NodeMetrics;
use crate::pipeline::{spawn_pipeline, Control, PipelineHandle, PipelineOutputs};
use crate::queues::QueueSender;
use crate::shutdown::ShutdownController;
use crate::tracing_spans::pump_span;
use crate::worker::CommittedSlot;
use crate::NodeError;

/// Build a registry holding `roster` from genesis.
pub fn registry_from_roster(roster: &Roster) -> Result<AuthorityRegistry, NodeError> {
    let mut registry = AuthorityRegistry::new();
    let groups = [
        (&roster.federated, AuthorityStatus::Federated),
        (&roster.audit, AuthorityStatus::Audit),
    ];
    for (ids, status) in groups {
        for id in ids {
            let key = roster
                .keyring
                .public(id)
                .ok_or(ConsensusError::MissingKey(*id))?;
            let index = registry.add(*id)?;
            registry.set_status(index, status, DbHeight::GENESIS)?;
            registry.register_signing_key(index, key, KeyType::Ed25519, 0)?;
        }
    }
    Ok(registry)
}

/// One node on the loopback network.
pub struct LoopbackNode {
    pub handle: PipelineHandle,
    pub metrics: Arc<NodeMetrics>,
    commits: mpsc::Receiver<CommittedSlot>,
}

/// Several pipelines wired together in memory.
pub struct Loopback {
    nodes: Vec<LoopbackNode>,
    tasks: Vec<JoinHandle<Result<u64, NodeError>>>,
    shutdown: ShutdownController,
}

impl Loopback {
    /// Start one pipeline per identity in `members`, all reading `registry`.
    pub fn start(
        config: &NodeConfig,
        roster: &Roster,
        registry: Arc<RwLock<AuthorityRegistry>>,
        members: &[IdentityChainId],
    ) -> Result<Self, NodeError> {
        let shutdown = ShutdownController::new();
        let mut nodes = Vec::with_capacity(members.len());
        let mut outputs = Vec::with_capacity(members.len());
        for identity in members {
            let key = roster
                .keyring
                .private_copy(identity)
                .ok_or(ConsensusError::MissingKey(*identity))?;
            let metrics = Arc::new(NodeMetrics::new());
            let (handle, out) = spawn_pipeline(
                config,
                Arc::clone(&registry),
                roster.height(),
                *identity,
                key,
                Arc::clone(&metrics),
                &shutdown,
            )?;
            outputs.push(out);
            nodes.push((handle, metrics));
        }

        let inbounds: Vec<QueueSender<Message>> =
            nodes.iter().map(|(h, _)| h.inbound.clone()).collect();
        let mut tasks = Vec::new();
        let mut wired = Vec::with_capacity(nodes.len());
        for (index, ((handle, metrics), out)) in nodes.into_iter().zip(outputs).enumerate() {
            let PipelineOutputs {
                outbound,
                inventory,
                commits,
                leader,
                invalid,
            } = out;
            let peers: Vec<_> = inbounds
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, tx)| tx.clone())
                .collect();
            let span = pump_span(&handle.local(), peers.len());
            tasks.push(tokio::spawn(
                pump(outbound, inventory, peers, shutdown.subscribe()).instrument(span),
            ));
            tasks.push(tokio::spawn(drain(leader, shutdown.subscribe())));
            tasks.push(tokio::spawn(drain(invalid, shutdown.subscribe())));
            wired.push(LoopbackNode {
                handle,
                metrics,
                commits,
            });
        }
        Ok(Self {
            nodes: wired,
            tasks,
            shutdown,
        })
    }

    pub fn nodes(&self) -> &[LoopbackNode] {
        &self.nodes
    }

    /// Inject `message` into every node's inbound queue.
    pub async fn broadcast(&self, message: &Message) -> Result<(), NodeError> {
        for node in &self.nodes {
            node.handle.inbound.send(message.clone()).await?;
        }
        Ok(())
    }

    /// Hand `control` to every node, as each node's clock and block layer
    /// would.
    pub async fn control(&self, control: &Control) -> Result<(), NodeError> {
        for node in &self.nodes {
            node.handle.control.send(control.clone()).await?;
        }
        Ok(())
    }

    /// Wait up to `wait` for every node to report a commit. Nodes that did
    /// not commit in time map to an empty list.
    pub async fn collect_commits(
        &mut self,
        wait: Duration,
    ) -> BTreeMap<IdentityChainId, Vec<CommittedSlot>> {
        let deadline = Instant::now() + wait;
        let mut commits = BTreeMap::new();
        for node in &mut self.nodes {
            let mut seen = Vec::new();
            match timeout_at(deadline, node.commits.recv()).await {
                Ok(Some(commit)) => seen.push(commit),
                Ok(None) => {}
                Err(_) => warn!(node = ?node.handle.local(), "no commit before deadline"),
            }
            while let Ok(commit) = node.commits.try_recv() {
                seen.push(commit);
            }
            commits.insert(node.handle.local(), seen);
        }
        commits
    }

    /// Stop every task. Returns the number of messages the pumps forwarded.
    pub async fn stop(mut self) -> Result<u64, NodeError> {
        self.shutdown.shutdown();
        let mut forwarded = 0;
        for task in self.tasks.drain(..) {
            forwarded += task.await.map_err(|e| NodeError::Task(e.to_string()))??;
        }
        for node in &mut self.nodes {
            node.handle.join().await?;
        }
        Ok(forwarded)
    }
}

/// Forward one node's output to its peers through the wire codec.
async fn pump(
    mut outbound: mpsc::Receiver<Message>,
    mut inventory: mpsc::Receiver<Message>,
    peers: Vec<QueueSender<Message>>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<u64, NodeError> {
    let mut forwarded = 0;
    loop {
        let next = tokio::select! {
            _ = shutdown.recv() => break,
            m = outbound.recv() => m,
            m = inventory.recv() => m,
        };
        let Some(message) = next else { break };
        let bytes = encode(&message)?;
        for peer in &peers {
            match peer.send(decode(&bytes)?).await {
                Ok(_) => forwarded += 1,
                Err(NodeError::QueueClosed(_)) => return Ok(forwarded),
                Err(e) => return Err(e),
            }
        }
    }
    debug!(forwarded, "pump stopped");
    Ok(forwarded)
}

async fn drain<T>(
    mut rx: mpsc::Receiver<T>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<u64, NodeError> {
    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            next = rx.recv() => if next.is_none() { break },
        }
    }
    Ok(0)
}

/// Outcome of [`simulate`].
#[derive(Clone, Debug, Serialize)]
pub struct SimulationReport {
    pub faulted_slot: usize,
    pub faulted_leader: IdentityChainId,
    /// Winner each node committed for the faulted slot, by node.
    pub winners: BTreeMap<String, Option<IdentityChainId>>,
    /// Every node committed, and all to the same winner.
    pub agreed: bool,
    pub forwarded: u64,
    pub votes_counted: u64,
    pub rejected: u64,
    pub safety_violations: u64,
    /// Text exposition of the first node's metrics, when enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<String>,
}

impl SimulationReport {
    pub fn winner(&self) -> Option<IdentityChainId> {
        if !self.agreed {
            return None;
        }
        self.winners.values().next().copied().flatten()
    }
}

/// Run the configured roster through one minute in which the leader of
/// `roster.faulted_slot` stays silent.
///
/// Every other leader sends its EOM, then every node gets the minute's tick.
/// The fault monitors detect the silent leader, the top-priority audit
/// server volunteers and the nodes vote over the loopback network.
pub async fn simulate(config: &NodeConfig, wait: Duration) -> Result<SimulationReport, NodeError> {
    config.validate()?;
    let roster = Roster::simulated(
        config.roster.federated,
        config.roster.audit,
        DbHeight::new(config.roster.height),
    );
    let faulted_slot = config.roster.faulted_slot;
    let faulted_leader = roster
        .authorities
        .leader(faulted_slot)
        .ok_or(ConsensusError::InvalidSlot {
            slot: faulted_slot,
            slots: roster.federated.len(),
        })?;
    let registry = Arc::new(RwLock::new(registry_from_roster(&roster)?));
    let members: Vec<_> = roster.all().filter(|id| *id != faulted_leader).collect();
    info!(
        nodes = members.len(),
        faulted_slot,
        leader = ?faulted_leader,
        "simulation starting"
    );

    let mut network = Loopback::start(config, &roster, registry, &members)?;
    let height = roster.height();
    for leader in roster.federated.iter().filter(|id| **id != faulted_leader) {
        let eom = BlockMessage {
            kind: BlockKind::Eom,
            sender: *leader,
            height,
            minute: 0,
            payload: Vec::new(),
        };
        network.broadcast(&Message::Block(eom.clone())).await?;
        network.control(&Control::Synced(eom)).await?;
    }
    network.control(&Control::Tick(Tick::new(height, 0))).await?;

    let commits = network.collect_commits(wait).await;
    let (votes_counted, rejected, safety_violations) =
        network.nodes().iter().fold((0, 0, 0), |(v, r, s), node| {
            (
                v + node.metrics.votes_counted.get(),
                r + node.metrics.rejected_total(),
                s + node.metrics.safety_violations.get(),
            )
        });
    let metrics = match network.nodes().first() {
        Some(node) if config.enable_metrics => Some(node.metrics.encode()?),
        _ => None,
    };
    let forwarded = network.stop().await?;

    let winners: BTreeMap<String, Option<IdentityChainId>> = commits
        .iter()
        .map(|(node, seen)| {
            let winner = seen
                .iter()
                .find(|c| c.slot == faulted_slot)
                .map(|c| c.winner);
            (node.short(), winner)
        })
        .collect();
    let first = winners.values().next().copied().flatten();
    let agreed = first.is_some() && winners.values().all(|w| *w == first);
    info!(agreed, winner = ?first, forwarded, "simulation finished");

    Ok(SimulationReport {
        faulted_slot,
        faulted_leader,
        winners,
        agreed,
        forwarded,
        votes_counted,
        rejected,
        safety_violations,
        metrics,
    })
}

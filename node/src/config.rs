//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::Path;

use fedchain_consensus::DEFAULT_ELECTION_WINDOW;
use fedchain_search::SearchConfig;
use fedchain_types::NetworkId;

use crate::logging::LogFormat;
use crate::queues::QueuePolicy;
use crate::NodeError;

/// Configuration for a fedchain node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Which network the signing payloads are bound to.
    #[serde(default)]
    pub network: NetworkId,

    /// Index of the local identity in the simulated roster (federated first).
    #[serde(default)]
    pub local_identity: u32,

    /// Minutes an election stays open before a tick expires it.
    #[serde(default = "default_election_window")]
    pub election_window: u32,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to collect Prometheus metrics.
    #[serde(default)]
    pub enable_metrics: bool,

    /// Capacities and backpressure policies of the pipeline queues.
    #[serde(default)]
    pub queues: QueueConfig,

    /// Defaults for the search harness.
    #[serde(default)]
    pub search: SearchConfig,

    /// Authority set used by simulations.
    #[serde(default)]
    pub roster: RosterConfig,
}

/// Queue sizing. Every queue is bounded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Network intake into the validator.
    #[serde(default = "default_block")]
    pub inbound: QueuePolicy,

    /// Local ticks and block-layer EOM confirmations into the router.
    #[serde(default = "default_block")]
    pub control: QueuePolicy,

    /// Validated messages into the per-slot workers.
    #[serde(default = "default_block")]
    pub election: QueuePolicy,

    /// Votes and commit announcements to peers.
    #[serde(default = "default_block")]
    pub outbound: QueuePolicy,

    /// Commits handed to block production.
    #[serde(default = "default_block")]
    pub commits: QueuePolicy,

    /// Block-production traffic for the leader.
    #[serde(default = "default_block")]
    pub leader: QueuePolicy,

    /// Rejected messages, kept for inspection.
    #[serde(default = "default_drop_newest")]
    pub invalid: QueuePolicy,

    /// Re-broadcast of accepted volunteers.
    #[serde(default = "default_drop_newest")]
    pub inventory: QueuePolicy,
}

/// A simulated authority set: federated servers lead slots `0..federated`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterConfig {
    #[serde(default = "default_federated")]
    pub federated: u32,

    #[serde(default = "default_audit")]
    pub audit: u32,

    /// Directory-block height the elections run at.
    #[serde(default = "default_height")]
    pub height: u32,

    /// Slot whose leader stays silent in `simulate`.
    #[serde(default = "default_faulted_slot")]
    pub faulted_slot: usize,
}

// Serde default helpers

fn default_election_window() -> u32 {
    DEFAULT_ELECTION_WINDOW
}

fn default_capacity() -> usize {
    10_000
}

fn default_block() -> QueuePolicy {
    QueuePolicy::Block
}

fn default_drop_newest() -> QueuePolicy {
    QueuePolicy::DropNewest
}

fn default_federated() -> u32 {
    3
}

fn default_audit() -> u32 {
    2
}

fn default_height() -> u32 {
    1
}

fn default_faulted_slot() -> usize {
    1
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            NodeError::Config(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn log_format(&self) -> LogFormat {
        LogFormat::parse(&self.log_format)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.queues.capacity == 0 {
            return Err(NodeError::Config("queue capacity must be positive".into()));
        }
        if self.roster.federated == 0 {
            return Err(NodeError::Config("roster needs at least one federated server".into()));
        }
        let total = self.roster.federated + self.roster.audit;
        if self.local_identity >= total {
            return Err(NodeError::Config(format!(
                "local_identity {} outside roster of {total}",
                self.local_identity
            )));
        }
        if self.roster.faulted_slot >= self.roster.federated as usize {
            return Err(NodeError::Config(format!(
                "faulted_slot {} outside {} leader slots",
                self.roster.faulted_slot, self.roster.federated
            )));
        }
        if self.election_window == 0 {
            return Err(NodeError::Config("election_window must be positive".into()));
        }
        Ok(())
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: NetworkId::default(),
            local_identity: 0,
            election_window: default_election_window(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
            queues: QueueConfig::default(),
            search: SearchConfig::default(),
            roster: RosterConfig::default(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            inbound: QueuePolicy::Block,
            control: QueuePolicy::Block,
            election: QueuePolicy::Block,
            outbound: QueuePolicy::Block,
            commits: QueuePolicy::Block,
            leader: QueuePolicy::Block,
            invalid: QueuePolicy::DropNewest,
            inventory: QueuePolicy::DropNewest,
        }
    }
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            federated: default_federated(),
            audit: default_audit(),
            height: default_height(),
            faulted_slot: default_faulted_slot(),
        }
    }
}

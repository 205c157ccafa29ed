//! fedchain node: the production path around the election core.
//!
//! Inbound messages are classified and authenticated by the [`Validator`],
//! then routed to one [`SlotWorker`] per leader slot. Each worker owns the
//! election for its slot; the router also owns the [`fedchain_consensus::FaultMonitor`]
//! that turns missing end-of-minute signals into volunteers. Every queue is
//! bounded, with a [`QueuePolicy`] chosen in [`NodeConfig`].
//!
//! [`loopback`] wires several pipelines together in memory for simulations.

pub mod config;
pub mod error;
pub mod logging;
pub mod loopback;
pub mod metrics;
pub mod pipeline;
pub mod queues;
pub mod router;
pub mod shutdown;
pub mod tracing_spans;
pub mod worker;

pub use config::{NodeConfig, QueueConfig, RosterConfig};
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use loopback::{registry_from_roster, simulate, Loopback, LoopbackNode, SimulationReport};
pub use metrics::NodeMetrics;
pub use pipeline::{spawn_pipeline, Control, InvalidMessage, PipelineHandle, PipelineOutputs};
pub use queues::{bounded, QueuePolicy, QueueSender};
pub use router::{Route, Validator};
pub use shutdown::ShutdownController;
pub use worker::{CommittedSlot, SlotWorker, WorkerOutputs};

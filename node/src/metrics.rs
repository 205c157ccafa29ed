//! Prometheus metrics for the election pipeline.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`]; [`NodeMetrics::encode`]
//! renders it in the Prometheus text exposition format.

use prometheus::core::Collector;
use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, Histogram,
    HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

use crate::NodeError;

/// Node-level election metrics.
pub struct NodeMetrics {
    pub registry: Registry,

    // Counters
    /// Messages taken off the inbound network queue.
    pub messages_received: IntCounter,
    /// Messages that passed classification and authentication.
    pub messages_validated: IntCounter,
    /// Messages discarded, by rejection reason.
    pub messages_rejected: IntCounterVec,
    /// Items dropped because a best-effort queue was full, by queue.
    pub messages_dropped: IntCounterVec,
    /// Votes an election accepted.
    pub votes_counted: IntCounter,
    pub elections_committed: IntCounter,
    pub elections_expired: IntCounter,
    pub safety_violations: IntCounter,
    /// Volunteers this node produced after detecting a leader fault.
    pub volunteers_sent: IntCounter,

    // Gauges
    /// Elections not yet committed, expired or halted.
    pub open_elections: IntGauge,

    // Histograms
    /// Messages an election consumed before it committed.
    pub messages_to_commit: Histogram,
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let messages_received = register_int_counter_with_registry!(
            Opts::new(
                "fedchain_messages_received_total",
                "Messages taken off the inbound network queue"
            ),
            registry
        )
        .expect("failed to register messages_received counter");

        let messages_validated = register_int_counter_with_registry!(
            Opts::new(
                "fedchain_messages_validated_total",
                "Messages that passed validation"
            ),
            registry
        )
        .expect("failed to register messages_validated counter");

        let messages_rejected = register_int_counter_vec_with_registry!(
            Opts::new(
                "fedchain_messages_rejected_total",
                "Messages discarded, by reason"
            ),
            &["reason"],
            registry
        )
        .expect("failed to register messages_rejected counter");

        let messages_dropped = register_int_counter_vec_with_registry!(
            Opts::new(
                "fedchain_messages_dropped_total",
                "Items dropped on a full best-effort queue"
            ),
            &["queue"],
            registry
        )
        .expect("failed to register messages_dropped counter");

        let votes_counted = register_int_counter_with_registry!(
            Opts::new("fedchain_votes_counted_total", "Votes accepted by elections"),
            registry
        )
        .expect("failed to register votes_counted counter");

        let elections_committed = register_int_counter_with_registry!(
            Opts::new(
                "fedchain_elections_committed_total",
                "Elections that reached quorum"
            ),
            registry
        )
        .expect("failed to register elections_committed counter");

        let elections_expired = register_int_counter_with_registry!(
            Opts::new(
                "fedchain_elections_expired_total",
                "Elections that timed out without a winner"
            ),
            registry
        )
        .expect("failed to register elections_expired counter");

        let safety_violations = register_int_counter_with_registry!(
            Opts::new(
                "fedchain_safety_violations_total",
                "Slots halted after conflicting commits"
            ),
            registry
        )
        .expect("failed to register safety_violations counter");

        let volunteers_sent = register_int_counter_with_registry!(
            Opts::new(
                "fedchain_volunteers_sent_total",
                "Volunteers produced by this node"
            ),
            registry
        )
        .expect("failed to register volunteers_sent counter");

        let open_elections = register_int_gauge_with_registry!(
            Opts::new("fedchain_open_elections", "Elections still collecting votes"),
            registry
        )
        .expect("failed to register open_elections gauge");

        let messages_to_commit = register_histogram_with_registry!(
            HistogramOpts::new(
                "fedchain_messages_to_commit",
                "Messages an election consumed before committing"
            )
            .buckets(prometheus::linear_buckets(1.0, 2.0, 16).unwrap_or_default()),
            registry
        )
        .expect("failed to register messages_to_commit histogram");

        Self {
            registry,
            messages_received,
            messages_validated,
            messages_rejected,
            messages_dropped,
            votes_counted,
            elections_committed,
            elections_expired,
            safety_violations,
            volunteers_sent,
            open_elections,
            messages_to_commit,
        }
    }

    /// Render every metric in the text exposition format.
    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| NodeError::Config(format!("metrics encoding: {e}")))?;
        String::from_utf8(buffer).map_err(|e| NodeError::Config(format!("metrics encoding: {e}")))
    }

    pub fn rejected(&self, reason: &str) {
        self.messages_rejected.with_label_values(&[reason]).inc();
    }

    pub fn dropped(&self, queue: &str) {
        self.messages_dropped.with_label_values(&[queue]).inc();
    }

    /// Rejections summed over every reason.
    pub fn rejected_total(&self) -> u64 {
        self.messages_rejected
            .collect()
            .iter()
            .flat_map(|family| family.get_metric())
            .map(|metric| metric.get_counter().get_value() as u64)
            .sum()
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labelled_counters_show_up_in_text_output() {
        let metrics = NodeMetrics::new();
        metrics.rejected("bad_signature");
        metrics.rejected("bad_signature");
        metrics.dropped("invalid");
        metrics.elections_committed.inc();

        assert_eq!(metrics.rejected_total(), 2);

        let text = metrics.encode().unwrap();
        assert!(text.contains("fedchain_messages_rejected_total{reason=\"bad_signature\"} 2"));
        assert!(text.contains("fedchain_messages_dropped_total{queue=\"invalid\"} 1"));
        assert!(text.contains("fedchain_elections_committed_total 1"));
    }

    #[test]
    fn separate_instances_do_not_share_registries() {
        let a = NodeMetrics::new();
        let b = NodeMetrics::new();
        a.votes_counted.inc();
        assert_eq!(a.votes_counted.get(), 1);
        assert_eq!(b.votes_counted.get(), 0);
    }
}

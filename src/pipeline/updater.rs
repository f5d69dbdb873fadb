//! Node registry updater
//!
//! The only writer of the registry. Picks the node id out of a decoded
//! response, drops responses without a valid id, merges the rest and forwards
//! merged nodes that carry statistics to the sink.

use crate::core::{NodeId, NodeRegistry, ResponseData};
use crate::infrastructure::CollectorMetrics;
use crate::sink::StatsSink;
use std::net::SocketAddr;
use std::sync::Arc;

/// Result of handling one response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Merged into the registry
    Stored {
        node_id: NodeId,
        /// Merged node was handed to the sink
        forwarded: bool,
    },
    /// Dropped: no section present, or the id has the wrong length
    InvalidNodeId {
        source: SocketAddr,
        raw_id: Option<String>,
    },
}

/// Dispatches decoded responses to the registry and sink
#[derive(Clone)]
pub struct NodeUpdater {
    registry: Arc<dyn NodeRegistry>,
    sink: Option<Arc<dyn StatsSink>>,
    metrics: Arc<CollectorMetrics>,
}

impl NodeUpdater {
    pub fn new(
        registry: Arc<dyn NodeRegistry>,
        sink: Option<Arc<dyn StatsSink>>,
        metrics: Arc<CollectorMetrics>,
    ) -> Self {
        Self {
            registry,
            sink,
            metrics,
        }
    }

    /// Handle one decoded response from `source`
    pub fn save_response(&self, source: SocketAddr, response: ResponseData) -> UpdateOutcome {
        let Some((section, raw_id)) = response.candidate_node_id() else {
            tracing::warn!(%source, "invalid node id: response has no known section");
            self.metrics.record_invalid_node_id();
            return UpdateOutcome::InvalidNodeId { source, raw_id: None };
        };

        let node_id = match NodeId::parse(raw_id) {
            Ok(node_id) => node_id,
            Err(e) => {
                tracing::warn!(%source, section = section.key(), raw_id = %e.0, "invalid node id");
                self.metrics.record_invalid_node_id();
                return UpdateOutcome::InvalidNodeId {
                    source,
                    raw_id: Some(e.0),
                };
            }
        };

        let node = self.registry.update(&node_id, response);
        self.metrics.record_node_updated();

        let mut forwarded = false;
        if let Some(sink) = &self.sink {
            if node.has_statistics() {
                sink.add(&node_id, &node);
                self.metrics.record_sink_forward();
                forwarded = true;
            }
        }

        tracing::debug!(node_id = %node_id, %source, forwarded, "node updated");
        UpdateOutcome::Stored { node_id, forwarded }
    }
}
